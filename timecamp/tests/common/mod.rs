//! In-process mock of the TimeCamp API plus a few diagnostic routes used by
//! the deduplication tests. Every handler counts its hits.

#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};

pub const TOKEN: &str = "test-token";
pub const SLOW: Duration = Duration::from_millis(300);

#[derive(Default)]
pub struct MockState {
    hits: Mutex<HashMap<&'static str, usize>>,
    pub failing: AtomicBool,
    last_body: Mutex<Option<Value>>,
    last_query: Mutex<Option<HashMap<String, String>>>,
}

impl MockState {
    pub fn hits(&self, route: &str) -> usize {
        self.hits.lock().unwrap().get(route).copied().unwrap_or(0)
    }

    pub fn last_body(&self) -> Option<Value> {
        self.last_body.lock().unwrap().clone()
    }

    pub fn last_query(&self) -> Option<HashMap<String, String>> {
        self.last_query.lock().unwrap().clone()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn hit(&self, route: &'static str) {
        *self.hits.lock().unwrap().entry(route).or_default() += 1;
    }

    fn record_body(&self, body: &Value) {
        *self.last_body.lock().unwrap() = Some(body.clone());
    }
}

pub struct MockBackend {
    pub base_url: String,
    pub state: Arc<MockState>,
}

pub async fn spawn() -> MockBackend {
    let state = Arc::new(MockState::default());
    let app = router(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    MockBackend {
        base_url: format!("http://{}", addr),
        state,
    }
}

/// Address nothing listens on.
pub async fn closed_port_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

/// Server that announces a 100 byte JSON body, sends a few bytes of it and
/// hangs up, once per connection.
pub async fn truncated_body_url() -> String {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let mut request = [0u8; 4096];
            let _ = socket.read(&mut request).await;
            let _ = socket
                .write_all(
                    b"HTTP/1.1 200 OK\r\ncontent-type: application/json\r\n\
                      content-length: 100\r\n\r\n{\"x\"",
                )
                .await;
            let _ = socket.shutdown().await;
        }
    });
    format!("http://{}", addr)
}

type Shared = State<Arc<MockState>>;

fn router(state: Arc<MockState>) -> Router {
    Router::new()
        .route("/slow", get(slow))
        .route("/flaky", get(flaky))
        .route("/status/404", get(not_found))
        .route("/garbage", get(garbage))
        .route("/hang", get(hang))
        .route("/echo-headers", get(echo_headers))
        .route("/echo", axum::routing::post(echo))
        .route("/me", get(me))
        .route("/entries", get(entries).put(update_entry).delete(delete_entry))
        .route("/tasks", get(tasks))
        .route("/timer_running", get(timer_running))
        .route("/timer", axum::routing::post(timer))
        .with_state(state)
}

async fn slow(State(state): Shared) -> Json<Value> {
    state.hit("slow");
    tokio::time::sleep(SLOW).await;
    Json(json!({"x": 1}))
}

async fn flaky(State(state): Shared) -> Response {
    state.hit("flaky");
    tokio::time::sleep(Duration::from_millis(200)).await;
    if state.failing.load(Ordering::SeqCst) {
        (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response()
    } else {
        Json(json!({"x": 2})).into_response()
    }
}

async fn not_found(State(state): Shared) -> Response {
    state.hit("not_found");
    (StatusCode::NOT_FOUND, "not here").into_response()
}

async fn garbage(State(state): Shared) -> &'static str {
    state.hit("garbage");
    tokio::time::sleep(Duration::from_millis(100)).await;
    "this is not json"
}

async fn hang(State(state): Shared) -> &'static str {
    state.hit("hang");
    tokio::time::sleep(Duration::from_secs(10)).await;
    "too late"
}

async fn echo_headers(State(state): Shared, headers: HeaderMap) -> Json<Value> {
    state.hit("echo_headers");
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    Json(json!({
        "content-type": header("content-type"),
        "accept": header("accept"),
        "authorization": header("authorization"),
        "x-trace": header("x-trace"),
    }))
}

async fn echo(State(state): Shared, Json(body): Json<Value>) -> Json<Value> {
    state.hit("echo");
    state.record_body(&body);
    tokio::time::sleep(Duration::from_millis(200)).await;
    Json(body)
}

fn authorize(headers: &HeaderMap) -> Result<(), Response> {
    let expected = format!("Bearer {}", TOKEN);
    match headers.get("authorization").and_then(|v| v.to_str().ok()) {
        Some(value) if value == expected => Ok(()),
        _ => Err((StatusCode::UNAUTHORIZED, "invalid token").into_response()),
    }
}

async fn me(State(state): Shared, headers: HeaderMap) -> Response {
    state.hit("me");
    if let Err(response) = authorize(&headers) {
        return response;
    }
    tokio::time::sleep(Duration::from_millis(100)).await;
    Json(json!({
        "user_id": "1234",
        "email": "ada@example.com",
        "register_time": "2020-01-01 10:00:00",
        "display_name": "Ada",
        "synch_time": null,
        "root_group_id": 77,
        "permissions": {"time_tracking_admin": true}
    }))
    .into_response()
}

async fn entries(
    State(state): Shared,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    state.hit("entries");
    if let Err(response) = authorize(&headers) {
        return response;
    }
    *state.last_query.lock().unwrap() = Some(query);
    Json(json!([
        {
            "id": 501,
            "duration": "3600",
            "user_id": "1234",
            "user_name": "Ada",
            "task_id": "10",
            "date": "2024-05-01",
            "start_time": "09:00:00",
            "end_time": "10:00:00",
            "name": "api",
            "billable": 1,
            "invoiceId": "0"
        },
        {
            "id": "502",
            "duration": 0,
            "user_id": 1234,
            "task_id": 11,
            "date": "2024-05-01",
            "start_time": "11:00:00",
            "end_time": "11:00:00",
            "name": "Auth"
        }
    ]))
    .into_response()
}

async fn tasks(
    State(state): Shared,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    state.hit("tasks");
    if let Err(response) = authorize(&headers) {
        return response;
    }
    if query.get("minimal").map(String::as_str) != Some("1") {
        return (StatusCode::BAD_REQUEST, "minimal expected").into_response();
    }
    Json(json!({
        "1": {"task_id": 1, "parent_id": 0, "name": "backend", "level": 1},
        "10": {"task_id": "10", "parent_id": "1", "name": "api", "level": 2},
        "11": {"task_id": 11, "parent_id": 1, "name": "Auth", "level": 2}
    }))
    .into_response()
}

async fn timer_running(State(state): Shared, headers: HeaderMap) -> Response {
    state.hit("timer_running");
    if let Err(response) = authorize(&headers) {
        return response;
    }
    if state.failing.load(Ordering::SeqCst) {
        return (StatusCode::SERVICE_UNAVAILABLE, "timers down").into_response();
    }
    Json(json!([
        {"timer_id": "9", "user_id": "1234", "task_id": "11",
         "started_at": "2024-05-01 11:00:00", "name": null}
    ]))
    .into_response()
}

async fn timer(State(state): Shared, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    state.hit("timer");
    if let Err(response) = authorize(&headers) {
        return response;
    }
    state.record_body(&body);
    match body["action"].as_str() {
        Some("start") => Json(json!({"entry_id": 601})).into_response(),
        Some("stop") => {
            Json(json!({"elapsed": 90, "entry_id": "601", "entry_time": 90})).into_response()
        }
        _ => (StatusCode::BAD_REQUEST, "unknown action").into_response(),
    }
}

async fn update_entry(State(state): Shared, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    state.hit("update_entry");
    if let Err(response) = authorize(&headers) {
        return response;
    }
    state.record_body(&body);
    Json(json!({
        "entry_id": body["id"].clone(),
        "task_id": body.get("task_id").cloned().unwrap_or(json!("10")),
    }))
    .into_response()
}

async fn delete_entry(State(state): Shared, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    state.hit("delete_entry");
    if let Err(response) = authorize(&headers) {
        return response;
    }
    state.record_body(&body);
    Json(json!({"message": "Entry deleted"})).into_response()
}
