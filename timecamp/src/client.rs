use core::fmt;
use std::{any::Any, future::Future, sync::Arc, time::Duration};

use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE},
    Url,
};
use serde::de::DeserializeOwned;
use tokio::{runtime::Handle, sync::oneshot};
use tracing::instrument;

use crate::{
    error::UNREADABLE_BODY,
    in_flight::{self, Completed, InFlight, Outcome, Registration},
    request::validate_header,
    ApiRequest, CallError, ClientBuildError,
};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

type Decoder = fn(&[u8]) -> Result<Arc<dyn Any + Send + Sync>, serde_json::Error>;

fn decode_shared<T>(bytes: &[u8]) -> Result<Arc<dyn Any + Send + Sync>, serde_json::Error>
where
    T: DeserializeOwned + Send + Sync + 'static,
{
    let value: Arc<dyn Any + Send + Sync> = Arc::new(serde_json::from_slice::<T>(bytes)?);
    Ok(value)
}

/// HTTP client that collapses concurrent identical requests into a single
/// network call.
///
/// Clones share the transport and the in-flight registry; clients built
/// separately are fully independent.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Arc<str>,
    in_flight: Arc<InFlight>,
    runtime: Handle,
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("in_flight", &self.in_flight.len())
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub struct ApiClientBuilder {
    base_url: String,
    timeout: Duration,
    runtime: Option<Handle>,
}

impl ApiClientBuilder {
    /// Per-request timeout covering connect, send and body read.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Runtime used by the spawning and blocking call variants. Defaults to
    /// the runtime the client is built on.
    pub fn runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    pub fn build(self) -> Result<ApiClient, ClientBuildError> {
        let base_url = self.base_url.trim_end_matches('/').to_string();
        Url::parse(&base_url).map_err(|e| ClientBuildError::InvalidBaseUrl {
            url: self.base_url.clone(),
            reason: e.to_string(),
        })?;

        let runtime = match self.runtime {
            Some(runtime) => runtime,
            None => Handle::try_current()?,
        };

        let http = reqwest::Client::builder().timeout(self.timeout).build()?;

        Ok(ApiClient {
            http,
            base_url: base_url.into(),
            in_flight: Arc::new(InFlight::default()),
            runtime,
        })
    }
}

impl ApiClient {
    /// Client with the default 30 second timeout, bound to the current tokio
    /// runtime.
    pub fn new(base_url: &str) -> Result<Self, ClientBuildError> {
        Self::builder(base_url).build()
    }

    pub fn builder(base_url: &str) -> ApiClientBuilder {
        ApiClientBuilder {
            base_url: base_url.to_string(),
            timeout: DEFAULT_TIMEOUT,
            runtime: None,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Number of distinct requests currently on the wire.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Perform `request` and decode the response body as `T`.
    ///
    /// Concurrent callers with an identical request share one network call
    /// and receive the same `Arc<T>`.
    pub async fn call<T>(&self, request: ApiRequest) -> Result<Arc<T>, CallError>
    where
        T: DeserializeOwned + Send + Sync + 'static,
    {
        self.execute(&request, Some(decode_shared::<T> as Decoder))
            .await?
            .typed::<T>()
    }

    /// Perform `request` and drain the response without decoding it.
    pub async fn call_discard(&self, request: ApiRequest) -> Result<(), CallError> {
        self.execute(&request, None).await.map(|_| ())
    }

    /// Start `request` on a background task; the result is delivered exactly
    /// once through the returned receiver.
    pub fn spawn_call<T>(&self, request: ApiRequest) -> oneshot::Receiver<Result<Arc<T>, CallError>>
    where
        T: DeserializeOwned + Send + Sync + 'static,
    {
        let client = self.clone();
        self.spawn_into(async move { client.call::<T>(request).await })
    }

    pub fn spawn_discard(&self, request: ApiRequest) -> oneshot::Receiver<Result<(), CallError>> {
        let client = self.clone();
        self.spawn_into(async move { client.call_discard(request).await })
    }

    /// Start `request` on a background task and invoke `callback` exactly
    /// once with the result.
    pub fn call_with_callback<T, F>(&self, request: ApiRequest, callback: F)
    where
        T: DeserializeOwned + Send + Sync + 'static,
        F: FnOnce(Result<Arc<T>, CallError>) + Send + 'static,
    {
        let client = self.clone();
        self.runtime.spawn(async move {
            callback(client.call::<T>(request).await);
        });
    }

    pub fn discard_with_callback<F>(&self, request: ApiRequest, callback: F)
    where
        F: FnOnce(Result<(), CallError>) + Send + 'static,
    {
        let client = self.clone();
        self.runtime.spawn(async move {
            callback(client.call_discard(request).await);
        });
    }

    /// Block the current thread until `request` completes.
    ///
    /// # Panics
    ///
    /// Panics when called from within an asynchronous execution context;
    /// use [`ApiClient::call`] there instead.
    pub fn call_blocking<T>(&self, request: ApiRequest) -> Result<Arc<T>, CallError>
    where
        T: DeserializeOwned + Send + Sync + 'static,
    {
        self.spawn_call::<T>(request)
            .blocking_recv()
            .unwrap_or(Err(CallError::Abandoned))
    }

    /// Blocking counterpart of [`ApiClient::call_discard`].
    ///
    /// # Panics
    ///
    /// Panics when called from within an asynchronous execution context.
    pub fn call_discard_blocking(&self, request: ApiRequest) -> Result<(), CallError> {
        self.spawn_discard(request)
            .blocking_recv()
            .unwrap_or(Err(CallError::Abandoned))
    }

    fn spawn_into<R, F>(&self, work: F) -> oneshot::Receiver<R>
    where
        R: Send + 'static,
        F: Future<Output = R> + Send + 'static,
    {
        let (sender, receiver) = oneshot::channel();
        self.runtime.spawn(async move {
            let _ = sender.send(work.await);
        });
        receiver
    }

    #[instrument(
        name = "ApiClient::execute",
        skip(self, request, decode),
        fields(method = %request.method(), path = %request.path())
    )]
    async fn execute(&self, request: &ApiRequest, decode: Option<Decoder>) -> Outcome {
        let fingerprint = request.fingerprint()?;

        match self.in_flight.register(fingerprint) {
            Registration::Joiner(signal) => {
                tracing::debug!("joining in-flight request");
                in_flight::wait(signal).await
            }
            Registration::Owner(guard) => {
                let outcome = self.perform(request, decode).await;
                guard.complete(outcome)
            }
        }
    }

    async fn perform(&self, request: &ApiRequest, decode: Option<Decoder>) -> Outcome {
        let url = format!("{}{}", self.base_url, request.path());

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        for (name, value) in request.headers() {
            let (name, value) = validate_header(name, value)?;
            headers.insert(name, value);
        }

        let mut builder = self
            .http
            .request(request.method().into(), url.as_str())
            .headers(headers);
        if let Some(body) = request.wire_body()? {
            builder = builder.body(body);
        }

        tracing::debug!("sending request");
        let response = builder.send().await.map_err(|e| {
            tracing::warn!("transport error: {}", e);
            CallError::Transport(e.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| UNREADABLE_BODY.to_string());
            tracing::warn!(status = status.as_u16(), "request failed");
            return Err(CallError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.bytes().await.map_err(|e| {
            tracing::warn!("failed to read response body: {}", e);
            CallError::Transport(e.to_string())
        })?;

        // A 2xx body that does not match the owner's shape is still a
        // completed exchange; every caller asking for a shape decodes it
        // and reports its own error.
        let decoded = decode.and_then(|decode| match decode(&body) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                tracing::debug!("response did not decode: {}", e);
                None
            }
        });
        tracing::debug!(status = status.as_u16(), "request completed");

        Ok(Completed { body, decoded })
    }
}
