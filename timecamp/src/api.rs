use core::fmt;
use std::sync::Arc;

use time::Date;
use tracing::instrument;

use crate::{
    domain::{
        api_date, DeleteEntry, DeleteResponse, Entry, EntryUpdate, Me, RunningTimer,
        StartedTimer, StoppedTimer, TimerAction, Tasks, UpdatedEntry,
    },
    ApiClient, ApiPath, ApiRequest, CallError,
};

pub const DEFAULT_BASE_URL: &str = "https://app.timecamp.com/third_party/api";

/// Typed TimeCamp API on top of a deduplicating [`ApiClient`]. Every call
/// carries the bearer token.
#[derive(Clone)]
pub struct TimeCamp {
    client: ApiClient,
    token: Arc<str>,
}

impl fmt::Debug for TimeCamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimeCamp")
            .field("client", &self.client)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Result of [`TimeCamp::overview`]; each part fails independently.
#[derive(Debug)]
pub struct Overview {
    pub me: Result<Arc<Me>, CallError>,
    pub entries: Result<Arc<Vec<Entry>>, CallError>,
    pub timers: Result<Arc<Vec<RunningTimer>>, CallError>,
    pub tasks: Result<Arc<Tasks>, CallError>,
}

impl Overview {
    /// `(fetch type, error)` for every part that failed.
    pub fn failures(&self) -> Vec<(&'static str, &CallError)> {
        [
            ("user info", self.me.as_ref().err()),
            ("entries", self.entries.as_ref().err()),
            ("timers", self.timers.as_ref().err()),
            ("tasks", self.tasks.as_ref().err()),
        ]
        .into_iter()
        .filter_map(|(kind, err)| err.map(|err| (kind, err)))
        .collect()
    }
}

impl TimeCamp {
    pub fn new(client: ApiClient, token: impl Into<String>) -> Self {
        Self {
            client,
            token: token.into().into(),
        }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    fn request(&self, request: ApiRequest) -> ApiRequest {
        request.bearer_auth(&self.token)
    }

    #[instrument(name = "TimeCamp::me", skip(self))]
    pub async fn me(&self) -> Result<Arc<Me>, CallError> {
        self.client
            .call(self.request(ApiRequest::get(ApiPath::new("me"))))
            .await
    }

    #[instrument(name = "TimeCamp::entries", skip(self))]
    pub async fn entries(&self, date: Date) -> Result<Arc<Vec<Entry>>, CallError> {
        let day = api_date(date);
        let path = ApiPath::new("entries")
            .with_query("from", &day)
            .with_query("to", &day);
        self.client.call(self.request(ApiRequest::get(path))).await
    }

    #[instrument(name = "TimeCamp::tasks", skip(self))]
    pub async fn tasks(&self) -> Result<Arc<Tasks>, CallError> {
        let path = ApiPath::new("tasks").with_query("minimal", 1);
        self.client.call(self.request(ApiRequest::get(path))).await
    }

    #[instrument(name = "TimeCamp::running_timers", skip(self))]
    pub async fn running_timers(&self) -> Result<Arc<Vec<RunningTimer>>, CallError> {
        self.client
            .call(self.request(ApiRequest::get(ApiPath::new("timer_running"))))
            .await
    }

    #[instrument(name = "TimeCamp::start_timer", skip(self))]
    pub async fn start_timer(&self) -> Result<Arc<StartedTimer>, CallError> {
        let request = ApiRequest::post(ApiPath::new("timer")).json(&TimerAction::Start);
        self.client.call(self.request(request)).await
    }

    #[instrument(name = "TimeCamp::stop_timer", skip(self))]
    pub async fn stop_timer(&self, task_id: Option<String>) -> Result<Arc<StoppedTimer>, CallError> {
        let request =
            ApiRequest::post(ApiPath::new("timer")).json(&TimerAction::Stop { task_id });
        self.client.call(self.request(request)).await
    }

    #[instrument(name = "TimeCamp::update_entry", skip(self, update), fields(entry_id = update.id))]
    pub async fn update_entry(&self, update: &EntryUpdate) -> Result<Arc<UpdatedEntry>, CallError> {
        let request = ApiRequest::put(ApiPath::new("entries")).json(update);
        self.client.call(self.request(request)).await
    }

    /// Update `entry`, leaving its times alone when it is the running timer.
    pub async fn edit_entry(
        &self,
        entry: &Entry,
        timers: &[RunningTimer],
        update: EntryUpdate,
    ) -> Result<Arc<UpdatedEntry>, CallError> {
        let update = if entry.is_running_timer(timers) {
            tracing::debug!(entry_id = entry.id, "entry is the running timer, not sending times");
            update.without_times()
        } else {
            update
        };
        self.update_entry(&update).await
    }

    pub async fn reassign_task(
        &self,
        entry_id: i64,
        task_id: i64,
    ) -> Result<Arc<UpdatedEntry>, CallError> {
        self.update_entry(&EntryUpdate::new(entry_id).task(task_id))
            .await
    }

    #[instrument(name = "TimeCamp::delete_entry", skip(self))]
    pub async fn delete_entry(&self, entry_id: i64) -> Result<Arc<DeleteResponse>, CallError> {
        let body = DeleteEntry {
            id: entry_id.to_string(),
        };
        let request = ApiRequest::delete(ApiPath::new("entries")).json(&body);
        self.client.call(self.request(request)).await
    }

    /// Fetch profile, the day's entries, running timers and tasks
    /// concurrently. Failures are logged per part and returned in place.
    #[instrument(name = "TimeCamp::overview", skip(self))]
    pub async fn overview(&self, date: Date) -> Overview {
        let (me, entries, timers, tasks) = tokio::join!(
            self.me(),
            self.entries(date),
            self.running_timers(),
            self.tasks()
        );
        let overview = Overview {
            me,
            entries,
            timers,
            tasks,
        };

        for (kind, err) in overview.failures() {
            tracing::warn!("error fetching {}: {}", kind, err);
        }

        overview
    }
}
