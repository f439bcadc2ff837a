use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::{macros::format_description, Date, Time};

use super::{lenient, RunningTimer};

/// Formats a date the way the entries endpoints expect it (`YYYY-MM-DD`).
pub fn api_date(date: Date) -> String {
    format!(
        "{:04}-{:02}-{:02}",
        date.year(),
        date.month() as u8,
        date.day()
    )
}

/// A logged time entry (`GET /entries`).
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Entry {
    #[serde(deserialize_with = "lenient::int")]
    pub id: i64,
    #[serde(deserialize_with = "lenient::string")]
    pub duration: String,
    #[serde(deserialize_with = "lenient::string")]
    pub user_id: String,
    #[serde(deserialize_with = "lenient::string")]
    pub user_name: String,
    #[serde(deserialize_with = "lenient::string")]
    pub task_id: String,
    #[serde(deserialize_with = "lenient::string")]
    pub task_note: String,
    #[serde(deserialize_with = "lenient::string")]
    pub last_modify: String,
    #[serde(deserialize_with = "lenient::string")]
    pub date: String,
    #[serde(deserialize_with = "lenient::string")]
    pub start_time: String,
    #[serde(deserialize_with = "lenient::string")]
    pub end_time: String,
    #[serde(deserialize_with = "lenient::string")]
    pub locked: String,
    #[serde(deserialize_with = "lenient::string")]
    pub name: String,
    #[serde(deserialize_with = "lenient::string")]
    pub addons_external_id: String,
    #[serde(deserialize_with = "lenient::int")]
    pub billable: i64,
    #[serde(rename = "invoiceId", deserialize_with = "lenient::string")]
    pub invoice_id: String,
    #[serde(deserialize_with = "lenient::string")]
    pub color: String,
    #[serde(deserialize_with = "lenient::string")]
    pub description: String,
}

impl Entry {
    /// The running timer shows up as an entry whose start and end are equal.
    pub fn is_running_timer(&self, timers: &[RunningTimer]) -> bool {
        self.start_time == self.end_time && !timers.is_empty()
    }

    /// Duration in seconds, or 0 when the server sent something unparsable.
    pub fn duration_secs(&self) -> i64 {
        self.duration.trim().parse().unwrap_or(0)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EntryUpdateError {
    #[error("end time {end} is before start time {start}")]
    EndBeforeStart { start: String, end: String },
}

/// Body of `PUT /entries`. Unset fields are left untouched by the server.
#[derive(Default, Debug, Clone, PartialEq, Serialize)]
pub struct EntryUpdate {
    pub id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<i64>,
}

impl EntryUpdate {
    pub fn new(id: i64) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    pub fn date(mut self, date: Date) -> Self {
        self.date = Some(api_date(date));
        self
    }

    pub fn task(mut self, task_id: i64) -> Self {
        self.task_id = Some(task_id);
        self
    }

    /// Set start and/or end (`HH:MM:SS`); empty strings are ignored. When
    /// both parse, the duration is derived from them and an end before the
    /// start is rejected.
    pub fn with_times(mut self, start: &str, end: &str) -> Result<Self, EntryUpdateError> {
        if !start.is_empty() {
            self.start_time = Some(start.to_string());
        }
        if !end.is_empty() {
            self.end_time = Some(end.to_string());
        }

        if let (Some(start_at), Some(end_at)) = (parse_clock(start), parse_clock(end)) {
            if end_at < start_at {
                return Err(EntryUpdateError::EndBeforeStart {
                    start: start.to_string(),
                    end: end.to_string(),
                });
            }
            let seconds = (end_at - start_at).whole_seconds();
            self.duration = (seconds > 0).then_some(seconds);
        }

        Ok(self)
    }

    /// Drop any times; used when the entry is the running timer, whose
    /// bounds are owned by the timer itself.
    pub fn without_times(mut self) -> Self {
        self.start_time = None;
        self.end_time = None;
        self.duration = None;
        self
    }
}

fn parse_clock(value: &str) -> Option<Time> {
    Time::parse(value, format_description!("[hour]:[minute]:[second]")).ok()
}

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdatedEntry {
    #[serde(deserialize_with = "lenient::string")]
    pub entry_id: String,
    #[serde(deserialize_with = "lenient::string")]
    pub task_id: String,
}

/// Body of `DELETE /entries`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeleteEntry {
    pub id: String,
}

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeleteResponse {
    pub message: String,
}
