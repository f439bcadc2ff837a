use serde::{Deserialize, Serialize};
use time::{macros::format_description, Duration, PrimitiveDateTime};

use super::lenient;

/// A timer currently running for the user (`GET /timer_running`).
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunningTimer {
    #[serde(deserialize_with = "lenient::string")]
    pub timer_id: String,
    #[serde(deserialize_with = "lenient::string")]
    pub user_id: String,
    #[serde(deserialize_with = "lenient::optional_string")]
    pub task_id: Option<String>,
    pub started_at: String,
    pub name: Option<String>,
}

impl RunningTimer {
    /// Start time in the account's local time zone.
    pub fn started(&self) -> Option<PrimitiveDateTime> {
        PrimitiveDateTime::parse(
            &self.started_at,
            format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
        )
        .ok()
    }

    pub fn elapsed(&self, now: PrimitiveDateTime) -> Option<Duration> {
        self.started().map(|started| now - started)
    }
}

/// Body of `POST /timer`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum TimerAction {
    Start,
    Stop {
        #[serde(skip_serializing_if = "Option::is_none")]
        task_id: Option<String>,
    },
}

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StartedTimer {
    #[serde(deserialize_with = "lenient::int")]
    pub entry_id: i64,
}

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoppedTimer {
    #[serde(deserialize_with = "lenient::int")]
    pub elapsed: i64,
    #[serde(deserialize_with = "lenient::string")]
    pub entry_id: String,
    #[serde(deserialize_with = "lenient::int")]
    pub entry_time: i64,
}
