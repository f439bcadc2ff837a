use serde::{Deserialize, Serialize};

use super::lenient;

/// The authenticated user, as returned by `GET /me`.
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Me {
    #[serde(deserialize_with = "lenient::string")]
    pub user_id: String,
    pub email: String,
    pub register_time: String,
    pub display_name: Option<String>,
    pub synch_time: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub root_group_id: String,
    pub permissions: Permissions,
}

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Permissions {
    pub time_tracking_admin: bool,
    pub create_projects: bool,
    pub can_view_rates: bool,
}

impl Me {
    /// Display name with the email appended, or just the email when the
    /// account has no display name.
    pub fn label(&self) -> String {
        match self.display_name.as_deref().filter(|name| !name.is_empty()) {
            Some(name) => format!("{} ({})", name, self.email),
            None => self.email.clone(),
        }
    }
}
