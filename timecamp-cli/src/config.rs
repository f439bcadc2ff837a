use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const TOKEN_ENV: &str = "TIMECAMP_API_TOKEN";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampConfig {
    /// Base URL of the TimeCamp API
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Log filter used when RUST_LOG is not set, e.g. "info" or "timecamp=debug"
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// API token; TIMECAMP_API_TOKEN takes precedence
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,
}

fn default_api_url() -> String {
    timecamp::DEFAULT_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    timecamp::DEFAULT_TIMEOUT.as_secs()
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for CampConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            timeout_secs: default_timeout_secs(),
            log_level: default_log_level(),
            api_token: None,
        }
    }
}

impl CampConfig {
    pub fn config_path() -> Result<PathBuf> {
        Ok(dirs::config_dir()
            .context("Cannot determine config directory")?
            .join("timecamp")
            .join("config.toml"))
    }

    /// Load config from the default location, layered with `CAMP_*`
    /// environment variables.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?, environment())
    }

    /// Defaults, then the file at `path` if it exists, then `env`.
    pub fn load_from(path: &Path, env: config::Environment) -> Result<Self> {
        let settings = config::Config::builder()
            .set_default("api_url", default_api_url())?
            .set_default("timeout_secs", default_timeout_secs() as i64)?
            .set_default("log_level", default_log_level())?
            .add_source(config::File::from(path).required(false))
            .add_source(env)
            .build()
            .with_context(|| format!("Failed to read config at {}", path.display()))?;

        settings
            .try_deserialize::<Self>()
            .with_context(|| format!("Failed to parse config at {}", path.display()))
    }

    /// Write the default config to `path` unless a file already exists.
    /// Returns whether a file was created.
    pub fn write_default(path: &Path) -> Result<bool> {
        if path.exists() {
            return Ok(false);
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let raw = toml::to_string_pretty(&Self::default())?;
        std::fs::write(path, raw)
            .with_context(|| format!("Failed to write config at {}", path.display()))?;
        Ok(true)
    }

    /// Token from `env_token` (the TIMECAMP_API_TOKEN value) or the config
    /// file, in that order. Blank values count as missing.
    pub fn resolve_token(&self, env_token: Option<String>) -> Result<String> {
        let token = env_token
            .into_iter()
            .chain(self.api_token.clone())
            .map(|token| token.trim().to_string())
            .find(|token| !token.is_empty());

        match token {
            Some(token) => Ok(token),
            None => bail!(
                "No API token configured. Set {} or api_token in the config file",
                TOKEN_ENV
            ),
        }
    }
}

fn environment() -> config::Environment {
    config::Environment::with_prefix("CAMP")
        .prefix_separator("_")
        .separator("__")
}
