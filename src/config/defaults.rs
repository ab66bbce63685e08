//! Built-in defaults (layer 1)

use anaplan_protocol::{DEFAULT_API_BASE_URL, DEFAULT_AUTH_URL, DEFAULT_CHUNK_SIZE, DEFAULT_LOCALE};

use super::settings::{EngineSettings, RetrySettings};
use crate::session::AuthScheme;

/// Default name of the configuration file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "anaplan.toml";

pub const DEFAULT_EMAIL_VAR: &str = "ANAPLAN_EMAIL";
pub const DEFAULT_PASSWORD_VAR: &str = "ANAPLAN_PASSWORD";

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            auth_url: DEFAULT_AUTH_URL.to_string(),
            auth_scheme: AuthScheme::Basic,
            chunk_size: DEFAULT_CHUNK_SIZE,
            locale: DEFAULT_LOCALE.to_string(),
            poll_interval_seconds: 5,
            max_poll_attempts: 240,
            http_timeout_seconds: 60,
            retry: RetrySettings::default(),
        }
    }
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 60,
            initial_delay_ms: 500,
            max_delay_ms: 30_000,
            retry_non_idempotent: false,
        }
    }
}

/// Built-in defaults as a JSON value for merging
pub fn builtin_value() -> serde_json::Value {
    serde_json::to_value(EngineSettings::default()).unwrap_or(serde_json::Value::Null)
}
