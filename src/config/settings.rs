//! Typed settings deserialized from the merged configuration

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::host::RetryPolicy;
use crate::session::AuthScheme;
use crate::task::PollSettings;

/// Engine-wide settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    pub api_base_url: String,
    pub auth_url: String,
    pub auth_scheme: AuthScheme,
    /// Upload chunk size in bytes
    pub chunk_size: u64,
    pub locale: String,
    pub poll_interval_seconds: u64,
    pub max_poll_attempts: u32,
    /// Per-request timeout
    pub http_timeout_seconds: u64,
    pub retry: RetrySettings,
}

/// Transient failure retry settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub retry_non_idempotent: bool,
}

impl EngineSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (key, url) in [("api_base_url", &self.api_base_url), ("auth_url", &self.auth_url)] {
            if !(url.starts_with("https://") || url.starts_with("http://")) {
                return Err(ConfigError::ValidationError(format!(
                    "{} must be an http(s) URL, got '{}'",
                    key, url
                )));
            }
        }
        if self.chunk_size == 0 {
            return Err(ConfigError::ValidationError("chunk_size must be greater than 0".to_string()));
        }
        if self.poll_interval_seconds == 0 {
            return Err(ConfigError::ValidationError(
                "poll_interval_seconds must be greater than 0".to_string(),
            ));
        }
        if self.max_poll_attempts == 0 {
            return Err(ConfigError::ValidationError(
                "max_poll_attempts must be greater than 0".to_string(),
            ));
        }
        if self.http_timeout_seconds == 0 {
            return Err(ConfigError::ValidationError(
                "http_timeout_seconds must be greater than 0".to_string(),
            ));
        }
        if self.locale.trim().is_empty() {
            return Err(ConfigError::ValidationError("locale must not be empty".to_string()));
        }
        self.retry.validate()
    }

    pub fn poll_settings(&self) -> PollSettings {
        PollSettings {
            interval: Duration::from_secs(self.poll_interval_seconds),
            max_attempts: self.max_poll_attempts,
        }
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_seconds)
    }
}

impl RetrySettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::ValidationError(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.initial_delay_ms > self.max_delay_ms {
            return Err(ConfigError::ValidationError(format!(
                "retry.initial_delay_ms ({}) must not exceed retry.max_delay_ms ({})",
                self.initial_delay_ms, self.max_delay_ms
            )));
        }
        Ok(())
    }

    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            initial_delay: Duration::from_millis(self.initial_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
            retry_non_idempotent: self.retry_non_idempotent,
            ..RetryPolicy::default()
        }
    }
}

/// A named sequence declared with `[[sequence]]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceSpec {
    pub name: String,
    pub workspace_id: String,
    pub model_id: String,
    pub wake_up_process: String,
    pub file_path: PathBuf,
    /// Defaults to the local file name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_file_name: Option<String>,
    pub main_process: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_size: Option<u64>,
}

impl SequenceSpec {
    /// Remote name, falling back to the last component of `file_path`
    pub fn remote_file_name(&self) -> Result<String, ConfigError> {
        if let Some(name) = &self.remote_file_name {
            return Ok(name.clone());
        }
        file_name_of(&self.file_path).ok_or_else(|| {
            ConfigError::ValidationError(format!(
                "sequence '{}': cannot derive a remote file name from '{}'",
                self.name,
                self.file_path.display()
            ))
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("name", self.name.as_str()),
            ("workspace_id", self.workspace_id.as_str()),
            ("model_id", self.model_id.as_str()),
            ("wake_up_process", self.wake_up_process.as_str()),
            ("main_process", self.main_process.as_str()),
        ];
        for (key, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "sequence '{}': {} must not be empty",
                    self.name, key
                )));
            }
        }
        if self.chunk_size == Some(0) {
            return Err(ConfigError::ValidationError(format!(
                "sequence '{}': chunk_size must be greater than 0",
                self.name
            )));
        }
        self.remote_file_name().map(|_| ())
    }
}

pub(crate) fn file_name_of(path: &Path) -> Option<String> {
    path.file_name().map(|n| n.to_string_lossy().into_owned())
}
