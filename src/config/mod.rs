//! Configuration merge system
//!
//! Three layers, later layers win:
//! 1. Built-in defaults
//! 2. TOML config file (`anaplan.toml` or `--config`)
//! 3. CLI flags
//!
//! Credentials never come from configuration files, only from the environment.

mod defaults;
mod effective;
mod merge;
mod settings;

pub use defaults::{builtin_value, DEFAULT_CONFIG_FILE, DEFAULT_EMAIL_VAR, DEFAULT_PASSWORD_VAR};
pub use effective::{ConfigOrigin, ConfigSource, EffectiveConfig};
pub use merge::{deep_merge, merge_layers};
pub use settings::{EngineSettings, RetrySettings, SequenceSpec};
pub(crate) use settings::file_name_of;

use crate::session::Credentials;

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Environment variable {0} is not set")]
    MissingEnv(String),

    #[error("No sequence named '{0}' in configuration")]
    UnknownSequence(String),
}

/// Read credentials from the named environment variables
pub fn credentials_from_env(email_var: &str, password_var: &str) -> Result<Credentials, ConfigError> {
    let read = |name: &str| match std::env::var(name) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => Err(ConfigError::MissingEnv(name.to_string())),
    };
    Ok(Credentials::new(read(email_var)?, read(password_var)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_from_env() {
        std::env::set_var("ANAPLAN_SEQ_TEST_EMAIL", "user@example.com");
        std::env::set_var("ANAPLAN_SEQ_TEST_PASSWORD", "secret");

        let creds = credentials_from_env("ANAPLAN_SEQ_TEST_EMAIL", "ANAPLAN_SEQ_TEST_PASSWORD").unwrap();
        assert_eq!(creds.email, "user@example.com");

        let err = credentials_from_env("ANAPLAN_SEQ_TEST_EMAIL", "ANAPLAN_SEQ_TEST_UNSET").unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnv(ref v) if v == "ANAPLAN_SEQ_TEST_UNSET"));
    }
}
