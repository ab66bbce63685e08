//! Effective configuration with full provenance
//!
//! Captures the merged configuration plus where each layer came from.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;

use super::defaults::builtin_value;
use super::merge::merge_layers;
use super::settings::{EngineSettings, SequenceSpec};
use super::ConfigError;

/// Origin of a configuration source
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ConfigOrigin {
    Builtin,
    File,
    Cli,
}

/// A contributing config source with provenance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSource {
    pub origin: ConfigOrigin,

    /// File path (None for builtin/cli)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// SHA-256 digest of raw file bytes (None for builtin/cli)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

/// Effective configuration with full provenance
#[derive(Debug, Clone, Serialize)]
pub struct EffectiveConfig {
    pub created_at: DateTime<Utc>,

    /// The merged configuration object, secrets redacted
    pub config: Value,

    /// Contributing sources in precedence order
    pub sources: Vec<ConfigSource>,

    /// Redacted key paths
    pub redactions: Vec<String>,

    #[serde(skip)]
    pub settings: EngineSettings,

    #[serde(skip)]
    pub sequences: Vec<SequenceSpec>,
}

/// Keys that contain secrets and should be redacted
const SECRET_KEYS: &[&str] = &["password", "token", "secret", "api_key", "credential"];

const SEQUENCE_KEY: &str = "sequence";

impl EffectiveConfig {
    /// Build effective config from builtin defaults, an optional TOML file
    /// and CLI overrides
    pub fn build(config_path: Option<&Path>, cli_overrides: Option<Value>) -> Result<Self, ConfigError> {
        let mut layers = vec![builtin_value()];
        let mut sources = vec![ConfigSource {
            origin: ConfigOrigin::Builtin,
            path: None,
            digest: None,
        }];

        if let Some(path) = config_path {
            let (value, digest) = Self::load_toml_file(path)?;
            layers.push(value);
            sources.push(ConfigSource {
                origin: ConfigOrigin::File,
                path: Some(path.to_string_lossy().to_string()),
                digest: Some(digest),
            });
        }

        if let Some(cli) = cli_overrides {
            layers.push(cli);
            sources.push(ConfigSource {
                origin: ConfigOrigin::Cli,
                path: None,
                digest: None,
            });
        }

        let mut merged = merge_layers(layers);

        let sequences = Self::parse_sequences(&merged)?;
        let mut settings_value = merged.clone();
        if let Value::Object(map) = &mut settings_value {
            map.remove(SEQUENCE_KEY);
        }
        let settings: EngineSettings = serde_json::from_value(settings_value)
            .map_err(|e| ConfigError::ParseError(format!("invalid settings: {}", e)))?;
        settings.validate()?;

        let redactions = Self::redact_secrets(&mut merged);

        Ok(Self {
            created_at: Utc::now(),
            config: merged,
            sources,
            redactions,
            settings,
            sequences,
        })
    }

    fn parse_sequences(merged: &Value) -> Result<Vec<SequenceSpec>, ConfigError> {
        let sequences: Vec<SequenceSpec> = match merged.get(SEQUENCE_KEY) {
            None | Some(Value::Null) => Vec::new(),
            Some(value) => serde_json::from_value(value.clone())
                .map_err(|e| ConfigError::ParseError(format!("invalid [[sequence]] entry: {}", e)))?,
        };

        for (i, spec) in sequences.iter().enumerate() {
            spec.validate()?;
            if sequences[..i].iter().any(|other| other.name == spec.name) {
                return Err(ConfigError::ValidationError(format!(
                    "duplicate sequence name '{}'",
                    spec.name
                )));
            }
        }
        Ok(sequences)
    }

    /// Load and parse a TOML file, returning the value and digest
    fn load_toml_file(path: &Path) -> Result<(Value, String), ConfigError> {
        let bytes = fs::read(path)
            .map_err(|e| ConfigError::IoError(format!("{}: {}", path.display(), e)))?;

        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        let digest = hex::encode(hasher.finalize());

        let contents = String::from_utf8(bytes)
            .map_err(|e| ConfigError::ParseError(format!("Invalid UTF-8: {}", e)))?;

        let toml_value: toml::Value = toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError(format!("TOML parse error: {}", e)))?;

        Ok((Self::toml_to_json(toml_value), digest))
    }

    /// Convert TOML Value to JSON Value
    fn toml_to_json(toml: toml::Value) -> Value {
        match toml {
            toml::Value::String(s) => Value::String(s),
            toml::Value::Integer(i) => Value::Number(i.into()),
            toml::Value::Float(f) => serde_json::Number::from_f64(f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            toml::Value::Boolean(b) => Value::Bool(b),
            toml::Value::Datetime(dt) => Value::String(dt.to_string()),
            toml::Value::Array(arr) => Value::Array(arr.into_iter().map(Self::toml_to_json).collect()),
            toml::Value::Table(table) => Value::Object(
                table
                    .into_iter()
                    .map(|(k, v)| (k, Self::toml_to_json(v)))
                    .collect(),
            ),
        }
    }

    /// Redact secrets in the config, returning list of redacted paths
    fn redact_secrets(value: &mut Value) -> Vec<String> {
        let mut redactions = Vec::new();
        Self::redact_recursive(value, String::new(), &mut redactions);
        redactions
    }

    fn redact_recursive(value: &mut Value, path: String, redactions: &mut Vec<String>) {
        match value {
            Value::Object(map) => {
                for (key, val) in map.iter_mut() {
                    let key_lower = key.to_lowercase();
                    let current_path = if path.is_empty() {
                        key.clone()
                    } else {
                        format!("{}.{}", path, key)
                    };

                    let is_secret = SECRET_KEYS.iter().any(|s| key_lower.contains(s));
                    if is_secret && !val.is_object() && !val.is_array() {
                        *val = Value::String("[REDACTED]".to_string());
                        redactions.push(current_path);
                    } else {
                        Self::redact_recursive(val, current_path, redactions);
                    }
                }
            }
            Value::Array(arr) => {
                for (i, val) in arr.iter_mut().enumerate() {
                    Self::redact_recursive(val, format!("{}[{}]", path, i), redactions);
                }
            }
            _ => {}
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Look up a sequence by name
    pub fn sequence(&self, name: &str) -> Option<&SequenceSpec> {
        self.sequences.iter().find(|s| s.name == name)
    }

    /// Get a config value by path (dot-separated)
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut current = &self.config;
        for part in path.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    pub fn get_u64(&self, path: &str) -> Option<u64> {
        self.get(path).and_then(|v| v.as_u64())
    }

    pub fn get_str(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(|v| v.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_build_with_defaults_only() {
        let config = EffectiveConfig::build(None, None).unwrap();

        assert_eq!(config.get_u64("chunk_size"), Some(10 * 1024 * 1024));
        assert_eq!(config.get_str("locale"), Some("en_US"));
        assert_eq!(config.settings, EngineSettings::default());
        assert!(config.sequences.is_empty());
        assert_eq!(config.sources.len(), 1);
        assert_eq!(config.sources[0].origin, ConfigOrigin::Builtin);
    }

    #[test]
    fn test_build_with_cli_override() {
        let cli = serde_json::json!({"poll_interval_seconds": 1, "retry": {"max_attempts": 3}});

        let config = EffectiveConfig::build(None, Some(cli)).unwrap();

        assert_eq!(config.settings.poll_interval_seconds, 1);
        assert_eq!(config.settings.retry.max_attempts, 3);
        assert_eq!(config.settings.retry.max_delay_ms, 30_000);
    }

    #[test]
    fn test_validation_failure() {
        let cli = serde_json::json!({"max_poll_attempts": 0});
        let err = EffectiveConfig::build(None, Some(cli)).unwrap_err();
        assert!(err.to_string().contains("max_poll_attempts"));
    }

    #[test]
    fn test_bad_type_is_parse_error() {
        let cli = serde_json::json!({"chunk_size": "big"});
        let err = EffectiveConfig::build(None, Some(cli)).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_load_toml_file_with_sequences() {
        let mut temp = NamedTempFile::new().unwrap();
        writeln!(temp, "chunk_size = 1048576").unwrap();
        writeln!(temp, "auth_scheme = \"json\"").unwrap();
        writeln!(temp, "[retry]").unwrap();
        writeln!(temp, "max_attempts = 4").unwrap();
        writeln!(temp, "[[sequence]]").unwrap();
        writeln!(temp, "name = \"daily\"").unwrap();
        writeln!(temp, "workspace_id = \"W\"").unwrap();
        writeln!(temp, "model_id = \"M\"").unwrap();
        writeln!(temp, "wake_up_process = \"Wake\"").unwrap();
        writeln!(temp, "file_path = \"/tmp/data.csv\"").unwrap();
        writeln!(temp, "main_process = \"Main\"").unwrap();

        let config = EffectiveConfig::build(Some(temp.path()), None).unwrap();

        assert_eq!(config.settings.chunk_size, 1_048_576);
        assert_eq!(config.settings.auth_scheme, crate::session::AuthScheme::Json);
        assert_eq!(config.settings.retry.max_attempts, 4);
        assert_eq!(config.sequences.len(), 1);
        assert_eq!(config.sequence("daily").unwrap().model_id, "M");
        assert_eq!(config.sources[1].origin, ConfigOrigin::File);
        assert_eq!(config.sources[1].digest.as_ref().map(|d| d.len()), Some(64));
    }

    #[test]
    fn test_duplicate_sequence_names_rejected() {
        let seq = serde_json::json!({
            "name": "dup", "workspace_id": "W", "model_id": "M",
            "wake_up_process": "Wake", "file_path": "/tmp/a.csv", "main_process": "Main"
        });
        let cli = serde_json::json!({"sequence": [seq.clone(), seq]});
        let err = EffectiveConfig::build(None, Some(cli)).unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = EffectiveConfig::build(Some(&dir.path().join("absent.toml")), None).unwrap_err();
        assert!(matches!(err, ConfigError::IoError(_)));
    }

    #[test]
    fn test_secret_redaction() {
        let cli = serde_json::json!({
            "password": "hunter2",
            "extra": {"token": "abc", "username": "user"}
        });

        let config = EffectiveConfig::build(None, Some(cli)).unwrap();

        assert_eq!(config.get_str("password"), Some("[REDACTED]"));
        assert_eq!(config.get_str("extra.token"), Some("[REDACTED]"));
        assert_eq!(config.get_str("extra.username"), Some("user"));
        assert!(config.redactions.contains(&"password".to_string()));
        assert!(!config.to_json().unwrap().contains("hunter2"));
    }
}
