//! Status and error envelopes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Status object carried by most integration API responses.
///
/// Successful calls report `{"code": 200, "message": "Success"}`; failures
/// carry the HTTP code and a short reason.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiStatus {
    /// HTTP-like status code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<u16>,
    /// Short status message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Message reported by the platform on success.
pub const STATUS_MESSAGE_SUCCESS: &str = "Success";

impl ApiStatus {
    /// Create a success status.
    pub fn success() -> Self {
        Self {
            code: Some(200),
            message: Some(STATUS_MESSAGE_SUCCESS.to_string()),
        }
    }

    /// Create a failure status.
    pub fn failure(code: u16, message: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            message: Some(message.into()),
        }
    }

    /// Whether this status carries the success discriminator.
    pub fn is_success(&self) -> bool {
        self.message.as_deref() == Some(STATUS_MESSAGE_SUCCESS)
    }
}

impl fmt::Display for ApiStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.code, &self.message) {
            (Some(code), Some(message)) => write!(f, "{} {}", code, message),
            (Some(code), None) => write!(f, "{}", code),
            (None, Some(message)) => write!(f, "{}", message),
            (None, None) => write!(f, "no status"),
        }
    }
}

/// Errors raised while decoding a response envelope.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("malformed response body: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_discriminator() {
        let status: ApiStatus =
            serde_json::from_str(r#"{"code": 200, "message": "Success"}"#).unwrap();
        assert!(status.is_success());

        let status: ApiStatus =
            serde_json::from_str(r#"{"code": 400, "message": "Bad Request"}"#).unwrap();
        assert!(!status.is_success());
        assert_eq!(status.to_string(), "400 Bad Request");
    }

    #[test]
    fn test_empty_status_is_not_success() {
        let status: ApiStatus = serde_json::from_str("{}").unwrap();
        assert!(!status.is_success());
        assert_eq!(status.to_string(), "no status");
    }
}
