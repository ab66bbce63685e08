//! Authentication service types.
//!
//! The token endpoint accepts either a `Basic` authorization header or a JSON
//! credentials body and answers with a status discriminator plus the token.

use serde::{Deserialize, Serialize};

/// Status value reported by the authentication service on success.
pub const AUTH_STATUS_SUCCESS: &str = "SUCCESS";

/// Status value reported by the authentication service on failure.
pub const AUTH_STATUS_FAILURE: &str = "FAILURE_BAD_CREDENTIAL";

/// JSON body for the credential-body authentication variant.
#[derive(Clone, Serialize, Deserialize)]
pub struct JsonCredentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for JsonCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Token details returned on successful authentication.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenInfo {
    /// Opaque bearer token value.
    pub token_value: String,
    /// Token id (informational).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_id: Option<String>,
    /// Expiry as epoch milliseconds (informational).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
    /// Refresh token id (informational).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token_id: Option<String>,
}

/// Authentication service response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    /// Status discriminator (`SUCCESS` on success).
    pub status: String,
    /// Optional human-readable status message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_message: Option<String>,
    /// Token details (present on success).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_info: Option<TokenInfo>,
}

impl AuthResponse {
    /// Build a success response carrying `token`.
    pub fn success(token: impl Into<String>) -> Self {
        Self {
            status: AUTH_STATUS_SUCCESS.to_string(),
            status_message: Some("Login successful".to_string()),
            token_info: Some(TokenInfo {
                token_value: token.into(),
                token_id: None,
                expires_at: None,
                refresh_token_id: None,
            }),
        }
    }

    /// Build a failure response.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            status: AUTH_STATUS_FAILURE.to_string(),
            status_message: Some(message.into()),
            token_info: None,
        }
    }

    /// Return the token when the response reports success.
    pub fn token(&self) -> Option<&str> {
        if self.status != AUTH_STATUS_SUCCESS {
            return None;
        }
        self.token_info
            .as_ref()
            .map(|info| info.token_value.as_str())
            .filter(|token| !token.is_empty())
    }
}
