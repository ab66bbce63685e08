//! Session Management
//!
//! Exchanges credentials for a bearer token at the authentication service and
//! caches the resulting [`Session`] until it is explicitly cleared. Every
//! authenticated call goes through [`SessionManager::session`], a single
//! guarded get-or-create accessor.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use anaplan_protocol::{AuthResponse, JsonCredentials, Method, CONTENT_TYPE_JSON, TOKEN_AUTH_SCHEME};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::host::{HttpRequest, Transport};
use crate::observer::EngineObserver;

/// How credentials are presented to the authentication service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthScheme {
    /// `Authorization: Basic base64(email:password)` with an empty body
    #[default]
    Basic,
    /// JSON body `{"username", "password"}`
    Json,
}

/// Account credentials.
#[derive(Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    fn basic_header(&self) -> String {
        let raw = format!("{}:{}", self.email, self.password);
        format!("Basic {}", STANDARD.encode(raw.as_bytes()))
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// An authenticated session.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    token: String,
}

impl Session {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into() }
    }

    /// Value of the `Authorization` header for API calls
    pub fn authorization(&self) -> String {
        format!("{} {}", TOKEN_AUTH_SCHEME, self.token)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session").field("token", &"<redacted>").finish()
    }
}

/// Owns the credential exchange and the cached session.
pub struct SessionManager {
    transport: Arc<dyn Transport>,
    auth_url: String,
    scheme: AuthScheme,
    credentials: Credentials,
    observer: Arc<dyn EngineObserver>,
    current: Mutex<Option<Session>>,
}

impl SessionManager {
    pub fn new(
        transport: Arc<dyn Transport>,
        auth_url: impl Into<String>,
        scheme: AuthScheme,
        credentials: Credentials,
        observer: Arc<dyn EngineObserver>,
    ) -> Self {
        Self {
            transport,
            auth_url: auth_url.into(),
            scheme,
            credentials,
            observer,
            current: Mutex::new(None),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<Session>> {
        self.current.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Exchange credentials for a new token, replacing any cached session.
    pub fn authenticate(&self) -> EngineResult<Session> {
        let mut current = self.lock();
        *current = None;
        let session = self.exchange()?;
        *current = Some(session.clone());
        Ok(session)
    }

    /// The cached session, authenticating first if there is none.
    pub fn session(&self) -> EngineResult<Session> {
        let mut current = self.lock();
        if let Some(session) = current.as_ref() {
            return Ok(session.clone());
        }
        let session = self.exchange()?;
        *current = Some(session.clone());
        Ok(session)
    }

    /// Drop the cached session.
    pub fn clear(&self) {
        *self.lock() = None;
    }

    pub fn is_authenticated(&self) -> bool {
        self.lock().is_some()
    }

    fn exchange(&self) -> EngineResult<Session> {
        match self.request_token() {
            Ok(token) => {
                tracing::info!(auth_url = %self.auth_url, "authenticated");
                self.observer.on_authenticated();
                Ok(Session::new(token))
            }
            Err(reason) => {
                tracing::warn!(auth_url = %self.auth_url, %reason, "authentication failed");
                self.observer.on_auth_failed(&reason);
                Err(EngineError::Authentication(reason))
            }
        }
    }

    fn request_token(&self) -> Result<String, String> {
        let request = HttpRequest::new(Method::Post, self.auth_url.clone());
        let request = match self.scheme {
            AuthScheme::Basic => request
                .with_header("Authorization", self.credentials.basic_header())
                .with_header("Content-Type", CONTENT_TYPE_JSON),
            AuthScheme::Json => request
                .with_json(&JsonCredentials {
                    username: self.credentials.email.clone(),
                    password: self.credentials.password.clone(),
                })
                .map_err(|e| e.to_string())?,
        };

        let response = self
            .transport
            .execute(&request)
            .map_err(|e| format!("authentication request failed: {}", e))?;

        let parsed: Result<AuthResponse, _> = serde_json::from_slice(&response.body);
        match parsed {
            Ok(body) => match body.token() {
                Some(token) if response.is_success() => Ok(token.to_string()),
                _ => Err(body
                    .status_message
                    .map(|m| format!("{} ({})", m, body.status))
                    .unwrap_or_else(|| format!("{} ({})", response.describe(), body.status))),
            },
            Err(_) if !response.is_success() => Err(response.describe()),
            Err(e) => Err(format!("malformed authentication response: {}", e)),
        }
    }
}
