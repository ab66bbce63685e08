//! Transport Layer for the API Client
//!
//! Abstracts HTTP for testability. Provides:
//! - Transport trait: interface for issuing one request
//! - MockTransport: in-process mock platform for unit tests
//! - UreqTransport: blocking HTTPS transport for production

use std::io;
use std::time::Duration;

use anaplan_protocol::Method;
use serde::Serialize;

use crate::mock::MockPlatform;

/// One HTTP request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    /// Absolute URL.
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpRequest {
    /// Create a request with no headers and an empty body
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    /// Set a header, replacing any existing value with the same name
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
        self.headers.push((name.to_string(), value.into()));
    }

    /// Builder form of [`HttpRequest::set_header`]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set_header(name, value);
        self
    }

    /// Set a JSON body and the matching content type
    pub fn with_json<T: Serialize>(mut self, body: &T) -> Result<Self, TransportError> {
        self.body = serde_json::to_vec(body)?;
        self.set_header("Content-Type", anaplan_protocol::CONTENT_TYPE_JSON);
        Ok(self)
    }

    /// Set a raw body with the given content type
    pub fn with_body(mut self, body: Vec<u8>, content_type: &str) -> Self {
        self.body = body;
        self.set_header("Content-Type", content_type);
        self
    }

    /// Look up a header value (case-insensitive)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// One HTTP response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Create a response with a JSON body
    pub fn json(status: u16, body: &serde_json::Value) -> Self {
        Self {
            status,
            headers: vec![(
                "Content-Type".to_string(),
                anaplan_protocol::CONTENT_TYPE_JSON.to_string(),
            )],
            body: body.to_string().into_bytes(),
        }
    }

    /// Create a response with an empty body
    pub fn empty(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Look up a header value (case-insensitive)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Delay requested by a `Retry-After` header given in seconds
    pub fn retry_after(&self) -> Option<Duration> {
        self.header("Retry-After")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs)
    }

    /// Short single-line description for error messages
    pub fn describe(&self) -> String {
        let text = String::from_utf8_lossy(&self.body);
        let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
        if text.is_empty() {
            format!("HTTP {}", self.status)
        } else if text.len() > 200 {
            let cut = text.char_indices().nth(200).map(|(i, _)| i).unwrap_or(text.len());
            format!("HTTP {}: {}...", self.status, &text[..cut])
        } else {
            format!("HTTP {}: {}", self.status, text)
        }
    }
}

/// Transport trait for HTTP communication
pub trait Transport: Send + Sync {
    /// Execute a request and return the response, whatever its status
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Transport errors
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request timed out")]
    Timeout,

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Unexpected response: {0}")]
    Status(String),

    #[error("Gave up after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: String },
}

impl TransportError {
    /// Whether the failure happened before any response was received
    pub fn is_connection_level(&self) -> bool {
        matches!(
            self,
            TransportError::ConnectionFailed(_) | TransportError::Timeout | TransportError::Io(_)
        )
    }
}

/// Mock transport for testing - connects directly to MockPlatform in-process
pub struct MockTransport {
    platform: MockPlatform,
}

impl MockTransport {
    /// Create a new mock transport with a fresh mock platform
    pub fn new() -> Self {
        Self {
            platform: MockPlatform::new(),
        }
    }

    /// Create a mock transport with a pre-configured platform
    pub fn with_platform(platform: MockPlatform) -> Self {
        Self { platform }
    }

    /// Get a reference to the underlying mock platform for test configuration
    pub fn platform(&self) -> &MockPlatform {
        &self.platform
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for MockTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        self.platform.handle_request(request)
    }
}

/// Blocking HTTPS transport for production use
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    /// Create a transport whose requests time out after `timeout`
    pub fn new(timeout: Duration) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build();
        Self {
            agent: ureq::Agent::new_with_config(config),
        }
    }
}

fn map_ureq_error(error: ureq::Error) -> TransportError {
    match error {
        ureq::Error::Timeout(_) => TransportError::Timeout,
        ureq::Error::Io(e) => TransportError::Io(e),
        other => TransportError::ConnectionFailed(other.to_string()),
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let url = request.url.as_str();
        let result = match request.method {
            Method::Get => {
                let mut builder = self.agent.get(url);
                for (name, value) in &request.headers {
                    builder = builder.header(name.as_str(), value.as_str());
                }
                builder.call()
            }
            Method::Post => {
                let mut builder = self.agent.post(url);
                for (name, value) in &request.headers {
                    builder = builder.header(name.as_str(), value.as_str());
                }
                builder.send(request.body.as_slice())
            }
            Method::Put => {
                let mut builder = self.agent.put(url);
                for (name, value) in &request.headers {
                    builder = builder.header(name.as_str(), value.as_str());
                }
                builder.send(request.body.as_slice())
            }
        };

        let mut response = result.map_err(map_ureq_error)?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response.body_mut().read_to_vec().map_err(map_ureq_error)?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
