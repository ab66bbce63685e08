//! Failure Injection for the Mock Platform
//!
//! Supports configurable failure injection per endpoint for testing error paths.

use std::collections::HashMap;

use anaplan_protocol::EndpointKind;
use serde_json::{json, Value};

use crate::host::{HttpResponse, TransportError};

/// Failure configuration for an endpoint
#[derive(Debug, Clone)]
pub struct FailureConfig {
    /// HTTP status to answer with
    pub status: u16,
    /// Status message placed in the default error body
    pub message: Option<String>,
    /// Full response body, replacing the default error body
    pub body: Option<Value>,
    /// `Retry-After` header value in seconds
    pub retry_after_seconds: Option<u32>,
    /// Fail at the connection level instead of answering
    pub connection_error: Option<String>,
    /// Number of times to fail before succeeding (None = always fail)
    pub fail_count: Option<u32>,
    /// Number of calls that succeed before failures start
    pub skip: u32,
}

impl FailureConfig {
    /// Answer with an HTTP status and a standard error body
    pub fn status(status: u16) -> Self {
        Self {
            status,
            message: None,
            body: None,
            retry_after_seconds: None,
            connection_error: None,
            fail_count: None,
            skip: 0,
        }
    }

    /// Answer with a specific status and body
    pub fn body(status: u16, body: Value) -> Self {
        Self {
            body: Some(body),
            ..Self::status(status)
        }
    }

    /// Fail before any response is produced
    pub fn connection_failure(message: impl Into<String>) -> Self {
        Self {
            connection_error: Some(message.into()),
            ..Self::status(0)
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_retry_after(mut self, seconds: u32) -> Self {
        self.retry_after_seconds = Some(seconds);
        self
    }

    /// Set the number of times to fail before succeeding
    pub fn with_fail_count(mut self, count: u32) -> Self {
        self.fail_count = Some(count);
        self
    }

    /// Let the first `calls` requests through untouched
    pub fn with_skip(mut self, calls: u32) -> Self {
        self.skip = calls;
        self
    }

    /// Produce the injected outcome
    pub fn respond(&self) -> Result<HttpResponse, TransportError> {
        if let Some(message) = &self.connection_error {
            return Err(TransportError::ConnectionFailed(message.clone()));
        }

        let body = self.body.clone().unwrap_or_else(|| {
            json!({
                "status": {
                    "code": self.status,
                    "message": self.message.clone().unwrap_or_else(|| reason(self.status).to_string())
                }
            })
        });
        let mut response = HttpResponse::json(self.status, &body);
        if let Some(seconds) = self.retry_after_seconds {
            response
                .headers
                .push(("Retry-After".to_string(), seconds.to_string()));
        }
        Ok(response)
    }
}

fn reason(status: u16) -> &'static str {
    match status {
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        _ => "Error",
    }
}

/// Failure injector for the mock platform
#[derive(Debug, Default)]
pub struct FailureInjector {
    configs: HashMap<EndpointKind, FailureConfig>,
    call_counts: HashMap<EndpointKind, u32>,
}

impl FailureInjector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inject a failure for an endpoint, resetting its call count
    pub fn inject(&mut self, kind: EndpointKind, config: FailureConfig) {
        self.configs.insert(kind, config);
        self.call_counts.insert(kind, 0);
    }

    pub fn clear(&mut self) {
        self.configs.clear();
        self.call_counts.clear();
    }

    pub fn clear_kind(&mut self, kind: EndpointKind) {
        self.configs.remove(&kind);
        self.call_counts.remove(&kind);
    }

    /// Check if a failure should occur for an endpoint call.
    /// Returns the failure config if one should occur, None otherwise
    pub fn check(&mut self, kind: EndpointKind) -> Option<&FailureConfig> {
        let config = self.configs.get(&kind)?;
        let count = self.call_counts.entry(kind).or_insert(0);
        *count += 1;

        if *count <= config.skip {
            return None;
        }
        if let Some(fail_limit) = config.fail_count {
            if *count - config.skip > fail_limit {
                return None;
            }
        }
        Some(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_error_body() {
        let response = FailureConfig::status(503).respond().unwrap();
        assert_eq!(response.status, 503);
        let body: Value = serde_json::from_slice(&response.body).unwrap();
        assert_eq!(body["status"]["message"], "Service Unavailable");
    }

    #[test]
    fn test_retry_after_header() {
        let response = FailureConfig::status(429).with_retry_after(3).respond().unwrap();
        assert_eq!(response.header("Retry-After"), Some("3"));
    }

    #[test]
    fn test_connection_failure() {
        let result = FailureConfig::connection_failure("reset").respond();
        assert!(matches!(result, Err(TransportError::ConnectionFailed(_))));
    }

    #[test]
    fn test_injector_basic() {
        let mut injector = FailureInjector::new();
        assert!(injector.check(EndpointKind::ListFiles).is_none());

        injector.inject(EndpointKind::ListFiles, FailureConfig::status(500));
        assert_eq!(injector.check(EndpointKind::ListFiles).map(|c| c.status), Some(500));
        assert!(injector.check(EndpointKind::ListProcesses).is_none());
    }

    #[test]
    fn test_injector_fail_count() {
        let mut injector = FailureInjector::new();
        injector.inject(EndpointKind::UploadChunk, FailureConfig::status(503).with_fail_count(2));

        assert!(injector.check(EndpointKind::UploadChunk).is_some());
        assert!(injector.check(EndpointKind::UploadChunk).is_some());
        assert!(injector.check(EndpointKind::UploadChunk).is_none());
    }

    #[test]
    fn test_injector_skip_then_fail() {
        let mut injector = FailureInjector::new();
        injector.inject(
            EndpointKind::UploadChunk,
            FailureConfig::status(400).with_skip(2).with_fail_count(1),
        );

        assert!(injector.check(EndpointKind::UploadChunk).is_none());
        assert!(injector.check(EndpointKind::UploadChunk).is_none());
        assert!(injector.check(EndpointKind::UploadChunk).is_some());
        assert!(injector.check(EndpointKind::UploadChunk).is_none());
    }

    #[test]
    fn test_injector_clear() {
        let mut injector = FailureInjector::new();
        injector.inject(EndpointKind::TriggerProcess, FailureConfig::status(400));
        injector.clear_kind(EndpointKind::TriggerProcess);
        assert!(injector.check(EndpointKind::TriggerProcess).is_none());
    }
}
