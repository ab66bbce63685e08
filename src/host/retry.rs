//! Transient Failure Retry
//!
//! Wraps a [`Transport`] and transparently repeats requests that hit a
//! transient status (429/5xx gateway errors) or a connection-level failure.
//! Delays double from an initial value and plateau at a cap; a `Retry-After`
//! header overrides the computed delay (still capped).

use std::sync::Arc;
use std::time::Duration;

use super::transport::{HttpRequest, HttpResponse, Transport, TransportError};
use crate::clock::Sleeper;

/// Statuses treated as transient.
pub const DEFAULT_RETRY_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

/// Retry configuration
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    /// Delay before the second attempt
    pub initial_delay: Duration,
    /// Upper bound for any single delay
    pub max_delay: Duration,
    /// Also retry POST requests (may repeat side effects)
    pub retry_non_idempotent: bool,
    pub retry_statuses: Vec<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 60,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            retry_non_idempotent: false,
            retry_statuses: DEFAULT_RETRY_STATUSES.to_vec(),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay after failed attempt number `attempt` (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        let delay = self
            .initial_delay
            .checked_mul(2u32.pow(exponent))
            .unwrap_or(self.max_delay);
        delay.min(self.max_delay)
    }

    fn is_retryable_status(&self, status: u16) -> bool {
        self.retry_statuses.contains(&status)
    }

    fn applies_to(&self, request: &HttpRequest) -> bool {
        request.method.is_idempotent() || self.retry_non_idempotent
    }
}

/// Transport decorator applying a [`RetryPolicy`]
pub struct RetryingTransport {
    inner: Arc<dyn Transport>,
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl RetryingTransport {
    pub fn new(inner: Arc<dyn Transport>, policy: RetryPolicy, sleeper: Arc<dyn Sleeper>) -> Self {
        Self {
            inner,
            policy,
            sleeper,
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }
}

impl Transport for RetryingTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        if !self.policy.applies_to(request) {
            return self.inner.execute(request);
        }

        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            let (retry_after, last) = match self.inner.execute(request) {
                Ok(response) if self.policy.is_retryable_status(response.status) => {
                    (response.retry_after(), response.describe())
                }
                Ok(response) => return Ok(response),
                Err(e) if e.is_connection_level() => (None, e.to_string()),
                Err(e) => return Err(e),
            };

            if attempt >= max_attempts {
                if max_attempts > 1 {
                    tracing::warn!(
                        method = %request.method,
                        url = %request.url,
                        attempts = attempt,
                        "giving up after transient failures"
                    );
                }
                return Err(TransportError::RetriesExhausted {
                    attempts: attempt,
                    last,
                });
            }

            let delay = retry_after
                .map(|d| d.min(self.policy.max_delay))
                .unwrap_or_else(|| self.policy.delay_for(attempt));
            tracing::warn!(
                method = %request.method,
                url = %request.url,
                attempt,
                delay_ms = delay.as_millis() as u64,
                reason = %last,
                "transient failure, retrying"
            );
            self.sleeper.sleep(delay);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{FailureConfig, MockPlatform, RecordingSleeper};
    use crate::host::transport::MockTransport;
    use anaplan_protocol::{paths, EndpointKind, Method};

    fn setup(policy: RetryPolicy) -> (MockPlatform, Arc<RecordingSleeper>, RetryingTransport) {
        let platform = MockPlatform::new();
        platform.add_file("W", "M", "data.csv");
        let sleeper = Arc::new(RecordingSleeper::new());
        let transport = RetryingTransport::new(
            Arc::new(MockTransport::with_platform(platform.clone())),
            policy,
            sleeper.clone(),
        );
        (platform, sleeper, transport)
    }

    fn list_files_request(platform: &MockPlatform) -> HttpRequest {
        HttpRequest::new(Method::Get, format!("{}{}", platform.api_base_url(), paths::files("W", "M")))
            .with_header("Authorization", format!("AnaplanAuthToken {}", platform.token()))
    }

    #[test]
    fn test_backoff_doubles_then_plateaus() {
        let policy = RetryPolicy {
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(1000),
            ..RetryPolicy::default()
        };
        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for(4), Duration::from_millis(800));
        assert_eq!(policy.delay_for(5), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(60), Duration::from_millis(1000));
    }

    #[test]
    fn test_retries_transient_status_then_succeeds() {
        let policy = RetryPolicy {
            initial_delay: Duration::from_millis(10),
            ..RetryPolicy::default()
        };
        let (platform, sleeper, transport) = setup(policy);
        platform.inject(EndpointKind::ListFiles, FailureConfig::status(503).with_fail_count(2));

        let response = transport.execute(&list_files_request(&platform)).unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(
            sleeper.durations(),
            vec![Duration::from_millis(10), Duration::from_millis(20)]
        );
    }

    #[test]
    fn test_honors_retry_after_capped() {
        let policy = RetryPolicy {
            max_delay: Duration::from_secs(5),
            ..RetryPolicy::default()
        };
        let (platform, sleeper, transport) = setup(policy);
        platform.inject(
            EndpointKind::ListFiles,
            FailureConfig::status(429).with_retry_after(60).with_fail_count(1),
        );

        transport.execute(&list_files_request(&platform)).unwrap();

        assert_eq!(sleeper.durations(), vec![Duration::from_secs(5)]);
    }

    #[test]
    fn test_exhaustion_surfaces_transport_error() {
        let policy = RetryPolicy {
            max_attempts: 3,
            ..RetryPolicy::default()
        };
        let (platform, sleeper, transport) = setup(policy);
        platform.inject(EndpointKind::ListFiles, FailureConfig::status(502));

        let err = transport.execute(&list_files_request(&platform)).unwrap_err();

        assert!(matches!(err, TransportError::RetriesExhausted { attempts: 3, .. }));
        assert_eq!(sleeper.durations().len(), 2);
    }

    #[test]
    fn test_post_not_retried_by_default() {
        let (platform, sleeper, transport) = setup(RetryPolicy::default());
        platform.inject(EndpointKind::CreateFile, FailureConfig::status(503));

        let request = HttpRequest::new(
            Method::Post,
            format!("{}{}", platform.api_base_url(), paths::files("W", "M")),
        )
        .with_header("Authorization", format!("AnaplanAuthToken {}", platform.token()));
        let response = transport.execute(&request).unwrap();

        assert_eq!(response.status, 503);
        assert!(sleeper.durations().is_empty());
    }

    #[test]
    fn test_non_transient_status_returned_as_is() {
        let (platform, sleeper, transport) = setup(RetryPolicy::default());
        platform.inject(EndpointKind::ListFiles, FailureConfig::status(404));

        let response = transport.execute(&list_files_request(&platform)).unwrap();

        assert_eq!(response.status, 404);
        assert!(sleeper.durations().is_empty());
    }

    #[test]
    fn test_connection_failures_are_retried() {
        let policy = RetryPolicy {
            initial_delay: Duration::from_millis(1),
            ..RetryPolicy::default()
        };
        let (platform, sleeper, transport) = setup(policy);
        platform.inject(
            EndpointKind::ListFiles,
            FailureConfig::connection_failure("connection reset").with_fail_count(1),
        );

        let response = transport.execute(&list_files_request(&platform)).unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(sleeper.durations().len(), 1);
    }
}
