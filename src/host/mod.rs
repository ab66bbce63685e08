//! Host-Side HTTP Components
//!
//! Transport abstraction, transient-failure retry, and the authenticated
//! API client used by every engine component.

pub mod client;
pub mod retry;
pub mod transport;

pub use client::ApiClient;
pub use retry::{RetryPolicy, RetryingTransport};
pub use transport::{HttpRequest, HttpResponse, MockTransport, Transport, TransportError, UreqTransport};
