//! Mock Anaplan Platform
//!
//! An in-process stand-in for the authentication service and the integration
//! API, used by unit and integration tests. Requests reach it through
//! [`MockTransport`](crate::host::MockTransport).
//!
//! # Endpoints
//!
//! - `authenticate`: Basic or JSON credentials, issues tokens
//! - `workspaces`, `files`, `processes`: paged listings
//! - `files` / `files/{id}`: create or re-initiate an upload
//! - `chunks/{index}`: store a chunk of the current upload
//! - `complete`: finish an upload with the declared chunk count
//! - `tasks`: trigger a process and report scripted task states
//!
//! Every endpoint supports failure injection through [`FailureConfig`].

mod failure;
mod platform;
mod recording;
mod state;

use std::sync::Arc;

pub use failure::{FailureConfig, FailureInjector};
pub use platform::MockPlatform;
pub use recording::{ObservedEvent, RecordingObserver, RecordingSleeper};
pub use state::{ChunkRecord, Completion, RecordedCall};

use crate::host::{ApiClient, MockTransport};
use crate::observer::NoopObserver;
use crate::session::{AuthScheme, Credentials, SessionManager};

/// API client wired straight to `platform`, without retries
pub fn test_client(platform: &MockPlatform) -> ApiClient {
    let transport = Arc::new(MockTransport::with_platform(platform.clone()));
    let sessions = SessionManager::new(
        transport.clone(),
        platform.auth_url(),
        AuthScheme::Basic,
        Credentials::new(MockPlatform::EMAIL, MockPlatform::PASSWORD),
        Arc::new(NoopObserver),
    );
    ApiClient::new(transport, sessions, platform.api_base_url())
}
