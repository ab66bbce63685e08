//! Anaplan Protocol Types
//!
//! Defines the JSON envelopes and endpoint paths of the Anaplan
//! integration API (v2) and its authentication service.

pub mod auth;
pub mod error;
pub mod listing;
pub mod ops;
pub mod paths;

pub use auth::{AuthResponse, JsonCredentials, TokenInfo};
pub use error::{ApiStatus, ProtocolError};
pub use listing::{FileEntry, ListPage, Meta, Named, Paging, ProcessEntry, WorkspaceEntry};
pub use paths::{Endpoint, EndpointKind, Method};

/// Default base URL of the integration API.
pub const DEFAULT_API_BASE_URL: &str = "https://api.anaplan.com/2/0";

/// Default token endpoint of the authentication service.
pub const DEFAULT_AUTH_URL: &str = "https://auth.anaplan.com/token/authenticate";

/// Authorization scheme used for token-authenticated API calls.
pub const TOKEN_AUTH_SCHEME: &str = "AnaplanAuthToken";

/// Content type for JSON request bodies.
pub const CONTENT_TYPE_JSON: &str = "application/json";

/// Content type for raw chunk bodies.
pub const CONTENT_TYPE_OCTET_STREAM: &str = "application/octet-stream";

/// Default locale sent with process runs.
pub const DEFAULT_LOCALE: &str = "en_US";

/// Default chunk size for uploads (10 MiB).
pub const DEFAULT_CHUNK_SIZE: u64 = 10 * 1024 * 1024;
