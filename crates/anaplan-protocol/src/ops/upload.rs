//! Upload operation types.
//!
//! Initiate declares the chunk count, each chunk is a raw PUT, and complete
//! repeats the count so the platform can finalize the file.

use serde::{Deserialize, Serialize};

use crate::error::{ApiStatus, ProtocolError};
use crate::listing::FileEntry;

/// Initiate payload.
///
/// `name` is only sent when a new file record is created; re-uploading into an
/// existing file id declares the chunk count alone.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiateUploadRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub chunk_count: u64,
}

/// Initiate response.
///
/// The file id is nested under `file` in the current API and top-level in the
/// older envelope; both are accepted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InitiateUploadResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ApiStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<FileEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl InitiateUploadResponse {
    /// Decode from a response body.
    pub fn from_body(body: &[u8]) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_slice(body)?)
    }

    /// The file id, preferring the nested `file.id`.
    pub fn file_id(&self) -> Option<&str> {
        self.file
            .as_ref()
            .map(|f| f.id.as_str())
            .or(self.id.as_deref())
            .filter(|id| !id.is_empty())
    }
}

/// Complete payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteUploadRequest {
    pub chunk_count: u64,
}
