//! Chunked file upload.
//!
//! Upload is three calls deep: initiate (declaring the chunk count), one raw
//! PUT per chunk in index order, then complete. The declared count always
//! equals the number of chunks sent, and only the last chunk may be short.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use anaplan_protocol::ops::{CompleteUploadRequest, InitiateUploadRequest, InitiateUploadResponse};
use anaplan_protocol::{paths, CONTENT_TYPE_OCTET_STREAM};
use serde::Serialize;

use crate::error::{EngineError, EngineResult};
use crate::host::ApiClient;
use crate::locator::ResourceLocator;
use crate::observer::EngineObserver;

/// How a file of a given size splits into chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPlan {
    pub file_size: u64,
    pub chunk_size: u64,
    pub chunk_count: u64,
}

impl ChunkPlan {
    pub fn new(file_size: u64, chunk_size: u64) -> EngineResult<Self> {
        if chunk_size == 0 {
            return Err(EngineError::InvalidConfig("chunk size must be greater than zero".to_string()));
        }
        Ok(Self {
            file_size,
            chunk_size,
            chunk_count: file_size.div_ceil(chunk_size),
        })
    }

    /// Byte length of chunk `index`.
    pub fn chunk_len(&self, index: u64) -> u64 {
        let start = index.saturating_mul(self.chunk_size);
        self.file_size.saturating_sub(start).min(self.chunk_size)
    }
}

/// What the platform now holds after a successful upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadReceipt {
    pub file_id: String,
    pub file_name: String,
    pub chunk_count: u64,
    pub file_size: u64,
}

/// Upload `local_path` as `remote_name`. The file handle is closed before
/// this returns, on success and on every error path.
#[allow(clippy::too_many_arguments)]
pub fn upload_file(
    client: &ApiClient,
    observer: &dyn EngineObserver,
    workspace_id: &str,
    model_id: &str,
    local_path: &Path,
    remote_name: &str,
    chunk_size: u64,
) -> EngineResult<UploadReceipt> {
    let not_found = |reason: String| EngineError::FileNotFound {
        path: local_path.to_path_buf(),
        reason,
    };

    let metadata = std::fs::metadata(local_path).map_err(|e| not_found(e.to_string()))?;
    if !metadata.is_file() {
        return Err(not_found("not a regular file".to_string()));
    }
    let file = File::open(local_path).map_err(|e| not_found(e.to_string()))?;

    tracing::info!(path = %local_path.display(), remote_name, size = metadata.len(), "uploading file");
    upload_reader(
        client,
        observer,
        workspace_id,
        model_id,
        file,
        metadata.len(),
        remote_name,
        chunk_size,
    )
}

/// Upload `size` bytes from `reader`. The reader is consumed and dropped
/// before returning.
#[allow(clippy::too_many_arguments)]
pub fn upload_reader<R: Read>(
    client: &ApiClient,
    observer: &dyn EngineObserver,
    workspace_id: &str,
    model_id: &str,
    mut reader: R,
    size: u64,
    remote_name: &str,
    chunk_size: u64,
) -> EngineResult<UploadReceipt> {
    let plan = ChunkPlan::new(size, chunk_size)?;
    let file_id = initiate(client, workspace_id, model_id, remote_name, plan.chunk_count)?;

    for index in 0..plan.chunk_count {
        let len = plan.chunk_len(index);
        let mut chunk = Vec::with_capacity(len as usize);
        reader
            .by_ref()
            .take(len)
            .read_to_end(&mut chunk)
            .map_err(|source| EngineError::LocalRead { index, source })?;
        if chunk.len() as u64 != len {
            return Err(EngineError::LocalRead {
                index,
                source: io::Error::new(io::ErrorKind::UnexpectedEof, "file shrank during upload"),
            });
        }

        let response = client
            .put_bytes(
                &paths::chunk(workspace_id, model_id, &file_id, index),
                chunk,
                CONTENT_TYPE_OCTET_STREAM,
            )
            .map_err(|e| e.in_stage(|reason| EngineError::ChunkUpload { index, reason }))?;
        if !response.is_success() {
            return Err(EngineError::ChunkUpload {
                index,
                reason: response.describe(),
            });
        }
        observer.on_chunk_sent(&file_id, index, plan.chunk_count, len);
    }
    drop(reader);

    let response = client
        .post_json(
            &paths::complete(workspace_id, model_id, &file_id),
            &CompleteUploadRequest {
                chunk_count: plan.chunk_count,
            },
        )
        .map_err(|e| e.in_stage(EngineError::UploadComplete))?;
    if !response.is_success() {
        return Err(EngineError::UploadComplete(response.describe()));
    }

    tracing::info!(file_id, remote_name, chunk_count = plan.chunk_count, "upload completed");
    Ok(UploadReceipt {
        file_id,
        file_name: remote_name.to_string(),
        chunk_count: plan.chunk_count,
        file_size: size,
    })
}

/// Declare the upload, reusing the id of an existing file with the same name.
fn initiate(
    client: &ApiClient,
    workspace_id: &str,
    model_id: &str,
    remote_name: &str,
    chunk_count: u64,
) -> EngineResult<String> {
    let existing = ResourceLocator::new(client)
        .find_file_id(workspace_id, model_id, remote_name)
        .map_err(|e| e.in_stage(EngineError::UploadInit))?;

    let (path, body) = match existing {
        Some(file_id) => (
            paths::file(workspace_id, model_id, &file_id),
            InitiateUploadRequest {
                name: None,
                chunk_count,
            },
        ),
        None => (
            paths::files(workspace_id, model_id),
            InitiateUploadRequest {
                name: Some(remote_name.to_string()),
                chunk_count,
            },
        ),
    };

    let response = client
        .post_json(&path, &body)
        .map_err(|e| e.in_stage(EngineError::UploadInit))?;
    if !response.is_success() {
        return Err(EngineError::UploadInit(response.describe()));
    }

    let parsed = InitiateUploadResponse::from_body(&response.body)
        .map_err(|e| EngineError::UploadInit(format!("malformed initiate response: {}", e)))?;
    parsed
        .file_id()
        .map(str::to_string)
        .ok_or_else(|| EngineError::UploadInit("response carried no file id".to_string()))
}
