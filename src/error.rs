//! Engine errors
//!
//! Each component signals a typed [`EngineError`]; the sequence orchestrator
//! only annotates which step failed.

use std::fmt;
use std::io;
use std::path::PathBuf;

use crate::host::TransportError;
use crate::summary::{ExitCode, FailureKind};
use crate::task::TaskState;

/// Kind of a named platform resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Workspace,
    File,
    Process,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ResourceKind::Workspace => "Workspace",
            ResourceKind::File => "File",
            ResourceKind::Process => "Process",
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("{kind} '{name}' not found")]
    NotFound { kind: ResourceKind, name: String },

    #[error("Local file '{}' not found or unreadable: {reason}", path.display())]
    FileNotFound { path: PathBuf, reason: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to initiate upload: {0}")]
    UploadInit(String),

    #[error("Failed to upload chunk {index}: {reason}")]
    ChunkUpload { index: u64, reason: String },

    #[error("Failed to read chunk {index} from local file: {source}")]
    LocalRead { index: u64, source: io::Error },

    #[error("Failed to complete upload: {0}")]
    UploadComplete(String),

    #[error("Failed to trigger process: {0}")]
    Trigger(String),

    #[error("Task status request failed: {0}")]
    PollTransport(String),

    #[error("Task monitoring timed out after {attempts} attempts")]
    PollTimeout { attempts: u32 },

    #[error("Task ended {state}: {message}")]
    TaskFailed { state: TaskState, message: String },

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

impl EngineError {
    /// Re-label a bare transport failure as a stage-specific error.
    ///
    /// Authentication and other already-typed errors pass through unchanged.
    pub fn in_stage(self, stage: impl FnOnce(String) -> EngineError) -> EngineError {
        match self {
            EngineError::Transport(e) => stage(e.to_string()),
            other => other,
        }
    }

    /// Map error to failure kind for exit code
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            EngineError::Authentication(_) => FailureKind::Auth,
            EngineError::NotFound { .. } => FailureKind::NotFound,
            EngineError::FileNotFound { .. } | EngineError::InvalidConfig(_) => FailureKind::Config,
            EngineError::UploadInit(_)
            | EngineError::ChunkUpload { .. }
            | EngineError::LocalRead { .. }
            | EngineError::UploadComplete(_) => FailureKind::Upload,
            EngineError::Trigger(_) => FailureKind::JobFailed,
            EngineError::PollTransport(_) | EngineError::Transport(_) => FailureKind::Transport,
            EngineError::PollTimeout { .. } => FailureKind::Timeout,
            EngineError::TaskFailed { state, .. } => match state {
                TaskState::Cancelled => FailureKind::JobCancelled,
                TaskState::Timeout => FailureKind::Timeout,
                TaskState::Error => FailureKind::Transport,
                _ => FailureKind::JobFailed,
            },
        }
    }

    /// Get exit code for this error
    pub fn exit_code(&self) -> ExitCode {
        self.failure_kind().exit_code()
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
