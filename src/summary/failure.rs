//! Failure taxonomy and stable exit codes

use serde::{Deserialize, Serialize};

/// Failure kind - categorizes the cause of a failed sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureKind {
    /// Invalid settings or local input
    Config,
    /// Credential exchange failed
    Auth,
    /// Network or HTTP failure after retries
    Transport,
    /// A named file or process does not exist
    NotFound,
    /// Initiate, chunk transfer or completion failed
    Upload,
    /// The remote job could not be started or ended FAILED
    JobFailed,
    /// The remote job ended CANCELLED
    JobCancelled,
    /// Polling exhausted its attempts
    Timeout,
}

impl FailureKind {
    /// Get the stable exit code for this failure kind
    pub fn exit_code(&self) -> ExitCode {
        match self {
            FailureKind::Config => ExitCode::Config,
            FailureKind::Auth => ExitCode::Auth,
            FailureKind::Transport => ExitCode::Transport,
            FailureKind::NotFound => ExitCode::NotFound,
            FailureKind::Upload => ExitCode::Upload,
            FailureKind::JobFailed => ExitCode::JobFailed,
            FailureKind::JobCancelled => ExitCode::JobCancelled,
            FailureKind::Timeout => ExitCode::Timeout,
        }
    }
}

/// Stable process exit codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(i32)]
pub enum ExitCode {
    Success = 0,
    Config = 1,
    Auth = 10,
    Transport = 20,
    NotFound = 30,
    Upload = 40,
    JobFailed = 50,
    JobCancelled = 60,
    Timeout = 80,
}

impl ExitCode {
    /// Get the integer value of the exit code
    pub fn as_i32(&self) -> i32 {
        *self as i32
    }

    /// Create from integer value
    pub fn from_i32(code: i32) -> Option<Self> {
        match code {
            0 => Some(ExitCode::Success),
            1 => Some(ExitCode::Config),
            10 => Some(ExitCode::Auth),
            20 => Some(ExitCode::Transport),
            30 => Some(ExitCode::NotFound),
            40 => Some(ExitCode::Upload),
            50 => Some(ExitCode::JobFailed),
            60 => Some(ExitCode::JobCancelled),
            80 => Some(ExitCode::Timeout),
            _ => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ExitCode::Success)
    }
}

impl Default for ExitCode {
    fn default() -> Self {
        ExitCode::Success
    }
}

/// Aggregates exit codes across several sequences; the first failure wins
#[derive(Debug, Default)]
pub struct ExitCodeAggregator {
    first_failure_code: Option<ExitCode>,
}

impl ExitCodeAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, exit_code: ExitCode) {
        if !exit_code.is_success() && self.first_failure_code.is_none() {
            self.first_failure_code = Some(exit_code);
        }
    }

    pub fn exit_code(&self) -> ExitCode {
        self.first_failure_code.unwrap_or(ExitCode::Success)
    }
}
