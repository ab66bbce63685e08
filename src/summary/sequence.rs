//! Sequence result record

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::failure::{ExitCode, FailureKind};
use crate::task::{TaskOutcome, TaskState};
use crate::upload::UploadReceipt;

/// The three steps of a sequence, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepName {
    WakeUp,
    FileUpload,
    MainProcess,
}

impl StepName {
    pub const ALL: [StepName; 3] = [StepName::WakeUp, StepName::FileUpload, StepName::MainProcess];

    pub fn as_str(&self) -> &'static str {
        match self {
            StepName::WakeUp => "wake_up",
            StepName::FileUpload => "file_upload",
            StepName::MainProcess => "main_process",
        }
    }
}

impl fmt::Display for StepName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Step status. Process steps report the task state; the upload step
/// reports `COMPLETED`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepStatus {
    Complete,
    Completed,
    Failed,
    Cancelled,
    Error,
    Timeout,
}

impl StepStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, StepStatus::Complete | StepStatus::Completed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StepStatus::Complete => "COMPLETE",
            StepStatus::Completed => "COMPLETED",
            StepStatus::Failed => "FAILED",
            StepStatus::Cancelled => "CANCELLED",
            StepStatus::Error => "ERROR",
            StepStatus::Timeout => "TIMEOUT",
        }
    }
}

impl From<TaskState> for StepStatus {
    fn from(state: TaskState) -> Self {
        match state {
            TaskState::Complete => StepStatus::Complete,
            TaskState::Cancelled => StepStatus::Cancelled,
            TaskState::Error => StepStatus::Error,
            TaskState::Timeout => StepStatus::Timeout,
            TaskState::Failed | TaskState::Running => StepStatus::Failed,
        }
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    pub status: StepStatus,
    pub message: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,

    /// Task `result` object as reported by the platform
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_count: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_kind: Option<FailureKind>,
}

impl StepRecord {
    fn bare(status: StepStatus, message: String) -> Self {
        Self {
            status,
            message,
            process_id: None,
            task_id: None,
            details: None,
            file_id: None,
            file_name: None,
            chunk_count: None,
            failure_kind: None,
        }
    }

    /// A step that failed before producing a task or upload
    pub fn failed(message: impl Into<String>, kind: FailureKind) -> Self {
        Self {
            failure_kind: Some(kind),
            ..Self::bare(StepStatus::Failed, message.into())
        }
    }

    /// A process step that reached a terminal (or synthetic) state
    pub fn from_outcome(process_id: &str, outcome: &TaskOutcome) -> Self {
        let failure_kind = match outcome.state {
            TaskState::Complete => None,
            TaskState::Cancelled => Some(FailureKind::JobCancelled),
            TaskState::Error => Some(FailureKind::Transport),
            TaskState::Timeout => Some(FailureKind::Timeout),
            TaskState::Failed | TaskState::Running => Some(FailureKind::JobFailed),
        };
        Self {
            process_id: Some(process_id.to_string()),
            task_id: Some(outcome.task_id.clone()),
            details: Some(outcome.details.clone()),
            failure_kind,
            ..Self::bare(outcome.state.into(), outcome.message.clone())
        }
    }

    /// A successful upload
    pub fn from_upload(receipt: &UploadReceipt) -> Self {
        Self {
            file_id: Some(receipt.file_id.clone()),
            file_name: Some(receipt.file_name.clone()),
            chunk_count: Some(receipt.chunk_count),
            ..Self::bare(
                StepStatus::Completed,
                format!("Uploaded '{}' in {} chunks", receipt.file_name, receipt.chunk_count),
            )
        }
    }
}

/// Records of the attempted steps; steps never reached stay `None`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SequenceSteps {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wake_up: Option<StepRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_upload: Option<StepRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_process: Option<StepRecord>,
}

impl SequenceSteps {
    pub fn get(&self, step: StepName) -> Option<&StepRecord> {
        match step {
            StepName::WakeUp => self.wake_up.as_ref(),
            StepName::FileUpload => self.file_upload.as_ref(),
            StepName::MainProcess => self.main_process.as_ref(),
        }
    }

    pub fn set(&mut self, step: StepName, record: StepRecord) {
        let slot = match step {
            StepName::WakeUp => &mut self.wake_up,
            StepName::FileUpload => &mut self.file_upload,
            StepName::MainProcess => &mut self.main_process,
        };
        *slot = Some(record);
    }

    /// Attempted steps in execution order
    pub fn attempted(&self) -> impl Iterator<Item = (StepName, &StepRecord)> {
        StepName::ALL
            .into_iter()
            .filter_map(move |step| self.get(step).map(|record| (step, record)))
    }
}

/// Result of one sequence execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequenceResult {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub success: bool,
    pub message: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_step: Option<StepName>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_kind: Option<FailureKind>,

    pub exit_code: i32,
    pub steps: SequenceSteps,
}

impl SequenceResult {
    pub fn exit_code(&self) -> ExitCode {
        ExitCode::from_i32(self.exit_code).unwrap_or(ExitCode::JobFailed)
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// One line per attempted step plus a verdict line
    pub fn human_summary(&self) -> String {
        let mut lines: Vec<String> = self
            .steps
            .attempted()
            .map(|(step, record)| format!("{:<13} {:<10} {}", step.as_str(), record.status.as_str(), record.message))
            .collect();
        let verdict = if self.success { "SUCCESS" } else { "FAILED" };
        lines.push(format!("{} ({} ms): {}", verdict, self.duration_ms, self.message));
        lines.join("\n")
    }
}
