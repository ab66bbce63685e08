//! Process run (task) types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ApiStatus, ProtocolError};

/// Trigger payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerRequest {
    pub locale_name: String,
}

/// Task reference returned by a trigger.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRef {
    pub task_id: String,
}

/// Trigger response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TriggerResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ApiStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task: Option<TaskRef>,
}

impl TriggerResponse {
    /// Decode from a response body.
    pub fn from_body(body: &[u8]) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_slice(body)?)
    }

    /// The task id, only when the status discriminator reports success.
    pub fn task_id(&self) -> Option<&str> {
        let ok = self.status.as_ref().map(ApiStatus::is_success).unwrap_or(false);
        if !ok {
            return None;
        }
        self.task
            .as_ref()
            .map(|t| t.task_id.as_str())
            .filter(|id| !id.is_empty())
    }
}

/// Task details returned by the status endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskInfo {
    #[serde(default)]
    pub task_id: String,
    /// Raw state string (`NOT_STARTED`, `IN_PROGRESS`, `COMPLETE`, ...).
    pub task_state: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_step: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
}

/// Status response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskStatusResponse {
    pub task: TaskInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ApiStatus>,
}

impl TaskStatusResponse {
    /// Decode from a response body.
    pub fn from_body(body: &[u8]) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_slice(body)?)
    }
}

/// Raw task states reported by the platform.
pub mod states {
    pub const NOT_STARTED: &str = "NOT_STARTED";
    pub const IN_PROGRESS: &str = "IN_PROGRESS";
    pub const COMPLETE: &str = "COMPLETE";
    pub const FAILED: &str = "FAILED";
    pub const CANCELLING: &str = "CANCELLING";
    pub const CANCELLED: &str = "CANCELLED";
}
