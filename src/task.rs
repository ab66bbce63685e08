//! Process trigger and task polling.
//!
//! A trigger starts one asynchronous run of a process and yields its task id.
//! [`poll_task`] then checks the task at a fixed interval until it reaches a
//! terminal state, the attempt ceiling is hit, or a status request fails.
//!
//! The loop sleeps after every non-terminal response, including the last one,
//! so a `TIMEOUT` outcome has waited exactly `max_attempts * interval`.

use std::fmt;
use std::time::Duration;

use anaplan_protocol::ops::task::states;
use anaplan_protocol::ops::{TaskStatusResponse, TriggerRequest, TriggerResponse};
use anaplan_protocol::paths;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::clock::Sleeper;
use crate::error::{EngineError, EngineResult};
use crate::host::ApiClient;
use crate::observer::EngineObserver;

/// Message reported when a terminal task carries no current step.
pub const DEFAULT_COMPLETION_MESSAGE: &str = "Task Completed Success";

/// Message reported when polling runs out of attempts.
pub const TIMEOUT_MESSAGE: &str = "Task monitoring timed out";

/// Task state as seen by the engine.
///
/// `Error` and `Timeout` are synthesized locally; the platform never reports
/// them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskState {
    Running,
    Complete,
    Failed,
    Cancelled,
    Error,
    Timeout,
}

impl TaskState {
    /// Map a raw platform state. Anything not terminal counts as running.
    pub fn from_platform(raw: &str) -> Self {
        match raw {
            states::COMPLETE => TaskState::Complete,
            states::FAILED => TaskState::Failed,
            states::CANCELLED => TaskState::Cancelled,
            _ => TaskState::Running,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, TaskState::Running)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TaskState::Complete)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskState::Running => "RUNNING",
            TaskState::Complete => "COMPLETE",
            TaskState::Failed => "FAILED",
            TaskState::Cancelled => "CANCELLED",
            TaskState::Error => "ERROR",
            TaskState::Timeout => "TIMEOUT",
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Polling cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            max_attempts: 240,
        }
    }
}

/// Final result of polling one task.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskOutcome {
    pub task_id: String,
    pub state: TaskState,
    pub message: String,
    /// The task's `result` object, empty when the platform sent none
    pub details: Value,
    /// Status requests issued
    pub attempts: u32,
}

impl TaskOutcome {
    fn synthetic(task_id: &str, state: TaskState, message: String, attempts: u32) -> Self {
        Self {
            task_id: task_id.to_string(),
            state,
            message,
            details: empty_details(),
            attempts,
        }
    }

    /// `Ok` for COMPLETE, the matching typed error otherwise
    pub fn into_result(self) -> EngineResult<TaskOutcome> {
        match self.state {
            TaskState::Complete => Ok(self),
            TaskState::Error => Err(EngineError::PollTransport(self.message)),
            TaskState::Timeout => Err(EngineError::PollTimeout {
                attempts: self.attempts,
            }),
            state => Err(EngineError::TaskFailed {
                state,
                message: self.message,
            }),
        }
    }
}

fn empty_details() -> Value {
    Value::Object(serde_json::Map::new())
}

/// Start a run of `process_id` and return its task id.
pub fn trigger_job(
    client: &ApiClient,
    workspace_id: &str,
    model_id: &str,
    process_id: &str,
    locale: &str,
) -> EngineResult<String> {
    let body = TriggerRequest {
        locale_name: locale.to_string(),
    };
    let response = client
        .post_json(&paths::process_tasks(workspace_id, model_id, process_id), &body)
        .map_err(|e| e.in_stage(EngineError::Trigger))?;

    if !response.is_success() {
        return Err(EngineError::Trigger(response.describe()));
    }

    let parsed = TriggerResponse::from_body(&response.body)
        .map_err(|e| EngineError::Trigger(format!("malformed trigger response: {}", e)))?;

    match parsed.task_id() {
        Some(task_id) => {
            tracing::info!(process_id, task_id, "process triggered");
            Ok(task_id.to_string())
        }
        None => {
            let status = parsed
                .status
                .map(|s| s.to_string())
                .unwrap_or_else(|| "no status in response".to_string());
            Err(EngineError::Trigger(format!("platform did not report success: {}", status)))
        }
    }
}

/// Poll a task until it is terminal. Never fails: transport problems become
/// an `ERROR` outcome and exhaustion becomes `TIMEOUT`.
#[allow(clippy::too_many_arguments)]
pub fn poll_task(
    client: &ApiClient,
    sleeper: &dyn Sleeper,
    observer: &dyn EngineObserver,
    workspace_id: &str,
    model_id: &str,
    process_id: &str,
    task_id: &str,
    settings: PollSettings,
) -> TaskOutcome {
    let path = paths::process_task(workspace_id, model_id, process_id, task_id);

    for attempt in 1..=settings.max_attempts {
        let response = match client.get(&path) {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(task_id, attempt, error = %e, "failed to check task status");
                return TaskOutcome::synthetic(task_id, TaskState::Error, e.to_string(), attempt);
            }
        };
        if !response.is_success() {
            tracing::error!(task_id, attempt, status = response.status, "failed to check task status");
            return TaskOutcome::synthetic(task_id, TaskState::Error, response.describe(), attempt);
        }
        let status = match TaskStatusResponse::from_body(&response.body) {
            Ok(status) => status,
            Err(e) => {
                return TaskOutcome::synthetic(
                    task_id,
                    TaskState::Error,
                    format!("malformed task status: {}", e),
                    attempt,
                );
            }
        };

        observer.on_poll_attempt(task_id, attempt, &status.task.task_state);
        let state = TaskState::from_platform(&status.task.task_state);
        if state.is_terminal() {
            return TaskOutcome {
                task_id: task_id.to_string(),
                state,
                message: status
                    .task
                    .current_step
                    .unwrap_or_else(|| DEFAULT_COMPLETION_MESSAGE.to_string()),
                details: status.task.result.unwrap_or_else(empty_details),
                attempts: attempt,
            };
        }

        sleeper.sleep(settings.interval);
    }

    TaskOutcome::synthetic(
        task_id,
        TaskState::Timeout,
        TIMEOUT_MESSAGE.to_string(),
        settings.max_attempts,
    )
}
