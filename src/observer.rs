//! Engine observer hooks
//!
//! The engine reports progress through an [`EngineObserver`] instead of
//! logging directly, so callers choose where events go.

use crate::summary::{StepName, StepRecord};

/// Callbacks invoked at defined points of a sequence. All methods default to
/// no-ops.
pub trait EngineObserver: Send + Sync {
    fn on_authenticated(&self) {}

    fn on_auth_failed(&self, _reason: &str) {}

    fn on_chunk_sent(&self, _file_id: &str, _index: u64, _chunk_count: u64, _bytes: u64) {}

    /// Called after each status response; `state` is the raw platform state.
    fn on_poll_attempt(&self, _task_id: &str, _attempt: u32, _state: &str) {}

    fn on_step_started(&self, _step: StepName) {}

    fn on_step_finished(&self, _step: StepName, _record: &StepRecord) {}
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl EngineObserver for NoopObserver {}

/// Emits every hook as a `tracing` event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl EngineObserver for TracingObserver {
    fn on_authenticated(&self) {
        tracing::debug!("session established");
    }

    fn on_auth_failed(&self, reason: &str) {
        tracing::error!(%reason, "authentication failed");
    }

    fn on_chunk_sent(&self, file_id: &str, index: u64, chunk_count: u64, bytes: u64) {
        tracing::info!(file_id, chunk = index + 1, chunk_count, bytes, "uploaded chunk");
    }

    fn on_poll_attempt(&self, task_id: &str, attempt: u32, state: &str) {
        tracing::info!(task_id, attempt, state, "task status");
    }

    fn on_step_started(&self, step: StepName) {
        tracing::info!(step = %step, "step started");
    }

    fn on_step_finished(&self, step: StepName, record: &StepRecord) {
        if record.status.is_success() {
            tracing::info!(step = %step, status = %record.status, "step finished");
        } else {
            tracing::error!(
                step = %step,
                status = %record.status,
                message = %record.message,
                "step failed"
            );
        }
    }
}
