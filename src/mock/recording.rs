//! Recording test doubles for the sleeper and observer seams

use std::sync::Mutex;
use std::time::Duration;

use crate::clock::Sleeper;
use crate::observer::EngineObserver;
use crate::summary::{StepName, StepRecord, StepStatus};

/// Sleeper that records requested durations and returns immediately
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    durations: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn durations(&self) -> Vec<Duration> {
        self.durations.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Sum of all requested sleeps
    pub fn total(&self) -> Duration {
        self.durations().iter().sum()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        self.durations
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(duration);
    }
}

/// An observer callback as seen by [`RecordingObserver`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObservedEvent {
    Authenticated,
    AuthFailed(String),
    ChunkSent {
        file_id: String,
        index: u64,
        chunk_count: u64,
        bytes: u64,
    },
    PollAttempt {
        task_id: String,
        attempt: u32,
        state: String,
    },
    StepStarted(StepName),
    StepFinished(StepName, StepStatus),
}

/// Observer that keeps every callback in order
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<ObservedEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ObservedEvent> {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn push(&self, event: ObservedEvent) {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).push(event);
    }
}

impl EngineObserver for RecordingObserver {
    fn on_authenticated(&self) {
        self.push(ObservedEvent::Authenticated);
    }

    fn on_auth_failed(&self, reason: &str) {
        self.push(ObservedEvent::AuthFailed(reason.to_string()));
    }

    fn on_chunk_sent(&self, file_id: &str, index: u64, chunk_count: u64, bytes: u64) {
        self.push(ObservedEvent::ChunkSent {
            file_id: file_id.to_string(),
            index,
            chunk_count,
            bytes,
        });
    }

    fn on_poll_attempt(&self, task_id: &str, attempt: u32, state: &str) {
        self.push(ObservedEvent::PollAttempt {
            task_id: task_id.to_string(),
            attempt,
            state: state.to_string(),
        });
    }

    fn on_step_started(&self, step: StepName) {
        self.push(ObservedEvent::StepStarted(step));
    }

    fn on_step_finished(&self, step: StepName, record: &StepRecord) {
        self.push(ObservedEvent::StepFinished(step, record.status));
    }
}
