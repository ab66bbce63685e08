//! Anaplan Sequence - wake-up, upload and process run for Anaplan models
//!
//! This crate drives one fixed workflow against the Anaplan integration API:
//! run a lightweight "wake-up" process so the model is loaded, upload a local
//! file in chunks, then run the main import process and report the outcome of
//! each step.

pub mod clock;
pub mod config;
pub mod error;
pub mod host;
pub mod locator;
pub mod mock;
pub mod observer;
pub mod pipeline;
pub mod session;
pub mod summary;
pub mod task;
pub mod upload;

pub use config::{ConfigError, EffectiveConfig, EngineSettings, SequenceSpec};
pub use error::{EngineError, EngineResult, ResourceKind};
pub use host::{ApiClient, HttpRequest, HttpResponse, RetryPolicy, Transport, TransportError};
pub use observer::{EngineObserver, NoopObserver, TracingObserver};
pub use pipeline::{SequenceEngine, SequenceEngineBuilder, SequenceRequest};
pub use session::{AuthScheme, Credentials};
pub use summary::{BatchSummary, ExitCode, FailureKind, SequenceResult, StepName, StepRecord, StepStatus};
pub use task::{PollSettings, TaskOutcome, TaskState};
pub use upload::{ChunkPlan, UploadReceipt};
