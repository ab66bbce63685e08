//! Sequence results and failure taxonomy

mod batch;
mod failure;
mod sequence;

pub use batch::{BatchSummary, NamedResult};
pub use failure::{ExitCode, ExitCodeAggregator, FailureKind};
pub use sequence::{SequenceResult, SequenceSteps, StepName, StepRecord, StepStatus};
