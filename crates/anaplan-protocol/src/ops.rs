//! Operation-specific types.

pub mod task;
pub mod upload;

pub use task::{TaskInfo, TaskRef, TaskStatusResponse, TriggerRequest, TriggerResponse};
pub use upload::{CompleteUploadRequest, InitiateUploadRequest, InitiateUploadResponse};
