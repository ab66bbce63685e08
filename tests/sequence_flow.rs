//! Integration Tests: Sequence Flow
//!
//! Drives `SequenceEngine::execute_sequence` end to end against the in-process
//! mock platform:
//! - Wake-up, upload and main process run in that order
//! - The first failing step ends the sequence
//! - Process lookup by name picks the first exact match

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use anaplan_protocol::EndpointKind;
use anaplan_sequence::host::MockTransport;
use anaplan_sequence::mock::{MockPlatform, ObservedEvent, RecordingObserver, RecordingSleeper};
use anaplan_sequence::pipeline::SUCCESS_MESSAGE;
use anaplan_sequence::{
    Credentials, EngineSettings, ExitCode, FailureKind, SequenceEngine, SequenceRequest, StepName, StepStatus,
};
use tempfile::NamedTempFile;

fn build_engine(
    platform: &MockPlatform,
    settings: EngineSettings,
) -> (SequenceEngine, Arc<RecordingSleeper>, Arc<RecordingObserver>) {
    let sleeper = Arc::new(RecordingSleeper::new());
    let observer = Arc::new(RecordingObserver::new());
    let engine = SequenceEngine::builder(settings, Credentials::new(MockPlatform::EMAIL, MockPlatform::PASSWORD))
        .transport(Arc::new(MockTransport::with_platform(platform.clone())))
        .sleeper(sleeper.clone())
        .observer(observer.clone())
        .build()
        .unwrap();
    (engine, sleeper, observer)
}

fn local_file(contents: &[u8]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents).unwrap();
    file.flush().unwrap();
    file
}

fn request(file: &NamedTempFile) -> SequenceRequest {
    SequenceRequest::new("W", "M", "Wake Up", file.path(), "sales.csv", "Load Sales")
}

// =============================================================================
// Test 1: Happy path sequence
// =============================================================================

#[test]
fn test_full_sequence_succeeds() {
    let platform = MockPlatform::new();
    let wake = platform.add_process("W", "M", "Wake Up");
    let main = platform.add_process("W", "M", "Load Sales");
    platform.set_task_states(&main, &["NOT_STARTED", "IN_PROGRESS", "COMPLETE"]);
    platform.set_task_result(&main, serde_json::json!({"successful": true, "failureDumpAvailable": false}));
    let (engine, sleeper, _) = build_engine(&platform, platform.settings());
    let file = local_file(b"region,amount\nnorth,10\n");

    let result = engine.execute_sequence(&request(&file));

    assert!(result.success, "{}", result.message);
    assert_eq!(result.message, SUCCESS_MESSAGE);
    assert_eq!(result.exit_code(), ExitCode::Success);
    assert_eq!(result.failed_step, None);

    let wake_record = result.steps.wake_up.as_ref().unwrap();
    assert_eq!(wake_record.status, StepStatus::Complete);
    assert_eq!(wake_record.process_id.as_deref(), Some(wake.as_str()));

    let upload = result.steps.file_upload.as_ref().unwrap();
    assert_eq!(upload.status, StepStatus::Completed);
    assert_eq!(upload.file_name.as_deref(), Some("sales.csv"));
    assert_eq!(upload.chunk_count, Some(1));

    let main_record = result.steps.main_process.as_ref().unwrap();
    assert_eq!(main_record.status, StepStatus::Complete);
    assert_eq!(main_record.details.as_ref().unwrap()["successful"], true);

    // Two non-terminal polls on the main process, none on the wake-up
    assert_eq!(sleeper.durations(), vec![Duration::from_secs(5); 2]);

    let file_id = upload.file_id.clone().unwrap();
    assert_eq!(platform.file_contents(&file_id).unwrap(), b"region,amount\nnorth,10\n");
}

#[test]
fn test_steps_run_in_order() {
    let platform = MockPlatform::new();
    let wake = platform.add_process("W", "M", "Wake Up");
    let main = platform.add_process("W", "M", "Load Sales");
    let (engine, _, observer) = build_engine(&platform, platform.settings());
    let file = local_file(b"abc");

    engine.execute_sequence(&request(&file));

    let steps: Vec<ObservedEvent> = observer
        .events()
        .into_iter()
        .filter(|e| matches!(e, ObservedEvent::StepStarted(_) | ObservedEvent::StepFinished(..)))
        .collect();
    assert_eq!(
        steps,
        vec![
            ObservedEvent::StepStarted(StepName::WakeUp),
            ObservedEvent::StepFinished(StepName::WakeUp, StepStatus::Complete),
            ObservedEvent::StepStarted(StepName::FileUpload),
            ObservedEvent::StepFinished(StepName::FileUpload, StepStatus::Completed),
            ObservedEvent::StepStarted(StepName::MainProcess),
            ObservedEvent::StepFinished(StepName::MainProcess, StepStatus::Complete),
        ]
    );

    let triggered: Vec<String> = platform.triggers().into_iter().map(|(id, _)| id).collect();
    assert_eq!(triggered, vec![wake, main]);

    // Upload completes before the main process is triggered
    let calls = platform.calls();
    let completed_at = calls.iter().position(|c| c.kind == Some(EndpointKind::CompleteUpload)).unwrap();
    let main_trigger_at = calls
        .iter()
        .rposition(|c| c.kind == Some(EndpointKind::TriggerProcess))
        .unwrap();
    assert!(completed_at < main_trigger_at);
}

#[test]
fn test_sequence_json_shape() {
    let platform = MockPlatform::new();
    platform.add_process("W", "M", "Wake Up");
    platform.add_process("W", "M", "Load Sales");
    let (engine, _, _) = build_engine(&platform, platform.settings());
    let file = local_file(b"abc");

    let result = engine.execute_sequence(&request(&file));
    let json: serde_json::Value = serde_json::from_str(&result.to_json().unwrap()).unwrap();

    assert_eq!(json["success"], true);
    assert_eq!(json["exit_code"], 0);
    assert_eq!(json["steps"]["wake_up"]["status"], "COMPLETE");
    assert_eq!(json["steps"]["file_upload"]["status"], "COMPLETED");
    assert_eq!(json["steps"]["file_upload"]["chunk_count"], 1);
    assert_eq!(json["steps"]["main_process"]["message"], "Task Completed Success");
    assert!(json.get("failed_step").is_none());
}

#[test]
fn test_large_file_sequence_uploads_three_chunks() {
    const MIB: usize = 1024 * 1024;
    let platform = MockPlatform::new();
    platform.add_process("W", "M", "Wake");
    platform.add_process("W", "M", "Main");
    let (engine, _, _) = build_engine(&platform, platform.settings());
    let data: Vec<u8> = (0..25 * MIB).map(|i| (i % 251) as u8).collect();
    let file = local_file(&data);
    let request = SequenceRequest::new("W", "M", "Wake", file.path(), "data.csv", "Main").with_chunk_size((10 * MIB) as u64);

    let result = engine.execute_sequence(&request);

    assert!(result.success, "{}", result.message);
    let upload = result.steps.file_upload.as_ref().unwrap();
    assert_eq!(upload.chunk_count, Some(3));
    assert_eq!(upload.file_name.as_deref(), Some("data.csv"));
    let lens: Vec<usize> = platform.chunks().iter().map(|c| c.len).collect();
    assert_eq!(lens, vec![10 * MIB, 10 * MIB, 5 * MIB]);
    assert_eq!(platform.completions()[0].chunk_count, 3);
    assert!(platform.file_contents(upload.file_id.as_deref().unwrap()).unwrap() == data);
    assert_eq!(result.steps.main_process.as_ref().unwrap().status, StepStatus::Complete);
}

// =============================================================================
// Test 2: Invalid requests rejected before any platform call
// =============================================================================

#[test]
fn test_zero_chunk_size_rejected_before_wake_up() {
    let platform = MockPlatform::new();
    platform.add_process("W", "M", "Wake Up");
    platform.add_process("W", "M", "Load Sales");
    let (engine, _, observer) = build_engine(&platform, platform.settings());
    let file = local_file(b"abc");

    let result = engine.execute_sequence(&request(&file).with_chunk_size(0));

    assert!(!result.success);
    assert_eq!(result.failed_step, None);
    assert_eq!(result.failure_kind, Some(FailureKind::Config));
    assert_eq!(result.exit_code(), ExitCode::Config);
    assert!(result.message.contains("chunk size"));
    assert!(result.steps.wake_up.is_none());
    assert_eq!(platform.call_count(EndpointKind::TriggerProcess), 0);
    assert!(platform.calls().is_empty());
    assert!(observer.events().is_empty());
}

#[test]
fn test_blank_locale_rejected_before_wake_up() {
    let platform = MockPlatform::new();
    platform.add_process("W", "M", "Wake Up");
    let (engine, _, _) = build_engine(&platform, platform.settings());
    let file = local_file(b"abc");

    let result = engine.execute_sequence(&request(&file).with_locale("  "));

    assert_eq!(result.exit_code(), ExitCode::Config);
    assert!(result.message.contains("locale"));
    assert_eq!(platform.call_count(EndpointKind::TriggerProcess), 0);
}

// =============================================================================
// Test 3: Wake-up failures abort the sequence
// =============================================================================

#[test]
fn test_wake_up_failure_skips_upload_and_main() {
    let platform = MockPlatform::new();
    let wake = platform.add_process("W", "M", "Wake Up");
    platform.add_process("W", "M", "Load Sales");
    platform.set_task_states(&wake, &["IN_PROGRESS", "FAILED"]);
    platform.set_task_step(&wake, "Model could not be opened");
    let (engine, _, _) = build_engine(&platform, platform.settings());
    let file = local_file(b"abc");

    let result = engine.execute_sequence(&request(&file));

    assert!(!result.success);
    assert_eq!(result.failed_step, Some(StepName::WakeUp));
    assert_eq!(result.message, "Wake-up process failed: Model could not be opened");
    assert_eq!(result.exit_code(), ExitCode::JobFailed);
    assert!(result.steps.file_upload.is_none());
    assert!(result.steps.main_process.is_none());

    assert_eq!(platform.call_count(EndpointKind::CreateFile), 0);
    assert_eq!(platform.call_count(EndpointKind::InitiateUpload), 0);
    assert_eq!(platform.call_count(EndpointKind::UploadChunk), 0);
    assert_eq!(platform.triggers().len(), 1);
}

#[test]
fn test_wake_up_cancelled() {
    let platform = MockPlatform::new();
    let wake = platform.add_process("W", "M", "Wake Up");
    platform.add_process("W", "M", "Load Sales");
    platform.set_task_states(&wake, &["CANCELLED"]);
    let (engine, _, _) = build_engine(&platform, platform.settings());
    let file = local_file(b"abc");

    let result = engine.execute_sequence(&request(&file));

    assert_eq!(result.failure_kind, Some(FailureKind::JobCancelled));
    assert_eq!(result.exit_code(), ExitCode::JobCancelled);
    assert_eq!(result.steps.wake_up.as_ref().unwrap().status, StepStatus::Cancelled);
    assert!(result.steps.file_upload.is_none());
}

#[test]
fn test_wake_up_not_found() {
    let platform = MockPlatform::new();
    platform.add_process("W", "M", "Load Sales");
    let (engine, _, _) = build_engine(&platform, platform.settings());
    let file = local_file(b"abc");

    let result = engine.execute_sequence(&request(&file));

    assert_eq!(result.message, "Wake-up process 'Wake Up' not found");
    assert_eq!(result.failure_kind, Some(FailureKind::NotFound));
    assert_eq!(result.exit_code(), ExitCode::NotFound);
    assert!(platform.triggers().is_empty());
}

#[test]
fn test_wake_up_timeout() {
    let platform = MockPlatform::new();
    let wake = platform.add_process("W", "M", "Wake Up");
    platform.set_task_states(&wake, &["IN_PROGRESS"]);
    let settings = EngineSettings {
        poll_interval_seconds: 2,
        max_poll_attempts: 3,
        ..platform.settings()
    };
    let (engine, sleeper, _) = build_engine(&platform, settings);
    let file = local_file(b"abc");

    let result = engine.execute_sequence(&request(&file));

    assert_eq!(result.steps.wake_up.as_ref().unwrap().status, StepStatus::Timeout);
    assert_eq!(result.exit_code(), ExitCode::Timeout);
    assert_eq!(sleeper.total(), Duration::from_secs(6));
    assert_eq!(platform.call_count(EndpointKind::TaskStatus), 3);
}

// =============================================================================
// Test 4: Process lookup by exact name
// =============================================================================

#[test]
fn test_duplicate_process_names_use_first_match() {
    let platform = MockPlatform::new();
    let first = platform.add_process("W", "M", "Wake Up");
    platform.add_process("W", "M", "Wake Up");
    platform.add_process("W", "M", "Load Sales");
    let (engine, _, _) = build_engine(&platform, platform.settings());
    let file = local_file(b"abc");

    let result = engine.execute_sequence(&request(&file));

    assert!(result.success);
    assert_eq!(platform.triggers()[0].0, first);
}

#[test]
fn test_process_names_match_exactly() {
    let platform = MockPlatform::new();
    platform.add_process("W", "M", "wake up");
    platform.add_process("W", "M", "Wake Up (old)");
    let (engine, _, _) = build_engine(&platform, platform.settings());
    let file = local_file(b"abc");

    let result = engine.execute_sequence(&request(&file));

    assert_eq!(result.failure_kind, Some(FailureKind::NotFound));
}

#[test]
fn test_processes_in_other_models_are_ignored() {
    let platform = MockPlatform::new();
    platform.add_process("W", "OTHER", "Wake Up");
    let (engine, _, _) = build_engine(&platform, platform.settings());
    let file = local_file(b"abc");

    let result = engine.execute_sequence(&request(&file));

    assert_eq!(result.message, "Wake-up process 'Wake Up' not found");
}

// =============================================================================
// Test 5: Reruns reuse the remote file
// =============================================================================

#[test]
fn test_rerun_reuses_existing_file() {
    let platform = MockPlatform::new();
    platform.add_process("W", "M", "Wake Up");
    platform.add_process("W", "M", "Load Sales");
    let existing = platform.add_file("W", "M", "sales.csv");
    let (engine, _, _) = build_engine(&platform, platform.settings());

    let first = local_file(b"first run");
    engine.execute_sequence(&request(&first));
    let second = local_file(b"second");
    let result = engine.execute_sequence(&request(&second));

    assert!(result.success);
    assert_eq!(result.steps.file_upload.as_ref().unwrap().file_id.as_deref(), Some(existing.as_str()));
    assert_eq!(platform.call_count(EndpointKind::CreateFile), 0);
    assert_eq!(platform.file_contents(&existing).unwrap(), b"second");
}

#[test]
fn test_each_run_gets_its_own_id() {
    let platform = MockPlatform::new();
    platform.add_process("W", "M", "Wake Up");
    platform.add_process("W", "M", "Load Sales");
    let (engine, _, _) = build_engine(&platform, platform.settings());
    let file = local_file(b"abc");

    let a = engine.execute_sequence(&request(&file));
    let b = engine.execute_sequence(&request(&file));

    assert_ne!(a.run_id, b.run_id);
    // One session across both runs
    assert_eq!(platform.call_count(EndpointKind::Authenticate), 1);
}
