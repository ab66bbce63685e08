//! Integration Tests: Task Trigger and Polling
//!
//! - Trigger sends the locale and returns the platform's task id
//! - Polling sleeps only between non-terminal responses
//! - Exhausted attempts become a TIMEOUT outcome, transport problems ERROR

use std::time::Duration;

use anaplan_protocol::EndpointKind;
use anaplan_sequence::mock::{test_client, FailureConfig, MockPlatform, ObservedEvent, RecordingObserver, RecordingSleeper};
use anaplan_sequence::task::{poll_task, trigger_job, DEFAULT_COMPLETION_MESSAGE, TIMEOUT_MESSAGE};
use anaplan_sequence::{EngineError, FailureKind, NoopObserver, PollSettings, TaskState};
use serde_json::json;

fn settings(interval_secs: u64, max_attempts: u32) -> PollSettings {
    PollSettings {
        interval: Duration::from_secs(interval_secs),
        max_attempts,
    }
}

// =============================================================================
// Test 1: Trigger with locale
// =============================================================================

#[test]
fn test_trigger_sends_locale() {
    let platform = MockPlatform::new();
    let process = platform.add_process("W", "M", "Import");
    let client = test_client(&platform);

    let task_id = trigger_job(&client, "W", "M", &process, "de_DE").unwrap();

    assert!(!task_id.is_empty());
    assert_eq!(platform.triggers(), vec![(process, "de_DE".to_string())]);
}

#[test]
fn test_trigger_unknown_process_fails() {
    let platform = MockPlatform::new();
    let client = test_client(&platform);

    let err = trigger_job(&client, "W", "M", "118000000999", "en_US").unwrap_err();

    assert!(matches!(err, EngineError::Trigger(_)));
    assert_eq!(err.failure_kind(), FailureKind::JobFailed);
}

#[test]
fn test_trigger_without_task_id_fails() {
    let platform = MockPlatform::new();
    let process = platform.add_process("W", "M", "Import");
    platform.inject(
        EndpointKind::TriggerProcess,
        FailureConfig::body(200, json!({"status": {"code": 200, "message": "Success"}})),
    );
    let client = test_client(&platform);

    let err = trigger_job(&client, "W", "M", &process, "en_US").unwrap_err();

    assert!(matches!(err, EngineError::Trigger(_)));
}

// =============================================================================
// Test 2: Polling until a terminal state
// =============================================================================

#[test]
fn test_immediate_complete_never_sleeps() {
    let platform = MockPlatform::new();
    let process = platform.add_process("W", "M", "Import");
    let client = test_client(&platform);
    let sleeper = RecordingSleeper::new();
    let task_id = trigger_job(&client, "W", "M", &process, "en_US").unwrap();

    let outcome = poll_task(&client, &sleeper, &NoopObserver, "W", "M", &process, &task_id, settings(5, 240));

    assert_eq!(outcome.state, TaskState::Complete);
    assert_eq!(outcome.attempts, 1);
    assert_eq!(outcome.message, DEFAULT_COMPLETION_MESSAGE);
    assert!(sleeper.durations().is_empty());
}

#[test]
fn test_timeout_sleeps_full_budget() {
    let platform = MockPlatform::new();
    let process = platform.add_process("W", "M", "Import");
    platform.set_task_states(&process, &["IN_PROGRESS"]);
    let client = test_client(&platform);
    let sleeper = RecordingSleeper::new();
    let task_id = trigger_job(&client, "W", "M", &process, "en_US").unwrap();

    let outcome = poll_task(&client, &sleeper, &NoopObserver, "W", "M", &process, &task_id, settings(3, 7));

    assert_eq!(outcome.state, TaskState::Timeout);
    assert_eq!(outcome.message, TIMEOUT_MESSAGE);
    assert_eq!(outcome.attempts, 7);
    assert_eq!(sleeper.total(), Duration::from_secs(21));
    assert_eq!(platform.call_count(EndpointKind::TaskStatus), 7);

    let err = outcome.into_result().unwrap_err();
    assert!(matches!(err, EngineError::PollTimeout { attempts: 7 }));
}

#[test]
fn test_unknown_states_keep_polling() {
    let platform = MockPlatform::new();
    let process = platform.add_process("W", "M", "Import");
    platform.set_task_states(&process, &["NOT_STARTED", "CANCELLING", "SOMETHING_NEW", "CANCELLED"]);
    let client = test_client(&platform);
    let sleeper = RecordingSleeper::new();
    let observer = RecordingObserver::new();
    let task_id = trigger_job(&client, "W", "M", &process, "en_US").unwrap();

    let outcome = poll_task(&client, &sleeper, &observer, "W", "M", &process, &task_id, settings(1, 10));

    assert_eq!(outcome.state, TaskState::Cancelled);
    assert_eq!(outcome.attempts, 4);
    assert_eq!(sleeper.durations().len(), 3);

    let seen: Vec<String> = observer
        .events()
        .into_iter()
        .filter_map(|e| match e {
            ObservedEvent::PollAttempt { state, .. } => Some(state),
            _ => None,
        })
        .collect();
    assert_eq!(seen, vec!["NOT_STARTED", "CANCELLING", "SOMETHING_NEW", "CANCELLED"]);
}

#[test]
fn test_failed_task_carries_step_and_details() {
    let platform = MockPlatform::new();
    let process = platform.add_process("W", "M", "Import");
    platform.set_task_states(&process, &["IN_PROGRESS", "FAILED"]);
    platform.set_task_step(&process, "Import into Sales: 12 rows rejected");
    platform.set_task_result(&process, json!({"successful": false, "failureDumpAvailable": true}));
    let client = test_client(&platform);
    let sleeper = RecordingSleeper::new();
    let task_id = trigger_job(&client, "W", "M", &process, "en_US").unwrap();

    let outcome = poll_task(&client, &sleeper, &NoopObserver, "W", "M", &process, &task_id, settings(5, 240));

    assert_eq!(outcome.state, TaskState::Failed);
    assert_eq!(outcome.message, "Import into Sales: 12 rows rejected");
    assert_eq!(outcome.details["failureDumpAvailable"], true);
    assert_eq!(sleeper.durations(), vec![Duration::from_secs(5)]);
}

#[test]
fn test_status_error_ends_polling() {
    let platform = MockPlatform::new();
    let process = platform.add_process("W", "M", "Import");
    platform.set_task_states(&process, &["IN_PROGRESS"]);
    platform.inject(EndpointKind::TaskStatus, FailureConfig::status(404).with_skip(2));
    let client = test_client(&platform);
    let sleeper = RecordingSleeper::new();
    let task_id = trigger_job(&client, "W", "M", &process, "en_US").unwrap();

    let outcome = poll_task(&client, &sleeper, &NoopObserver, "W", "M", &process, &task_id, settings(5, 240));

    assert_eq!(outcome.state, TaskState::Error);
    assert_eq!(outcome.attempts, 3);
    assert!(outcome.message.contains("404"));
    assert_eq!(sleeper.durations().len(), 2);
}

#[test]
fn test_connection_failure_is_error_outcome() {
    let platform = MockPlatform::new();
    let process = platform.add_process("W", "M", "Import");
    platform.inject(EndpointKind::TaskStatus, FailureConfig::connection_failure("connection reset"));
    let client = test_client(&platform);
    let sleeper = RecordingSleeper::new();
    let task_id = trigger_job(&client, "W", "M", &process, "en_US").unwrap();

    let outcome = poll_task(&client, &sleeper, &NoopObserver, "W", "M", &process, &task_id, settings(5, 240));

    assert_eq!(outcome.state, TaskState::Error);
    assert_eq!(outcome.attempts, 1);
    assert!(outcome.message.contains("connection reset"));
}
