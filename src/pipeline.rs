//! Sequence orchestration
//!
//! Runs the three-step workflow against one model:
//! - Resolve, trigger and poll the wake-up process
//! - Upload the local file in chunks
//! - Resolve, trigger and poll the main process
//!
//! The first failing step ends the sequence. Nothing is rolled back; remote
//! side effects of earlier steps stay as they happened.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anaplan_protocol::{FileEntry, ProcessEntry, WorkspaceEntry};
use chrono::Utc;

use crate::clock::{Sleeper, ThreadSleeper};
use crate::config::{file_name_of, ConfigError, EngineSettings, SequenceSpec};
use crate::error::{EngineError, EngineResult};
use crate::host::{ApiClient, RetryingTransport, Transport, UreqTransport};
use crate::locator::ResourceLocator;
use crate::observer::{EngineObserver, TracingObserver};
use crate::session::{Credentials, SessionManager};
use crate::summary::{ExitCode, FailureKind, SequenceResult, SequenceSteps, StepName, StepRecord};
use crate::task::{self, TaskOutcome};
use crate::upload::{self, UploadReceipt};

/// Message of a sequence whose steps all succeeded
pub const SUCCESS_MESSAGE: &str = "Sequence completed successfully";

/// Parameters of one sequence execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceRequest {
    pub workspace_id: String,
    pub model_id: String,
    pub wake_up_process: String,
    pub file_path: PathBuf,
    pub remote_file_name: String,
    pub main_process: String,
    /// Overrides the engine's chunk size
    pub chunk_size: Option<u64>,
    /// Overrides the engine's locale
    pub locale: Option<String>,
}

impl SequenceRequest {
    pub fn new(
        workspace_id: impl Into<String>,
        model_id: impl Into<String>,
        wake_up_process: impl Into<String>,
        file_path: impl Into<PathBuf>,
        remote_file_name: impl Into<String>,
        main_process: impl Into<String>,
    ) -> Self {
        Self {
            workspace_id: workspace_id.into(),
            model_id: model_id.into(),
            wake_up_process: wake_up_process.into(),
            file_path: file_path.into(),
            remote_file_name: remote_file_name.into(),
            main_process: main_process.into(),
            chunk_size: None,
            locale: None,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: u64) -> Self {
        self.chunk_size = Some(chunk_size);
        self
    }

    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }

    /// Reject overrides that can never succeed. Runs before any platform
    /// call so nothing is triggered on a bad request.
    pub fn validate(&self) -> EngineResult<()> {
        if self.chunk_size == Some(0) {
            return Err(EngineError::InvalidConfig("chunk size must be greater than zero".to_string()));
        }
        if matches!(&self.locale, Some(locale) if locale.trim().is_empty()) {
            return Err(EngineError::InvalidConfig("locale must not be empty".to_string()));
        }
        Ok(())
    }

    /// Build from a configured `[[sequence]]` entry
    pub fn from_spec(spec: &SequenceSpec) -> Result<Self, ConfigError> {
        spec.validate()?;
        Ok(Self {
            workspace_id: spec.workspace_id.clone(),
            model_id: spec.model_id.clone(),
            wake_up_process: spec.wake_up_process.clone(),
            file_path: spec.file_path.clone(),
            remote_file_name: spec.remote_file_name()?,
            main_process: spec.main_process.clone(),
            chunk_size: spec.chunk_size,
            locale: spec.locale.clone(),
        })
    }
}

/// Builder for [`SequenceEngine`]
pub struct SequenceEngineBuilder {
    settings: EngineSettings,
    credentials: Credentials,
    transport: Option<Arc<dyn Transport>>,
    sleeper: Arc<dyn Sleeper>,
    observer: Arc<dyn EngineObserver>,
}

impl SequenceEngineBuilder {
    /// Use a specific transport instead of HTTPS
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn observer(mut self, observer: Arc<dyn EngineObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn build(self) -> Result<SequenceEngine, ConfigError> {
        self.settings.validate()?;

        let base = self
            .transport
            .unwrap_or_else(|| Arc::new(UreqTransport::new(self.settings.http_timeout())));
        let transport: Arc<dyn Transport> = Arc::new(RetryingTransport::new(
            base,
            self.settings.retry.policy(),
            self.sleeper.clone(),
        ));

        let sessions = SessionManager::new(
            transport.clone(),
            self.settings.auth_url.clone(),
            self.settings.auth_scheme,
            self.credentials,
            self.observer.clone(),
        );
        let client = ApiClient::new(transport, sessions, self.settings.api_base_url.clone());

        Ok(SequenceEngine {
            client,
            settings: self.settings,
            sleeper: self.sleeper,
            observer: self.observer,
        })
    }
}

/// One engine instance owns one session. Run independent sequences in
/// parallel with separate instances.
pub struct SequenceEngine {
    client: ApiClient,
    settings: EngineSettings,
    sleeper: Arc<dyn Sleeper>,
    observer: Arc<dyn EngineObserver>,
}

impl SequenceEngine {
    pub fn builder(settings: EngineSettings, credentials: Credentials) -> SequenceEngineBuilder {
        SequenceEngineBuilder {
            settings,
            credentials,
            transport: None,
            sleeper: Arc::new(ThreadSleeper),
            observer: Arc::new(TracingObserver),
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    /// Authenticate eagerly instead of on the first call
    pub fn authenticate(&self) -> EngineResult<()> {
        self.client.sessions().authenticate().map(|_| ())
    }

    pub fn list_workspaces(&self) -> EngineResult<Vec<WorkspaceEntry>> {
        self.client.list_workspaces()
    }

    pub fn list_files(&self, workspace_id: &str, model_id: &str) -> EngineResult<Vec<FileEntry>> {
        self.client.list_files(workspace_id, model_id)
    }

    pub fn list_processes(&self, workspace_id: &str, model_id: &str) -> EngineResult<Vec<ProcessEntry>> {
        self.client.list_processes(workspace_id, model_id)
    }

    pub fn resolve_file_id(&self, workspace_id: &str, model_id: &str, file_name: &str) -> EngineResult<String> {
        ResourceLocator::new(&self.client).resolve_file_id(workspace_id, model_id, file_name)
    }

    pub fn resolve_process_id(&self, workspace_id: &str, model_id: &str, process_name: &str) -> EngineResult<String> {
        ResourceLocator::new(&self.client).resolve_process_id(workspace_id, model_id, process_name)
    }

    pub fn upload_file(
        &self,
        workspace_id: &str,
        model_id: &str,
        local_path: &Path,
        remote_name: &str,
        chunk_size: u64,
    ) -> EngineResult<UploadReceipt> {
        upload::upload_file(
            &self.client,
            self.observer.as_ref(),
            workspace_id,
            model_id,
            local_path,
            remote_name,
            chunk_size,
        )
    }

    pub fn trigger_job(&self, workspace_id: &str, model_id: &str, process_id: &str, locale: &str) -> EngineResult<String> {
        task::trigger_job(&self.client, workspace_id, model_id, process_id, locale)
    }

    /// Poll with the engine's configured interval and attempt ceiling
    pub fn poll_task(&self, workspace_id: &str, model_id: &str, process_id: &str, task_id: &str) -> TaskOutcome {
        task::poll_task(
            &self.client,
            self.sleeper.as_ref(),
            self.observer.as_ref(),
            workspace_id,
            model_id,
            process_id,
            task_id,
            self.settings.poll_settings(),
        )
    }

    /// Run wake-up, upload and main process in order, stopping at the first
    /// failure.
    pub fn execute_sequence(&self, request: &SequenceRequest) -> SequenceResult {
        let run_id = uuid::Uuid::new_v4().to_string();
        let started_at = Utc::now();
        let start = Instant::now();
        let span = tracing::info_span!(
            "sequence",
            run_id = %run_id,
            workspace_id = %request.workspace_id,
            model_id = %request.model_id
        );
        let _guard = span.enter();

        let locale = request.locale.as_deref().unwrap_or(&self.settings.locale);
        let chunk_size = request.chunk_size.unwrap_or(self.settings.chunk_size);
        let mut steps = SequenceSteps::default();

        let failure = match request.validate() {
            Err(e) => Some((None, e.to_string(), Some(e.failure_kind()))),
            Ok(()) => self
                .run_steps(request, locale, chunk_size, &mut steps)
                .err()
                .map(|(step, message)| (Some(step), message, steps.get(step).and_then(|r| r.failure_kind))),
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        let (success, message, failed_step, failure_kind) = match failure {
            None => (true, SUCCESS_MESSAGE.to_string(), None, None),
            Some((step, message, kind)) => (false, message, step, kind),
        };
        let exit_code = failure_kind
            .map(|k| k.exit_code())
            .unwrap_or(if success { ExitCode::Success } else { ExitCode::JobFailed });

        if success {
            tracing::info!(duration_ms, "sequence completed");
        } else {
            tracing::error!(duration_ms, %message, "sequence failed");
        }

        SequenceResult {
            run_id,
            started_at,
            duration_ms,
            success,
            message,
            failed_step,
            failure_kind,
            exit_code: exit_code.as_i32(),
            steps,
        }
    }

    fn run_steps(
        &self,
        request: &SequenceRequest,
        locale: &str,
        chunk_size: u64,
        steps: &mut SequenceSteps,
    ) -> Result<(), (StepName, String)> {
        self.process_step(StepName::WakeUp, request, &request.wake_up_process, locale, steps)?;
        self.upload_step(request, chunk_size, steps)?;
        self.process_step(StepName::MainProcess, request, &request.main_process, locale, steps)
    }

    /// Resolve, trigger and poll one process. On failure returns the step and
    /// the sequence-level message.
    fn process_step(
        &self,
        step: StepName,
        request: &SequenceRequest,
        process_name: &str,
        locale: &str,
        steps: &mut SequenceSteps,
    ) -> Result<(), (StepName, String)> {
        let (label, lower) = match step {
            StepName::WakeUp => ("Wake-up", "wake-up"),
            _ => ("Main", "main"),
        };
        self.observer.on_step_started(step);

        let ws = request.workspace_id.as_str();
        let model = request.model_id.as_str();
        let (record, sequence_message) = match self.resolve_process_id(ws, model, process_name) {
            Err(EngineError::NotFound { .. }) => {
                let message = format!("{} process '{}' not found", label, process_name);
                (StepRecord::failed(message.clone(), FailureKind::NotFound), message)
            }
            Err(e) => (StepRecord::failed(e.to_string(), e.failure_kind()), e.to_string()),
            Ok(process_id) => match self.trigger_job(ws, model, &process_id, locale) {
                Err(e) => {
                    let message = format!("Failed to trigger {} process: {}", lower, e);
                    (StepRecord::failed(message.clone(), e.failure_kind()), message)
                }
                Ok(task_id) => {
                    let outcome = self.poll_task(ws, model, &process_id, &task_id);
                    let message = format!("{} process failed: {}", label, outcome.message);
                    (StepRecord::from_outcome(&process_id, &outcome), message)
                }
            },
        };

        self.observer.on_step_finished(step, &record);
        let ok = record.status.is_success();
        steps.set(step, record);
        if ok {
            Ok(())
        } else {
            Err((step, sequence_message))
        }
    }

    fn upload_step(
        &self,
        request: &SequenceRequest,
        chunk_size: u64,
        steps: &mut SequenceSteps,
    ) -> Result<(), (StepName, String)> {
        let step = StepName::FileUpload;
        self.observer.on_step_started(step);

        let result = self.upload_file(
            &request.workspace_id,
            &request.model_id,
            &request.file_path,
            &request.remote_file_name,
            chunk_size,
        );
        let (record, failure) = match result {
            Ok(receipt) => (StepRecord::from_upload(&receipt), None),
            Err(e) => {
                let message = format!("Failed to upload file '{}': {}", request.remote_file_name, e);
                (StepRecord::failed(message.clone(), e.failure_kind()), Some(message))
            }
        };

        self.observer.on_step_finished(step, &record);
        steps.set(step, record);
        match failure {
            None => Ok(()),
            Some(message) => Err((step, message)),
        }
    }
}

/// Remote name for a local path: its last component
pub fn default_remote_name(path: &Path) -> Option<String> {
    file_name_of(path)
}
