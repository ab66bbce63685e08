//! Mock Platform Implementation
//!
//! An in-process fake of the authentication service and the integration API,
//! routed by method and path. Clones share state, so a test can keep one
//! handle for configuration while the engine talks to another.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use anaplan_protocol::auth::AuthResponse;
use anaplan_protocol::listing::keys;
use anaplan_protocol::ops::task::states;
use anaplan_protocol::ops::{CompleteUploadRequest, InitiateUploadRequest, TriggerRequest};
use anaplan_protocol::{
    ApiStatus, Endpoint, EndpointKind, FileEntry, JsonCredentials, Method, ProcessEntry, WorkspaceEntry,
    CONTENT_TYPE_OCTET_STREAM, TOKEN_AUTH_SCHEME,
};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::Serialize;
use serde_json::{json, Value};

use super::failure::FailureConfig;
use super::state::{ChunkRecord, Completion, MockFile, MockProcess, MockTask, PlatformState, RecordedCall};
use crate::config::EngineSettings;
use crate::host::{HttpRequest, HttpResponse, TransportError};

const FILE_ID_PREFIX: u32 = 113;
const PROCESS_ID_PREFIX: u32 = 118;

/// Configurable mock platform for testing
#[derive(Clone)]
pub struct MockPlatform {
    state: Arc<Mutex<PlatformState>>,
}

impl MockPlatform {
    pub const EMAIL: &'static str = "integration@example.com";
    pub const PASSWORD: &'static str = "correct-horse";
    pub const API_BASE_URL: &'static str = "https://api.mock.anaplan.test/2/0";
    pub const AUTH_URL: &'static str = "https://auth.mock.anaplan.test/token/authenticate";

    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(PlatformState::new(Self::EMAIL, Self::PASSWORD))),
        }
    }

    fn lock(&self) -> MutexGuard<'_, PlatformState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn api_base_url(&self) -> String {
        Self::API_BASE_URL.to_string()
    }

    pub fn auth_url(&self) -> String {
        Self::AUTH_URL.to_string()
    }

    /// Default engine settings pointed at this platform
    pub fn settings(&self) -> EngineSettings {
        EngineSettings {
            api_base_url: self.api_base_url(),
            auth_url: self.auth_url(),
            ..EngineSettings::default()
        }
    }

    // === Public API for test configuration ===

    /// Issue a valid token without going through authentication
    pub fn token(&self) -> String {
        self.lock().issue_token()
    }

    /// Invalidate every issued token; the next API call answers 401
    pub fn expire_tokens(&self) {
        self.lock().tokens.clear();
    }

    /// Inject a failure configuration for an endpoint
    pub fn inject(&self, kind: EndpointKind, config: FailureConfig) {
        self.lock().injector.inject(kind, config);
    }

    pub fn clear_failures(&self) {
        self.lock().injector.clear();
    }

    pub fn set_page_size(&self, size: usize) {
        self.lock().page_size = Some(size.max(1));
    }

    pub fn use_flat_initiate_response(&self, flat: bool) {
        self.lock().flat_initiate = flat;
    }

    pub fn add_workspace(&self, id: &str, name: &str) {
        self.lock().workspaces.push(WorkspaceEntry {
            id: id.to_string(),
            name: name.to_string(),
            active: Some(true),
        });
    }

    /// Add a file record and return its id
    pub fn add_file(&self, workspace_id: &str, model_id: &str, name: &str) -> String {
        let mut state = self.lock();
        let id = state.next_id(FILE_ID_PREFIX);
        state.files.push(MockFile {
            workspace_id: workspace_id.to_string(),
            model_id: model_id.to_string(),
            id: id.clone(),
            name: name.to_string(),
            declared_chunks: None,
            data: Default::default(),
            completed: false,
        });
        id
    }

    /// Add a process whose runs complete on the first status call
    pub fn add_process(&self, workspace_id: &str, model_id: &str, name: &str) -> String {
        let mut state = self.lock();
        let id = state.next_id(PROCESS_ID_PREFIX);
        state.processes.push(MockProcess {
            workspace_id: workspace_id.to_string(),
            model_id: model_id.to_string(),
            id: id.clone(),
            name: name.to_string(),
            states: vec![states::COMPLETE.to_string()],
            result: None,
            current_step: None,
        });
        id
    }

    /// Script the states reported for future runs of a process
    pub fn set_task_states(&self, process_id: &str, task_states: &[&str]) {
        if let Some(process) = self.lock().process_by_id_mut(process_id) {
            process.states = task_states.iter().map(|s| s.to_string()).collect();
        }
    }

    pub fn set_task_result(&self, process_id: &str, result: Value) {
        if let Some(process) = self.lock().process_by_id_mut(process_id) {
            process.result = Some(result);
        }
    }

    pub fn set_task_step(&self, process_id: &str, step: &str) {
        if let Some(process) = self.lock().process_by_id_mut(process_id) {
            process.current_step = Some(step.to_string());
        }
    }

    // === Inspection ===

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.lock().calls.clone()
    }

    pub fn call_count(&self, kind: EndpointKind) -> usize {
        self.lock().calls.iter().filter(|c| c.kind == Some(kind)).count()
    }

    pub fn chunks(&self) -> Vec<ChunkRecord> {
        self.lock().chunks.clone()
    }

    pub fn completions(&self) -> Vec<Completion> {
        self.lock().completions.clone()
    }

    pub fn triggers(&self) -> Vec<(String, String)> {
        self.lock().triggers.clone()
    }

    /// Bytes of the latest upload into a file, in chunk order
    pub fn file_contents(&self, file_id: &str) -> Option<Vec<u8>> {
        let state = self.lock();
        let file = state.files.iter().find(|f| f.id == file_id)?;
        Some(file.data.values().flatten().copied().collect())
    }

    pub fn file_name(&self, file_id: &str) -> Option<String> {
        let state = self.lock();
        state.files.iter().find(|f| f.id == file_id).map(|f| f.name.clone())
    }

    // === Request handling ===

    /// Handle one request as the platform would
    pub fn handle_request(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut state = self.lock();

        let endpoint = request
            .url
            .strip_prefix(Self::API_BASE_URL)
            .and_then(|path| Endpoint::parse(request.method, path));
        let is_auth = request.url.split('?').next() == Some(Self::AUTH_URL);
        let kind = if is_auth {
            Some(EndpointKind::Authenticate)
        } else {
            endpoint.as_ref().map(Endpoint::kind)
        };

        state.calls.push(RecordedCall {
            method: request.method,
            url: request.url.clone(),
            kind,
        });

        if let Some(kind) = kind {
            if let Some(failure) = state.injector.check(kind) {
                return failure.respond();
            }
        }

        if is_auth {
            return Ok(Self::authenticate(&mut state, request));
        }
        let Some(endpoint) = endpoint else {
            return Ok(error(404, "Not Found"));
        };

        if !Self::authorized(&state, request) {
            return Ok(error(401, "Unauthorized"));
        }

        Ok(Self::route(&mut state, request, endpoint))
    }

    fn authenticate(state: &mut PlatformState, request: &HttpRequest) -> HttpResponse {
        if request.method != Method::Post {
            return error(405, "Method Not Allowed");
        }

        let presented = match request.header("Authorization") {
            Some(header) => header
                .strip_prefix("Basic ")
                .and_then(|encoded| STANDARD.decode(encoded).ok())
                .and_then(|raw| String::from_utf8(raw).ok())
                .and_then(|pair| {
                    pair.split_once(':')
                        .map(|(user, pass)| (user.to_string(), pass.to_string()))
                }),
            None => serde_json::from_slice::<JsonCredentials>(&request.body)
                .ok()
                .map(|c| (c.username, c.password)),
        };

        match presented {
            Some((user, pass)) if user == state.email && pass == state.password => {
                let token = state.issue_token();
                json_response(201, &AuthResponse::success(token))
            }
            _ => json_response(401, &AuthResponse::failure("Bad credentials")),
        }
    }

    fn authorized(state: &PlatformState, request: &HttpRequest) -> bool {
        request
            .header("Authorization")
            .and_then(|value| value.strip_prefix(TOKEN_AUTH_SCHEME))
            .map(str::trim)
            .map(|token| state.tokens.contains(token))
            .unwrap_or(false)
    }

    fn route(state: &mut PlatformState, request: &HttpRequest, endpoint: Endpoint) -> HttpResponse {
        let offset = query_offset(&request.url);
        match endpoint {
            Endpoint::ListWorkspaces => {
                let items = state.workspaces.clone();
                page(state, items, keys::WORKSPACES, &request.url, offset)
            }
            Endpoint::ListFiles { workspace, model } => {
                let items: Vec<FileEntry> = state
                    .files
                    .iter()
                    .filter(|f| f.workspace_id == workspace && f.model_id == model)
                    .map(|f| FileEntry {
                        id: f.id.clone(),
                        name: f.name.clone(),
                        chunk_count: f.declared_chunks,
                    })
                    .collect();
                page(state, items, keys::FILES, &request.url, offset)
            }
            Endpoint::ListProcesses { workspace, model } => {
                let items: Vec<ProcessEntry> = state
                    .processes
                    .iter()
                    .filter(|p| p.workspace_id == workspace && p.model_id == model)
                    .map(|p| ProcessEntry {
                        id: p.id.clone(),
                        name: p.name.clone(),
                    })
                    .collect();
                page(state, items, keys::PROCESSES, &request.url, offset)
            }
            Endpoint::CreateFile { workspace, model } => {
                let Ok(body) = serde_json::from_slice::<InitiateUploadRequest>(&request.body) else {
                    return error(400, "Bad Request");
                };
                let Some(name) = body.name else {
                    return error(400, "Bad Request");
                };
                let id = state.next_id(FILE_ID_PREFIX);
                state.files.push(MockFile {
                    workspace_id: workspace,
                    model_id: model,
                    id: id.clone(),
                    name: name.clone(),
                    declared_chunks: Some(body.chunk_count),
                    data: Default::default(),
                    completed: false,
                });
                initiate_response(state.flat_initiate, &id, &name, body.chunk_count)
            }
            Endpoint::InitiateUpload { workspace, model, file } => {
                let Ok(body) = serde_json::from_slice::<InitiateUploadRequest>(&request.body) else {
                    return error(400, "Bad Request");
                };
                let flat = state.flat_initiate;
                let Some(record) = state.file_mut(&workspace, &model, &file) else {
                    return error(404, "Not Found");
                };
                record.declared_chunks = Some(body.chunk_count);
                record.data.clear();
                record.completed = false;
                let name = record.name.clone();
                initiate_response(flat, &file, &name, body.chunk_count)
            }
            Endpoint::UploadChunk { workspace, model, file, index } => {
                if request.header("Content-Type") != Some(CONTENT_TYPE_OCTET_STREAM) {
                    return error(415, "Unsupported Media Type");
                }
                let Some(record) = state.file_mut(&workspace, &model, &file) else {
                    return error(404, "Not Found");
                };
                match record.declared_chunks {
                    Some(declared) if index < declared => {}
                    _ => return error(400, "Bad Request"),
                }
                record.data.insert(index, request.body.clone());
                state.chunks.push(ChunkRecord {
                    file_id: file,
                    index,
                    len: request.body.len(),
                });
                HttpResponse::empty(204)
            }
            Endpoint::CompleteUpload { workspace, model, file } => {
                let Ok(body) = serde_json::from_slice::<CompleteUploadRequest>(&request.body) else {
                    return error(400, "Bad Request");
                };
                let Some(record) = state.file_mut(&workspace, &model, &file) else {
                    return error(404, "Not Found");
                };
                if record.declared_chunks != Some(body.chunk_count) {
                    return error(400, "Bad Request");
                }
                record.completed = true;
                let entry = FileEntry {
                    id: record.id.clone(),
                    name: record.name.clone(),
                    chunk_count: record.declared_chunks,
                };
                state.completions.push(Completion {
                    file_id: file,
                    chunk_count: body.chunk_count,
                });
                json_response(200, &json!({"file": entry, "status": ApiStatus::success()}))
            }
            Endpoint::TriggerProcess { workspace, model, process } => {
                let Ok(body) = serde_json::from_slice::<TriggerRequest>(&request.body) else {
                    return error(400, "Bad Request");
                };
                let Some(script) = state.process(&workspace, &model, &process).cloned() else {
                    return error(404, "Not Found");
                };
                let task_id = format!("{:032X}", state.tasks.len() as u64 + 1);
                state.tasks.insert(
                    task_id.clone(),
                    MockTask {
                        id: task_id.clone(),
                        process_id: process.clone(),
                        remaining: VecDeque::from(script.states),
                        result: script.result,
                        current_step: script.current_step,
                    },
                );
                state.triggers.push((process, body.locale_name));
                json_response(
                    200,
                    &json!({"task": {"taskId": task_id}, "status": ApiStatus::success()}),
                )
            }
            Endpoint::TaskStatus { process, task, .. } => {
                let Some(record) = state.tasks.get_mut(&task).filter(|t| t.process_id == process) else {
                    return error(404, "Not Found");
                };
                let task_state = record.next_state();
                let terminal = matches!(
                    task_state.as_str(),
                    states::COMPLETE | states::FAILED | states::CANCELLED
                );
                let mut info = json!({"taskId": record.id, "taskState": task_state});
                if terminal {
                    if let Some(step) = &record.current_step {
                        info["currentStep"] = json!(step);
                    }
                    if let Some(result) = &record.result {
                        info["result"] = result.clone();
                    }
                }
                json_response(200, &json!({"task": info, "status": ApiStatus::success()}))
            }
        }
    }
}

impl Default for MockPlatform {
    fn default() -> Self {
        Self::new()
    }
}

fn json_response<T: Serialize>(status: u16, body: &T) -> HttpResponse {
    HttpResponse::json(status, &serde_json::to_value(body).unwrap_or(Value::Null))
}

fn error(status: u16, message: &str) -> HttpResponse {
    json_response(status, &json!({"status": ApiStatus::failure(status, message)}))
}

fn initiate_response(flat: bool, id: &str, name: &str, chunk_count: u64) -> HttpResponse {
    let body = if flat {
        json!({"id": id, "name": name, "chunkCount": chunk_count})
    } else {
        json!({
            "file": {"id": id, "name": name, "chunkCount": chunk_count},
            "status": ApiStatus::success()
        })
    };
    json_response(200, &body)
}

fn query_offset(url: &str) -> usize {
    url.split_once('?')
        .map(|(_, query)| query)
        .into_iter()
        .flat_map(|query| query.split('&'))
        .find_map(|pair| pair.strip_prefix("offset="))
        .and_then(|v| v.parse().ok())
        .unwrap_or(0)
}

fn page<T: Serialize>(state: &PlatformState, items: Vec<T>, key: &str, url: &str, offset: usize) -> HttpResponse {
    let total = items.len();
    let size = state.page_size.unwrap_or(total.max(1));
    let start = offset.min(total);
    let end = (start + size).min(total);
    let base = url.split('?').next().unwrap_or(url);

    let mut paging = json!({"currentPageSize": end - start, "offset": start, "totalSize": total});
    if end < total {
        paging["next"] = json!(format!("{}?offset={}", base, end));
    }

    let mut body = json!({"meta": {"paging": paging}, "status": ApiStatus::success()});
    body[key] = json!(items.into_iter().skip(start).take(end - start).collect::<Vec<_>>());
    json_response(200, &body)
}
