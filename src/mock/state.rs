//! Mock Platform State
//!
//! Workspaces, files, processes and tasks held by the mock platform, plus the
//! records tests assert against.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use anaplan_protocol::ops::task::states;
use anaplan_protocol::{EndpointKind, Method, WorkspaceEntry};
use serde_json::Value;

use super::failure::FailureInjector;

/// A file record in a model
#[derive(Debug, Clone)]
pub struct MockFile {
    pub workspace_id: String,
    pub model_id: String,
    pub id: String,
    pub name: String,
    /// Chunk count declared by the latest initiate
    pub declared_chunks: Option<u64>,
    /// Chunk payloads of the current upload by index
    pub data: BTreeMap<u64, Vec<u8>>,
    pub completed: bool,
}

/// A process and the behavior scripted for its runs
#[derive(Debug, Clone)]
pub struct MockProcess {
    pub workspace_id: String,
    pub model_id: String,
    pub id: String,
    pub name: String,
    /// States reported by successive status calls; the last one repeats
    pub states: Vec<String>,
    pub result: Option<Value>,
    pub current_step: Option<String>,
}

/// One triggered run
#[derive(Debug, Clone)]
pub struct MockTask {
    pub id: String,
    pub process_id: String,
    pub remaining: VecDeque<String>,
    pub result: Option<Value>,
    pub current_step: Option<String>,
}

impl MockTask {
    /// State for the next status call
    pub fn next_state(&mut self) -> String {
        if self.remaining.len() > 1 {
            self.remaining.pop_front().unwrap_or_default()
        } else {
            self.remaining
                .front()
                .cloned()
                .unwrap_or_else(|| states::COMPLETE.to_string())
        }
    }
}

/// A received chunk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkRecord {
    pub file_id: String,
    pub index: u64,
    pub len: usize,
}

/// A completed upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub file_id: String,
    pub chunk_count: u64,
}

/// A request seen by the platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub method: Method,
    pub url: String,
    /// None for unknown routes
    pub kind: Option<EndpointKind>,
}

/// Complete mock platform state
#[derive(Debug, Default)]
pub struct PlatformState {
    pub email: String,
    pub password: String,
    pub tokens: HashSet<String>,
    pub token_counter: u64,
    pub id_counter: u64,

    pub workspaces: Vec<WorkspaceEntry>,
    pub files: Vec<MockFile>,
    pub processes: Vec<MockProcess>,
    pub tasks: HashMap<String, MockTask>,

    pub chunks: Vec<ChunkRecord>,
    pub completions: Vec<Completion>,
    /// (process id, locale) per trigger
    pub triggers: Vec<(String, String)>,
    pub calls: Vec<RecordedCall>,

    pub injector: FailureInjector,
    /// Listing page size; None returns everything in one page
    pub page_size: Option<usize>,
    /// Answer initiate with a top-level `id` instead of `file.id`
    pub flat_initiate: bool,
}

impl PlatformState {
    pub fn new(email: &str, password: &str) -> Self {
        Self {
            email: email.to_string(),
            password: password.to_string(),
            ..Self::default()
        }
    }

    pub fn next_id(&mut self, prefix: u32) -> String {
        self.id_counter += 1;
        format!("{}{:09}", prefix, self.id_counter)
    }

    pub fn issue_token(&mut self) -> String {
        self.token_counter += 1;
        let token = format!("mock-token-{}", self.token_counter);
        self.tokens.insert(token.clone());
        token
    }

    pub fn file_mut(&mut self, workspace_id: &str, model_id: &str, file_id: &str) -> Option<&mut MockFile> {
        self.files
            .iter_mut()
            .find(|f| f.workspace_id == workspace_id && f.model_id == model_id && f.id == file_id)
    }

    pub fn process(&self, workspace_id: &str, model_id: &str, process_id: &str) -> Option<&MockProcess> {
        self.processes
            .iter()
            .find(|p| p.workspace_id == workspace_id && p.model_id == model_id && p.id == process_id)
    }

    pub fn process_by_id_mut(&mut self, process_id: &str) -> Option<&mut MockProcess> {
        self.processes.iter_mut().find(|p| p.id == process_id)
    }
}
