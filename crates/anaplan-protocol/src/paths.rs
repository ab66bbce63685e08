//! Endpoint paths of the integration API.
//!
//! Builders produce paths relative to the API base URL; [`Endpoint::parse`]
//! maps a method and relative path back to the operation it addresses.

use std::fmt;

/// HTTP methods used by the integration API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
        }
    }

    /// Whether repeating the request has no additional effect.
    pub fn is_idempotent(&self) -> bool {
        matches!(self, Method::Get | Method::Put)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn workspaces() -> String {
    "/workspaces".to_string()
}

fn model(workspace_id: &str, model_id: &str) -> String {
    format!("/workspaces/{}/models/{}", workspace_id, model_id)
}

pub fn files(workspace_id: &str, model_id: &str) -> String {
    format!("{}/files", model(workspace_id, model_id))
}

pub fn file(workspace_id: &str, model_id: &str, file_id: &str) -> String {
    format!("{}/files/{}", model(workspace_id, model_id), file_id)
}

pub fn chunk(workspace_id: &str, model_id: &str, file_id: &str, index: u64) -> String {
    format!("{}/chunks/{}", file(workspace_id, model_id, file_id), index)
}

pub fn complete(workspace_id: &str, model_id: &str, file_id: &str) -> String {
    format!("{}/complete", file(workspace_id, model_id, file_id))
}

pub fn processes(workspace_id: &str, model_id: &str) -> String {
    format!("{}/processes", model(workspace_id, model_id))
}

pub fn process_tasks(workspace_id: &str, model_id: &str, process_id: &str) -> String {
    format!("{}/processes/{}/tasks", model(workspace_id, model_id), process_id)
}

pub fn process_task(workspace_id: &str, model_id: &str, process_id: &str, task_id: &str) -> String {
    format!("{}/{}", process_tasks(workspace_id, model_id, process_id), task_id)
}

/// An addressed operation of the integration API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    ListWorkspaces,
    ListFiles { workspace: String, model: String },
    CreateFile { workspace: String, model: String },
    InitiateUpload { workspace: String, model: String, file: String },
    UploadChunk { workspace: String, model: String, file: String, index: u64 },
    CompleteUpload { workspace: String, model: String, file: String },
    ListProcesses { workspace: String, model: String },
    TriggerProcess { workspace: String, model: String, process: String },
    TaskStatus { workspace: String, model: String, process: String, task: String },
}

/// Operation kind without its path parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointKind {
    Authenticate,
    ListWorkspaces,
    ListFiles,
    CreateFile,
    InitiateUpload,
    UploadChunk,
    CompleteUpload,
    ListProcesses,
    TriggerProcess,
    TaskStatus,
}

impl Endpoint {
    /// Map a method and a path relative to the API base to an endpoint.
    ///
    /// Query strings are ignored. Returns `None` for unknown routes.
    pub fn parse(method: Method, path: &str) -> Option<Self> {
        let path = path.split('?').next().unwrap_or("");
        let segments: Vec<&str> = path.trim_matches('/').split('/').collect();
        let s = |i: usize| segments[i].to_string();

        match (method, segments.as_slice()) {
            (Method::Get, ["workspaces"]) => Some(Endpoint::ListWorkspaces),
            (Method::Get, ["workspaces", _, "models", _, "files"]) => {
                Some(Endpoint::ListFiles { workspace: s(1), model: s(3) })
            }
            (Method::Post, ["workspaces", _, "models", _, "files"]) => {
                Some(Endpoint::CreateFile { workspace: s(1), model: s(3) })
            }
            (Method::Post, ["workspaces", _, "models", _, "files", _]) => {
                Some(Endpoint::InitiateUpload { workspace: s(1), model: s(3), file: s(5) })
            }
            (Method::Put, ["workspaces", _, "models", _, "files", _, "chunks", index]) => {
                let index = index.parse().ok()?;
                Some(Endpoint::UploadChunk { workspace: s(1), model: s(3), file: s(5), index })
            }
            (Method::Post, ["workspaces", _, "models", _, "files", _, "complete"]) => {
                Some(Endpoint::CompleteUpload { workspace: s(1), model: s(3), file: s(5) })
            }
            (Method::Get, ["workspaces", _, "models", _, "processes"]) => {
                Some(Endpoint::ListProcesses { workspace: s(1), model: s(3) })
            }
            (Method::Post, ["workspaces", _, "models", _, "processes", _, "tasks"]) => {
                Some(Endpoint::TriggerProcess { workspace: s(1), model: s(3), process: s(5) })
            }
            (Method::Get, ["workspaces", _, "models", _, "processes", _, "tasks", _]) => {
                Some(Endpoint::TaskStatus {
                    workspace: s(1),
                    model: s(3),
                    process: s(5),
                    task: s(7),
                })
            }
            _ => None,
        }
    }

    pub fn kind(&self) -> EndpointKind {
        match self {
            Endpoint::ListWorkspaces => EndpointKind::ListWorkspaces,
            Endpoint::ListFiles { .. } => EndpointKind::ListFiles,
            Endpoint::CreateFile { .. } => EndpointKind::CreateFile,
            Endpoint::InitiateUpload { .. } => EndpointKind::InitiateUpload,
            Endpoint::UploadChunk { .. } => EndpointKind::UploadChunk,
            Endpoint::CompleteUpload { .. } => EndpointKind::CompleteUpload,
            Endpoint::ListProcesses { .. } => EndpointKind::ListProcesses,
            Endpoint::TriggerProcess { .. } => EndpointKind::TriggerProcess,
            Endpoint::TaskStatus { .. } => EndpointKind::TaskStatus,
        }
    }
}
