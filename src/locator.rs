//! Name to id resolution for files and processes.
//!
//! Each lookup lists every resource of the kind and takes the first exact,
//! case-sensitive name match. Nothing is cached between calls.

use anaplan_protocol::Named;

use crate::error::{EngineError, EngineResult, ResourceKind};
use crate::host::ApiClient;

pub struct ResourceLocator<'a> {
    client: &'a ApiClient,
}

impl<'a> ResourceLocator<'a> {
    pub fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    /// Id of the first file named `file_name`, if any.
    pub fn find_file_id(&self, workspace_id: &str, model_id: &str, file_name: &str) -> EngineResult<Option<String>> {
        let files = self.client.list_files(workspace_id, model_id)?;
        Ok(first_match(&files, file_name))
    }

    pub fn resolve_file_id(&self, workspace_id: &str, model_id: &str, file_name: &str) -> EngineResult<String> {
        self.find_file_id(workspace_id, model_id, file_name)?
            .ok_or_else(|| EngineError::NotFound {
                kind: ResourceKind::File,
                name: file_name.to_string(),
            })
    }

    pub fn resolve_process_id(&self, workspace_id: &str, model_id: &str, process_name: &str) -> EngineResult<String> {
        let processes = self.client.list_processes(workspace_id, model_id)?;
        first_match(&processes, process_name).ok_or_else(|| EngineError::NotFound {
            kind: ResourceKind::Process,
            name: process_name.to_string(),
        })
    }
}

fn first_match<T: Named>(entries: &[T], name: &str) -> Option<String> {
    entries
        .iter()
        .find(|entry| entry.name() == name)
        .map(|entry| entry.id().to_string())
}
