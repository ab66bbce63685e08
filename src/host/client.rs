//! Authenticated API Client
//!
//! Resolves paths against the API base URL, attaches session headers, and
//! applies the token-expiry policy: a 401/403 clears the session,
//! re-authenticates once and repeats the call exactly once.

use std::sync::Arc;

use anaplan_protocol::listing::keys;
use anaplan_protocol::{
    paths, FileEntry, ListPage, Method, ProcessEntry, WorkspaceEntry, CONTENT_TYPE_JSON,
};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::transport::{HttpRequest, HttpResponse, Transport};
use crate::error::EngineResult;
use crate::session::SessionManager;

pub struct ApiClient {
    transport: Arc<dyn Transport>,
    sessions: SessionManager,
    base_url: String,
}

impl ApiClient {
    pub fn new(transport: Arc<dyn Transport>, sessions: SessionManager, base_url: impl Into<String>) -> Self {
        Self {
            transport,
            sessions,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for a path relative to the API base; absolute URLs pass through
    pub fn url(&self, path_or_url: &str) -> String {
        if path_or_url.starts_with("http://") || path_or_url.starts_with("https://") {
            path_or_url.to_string()
        } else {
            format!("{}{}", self.base_url, path_or_url)
        }
    }

    /// Send an authenticated request and return the response whatever its status
    pub fn send(&self, mut request: HttpRequest) -> EngineResult<HttpResponse> {
        let session = self.sessions.session()?;
        request.set_header("Authorization", session.authorization());
        if request.header("Content-Type").is_none() {
            request.set_header("Content-Type", CONTENT_TYPE_JSON);
        }

        let response = self.transport.execute(&request)?;
        if response.status != 401 && response.status != 403 {
            return Ok(response);
        }

        tracing::info!(
            status = response.status,
            url = %request.url,
            "authorization rejected, re-authenticating once"
        );
        self.sessions.clear();
        let session = self.sessions.session()?;
        request.set_header("Authorization", session.authorization());
        Ok(self.transport.execute(&request)?)
    }

    pub fn get(&self, path_or_url: &str) -> EngineResult<HttpResponse> {
        self.send(HttpRequest::new(Method::Get, self.url(path_or_url)))
    }

    pub fn post_json<T: Serialize>(&self, path: &str, body: &T) -> EngineResult<HttpResponse> {
        let request = HttpRequest::new(Method::Post, self.url(path)).with_json(body)?;
        self.send(request)
    }

    pub fn put_bytes(&self, path: &str, body: Vec<u8>, content_type: &str) -> EngineResult<HttpResponse> {
        self.send(HttpRequest::new(Method::Put, self.url(path)).with_body(body, content_type))
    }

    /// Fetch every page of a listing, following `meta.paging.next` links
    pub fn list_all<T: DeserializeOwned>(&self, path: &str, key: &str) -> EngineResult<Vec<T>> {
        let mut items = Vec::new();
        let mut visited = Vec::new();
        let mut next = Some(self.url(path));

        while let Some(url) = next.take() {
            if visited.contains(&url) {
                tracing::warn!(%url, "listing returned a next link already visited; stopping");
                break;
            }
            let response = self.get(&url)?;
            if !response.is_success() {
                return Err(crate::host::TransportError::Status(response.describe()).into());
            }
            let page: ListPage<T> = ListPage::from_body(&response.body, key)
                .map_err(|e| crate::host::TransportError::Status(format!("malformed listing: {}", e)))?;
            visited.push(url);
            items.extend(page.items);
            next = page.next.map(|link| self.url(&link));
        }

        Ok(items)
    }

    pub fn list_workspaces(&self) -> EngineResult<Vec<WorkspaceEntry>> {
        self.list_all(&paths::workspaces(), keys::WORKSPACES)
    }

    pub fn list_files(&self, workspace_id: &str, model_id: &str) -> EngineResult<Vec<FileEntry>> {
        self.list_all(&paths::files(workspace_id, model_id), keys::FILES)
    }

    pub fn list_processes(&self, workspace_id: &str, model_id: &str) -> EngineResult<Vec<ProcessEntry>> {
        self.list_all(&paths::processes(workspace_id, model_id), keys::PROCESSES)
    }
}
