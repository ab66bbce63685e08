//! Listing envelopes for workspaces, files and processes.
//!
//! Listing responses put their entries under a kind-specific key (`files`,
//! `processes`, `workspaces`) and may carry a `meta.paging` block whose
//! `next` link points at the following page.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ProtocolError;

/// Paging block of a listing response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paging {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_page_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_size: Option<u64>,
    /// Absolute URL of the next page, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
}

/// Response metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Meta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paging: Option<Paging>,
}

/// A listed resource with a name and an id.
pub trait Named {
    fn name(&self) -> &str;
    fn id(&self) -> &str;
}

/// File entry in a model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_count: Option<u64>,
}

/// Process entry in a model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessEntry {
    pub id: String,
    pub name: String,
}

/// Workspace entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceEntry {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
}

macro_rules! impl_named {
    ($($ty:ty),*) => {
        $(impl Named for $ty {
            fn name(&self) -> &str {
                &self.name
            }
            fn id(&self) -> &str {
                &self.id
            }
        })*
    };
}

impl_named!(FileEntry, ProcessEntry, WorkspaceEntry);

/// One decoded page of a listing.
#[derive(Debug, Clone)]
pub struct ListPage<T> {
    pub items: Vec<T>,
    /// URL of the next page, if the platform reported one.
    pub next: Option<String>,
}

impl<T: DeserializeOwned> ListPage<T> {
    /// Decode a listing body whose entries live under `key`.
    ///
    /// A missing `key` is an empty page, matching how the platform omits the
    /// array when a model has no resources of that kind.
    pub fn from_body(body: &[u8], key: &str) -> Result<Self, ProtocolError> {
        let mut value: Value = serde_json::from_slice(body)?;
        let items = match value.get_mut(key).map(Value::take) {
            Some(Value::Null) | None => Vec::new(),
            Some(array) => serde_json::from_value(array)?,
        };
        let meta: Meta = match value.get_mut("meta").map(Value::take) {
            Some(meta) => serde_json::from_value(meta)?,
            None => Meta::default(),
        };
        let next = meta
            .paging
            .and_then(|p| p.next)
            .filter(|link| !link.is_empty());
        Ok(Self { items, next })
    }
}

/// Listing keys.
pub mod keys {
    pub const FILES: &str = "files";
    pub const PROCESSES: &str = "processes";
    pub const WORKSPACES: &str = "workspaces";
}
