//! Scope families that partition stored values.
//!
//! Settings and shared storage use two distinct scope enums with the same two-variant shape. Both
//! resolve to a [`ScopePartition`]; partitions never fall back to one another.

use std::fmt;
use std::hash::Hash;

use serde::{Deserialize, Serialize};

use crate::storage::StoreError;

const MAX_WORKSPACE_ID_LEN: usize = 128;

/// Stable identifier for an open workspace.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkspaceId(String);

impl WorkspaceId {
    /// Returns a workspace id when `raw` is non-empty, bounded, and free of control characters.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidWorkspaceId`] for ids that fail validation.
    pub fn new(raw: impl Into<String>) -> Result<Self, StoreError> {
        let raw = raw.into();
        if raw.trim().is_empty()
            || raw.len() > MAX_WORKSPACE_ID_LEN
            || raw.chars().any(char::is_control)
        {
            return Err(StoreError::InvalidWorkspaceId(raw));
        }
        Ok(Self(raw))
    }

    /// Creates an id without validation for ids handed over by the backend.
    pub fn trusted(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Returns the string form of the identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkspaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Namespace a scoped key resolves into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopePartition<'a> {
    /// Process/user-wide partition.
    Global,
    /// Partition owned by a single workspace.
    Workspace(&'a WorkspaceId),
}

/// Shape shared by both scope families.
pub trait StoreScope: Clone + fmt::Debug + Eq + Hash + 'static {
    /// Returns the partition this scope addresses.
    fn partition(&self) -> ScopePartition<'_>;
}

/// Scope family used by settings storage.
///
/// Serialized as `"USER"` or `{"WORKSPACE": "<id>"}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SettingScope {
    /// User-wide settings.
    User,
    /// Settings owned by one workspace.
    Workspace(WorkspaceId),
}

impl SettingScope {
    /// Returns the user-wide settings scope.
    pub fn user() -> Self {
        Self::User
    }

    /// Returns the settings scope for a workspace.
    pub fn for_workspace(workspace_id: WorkspaceId) -> Self {
        Self::Workspace(workspace_id)
    }

    /// Returns `true` for the user scope.
    pub fn is_user(&self) -> bool {
        matches!(self, Self::User)
    }

    /// Returns `true` for a workspace scope.
    pub fn is_workspace(&self) -> bool {
        matches!(self, Self::Workspace(_))
    }
}

impl StoreScope for SettingScope {
    fn partition(&self) -> ScopePartition<'_> {
        match self {
            Self::User => ScopePartition::Global,
            Self::Workspace(id) => ScopePartition::Workspace(id),
        }
    }
}

/// Scope family used by shared storage (layout records, UI state blobs).
///
/// Serialized as `"application"` or `{"workspace": "<id>"}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageScope {
    /// Application-wide shared storage.
    Application,
    /// Shared storage owned by one workspace.
    Workspace(WorkspaceId),
}

impl StorageScope {
    /// Returns the application-wide storage scope.
    pub fn application() -> Self {
        Self::Application
    }

    /// Returns the storage scope for a workspace.
    pub fn for_workspace(workspace_id: WorkspaceId) -> Self {
        Self::Workspace(workspace_id)
    }
}

impl StoreScope for StorageScope {
    fn partition(&self) -> ScopePartition<'_> {
        match self {
            Self::Application => ScopePartition::Global,
            Self::Workspace(id) => ScopePartition::Workspace(id),
        }
    }
}
