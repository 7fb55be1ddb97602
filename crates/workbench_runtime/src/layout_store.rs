//! Per-workspace layout store: merge synchronously, persist asynchronously.

use std::fmt;
use std::rc::Rc;

use futures::future::{FutureExt, LocalBoxFuture};
use workbench_host::{ScopedValueStore, StorageScope, StoreError, WorkspaceId, WriteSequence};

use crate::layout::{apply_update, reduce_layout, LayoutAction, LayoutEffect, LayoutError};
use crate::model::{LayoutState, LayoutUpdate};
use crate::persistence::{layout_record, layout_scope, load_layout, LAYOUT_KEY};

/// Shared handle to the storage service that holds layout records.
pub type SharedStorage = Rc<dyn ScopedValueStore<StorageScope>>;

/// Future resolving when a layout write has been acknowledged by the store.
pub type PersistFuture = LocalBoxFuture<'static, Result<(), StoreError>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PersistReason {
    Update,
    Exit,
}

/// Result of a layout change: the merged state, available immediately, and its pending write.
pub struct LayoutCommit {
    /// Layout after the change.
    pub state: LayoutState,
    /// Resolves once the store acknowledges the write.
    pub persisted: PersistFuture,
}

impl fmt::Debug for LayoutCommit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayoutCommit")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

/// Layout owner for one workspace.
///
/// Every change updates the in-memory layout before any I/O happens, then issues exactly one
/// write. Writes are stamped at issue time, so the stored record always reflects the last change
/// made here even when the returned futures are awaited out of order or not at all.
pub struct LayoutStateStore {
    storage: SharedStorage,
    workspace_id: WorkspaceId,
    scope: StorageScope,
    current: LayoutState,
}

impl fmt::Debug for LayoutStateStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayoutStateStore")
            .field("workspace_id", &self.workspace_id)
            .field("current", &self.current)
            .finish_non_exhaustive()
    }
}

impl LayoutStateStore {
    /// Loads the stored layout of `workspace_id` (or defaults) and takes ownership of it.
    ///
    /// # Errors
    ///
    /// Propagates load failures from [`load_layout`].
    pub async fn open(storage: SharedStorage, workspace_id: WorkspaceId) -> Result<Self, StoreError> {
        let current = load_layout(storage.as_ref(), &workspace_id).await?;
        Ok(Self::with_state(storage, workspace_id, current))
    }

    /// Wraps an already loaded layout.
    pub fn with_state(storage: SharedStorage, workspace_id: WorkspaceId, state: LayoutState) -> Self {
        let scope = layout_scope(&workspace_id);
        Self {
            storage,
            workspace_id,
            scope,
            current: state,
        }
    }

    /// Workspace this store belongs to.
    pub fn workspace_id(&self) -> &WorkspaceId {
        &self.workspace_id
    }

    /// Layout as of the last change.
    pub fn current(&self) -> &LayoutState {
        &self.current
    }

    /// Merges `update` into the current layout and issues its write.
    pub fn apply_update(&mut self, update: &LayoutUpdate) -> LayoutCommit {
        self.current = apply_update(&self.current, update);
        self.commit(PersistReason::Update)
    }

    /// Reduces `action` against the current layout.
    ///
    /// Returns `Ok(None)` when the action left the layout unchanged; no write is issued then.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError`] when the reducer rejects the action.
    pub fn dispatch(&mut self, action: LayoutAction) -> Result<Option<LayoutCommit>, LayoutError> {
        let effects = reduce_layout(&mut self.current, action)?;
        Ok(effects
            .contains(&LayoutEffect::PersistLayout)
            .then(|| self.commit(PersistReason::Update)))
    }

    /// Writes the current layout one last time before the window closes.
    pub fn flush_on_exit(&self) -> PersistFuture {
        self.issue_write(PersistReason::Exit)
    }

    /// Re-reads the stored record, replacing the in-memory layout.
    ///
    /// # Errors
    ///
    /// Propagates load failures; the in-memory layout is kept in that case.
    pub async fn reload(&mut self) -> Result<&LayoutState, StoreError> {
        self.current = load_layout(self.storage.as_ref(), &self.workspace_id).await?;
        Ok(&self.current)
    }

    fn commit(&self, reason: PersistReason) -> LayoutCommit {
        LayoutCommit {
            state: self.current.clone(),
            persisted: self.issue_write(reason),
        }
    }

    fn issue_write(&self, reason: PersistReason) -> PersistFuture {
        let sequence = WriteSequence::next();
        let record = layout_record(&self.current);
        let storage = Rc::clone(&self.storage);
        let scope = self.scope.clone();
        let workspace = self.workspace_id.clone();

        async move {
            let result = match record {
                Ok(record) => {
                    storage
                        .write_value(&scope, LAYOUT_KEY, record, sequence)
                        .await
                }
                Err(err) => Err(err),
            };
            match &result {
                Ok(()) => tracing::debug!(
                    workspace = %workspace,
                    sequence = sequence.get(),
                    on_exit = reason == PersistReason::Exit,
                    "layout persisted"
                ),
                Err(err) => tracing::warn!(
                    workspace = %workspace,
                    sequence = sequence.get(),
                    on_exit = reason == PersistReason::Exit,
                    error = %err,
                    "layout persist failed"
                ),
            }
            result
        }
        .boxed_local()
    }
}
