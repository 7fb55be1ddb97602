//! One open workbench window: its layout store, activity router, and settings view.

use std::rc::Rc;

use serde_json::Value;
use workbench_host::{
    batch_get_with_defaults, ScopedValueStore, SettingScope, StorageScope, StoreError,
    WorkspaceId,
};

use crate::activity::ActivityRouter;
use crate::layout_store::{LayoutStateStore, SharedStorage};
use crate::model::LayoutState;

/// Shared handle to the settings service.
pub type SharedSettings = Rc<dyn ScopedValueStore<SettingScope>>;

/// Session state for a workspace window.
pub struct WorkbenchSession {
    workspace_id: WorkspaceId,
    layout: LayoutStateStore,
    activities: ActivityRouter,
    storage: SharedStorage,
    settings: SharedSettings,
}

impl std::fmt::Debug for WorkbenchSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkbenchSession")
            .field("workspace_id", &self.workspace_id)
            .field("layout", &self.layout)
            .field("activities", &self.activities)
            .finish_non_exhaustive()
    }
}

impl WorkbenchSession {
    /// Opens a session, loading the workspace layout from `storage`.
    ///
    /// # Errors
    ///
    /// Propagates layout load failures.
    pub async fn open(
        workspace_id: WorkspaceId,
        storage: SharedStorage,
        settings: SharedSettings,
    ) -> Result<Self, StoreError> {
        let layout = LayoutStateStore::open(Rc::clone(&storage), workspace_id.clone()).await?;
        tracing::info!(workspace = %workspace_id, "workbench session opened");
        Ok(Self {
            workspace_id,
            layout,
            activities: ActivityRouter::new(),
            storage,
            settings,
        })
    }

    /// Workspace the session belongs to.
    pub fn workspace_id(&self) -> &WorkspaceId {
        &self.workspace_id
    }

    /// Current layout.
    pub fn layout(&self) -> &LayoutState {
        self.layout.current()
    }

    /// Layout store.
    pub fn layout_store(&self) -> &LayoutStateStore {
        &self.layout
    }

    /// Mutable layout store.
    pub fn layout_store_mut(&mut self) -> &mut LayoutStateStore {
        &mut self.layout
    }

    /// Activity router.
    pub fn activities(&self) -> &ActivityRouter {
        &self.activities
    }

    /// Mutable activity router.
    pub fn activities_mut(&mut self) -> &mut ActivityRouter {
        &mut self.activities
    }

    fn workspace_settings_scope(&self) -> SettingScope {
        SettingScope::for_workspace(self.workspace_id.clone())
    }

    /// Reads a workspace setting, falling back to `default`. User settings are not consulted.
    ///
    /// # Errors
    ///
    /// Propagates settings store failures.
    pub async fn workspace_setting(&self, key: &str, default: Value) -> Result<Value, StoreError> {
        Ok(self
            .settings
            .get_value(&self.workspace_settings_scope(), key)
            .await?
            .unwrap_or(default))
    }

    /// Reads a user setting, falling back to `default`.
    ///
    /// # Errors
    ///
    /// Propagates settings store failures.
    pub async fn user_setting(&self, key: &str, default: Value) -> Result<Value, StoreError> {
        Ok(self
            .settings
            .get_value(&SettingScope::user(), key)
            .await?
            .unwrap_or(default))
    }

    /// Reads several workspace settings in one round-trip, each with its own default.
    ///
    /// # Errors
    ///
    /// Propagates settings store failures.
    pub async fn workspace_settings(
        &self,
        entries: &[(&str, Value)],
    ) -> Result<std::collections::BTreeMap<String, Value>, StoreError> {
        batch_get_with_defaults(
            self.settings.as_ref(),
            &self.workspace_settings_scope(),
            entries,
        )
        .await
    }

    /// Stores a workspace setting.
    ///
    /// # Errors
    ///
    /// Propagates settings store failures.
    pub async fn update_workspace_setting(&self, key: &str, value: Value) -> Result<(), StoreError> {
        self.settings
            .update_value(&self.workspace_settings_scope(), key, value)
            .await
    }

    /// Reads a value from the workspace partition of shared storage.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    pub async fn workspace_storage_value(&self, key: &str) -> Result<Option<Value>, StoreError> {
        self.storage
            .get_value(&StorageScope::for_workspace(self.workspace_id.clone()), key)
            .await
    }

    /// Flushes the layout and ends the session. Live activities are discarded.
    ///
    /// # Errors
    ///
    /// Returns the error of the final layout write.
    pub async fn close(self) -> Result<(), StoreError> {
        let Self {
            workspace_id,
            layout,
            mut activities,
            ..
        } = self;
        activities.clear();
        let result = layout.flush_on_exit().await;
        tracing::info!(workspace = %workspace_id, ok = result.is_ok(), "workbench session closed");
        result
    }
}

#[cfg(test)]
mod tests {
    use futures::executor::block_on;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use workbench_host::MemoryScopedStore;

    use super::*;

    fn open_session(
        storage: &MemoryScopedStore<StorageScope>,
        settings: &MemoryScopedStore<SettingScope>,
        workspace: &str,
    ) -> WorkbenchSession {
        block_on(WorkbenchSession::open(
            WorkspaceId::trusted(workspace),
            Rc::new(storage.clone()),
            Rc::new(settings.clone()),
        ))
        .expect("open session")
    }

    #[test]
    fn workspace_settings_ignore_user_values() {
        let storage = MemoryScopedStore::default();
        let settings = MemoryScopedStore::<SettingScope>::default();
        block_on(settings.update_value(&SettingScope::user(), "theme", json!("dark")))
            .expect("user put");
        let session = open_session(&storage, &settings, "w1");

        assert_eq!(
            block_on(session.workspace_setting("theme", json!("light"))).expect("get"),
            json!("light")
        );
        assert_eq!(
            block_on(session.user_setting("theme", json!("light"))).expect("get"),
            json!("dark")
        );

        block_on(session.update_workspace_setting("theme", json!("solarized"))).expect("put");
        let values = block_on(session.workspace_settings(&[
            ("theme", json!("light")),
            ("fontSize", json!(13)),
        ]))
        .expect("batch");
        assert_eq!(values.get("theme"), Some(&json!("solarized")));
        assert_eq!(values.get("fontSize"), Some(&json!(13)));
    }

    #[test]
    fn close_flushes_layout_for_the_next_session() {
        let storage = MemoryScopedStore::default();
        let settings = MemoryScopedStore::default();
        let mut session = open_session(&storage, &settings, "w1");
        let _pending = session
            .layout_store_mut()
            .dispatch(crate::layout::LayoutAction::ToggleBottomPanel)
            .expect("toggle");
        assert!(block_on(session.workspace_storage_value(crate::persistence::LAYOUT_KEY))
            .expect("read")
            .is_none());

        block_on(session.close()).expect("close");
        let reopened = open_session(&storage, &settings, "w1");
        assert!(reopened.layout().bottom_panel_state.is_visible);

        let other = open_session(&storage, &settings, "w2");
        assert!(!other.layout().bottom_panel_state.is_visible);
    }
}
