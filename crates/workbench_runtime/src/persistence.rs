//! Layout persistence over the shared storage service.

use serde_json::Value;
use workbench_host::{
    build_value_envelope, load_envelope_with_migration, migrate_envelope_payload,
    ScopedValueStore, StorageScope, StoreError, ValueEnvelope, WorkspaceId,
};

use crate::config::workbench_defaults;
use crate::model::{ActivitybarItem, LayoutState, LAYOUT_SCHEMA_VERSION};
use crate::reorder::{resequence_in_place, sort_by_order};

/// Storage key of the layout record within a workspace scope.
pub const LAYOUT_KEY: &str = "layout";
/// Envelope namespace for layout records.
pub const LAYOUT_NAMESPACE: &str = "workbench.layout";

/// Storage scope that owns the layout record of `workspace_id`.
pub fn layout_scope(workspace_id: &WorkspaceId) -> StorageScope {
    StorageScope::for_workspace(workspace_id.clone())
}

/// Serializes `state` into a versioned layout record.
///
/// # Errors
///
/// Returns [`StoreError::Serialize`] when the state cannot be encoded.
pub fn layout_record(state: &LayoutState) -> Result<Value, StoreError> {
    let envelope = build_value_envelope(LAYOUT_NAMESPACE, LAYOUT_SCHEMA_VERSION, state)?;
    serde_json::to_value(&envelope).map_err(|err| StoreError::Serialize {
        key: LAYOUT_KEY.to_string(),
        message: err.to_string(),
    })
}

fn migrate_layout(
    schema_version: u32,
    envelope: &ValueEnvelope,
) -> Result<Option<LayoutState>, StoreError> {
    match schema_version {
        0 => migrate_envelope_payload(envelope).map(Some),
        _ => {
            tracing::warn!(
                schema_version,
                expected = LAYOUT_SCHEMA_VERSION,
                "unsupported layout schema; using defaults"
            );
            Ok(None)
        }
    }
}

/// Aligns stored activity bar items with the configured item set.
///
/// Stored items keep their relative order and visibility, items no longer configured are dropped,
/// and newly configured items are appended. Orders come out contiguous from 1.
pub fn reconcile_activitybar_items(
    stored: &[ActivitybarItem],
    configured: &[ActivitybarItem],
) -> Vec<ActivitybarItem> {
    let mut items = stored
        .iter()
        .filter(|item| configured.iter().any(|known| known.id == item.id))
        .cloned()
        .collect::<Vec<_>>();
    sort_by_order(&mut items);
    for known in configured {
        if !items.iter().any(|item| item.id == known.id) {
            items.push(known.clone());
        }
    }
    resequence_in_place(&mut items);
    items
}

fn normalize_loaded(mut state: LayoutState) -> LayoutState {
    let configured = workbench_defaults().default_activitybar_items();
    let activitybar = &mut state.activitybar_state;
    activitybar.items = reconcile_activitybar_items(&activitybar.items, &configured);
    if let Some(active) = &activitybar.last_active_container_id {
        if activitybar.index_of(active).is_none() {
            activitybar.last_active_container_id = None;
        }
    }
    state
}

/// Loads the layout record of `workspace_id`, falling back to defaults.
///
/// Missing records and records with an unsupported schema resolve to the default layout. Bare
/// payloads written before records were enveloped are read as schema 0.
///
/// # Errors
///
/// Propagates store failures and decode errors for records at the current schema.
pub async fn load_layout<St>(store: &St, workspace_id: &WorkspaceId) -> Result<LayoutState, StoreError>
where
    St: ScopedValueStore<StorageScope> + ?Sized,
{
    let scope = layout_scope(workspace_id);
    let loaded =
        load_envelope_with_migration(store, &scope, LAYOUT_KEY, LAYOUT_SCHEMA_VERSION, migrate_layout)
            .await?;
    match loaded {
        Some(state) => Ok(normalize_loaded(state)),
        None => {
            tracing::debug!(workspace = %workspace_id, "no stored layout; using defaults");
            Ok(LayoutState::default())
        }
    }
}
