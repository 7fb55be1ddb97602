use std::rc::Rc;

use futures::executor::block_on;
use pretty_assertions::assert_eq;
use serde_json::json;
use workbench_host::{MemoryScopedStore, SettingScope, StorageScope, WorkspaceId};
use workbench_runtime::{
    load_layout, ActivityEvent, ActivityPhase, DropEdge, LayoutAction, LayoutState, LayoutUpdate,
    ProtocolViolation, WorkbenchSession, DEFAULT_BOTTOM_PANE_HEIGHT, DEFAULT_SIDEBAR_WIDTH,
};

fn open(
    storage: &MemoryScopedStore<StorageScope>,
    settings: &MemoryScopedStore<SettingScope>,
    workspace: &str,
) -> WorkbenchSession {
    block_on(WorkbenchSession::open(
        WorkspaceId::new(workspace).expect("workspace id"),
        Rc::new(storage.clone()),
        Rc::new(settings.clone()),
    ))
    .expect("open session")
}

#[test]
fn fresh_workspace_hides_sidebar_without_touching_other_parts() {
    let storage = MemoryScopedStore::default();
    let settings = MemoryScopedStore::default();
    let mut session = open(&storage, &settings, "w1");

    let initial = session.layout().clone();
    assert_eq!(initial, LayoutState::default());
    assert_eq!(initial.sidebar_state.preferred_size, DEFAULT_SIDEBAR_WIDTH);
    assert!(initial.sidebar_state.is_visible);
    assert_eq!(initial.bottom_panel_state.preferred_size, DEFAULT_BOTTOM_PANE_HEIGHT);
    assert!(!initial.bottom_panel_state.is_visible);
    assert!(initial.tabbed_pane_state.is_empty());

    let update: LayoutUpdate =
        serde_json::from_value(json!({"sidebarState": {"isVisible": false}})).expect("update");
    let commit = session.layout_store_mut().apply_update(&update);

    assert!(!commit.state.sidebar_state.is_visible);
    assert_eq!(
        commit.state.sidebar_state.preferred_size,
        initial.sidebar_state.preferred_size
    );
    assert_eq!(commit.state.bottom_panel_state, initial.bottom_panel_state);
    assert_eq!(commit.state.tabbed_pane_state, initial.tabbed_pane_state);
    assert_eq!(commit.state.activitybar_state, initial.activitybar_state);

    block_on(commit.persisted).expect("persist");
    let stored = block_on(load_layout(&storage, session.workspace_id())).expect("load");
    assert!(!stored.sidebar_state.is_visible);
}

#[test]
fn layout_survives_close_and_stays_in_its_workspace() {
    let storage = MemoryScopedStore::default();
    let settings = MemoryScopedStore::default();

    let mut first = open(&storage, &settings, "w1");
    let grid = json!({"panels": {"request-1": {"title": "GET /users"}}});
    let _ = first.layout_store_mut().apply_update(
        &serde_json::from_value(json!({"tabbedPaneState": {"gridState": grid}})).expect("update"),
    );
    let _ = first
        .layout_store_mut()
        .dispatch(LayoutAction::ReorderActivitybarItem {
            from_index: 0,
            to_index: 2,
            edge: Some(DropEdge::Bottom),
        })
        .expect("reorder");
    let expected = first.layout().clone();
    block_on(first.close()).expect("close");

    let reopened = open(&storage, &settings, "w1");
    assert_eq!(reopened.layout(), &expected);
    assert_eq!(reopened.layout().tabbed_pane_state.grid_state, grid);

    let elsewhere = open(&storage, &settings, "w2");
    assert_eq!(elsewhere.layout(), &LayoutState::default());
}

#[test]
fn activity_stream_drives_the_live_set() {
    let storage = MemoryScopedStore::default();
    let settings = MemoryScopedStore::default();
    let mut session = open(&storage, &settings, "w1");
    let router = session.activities_mut();

    for payload in [
        json!({"start": {"id": 1, "activityId": "import", "title": "Importing collection"}}),
        json!({"start": {"id": 2, "activityId": "sync", "title": "Syncing"}}),
        json!({"progress": {"id": 3, "activityId": "import", "detail": "12 of 40"}}),
        json!({"finish": {"id": 4, "activityId": "sync"}}),
    ] {
        router.dispatch_json(payload).expect("dispatch");
    }
    let active = router.list_active();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].activity_id, "import");
    assert_eq!(active[0].detail.as_deref(), Some("12 of 40"));
    assert_eq!(router.phase("sync"), ActivityPhase::Done);

    let orphan: ActivityEvent =
        serde_json::from_value(json!({"progress": {"id": 1, "activityId": "ghost"}}))
            .expect("event");
    assert!(matches!(
        router.dispatch(orphan),
        Err(ProtocolViolation::UnknownActivity { .. })
    ));
    assert!(router.get("ghost").is_none());
}
