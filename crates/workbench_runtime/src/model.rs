//! Serializable layout state for a workbench window and its partial-update shapes.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::reorder::Ordered;

/// Current schema version for persisted [`LayoutState`] records.
pub const LAYOUT_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
/// Edge of the window the sidebar is docked to.
pub enum SidebarPosition {
    #[default]
    /// Left edge.
    Left,
    /// Right edge.
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
/// Placement of the activity bar relative to the sidebar.
pub enum ActivitybarPosition {
    #[default]
    /// Vertical strip beside the sidebar.
    Default,
    /// Horizontal strip above the sidebar content.
    Top,
    /// Horizontal strip below the sidebar content.
    Bottom,
    /// Not rendered.
    Hidden,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Sidebar dimensions and visibility.
pub struct SidebarState {
    /// Preferred width in pixels.
    pub preferred_size: f64,
    /// Whether the sidebar is shown.
    pub is_visible: bool,
    #[serde(default)]
    /// Docking edge.
    pub position: SidebarPosition,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Bottom panel dimensions and visibility.
pub struct BottomPanelState {
    /// Preferred height in pixels.
    pub preferred_size: f64,
    /// Whether the panel is shown.
    pub is_visible: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Editor grid arrangement. The grid payload is opaque to the runtime.
pub struct TabbedPaneState {
    #[serde(default)]
    /// Serialized grid layout produced by the editor area.
    pub grid_state: Value,
}

impl TabbedPaneState {
    /// Returns `true` when the grid carries no arrangement.
    pub fn is_empty(&self) -> bool {
        grid_state_is_empty(&self.grid_state)
    }
}

/// Returns `true` for grid payloads that carry no arrangement: `null`, `""`, `{}`, `[]`, or an
/// object whose `panels` and `grid` members are both empty or missing.
pub fn grid_state_is_empty(grid: &Value) -> bool {
    match grid {
        Value::Null => true,
        Value::String(raw) => raw.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) if map.is_empty() => true,
        Value::Object(map) if map.contains_key("panels") || map.contains_key("grid") => {
            ["panels", "grid"]
                .iter()
                .all(|member| map.get(*member).map_or(true, grid_state_is_empty))
        }
        _ => false,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// One entry of the activity bar.
pub struct ActivitybarItem {
    /// Stable container id.
    pub id: String,
    /// Display order; contiguous from 1 after any reorder.
    pub order: i64,
    #[serde(default = "default_visible")]
    /// Whether the entry is shown.
    pub visible: bool,
}

fn default_visible() -> bool {
    true
}

impl ActivitybarItem {
    /// Creates a visible item at `order`.
    pub fn new(id: impl Into<String>, order: i64) -> Self {
        Self {
            id: id.into(),
            order,
            visible: true,
        }
    }
}

impl Ordered for ActivitybarItem {
    type Id = String;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn order(&self) -> i64 {
        self.order
    }

    fn set_order(&mut self, order: i64) {
        self.order = order;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Activity bar placement, selection, and item order.
pub struct ActivitybarState {
    #[serde(default)]
    /// Placement of the bar.
    pub position: ActivitybarPosition,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Container selected most recently.
    pub last_active_container_id: Option<String>,
    #[serde(default)]
    /// Items in display order.
    pub items: Vec<ActivitybarItem>,
}

impl ActivitybarState {
    /// Returns the index of the item with `id`.
    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.items.iter().position(|item| item.id == id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Full layout record for one workspace.
pub struct LayoutState {
    /// Sidebar part.
    pub sidebar_state: SidebarState,
    /// Bottom panel part.
    pub bottom_panel_state: BottomPanelState,
    #[serde(default)]
    /// Editor grid part.
    pub tabbed_pane_state: TabbedPaneState,
    #[serde(default)]
    /// Activity bar part.
    pub activitybar_state: ActivitybarState,
}

impl Default for LayoutState {
    fn default() -> Self {
        crate::config::workbench_defaults().default_layout()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Partial sidebar update. Absent fields keep their current value.
pub struct SidebarStateUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// New preferred width.
    pub preferred_size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// New visibility.
    pub is_visible: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// New docking edge.
    pub position: Option<SidebarPosition>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Partial bottom panel update.
pub struct BottomPanelStateUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// New preferred height.
    pub preferred_size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// New visibility.
    pub is_visible: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Partial editor grid update. Empty grids are ignored on merge.
pub struct TabbedPaneStateUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Replacement grid payload.
    pub grid_state: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Partial activity bar update.
pub struct ActivitybarStateUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// New placement.
    pub position: Option<ActivitybarPosition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// New selected container.
    pub last_active_container_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Replacement item list; orders are resequenced on merge.
    pub items: Option<Vec<ActivitybarItem>>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Partial layout update. Each absent part is left untouched by a merge.
pub struct LayoutUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Sidebar changes.
    pub sidebar_state: Option<SidebarStateUpdate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Bottom panel changes.
    pub bottom_panel_state: Option<BottomPanelStateUpdate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Editor grid changes.
    pub tabbed_pane_state: Option<TabbedPaneStateUpdate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Activity bar changes.
    pub activitybar_state: Option<ActivitybarStateUpdate>,
}

impl LayoutUpdate {
    /// Returns `true` when the update names no part.
    pub fn is_empty(&self) -> bool {
        self.sidebar_state.is_none()
            && self.bottom_panel_state.is_none()
            && self.tabbed_pane_state.is_none()
            && self.activitybar_state.is_none()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn layout_state_uses_camel_case_wire_names() {
        let value = serde_json::to_value(LayoutState::default()).expect("serialize");
        assert_eq!(value["sidebarState"]["preferredSize"], json!(200.0));
        assert_eq!(value["sidebarState"]["isVisible"], json!(true));
        assert_eq!(value["sidebarState"]["position"], json!("left"));
        assert_eq!(value["bottomPanelState"]["isVisible"], json!(false));
        assert_eq!(value["activitybarState"]["position"], json!("default"));
    }

    #[test]
    fn partial_update_decodes_only_named_fields() {
        let update: LayoutUpdate =
            serde_json::from_value(json!({"sidebarState": {"isVisible": false}}))
                .expect("deserialize");
        assert_eq!(
            update,
            LayoutUpdate {
                sidebar_state: Some(SidebarStateUpdate {
                    is_visible: Some(false),
                    ..SidebarStateUpdate::default()
                }),
                ..LayoutUpdate::default()
            }
        );
        assert!(!update.is_empty());
        assert!(LayoutUpdate::default().is_empty());
    }

    #[test]
    fn grid_emptiness_covers_null_and_empty_containers() {
        assert!(grid_state_is_empty(&Value::Null));
        assert!(grid_state_is_empty(&json!({})));
        assert!(grid_state_is_empty(&json!([])));
        assert!(grid_state_is_empty(&json!("")));
        assert!(grid_state_is_empty(&json!({"grid": null, "panels": {}})));
        assert!(!grid_state_is_empty(&json!({"panels": {"a": {}}})));
        assert!(!grid_state_is_empty(&json!({"orientation": 0})));
        assert!(TabbedPaneState::default().is_empty());
    }

    #[test]
    fn activitybar_item_visibility_defaults_to_true() {
        let item: ActivitybarItem =
            serde_json::from_value(json!({"id": "a", "order": 2})).expect("deserialize");
        assert_eq!(item, ActivitybarItem::new("a", 2));
    }
}
