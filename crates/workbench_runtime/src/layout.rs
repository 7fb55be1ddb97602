//! Partial-update merge and the layout reducer.

use thiserror::Error;

use crate::model::{
    grid_state_is_empty, ActivitybarItem, ActivitybarState, ActivitybarStateUpdate,
    BottomPanelState, BottomPanelStateUpdate, LayoutState, LayoutUpdate, SidebarState,
    SidebarStateUpdate, TabbedPaneState,
};
use crate::reorder::{resequence_in_place, sort_by_order, try_reorder, DropEdge, ReorderError};

#[derive(Debug, Clone, PartialEq)]
/// Layout interactions reduced by [`reduce_layout`].
pub enum LayoutAction {
    /// Merge a partial update.
    ApplyUpdate(LayoutUpdate),
    /// Flip sidebar visibility.
    ToggleSidebar,
    /// Flip bottom panel visibility.
    ToggleBottomPanel,
    /// Sidebar drag ended at `size`; a size of zero or less hides the sidebar.
    ResizeSidebar {
        /// Dragged width.
        size: f64,
    },
    /// Bottom panel drag ended at `size`; a size of zero or less hides the panel.
    ResizeBottomPanel {
        /// Dragged height.
        size: f64,
    },
    /// Drop of an activity bar item onto another.
    ReorderActivitybarItem {
        /// Dragged item index.
        from_index: isize,
        /// Drop target index.
        to_index: isize,
        /// Drop edge; `None` swaps.
        edge: Option<DropEdge>,
    },
    /// Show or hide one activity bar item.
    SetActivitybarItemVisible {
        /// Item id.
        id: String,
        /// New visibility.
        visible: bool,
    },
    /// Select an activity bar container.
    SetActiveContainer {
        /// Item id.
        id: String,
    },
    /// Replace the whole layout with a state loaded from storage.
    Hydrate {
        /// Loaded layout.
        state: LayoutState,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Side effects requested by the reducer.
pub enum LayoutEffect {
    /// Persist the current layout.
    PersistLayout,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
/// Reducer failures.
pub enum LayoutError {
    /// The action named an activity bar item that does not exist.
    #[error("activity bar item `{0}` not found")]
    UnknownActivitybarItem(String),
    /// A reorder carried indices outside the item list.
    #[error(transparent)]
    Reorder(#[from] ReorderError),
}

fn merged_size(current: f64, requested: Option<f64>) -> f64 {
    match requested {
        Some(size) if size.is_finite() => size.max(0.0),
        _ => current,
    }
}

fn merge_sidebar(current: &SidebarState, update: &SidebarStateUpdate) -> SidebarState {
    SidebarState {
        preferred_size: merged_size(current.preferred_size, update.preferred_size),
        is_visible: update.is_visible.unwrap_or(current.is_visible),
        position: update.position.unwrap_or(current.position),
    }
}

fn merge_bottom_panel(
    current: &BottomPanelState,
    update: &BottomPanelStateUpdate,
) -> BottomPanelState {
    BottomPanelState {
        preferred_size: merged_size(current.preferred_size, update.preferred_size),
        is_visible: update.is_visible.unwrap_or(current.is_visible),
    }
}

fn normalized_items(items: &[ActivitybarItem]) -> Vec<ActivitybarItem> {
    let mut items = items.to_vec();
    sort_by_order(&mut items);
    resequence_in_place(&mut items);
    items
}

fn merge_activitybar(
    current: &ActivitybarState,
    update: &ActivitybarStateUpdate,
) -> ActivitybarState {
    ActivitybarState {
        position: update.position.unwrap_or(current.position),
        last_active_container_id: update
            .last_active_container_id
            .clone()
            .or_else(|| current.last_active_container_id.clone()),
        items: update
            .items
            .as_deref()
            .map_or_else(|| current.items.clone(), normalized_items),
    }
}

/// Merges `update` into `current` and returns the resulting layout.
///
/// Parts absent from the update are copied unchanged. Present fields overwrite. An empty editor
/// grid never replaces the current grid, so the last non-empty arrangement survives teardown.
/// Sizes are clamped to be non-negative and non-finite sizes are ignored. Merging the same update
/// twice yields the same state as merging it once.
pub fn apply_update(current: &LayoutState, update: &LayoutUpdate) -> LayoutState {
    let mut next = current.clone();
    if let Some(sidebar) = &update.sidebar_state {
        next.sidebar_state = merge_sidebar(&current.sidebar_state, sidebar);
    }
    if let Some(panel) = &update.bottom_panel_state {
        next.bottom_panel_state = merge_bottom_panel(&current.bottom_panel_state, panel);
    }
    if let Some(grid) = update
        .tabbed_pane_state
        .as_ref()
        .and_then(|pane| pane.grid_state.as_ref())
        .filter(|grid| !grid_state_is_empty(grid))
    {
        next.tabbed_pane_state = TabbedPaneState {
            grid_state: grid.clone(),
        };
    }
    if let Some(activitybar) = &update.activitybar_state {
        next.activitybar_state = merge_activitybar(&current.activitybar_state, activitybar);
    }
    next
}

fn require_item(state: &LayoutState, id: &str) -> Result<usize, LayoutError> {
    state
        .activitybar_state
        .index_of(id)
        .ok_or_else(|| LayoutError::UnknownActivitybarItem(id.to_string()))
}

fn resized(is_visible: bool, current: f64, size: f64) -> (bool, f64) {
    if !size.is_finite() {
        (is_visible, current)
    } else if size <= 0.0 {
        (false, current)
    } else {
        (is_visible, size)
    }
}

/// Applies `action` to `state`, returning the effects the host should run.
///
/// [`LayoutEffect::PersistLayout`] is emitted only when the state actually changed. Hydration
/// never requests persistence.
///
/// # Errors
///
/// Returns [`LayoutError`] for unknown item ids and out-of-bounds reorder indices; `state` is left
/// untouched in that case.
pub fn reduce_layout(
    state: &mut LayoutState,
    action: LayoutAction,
) -> Result<Vec<LayoutEffect>, LayoutError> {
    let next = match action {
        LayoutAction::ApplyUpdate(update) => apply_update(state, &update),
        LayoutAction::ToggleSidebar => {
            let mut next = state.clone();
            next.sidebar_state.is_visible = !next.sidebar_state.is_visible;
            next
        }
        LayoutAction::ToggleBottomPanel => {
            let mut next = state.clone();
            next.bottom_panel_state.is_visible = !next.bottom_panel_state.is_visible;
            next
        }
        LayoutAction::ResizeSidebar { size } => {
            let mut next = state.clone();
            let sidebar = &mut next.sidebar_state;
            (sidebar.is_visible, sidebar.preferred_size) =
                resized(sidebar.is_visible, sidebar.preferred_size, size);
            next
        }
        LayoutAction::ResizeBottomPanel { size } => {
            let mut next = state.clone();
            let panel = &mut next.bottom_panel_state;
            (panel.is_visible, panel.preferred_size) =
                resized(panel.is_visible, panel.preferred_size, size);
            next
        }
        LayoutAction::ReorderActivitybarItem {
            from_index,
            to_index,
            edge,
        } => {
            let mut next = state.clone();
            let mut items = try_reorder(&state.activitybar_state.items, from_index, to_index, edge)?;
            resequence_in_place(&mut items);
            next.activitybar_state.items = items;
            next
        }
        LayoutAction::SetActivitybarItemVisible { id, visible } => {
            let index = require_item(state, &id)?;
            let mut next = state.clone();
            next.activitybar_state.items[index].visible = visible;
            next
        }
        LayoutAction::SetActiveContainer { id } => {
            require_item(state, &id)?;
            let mut next = state.clone();
            next.activitybar_state.last_active_container_id = Some(id);
            next
        }
        LayoutAction::Hydrate { state: loaded } => {
            *state = loaded;
            return Ok(Vec::new());
        }
    };

    if next == *state {
        return Ok(Vec::new());
    }
    *state = next;
    Ok(vec![LayoutEffect::PersistLayout])
}
