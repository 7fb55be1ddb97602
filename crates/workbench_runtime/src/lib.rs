pub mod activity;
pub mod config;
pub mod layout;
pub mod layout_store;
pub mod model;
pub mod persistence;
pub mod reorder;
pub mod session;

pub use activity::{
    ActivityEvent, ActivityLocation, ActivityPhase, ActivityRecord, ActivityRouter,
    ActivityTransition, FinishEvent, OneshotEvent, ProgressEvent, ProtocolViolation, RouterError,
    StartEvent, Subscription,
};
pub use config::{
    workbench_defaults, ActivityLimits, ConfigError, WorkbenchDefaults,
    DEFAULT_BOTTOM_PANE_HEIGHT, DEFAULT_SIDEBAR_WIDTH,
};
pub use layout::{apply_update, reduce_layout, LayoutAction, LayoutEffect, LayoutError};
pub use layout_store::{LayoutCommit, LayoutStateStore, PersistFuture, SharedStorage};
pub use model::*;
pub use persistence::{layout_record, layout_scope, load_layout, LAYOUT_KEY};
pub use reorder::{
    changed_orders, move_between, position_of, reorder, resequence, sort_by_order, try_reorder,
    DropEdge, Ordered, ReorderError, NOT_FOUND,
};
pub use session::{SharedSettings, WorkbenchSession};
