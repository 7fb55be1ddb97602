//! Workbench defaults loaded from `workbench.defaults.toml`.
//!
//! The build script validates the bundled file and embeds it as JSON; [`workbench_defaults`]
//! parses that snapshot once. [`WorkbenchDefaults::from_toml_str`] applies the same checks to
//! host-provided overrides at runtime.

use std::collections::BTreeSet;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{
    ActivitybarItem, ActivitybarPosition, ActivitybarState, BottomPanelState, LayoutState,
    SidebarPosition, SidebarState, TabbedPaneState,
};

include!(concat!(env!("OUT_DIR"), "/workbench_defaults_generated.rs"));

const DEFAULTS_SCHEMA_VERSION: u32 = 1;

/// Errors raised while loading workbench defaults.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The document is not valid TOML or does not match the defaults shape.
    #[error("failed to parse workbench defaults: {0}")]
    Parse(String),
    /// The document declares a schema this build cannot read.
    #[error("unsupported workbench defaults schema {0}")]
    UnsupportedSchema(u32),
    /// A part size is negative or not finite.
    #[error("invalid {part} preferred_size {size}")]
    InvalidSize {
        /// Part name.
        part: &'static str,
        /// Offending value, formatted.
        size: String,
    },
    /// An activity bar item id is blank.
    #[error("activity bar item ids must not be empty")]
    EmptyItemId,
    /// Two activity bar items share an id.
    #[error("duplicate activity bar item `{0}`")]
    DuplicateItem(String),
    /// The selected container is not one of the items.
    #[error("last active container `{0}` is not an activity bar item")]
    UnknownActiveContainer(String),
    /// Activity limits must be positive.
    #[error("activity limits must be positive")]
    InvalidActivityLimits,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Sidebar defaults.
pub struct SidebarDefaults {
    /// Width in pixels.
    pub preferred_size: f64,
    /// Initial visibility.
    pub is_visible: bool,
    #[serde(default)]
    /// Docking edge.
    pub position: SidebarPosition,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Bottom panel defaults.
pub struct BottomPanelDefaults {
    /// Height in pixels.
    pub preferred_size: f64,
    /// Initial visibility.
    pub is_visible: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// One default activity bar entry; order follows declaration order.
pub struct ActivitybarItemDefaults {
    /// Container id.
    pub id: String,
    #[serde(default = "default_true")]
    /// Initial visibility.
    pub visible: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Activity bar defaults.
pub struct ActivitybarDefaults {
    #[serde(default)]
    /// Placement.
    pub position: ActivitybarPosition,
    #[serde(default)]
    /// Initially selected container.
    pub last_active_container_id: Option<String>,
    /// Entries in display order.
    pub items: Vec<ActivitybarItemDefaults>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
/// Bounds for the activity router's retained history.
pub struct ActivityLimits {
    /// Maximum number of applied events kept in history.
    pub max_history: usize,
    /// Maximum number of undismissed oneshot notifications kept.
    pub max_recent_oneshots: usize,
}

impl Default for ActivityLimits {
    fn default() -> Self {
        workbench_defaults().activity
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Validated workbench defaults document.
pub struct WorkbenchDefaults {
    /// Defaults document schema.
    pub schema_version: u32,
    /// Sidebar defaults.
    pub sidebar: SidebarDefaults,
    /// Bottom panel defaults.
    pub bottom_panel: BottomPanelDefaults,
    /// Activity bar defaults.
    pub activitybar: ActivitybarDefaults,
    /// Activity router limits.
    pub activity: ActivityLimits,
}

impl WorkbenchDefaults {
    /// Parses and validates a defaults document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the document does not parse or fails validation.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let defaults: Self =
            toml::from_str(raw).map_err(|err| ConfigError::Parse(err.to_string()))?;
        defaults.validate()?;
        Ok(defaults)
    }

    /// Checks schema, sizes, item ids, and limits.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.schema_version != DEFAULTS_SCHEMA_VERSION {
            return Err(ConfigError::UnsupportedSchema(self.schema_version));
        }
        for (part, size) in [
            ("sidebar", self.sidebar.preferred_size),
            ("bottom_panel", self.bottom_panel.preferred_size),
        ] {
            if !size.is_finite() || size < 0.0 {
                return Err(ConfigError::InvalidSize {
                    part,
                    size: size.to_string(),
                });
            }
        }

        let mut seen = BTreeSet::new();
        for item in &self.activitybar.items {
            if item.id.trim().is_empty() {
                return Err(ConfigError::EmptyItemId);
            }
            if !seen.insert(item.id.as_str()) {
                return Err(ConfigError::DuplicateItem(item.id.clone()));
            }
        }
        if let Some(active) = &self.activitybar.last_active_container_id {
            if !seen.contains(active.as_str()) {
                return Err(ConfigError::UnknownActiveContainer(active.clone()));
            }
        }
        if self.activity.max_history == 0 || self.activity.max_recent_oneshots == 0 {
            return Err(ConfigError::InvalidActivityLimits);
        }
        Ok(())
    }

    /// Default activity bar items ordered from 1 in declaration order.
    pub fn default_activitybar_items(&self) -> Vec<ActivitybarItem> {
        self.activitybar
            .items
            .iter()
            .zip(1_i64..)
            .map(|(item, order)| ActivitybarItem {
                id: item.id.clone(),
                order,
                visible: item.visible,
            })
            .collect()
    }

    /// Layout used when a workspace has no persisted record.
    pub fn default_layout(&self) -> LayoutState {
        LayoutState {
            sidebar_state: SidebarState {
                preferred_size: self.sidebar.preferred_size,
                is_visible: self.sidebar.is_visible,
                position: self.sidebar.position,
            },
            bottom_panel_state: BottomPanelState {
                preferred_size: self.bottom_panel.preferred_size,
                is_visible: self.bottom_panel.is_visible,
            },
            tabbed_pane_state: TabbedPaneState::default(),
            activitybar_state: ActivitybarState {
                position: self.activitybar.position,
                last_active_container_id: self.activitybar.last_active_container_id.clone(),
                items: self.default_activitybar_items(),
            },
        }
    }
}

/// Returns the bundled defaults, parsed once per process.
pub fn workbench_defaults() -> &'static WorkbenchDefaults {
    static DEFAULTS: OnceLock<WorkbenchDefaults> = OnceLock::new();
    DEFAULTS.get_or_init(|| {
        serde_json::from_str(WORKBENCH_DEFAULTS_JSON)
            .expect("generated workbench defaults should parse")
    })
}
