use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SidebarDefaults {
    preferred_size: f64,
    is_visible: bool,
    #[serde(default = "default_sidebar_position")]
    position: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct BottomPanelDefaults {
    preferred_size: f64,
    is_visible: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ActivitybarItemDefaults {
    id: String,
    #[serde(default = "default_true")]
    visible: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ActivitybarDefaults {
    #[serde(default = "default_activitybar_position")]
    position: String,
    #[serde(default)]
    last_active_container_id: Option<String>,
    items: Vec<ActivitybarItemDefaults>,
}

// Mirrors the serde defaults of the runtime `WorkbenchDefaults`.
fn default_true() -> bool {
    true
}

fn default_sidebar_position() -> String {
    "left".to_string()
}

fn default_activitybar_position() -> String {
    "default".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ActivityLimits {
    max_history: usize,
    max_recent_oneshots: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WorkbenchDefaults {
    schema_version: u32,
    sidebar: SidebarDefaults,
    bottom_panel: BottomPanelDefaults,
    activitybar: ActivitybarDefaults,
    activity: ActivityLimits,
}

fn validate(path: &str, defaults: &WorkbenchDefaults) {
    if defaults.schema_version != 1 {
        panic!(
            "defaults schema mismatch in {path}: expected 1 found {}",
            defaults.schema_version
        );
    }
    for (part, size) in [
        ("sidebar", defaults.sidebar.preferred_size),
        ("bottom_panel", defaults.bottom_panel.preferred_size),
    ] {
        if !size.is_finite() || size < 0.0 {
            panic!("invalid {part} preferred_size in {path}: {size}");
        }
    }
    if !["left", "right"].contains(&defaults.sidebar.position.as_str()) {
        panic!(
            "invalid sidebar position in {path}: {}",
            defaults.sidebar.position
        );
    }
    if !["default", "top", "bottom", "hidden"].contains(&defaults.activitybar.position.as_str()) {
        panic!(
            "invalid activity bar position in {path}: {}",
            defaults.activitybar.position
        );
    }

    let mut seen = BTreeSet::new();
    for item in &defaults.activitybar.items {
        if item.id.trim().is_empty() {
            panic!("activity bar item with empty id in {path}");
        }
        if !seen.insert(item.id.as_str()) {
            panic!("duplicate activity bar item `{}` in {path}", item.id);
        }
    }
    if let Some(active) = &defaults.activitybar.last_active_container_id {
        if !seen.contains(active.as_str()) {
            panic!("last active container `{active}` in {path} is not an activity bar item");
        }
    }
    if defaults.activity.max_history == 0 || defaults.activity.max_recent_oneshots == 0 {
        panic!("activity limits in {path} must be positive");
    }
}

fn main() {
    let crate_root = PathBuf::from(std::env::var("CARGO_MANIFEST_DIR").expect("manifest dir"));
    let path = crate_root.join("workbench.defaults.toml");
    println!("cargo:rerun-if-changed={}", path.display());

    let raw = fs::read_to_string(&path)
        .unwrap_or_else(|err| panic!("failed to read {}: {err}", path.display()));
    let defaults: WorkbenchDefaults = toml::from_str(&raw)
        .unwrap_or_else(|err| panic!("failed to parse {}: {err}", path.display()));
    validate(&path.display().to_string(), &defaults);

    let json = serde_json::to_string_pretty(&defaults).expect("serialize workbench defaults");
    let generated = format!(
        "/// Build-time generated workbench defaults JSON.\n\
pub const WORKBENCH_DEFAULTS_JSON: &str = r##\"{json}\"##;\n\
/// Default sidebar width in pixels.\n\
pub const DEFAULT_SIDEBAR_WIDTH: f64 = {:?};\n\
/// Default bottom panel height in pixels.\n\
pub const DEFAULT_BOTTOM_PANE_HEIGHT: f64 = {:?};\n",
        defaults.sidebar.preferred_size, defaults.bottom_panel.preferred_size,
    );

    let out_dir = PathBuf::from(std::env::var("OUT_DIR").expect("OUT_DIR"));
    let out_file = out_dir.join("workbench_defaults_generated.rs");
    fs::write(&out_file, generated)
        .unwrap_or_else(|err| panic!("failed to write {}: {err}", out_file.display()));
}
