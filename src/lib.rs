// Progress Bar Thread - a progress bar advanced by a cancellable background worker
//
// This is the library crate containing the run lifecycle and its plumbing.
// The binary crate (main.rs) provides the GUI entry point.

pub mod config;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod services;
pub mod state;
pub mod ui;

// Re-export commonly used types for convenience
pub use self::config::ConfigManager;
pub use metrics::Metrics;
pub use models::{AppConfig, RunSettings, RunState};
pub use services::{RunController, Task, TaskEvent, TaskRunner};
pub use state::{StateChange, StateManager};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");

/// Directory holding `Settings.yaml`
pub const CONFIG_DIR: &str = "Progress Bar Thread Data";
