//! Data models for the Progress Bar Thread application.
//!
//! - [`RunState`]: the controller's run state (`step`, `active`, `interrupt`, `progress`)
//! - [`AppConfig`] / [`RunSettings`]: settings loaded from `Settings.yaml`
//!
//! `RunState` is never shared raw between threads; [`StateManager`](crate::state::StateManager)
//! wraps it in `Arc<RwLock<>>` and emits change events on every mutation.

pub mod app_state;
pub mod config;

pub use app_state::RunState;
pub use self::config::{AppConfig, ConfigError, RunSettings};
