use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Errors raised when settings are out of range
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("total_steps must be at least 2, got {0}")]
    TooFewSteps(u32),

    #[error("event_buffer must be greater than zero")]
    EmptyEventBuffer,
}

/// Application configuration from `Settings.yaml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub settings: RunSettings,
}

/// Tunables for the step loop and the ambient stack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSettings {
    /// Number of loop iterations in a full run
    #[serde(default = "default_total_steps")]
    pub total_steps: u32,

    /// Sleep between iterations; also the cancellation latency bound
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Capacity of the task and state broadcast channels
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,

    /// Reset `step` to 0 after an interrupted run too
    #[serde(default)]
    pub reset_step_on_interrupt: bool,

    #[serde(default)]
    pub debug_mode: bool,

    #[serde(default = "default_console_logging")]
    pub console_logging: bool,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            total_steps: default_total_steps(),
            tick_interval_ms: default_tick_interval_ms(),
            event_buffer: default_event_buffer(),
            reset_step_on_interrupt: false,
            debug_mode: false,
            console_logging: default_console_logging(),
        }
    }
}

impl RunSettings {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Check that the loop can produce a sensible percentage sequence.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.total_steps < 2 {
            return Err(ConfigError::TooFewSteps(self.total_steps));
        }
        if self.event_buffer == 0 {
            return Err(ConfigError::EmptyEventBuffer);
        }
        Ok(())
    }
}

fn default_total_steps() -> u32 {
    20
}

fn default_tick_interval_ms() -> u64 {
    250
}

fn default_event_buffer() -> usize {
    100
}

fn default_console_logging() -> bool {
    true
}
