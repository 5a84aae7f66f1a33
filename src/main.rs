//! Progress Bar Thread
//!
//! Main entry point for the GUI application.
//!
//! # Overview
//!
//! A window with Start/Stop buttons and a progress bar. Start launches a
//! step loop on a background worker; Stop asks it to halt at its next tick.
//! The binary initializes:
//! - Settings ([`ConfigManager`], optional `Progress Bar Thread Data/Settings.yaml`)
//! - Logging (daily rotating file + console output)
//! - Tokio runtime (the worker runs on its blocking pool)
//! - Run state ([`StateManager`]) and the [`RunController`]
//! - GUI controller ([`GuiController`] - wires the Slint window to the run controller)
//!
//! # Threading
//!
//! - **Main thread**: Runs the Slint event loop
//! - **Tokio blocking pool**: Runs the step loop, which sleeps between ticks
//! - **Tokio workers**: Fold task notifications into run state
//! - **State listener**: Background std::thread pushing state changes to the window

use anyhow::Result;
use camino::Utf8Path;
use progress_bar_thread::services::TaskRunner;
use progress_bar_thread::ui::GuiController;
use progress_bar_thread::{
    APP_NAME, CONFIG_DIR, ConfigManager, Metrics, RunController, StateManager, VERSION, logging,
};
use std::sync::Arc;
use std::time::Duration;

fn main() -> Result<()> {
    // Settings first: they decide the log level
    let config = ConfigManager::new(CONFIG_DIR).load_config()?;
    let settings = config.settings;

    let _log_guard = logging::setup_logging(
        Utf8Path::new("logs"),
        logging::LOG_PREFIX,
        settings.debug_mode,
        settings.console_logging,
    )?;

    tracing::info!("Starting {} v{}", APP_NAME, VERSION);
    tracing::debug!("Run settings: {:?}", settings);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .worker_threads(2)
        .thread_name("progress-worker")
        .build()?;

    let metrics = Arc::new(Metrics::new());
    let state_manager = StateManager::with_capacity(settings.event_buffer);
    let tick = settings.tick_interval();

    let controller = Arc::new(RunController::new(
        state_manager,
        TaskRunner::new(runtime.handle().clone()),
        settings,
        Arc::clone(&metrics),
    ));

    let gui_controller = GuiController::new(Arc::clone(&controller), Arc::clone(&metrics))?;

    tracing::info!("GUI controller initialized, launching window");

    // Blocks until the window is closed
    let result = gui_controller.run();

    tracing::info!("GUI closed, shutting down");

    // The close handler normally stopped the run already; this catches an
    // event loop that exited without a close request
    if controller.stop() {
        tracing::warn!("Event loop exited during a run - interrupting worker");
    }
    if controller.is_active() {
        // The loop polls once per tick
        std::thread::sleep(tick);
    }

    runtime.shutdown_timeout(Duration::from_secs(5));

    metrics.log_summary();
    tracing::info!("Application shutdown complete");

    result.map_err(|e| {
        tracing::error!("GUI error: {}", e);
        anyhow::anyhow!("GUI error: {}", e)
    })
}
