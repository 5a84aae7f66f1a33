// GUI Controller - Bridges the Slint window with the run controller
//
// Start/Stop button presses call RunController on the UI thread. Run state
// changes arrive on a subscription thread and are pushed to the window through
// the EventLoopBridge.

use crate::metrics::Metrics;
use crate::services::RunController;
use crate::state::{StateChange, StateManager};
use crate::ui::bridge::EventLoopBridge;
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::sync::broadcast;

// Include the generated Slint code
slint::include_modules!();

/// Capacity of the bridge's UI update queue
const UI_UPDATE_CAPACITY: usize = 100;

/// Wires the "Progress Bar Thread" window to a [`RunController`]
///
/// # Example
/// ```ignore
/// let controller = Arc::new(RunController::new(state, runner, settings, metrics.clone()));
/// let gui = GuiController::new(controller, metrics)?;
/// gui.run()?; // Blocks until the window is closed
/// ```
pub struct GuiController {
    ui: MainWindow,

    /// Kept alive for the lifetime of the window
    _bridge: EventLoopBridge<MainWindow>,
}

impl GuiController {
    /// Create the window and connect it to `controller`
    pub fn new(controller: Arc<RunController>, metrics: Arc<Metrics>) -> Result<Self> {
        let ui = MainWindow::new().context("Failed to create Slint UI")?;

        let bridge = EventLoopBridge::new(&ui, UI_UPDATE_CAPACITY, metrics);

        Self::sync_ui_with_state(&ui, controller.state());
        Self::setup_callbacks(&ui, &controller);
        Self::setup_state_subscription(&bridge, controller.state());

        tracing::info!("GUI controller initialized");

        Ok(Self {
            ui,
            _bridge: bridge,
        })
    }

    /// Run the GUI (blocks until window is closed)
    pub fn run(self) -> Result<(), slint::PlatformError> {
        tracing::info!("Starting GUI event loop");
        self.ui.run()
    }

    fn sync_ui_with_state(ui: &MainWindow, state_manager: &StateManager) {
        ui.set_progress_value(state_manager.read(|s| s.progress));
    }

    fn setup_callbacks(ui: &MainWindow, controller: &Arc<RunController>) {
        let run = Arc::clone(controller);
        ui.on_start_run(move || {
            tracing::debug!("Start button pressed");
            run.start();
        });

        let run = Arc::clone(controller);
        ui.on_stop_run(move || {
            tracing::debug!("Stop button pressed");
            run.stop();
        });

        // Closing mid-run interrupts the worker instead of leaving it orphaned
        let run = Arc::clone(controller);
        ui.window().on_close_requested(move || {
            if run.stop() {
                tracing::info!("Window closed during a run - interrupt requested");
            }
            slint::CloseRequestResponse::HideWindow
        });

        tracing::debug!("UI callbacks configured");
    }

    /// Forward run state changes to the window from a background thread
    fn setup_state_subscription(bridge: &EventLoopBridge<MainWindow>, state_manager: &StateManager) {
        let bridge = bridge.clone();
        let mut rx = state_manager.subscribe();

        std::thread::spawn(move || {
            tracing::debug!("State subscription thread started");

            loop {
                match rx.blocking_recv() {
                    Ok(change) => {
                        tracing::trace!("State change received: {:?}", change);

                        if let Some(percent) = displayed_progress(&change) {
                            bridge.update_ui(move |ui| ui.set_progress_value(percent));
                        }
                        if let StateChange::RunFinished { interrupted, step } = change {
                            tracing::debug!("Run finished (interrupted: {}, step: {})", interrupted, step);
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        tracing::info!("State broadcast channel closed - stopping subscription");
                        break;
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        // Only the latest percentage matters; the next event catches up
                        tracing::warn!("State subscription lagged - {} events skipped", skipped);
                    }
                }
            }

            tracing::debug!("State subscription thread terminated");
        });
    }
}

/// Percentage the progress bar should show after `change`, if it moves
fn displayed_progress(change: &StateChange) -> Option<i32> {
    match change {
        StateChange::ProgressUpdated { percent } => Some(*percent),
        _ => None,
    }
}
