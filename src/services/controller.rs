// Run controller - owns the run lifecycle independent of any GUI toolkit
//
// Start/Stop requests come in from the UI thread; task notifications come back
// on a tokio listener task and are folded into the StateManager, whose change
// events the GUI renders.

use crate::metrics::Metrics;
use crate::models::RunSettings;
use crate::services::step_loop::StepLoop;
use crate::services::task::{Task, TaskEvent, TaskRunner};
use crate::state::StateManager;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{broadcast, watch};

/// Starts and stops the step loop, one run at a time.
///
/// States: `Idle` (active=false) → `Running` (active=true) → `Idle`.
/// A stop request sets `interrupt` and sends `true` on the run's cancel
/// channel; the loop notices at its next iteration, so the latency is one
/// tick interval.
///
/// # Example
/// ```ignore
/// let controller = RunController::new(state, TaskRunner::new(handle), settings, metrics);
/// controller.start(); // true
/// controller.start(); // false, already running
/// controller.stop();  // true, loop exits within one tick
/// ```
pub struct RunController {
    state: StateManager,
    runner: TaskRunner,
    settings: RunSettings,
    metrics: Arc<Metrics>,

    /// Cancellation sender of the active run. The mutex also serializes start,
    /// stop and completion so `active`/`interrupt` and the channel never disagree.
    cancel_tx: Arc<Mutex<Option<watch::Sender<bool>>>>,
}

impl RunController {
    pub fn new(
        state: StateManager,
        runner: TaskRunner,
        settings: RunSettings,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            state,
            runner,
            settings,
            metrics,
            cancel_tx: Arc::new(Mutex::new(None)),
        }
    }

    pub fn state(&self) -> &StateManager {
        &self.state
    }

    pub fn is_active(&self) -> bool {
        self.state.read(|s| s.active)
    }

    /// Start a run. Returns false (and does nothing) if one is already active.
    pub fn start(&self) -> bool {
        let mut current = self
            .cancel_tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if !self.state.try_begin_run() {
            tracing::debug!("Start ignored - a run is already active");
            return false;
        }

        let (cancel_tx, cancel_rx) = watch::channel(false);
        *current = Some(cancel_tx);

        let step_loop = StepLoop::new(self.state.clone(), cancel_rx, &self.settings);
        let task = Task::with_capacity("step-loop", self.settings.event_buffer, move |progress| {
            step_loop.run(progress)
        });

        // Subscribe before submitting so no notification is missed
        self.spawn_listener(task.subscribe());
        self.metrics.record_run_started();
        self.runner.start(task);

        tracing::info!(
            "Run started at step {} of {}",
            self.state.read(|s| s.step),
            self.settings.total_steps
        );
        true
    }

    /// Request cooperative cancellation. Returns false if no run is active or
    /// a stop is already pending.
    pub fn stop(&self) -> bool {
        let current = self
            .cancel_tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if !self.state.request_interrupt() {
            tracing::debug!("Stop ignored - no active run or already stopping");
            return false;
        }

        if let Some(cancel_tx) = current.as_ref() {
            // The step loop may already have returned and dropped its receiver
            let _ = cancel_tx.send(true);
        }

        tracing::info!(
            "Stop requested - run halts within {:?}",
            self.settings.tick_interval()
        );
        true
    }

    /// Fold task notifications into run state until the task finishes.
    fn spawn_listener(&self, mut events: broadcast::Receiver<TaskEvent>) {
        let state = self.state.clone();
        let metrics = Arc::clone(&self.metrics);
        let cancel_tx = Arc::clone(&self.cancel_tx);
        let total_steps = self.settings.total_steps;
        let reset_step_on_interrupt = self.settings.reset_step_on_interrupt;

        self.runner.handle().spawn(async move {
            loop {
                match events.recv().await {
                    Ok(TaskEvent::Progress(percent)) => {
                        metrics.record_progress_tick();
                        state.set_progress(percent);
                        tracing::info!("{}% done", percent);
                    }
                    Ok(TaskEvent::Error(err)) => {
                        // Not surfaced in the window; subscribers and the log see it
                        metrics.record_task_error();
                        tracing::error!("Run failed: {}", err);
                    }
                    Ok(TaskEvent::Finished) => {
                        Self::complete_run(
                            &state,
                            &metrics,
                            &cancel_tx,
                            total_steps,
                            reset_step_on_interrupt,
                        );
                        break;
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!("Run listener lagged - {} notifications skipped", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        tracing::warn!("Task dropped without finishing - closing run");
                        Self::complete_run(
                            &state,
                            &metrics,
                            &cancel_tx,
                            total_steps,
                            reset_step_on_interrupt,
                        );
                        break;
                    }
                }
            }
        });
    }

    fn complete_run(
        state: &StateManager,
        metrics: &Metrics,
        cancel_tx: &Mutex<Option<watch::Sender<bool>>>,
        total_steps: u32,
        reset_step_on_interrupt: bool,
    ) {
        let mut current = cancel_tx.lock().unwrap_or_else(PoisonError::into_inner);
        current.take();

        // Count before finishing so RunFinished observers see final metrics
        let interrupted = state.read(|s| s.was_interrupted(total_steps));
        metrics.record_run_finished(interrupted);
        state.finish_run(total_steps, reset_step_on_interrupt);

        tracing::info!("Thread finished");
    }
}
