/// Run state shared between the UI thread and the worker.
///
/// # Thread Safety
///
/// `RunState` is wrapped in `Arc<RwLock<RunState>>` by [`crate::state::StateManager`].
/// Never mutate it directly - always go through the manager so that change
/// events are emitted:
/// - [`read()`](crate::state::StateManager::read) for read-only access
/// - [`update()`](crate::state::StateManager::update) for mutations
///
/// At most one run is active at a time: [`crate::state::StateManager::try_begin_run`]
/// flips `active` under a single write lock so two Start presses cannot both win.
///
/// # Lifecycle
///
/// - `step` resets to 0 only when a run completes without interruption.
/// - `active` and `interrupt` toggle once per run.
/// - `progress` is the last percentage pushed to the progress bar.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunState {
    /// Loop position in `[0, total_steps)`
    pub step: u32,

    /// True from a successful `start()` until the run finishes
    pub active: bool,

    /// Set by `stop()` while active; cleared by the next `start()`
    pub interrupt: bool,

    /// Last reported percentage
    pub progress: i32,
}

impl RunState {
    /// True when a stop has been requested but the loop has not exited yet.
    pub fn is_stopping(&self) -> bool {
        self.active && self.interrupt
    }

    /// True when the loop stopped short of `total_steps` because of a stop
    /// request. A stop that lands after the last tick does not count.
    pub fn was_interrupted(&self, total_steps: u32) -> bool {
        self.interrupt && self.step < total_steps
    }

    /// Apply end-of-run bookkeeping.
    ///
    /// `step` keeps its paused value after an interrupted run unless
    /// `reset_step_on_interrupt` is set. A run that reached `total_steps`
    /// always resets, even if a stop arrived during its final tick.
    pub fn finish(&mut self, total_steps: u32, reset_step_on_interrupt: bool) {
        self.active = false;
        if !self.was_interrupted(total_steps) {
            self.interrupt = false;
            self.step = 0;
        } else if reset_step_on_interrupt {
            self.step = 0;
        }
    }
}
