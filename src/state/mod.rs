// State management module
//
// This module provides the StateManager which wraps RunState with thread-safe access
// using Arc<RwLock<T>> and emits change events for GUI updates.

use crate::models::RunState;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::broadcast;

/// Change events emitted when run state is modified
///
/// The GUI listens to these instead of polling the state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StateChange {
    /// A run has been started (from `step`, which may be stale after an interrupt)
    RunStarted { step: u32 },

    /// The displayed percentage changed
    ProgressUpdated { percent: i32 },

    /// The loop advanced to `step`
    StepAdvanced { step: u32 },

    /// Stop was requested while the run was active
    InterruptRequested,

    /// The run ended, naturally or by interruption
    RunFinished { interrupted: bool, step: u32 },
}

/// Thread-safe run state manager with event emission
///
/// - [`read()`](Self::read) / [`snapshot()`](Self::snapshot) for reading
/// - [`update()`](Self::update) for mutations with automatic event emission
/// - [`subscribe()`](Self::subscribe) for listening to state changes
///
/// Lock poisoning is recovered rather than propagated: a panic on the worker
/// must not take the UI thread down with it.
pub struct StateManager {
    state: Arc<RwLock<RunState>>,
    state_tx: broadcast::Sender<StateChange>,
}

impl StateManager {
    /// Create a new StateManager with a broadcast buffer of 100 events
    pub fn new() -> Self {
        Self::with_capacity(100)
    }

    /// Create a new StateManager with a custom broadcast buffer size
    pub fn with_capacity(capacity: usize) -> Self {
        let (state_tx, _) = broadcast::channel(capacity);
        Self {
            state: Arc::new(RwLock::new(RunState::default())),
            state_tx,
        }
    }

    /// Get a copy of the current state
    pub fn snapshot(&self) -> RunState {
        self.read(RunState::clone)
    }

    /// Execute a function with read access to the state
    ///
    /// # Example
    /// ```ignore
    /// let active = state_manager.read(|state| state.active);
    /// ```
    pub fn read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&RunState) -> R,
    {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        f(&state)
    }

    /// Update the state and emit change events
    ///
    /// Captures the old state, applies `update_fn`, diffs, and broadcasts.
    ///
    /// # Returns
    /// The StateChange events that were emitted
    pub fn update<F>(&self, update_fn: F) -> Vec<StateChange>
    where
        F: FnOnce(&mut RunState),
    {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let old_state = state.clone();

        update_fn(&mut state);

        let changes = Self::detect_changes(&old_state, &state);
        for change in &changes {
            // It's OK if no one is listening
            let _ = self.state_tx.send(change.clone());
        }

        changes
    }

    /// Subscribe to state change events
    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.state_tx.subscribe()
    }

    fn detect_changes(old: &RunState, new: &RunState) -> Vec<StateChange> {
        let mut changes = Vec::new();

        if !old.active && new.active {
            changes.push(StateChange::RunStarted { step: new.step });
        }

        if !old.interrupt && new.interrupt && new.active {
            changes.push(StateChange::InterruptRequested);
        }

        if old.progress != new.progress {
            changes.push(StateChange::ProgressUpdated {
                percent: new.progress,
            });
        }

        if old.active && new.active && old.step != new.step {
            changes.push(StateChange::StepAdvanced { step: new.step });
        }

        if old.active && !new.active {
            changes.push(StateChange::RunFinished {
                interrupted: new.interrupt,
                step: new.step,
            });
        }

        changes
    }

    // Convenience methods for the run lifecycle

    /// Mark a run active if none is; returns false when a run is already active.
    ///
    /// The check and the flip happen under one write lock.
    pub fn try_begin_run(&self) -> bool {
        let mut began = false;
        self.update(|state| {
            if !state.active {
                state.active = true;
                state.interrupt = false;
                began = true;
            }
        });
        began
    }

    /// Request an interrupt; returns false when no run is active or a stop
    /// is already pending.
    pub fn request_interrupt(&self) -> bool {
        let mut requested = false;
        self.update(|state| {
            if state.active && !state.interrupt {
                state.interrupt = true;
                requested = true;
            }
        });
        requested
    }

    /// Record a progress tick
    ///
    /// Every tick is announced, even when the percentage repeats (the very
    /// first tick of a run reports 0 over an initial 0).
    pub fn set_progress(&self, percent: i32) -> Vec<StateChange> {
        let mut changes = self.update(|state| state.progress = percent);

        if changes.is_empty() {
            let tick_event = StateChange::ProgressUpdated { percent };
            let _ = self.state_tx.send(tick_event.clone());
            changes.push(tick_event);
        }

        changes
    }

    /// Advance the loop by one step and return the new step value
    pub fn advance_step(&self) -> u32 {
        let mut step = 0;
        self.update(|state| {
            state.step += 1;
            step = state.step;
        });
        step
    }

    /// End the active run of `total_steps` steps
    pub fn finish_run(&self, total_steps: u32, reset_step_on_interrupt: bool) -> Vec<StateChange> {
        self.update(|state| state.finish(total_steps, reset_step_on_interrupt))
    }
}

impl Default for StateManager {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for StateManager {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            state_tx: self.state_tx.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state_manager() {
        let manager = StateManager::new();
        let state = manager.snapshot();

        assert!(!state.active);
        assert!(!state.interrupt);
        assert_eq!(state.step, 0);
    }

    #[test]
    fn test_try_begin_run_only_once() {
        let manager = StateManager::new();

        assert!(manager.try_begin_run());
        assert!(!manager.try_begin_run());
        assert!(manager.read(|s| s.active));
    }

    #[test]
    fn test_begin_run_clears_interrupt() {
        let manager = StateManager::new();
        manager.update(|s| s.interrupt = true);

        let changes = manager.update(|s| {
            s.active = true;
            s.interrupt = false;
        });
        assert_eq!(changes, vec![StateChange::RunStarted { step: 0 }]);

        assert!(!manager.read(|s| s.interrupt));
    }

    #[test]
    fn test_request_interrupt_idle_is_noop() {
        let manager = StateManager::new();

        assert!(!manager.request_interrupt());
        assert!(!manager.read(|s| s.interrupt));
    }

    #[test]
    fn test_request_interrupt_while_active() {
        let manager = StateManager::new();
        manager.try_begin_run();
        let mut rx = manager.subscribe();

        assert!(manager.request_interrupt());
        assert_eq!(rx.try_recv().unwrap(), StateChange::InterruptRequested);
        assert!(manager.snapshot().is_stopping());
    }

    #[test]
    fn test_second_interrupt_while_stopping_is_noop() {
        let manager = StateManager::new();
        manager.try_begin_run();
        assert!(manager.request_interrupt());
        let mut rx = manager.subscribe();

        assert!(!manager.request_interrupt());
        assert!(rx.try_recv().is_err());
        assert!(manager.snapshot().is_stopping());
    }

    #[test]
    fn test_step_and_progress_events() {
        let manager = StateManager::new();
        manager.try_begin_run();

        let changes = manager.set_progress(5);
        assert_eq!(changes, vec![StateChange::ProgressUpdated { percent: 5 }]);

        // Repeated percentages are still announced
        let changes = manager.set_progress(5);
        assert_eq!(changes, vec![StateChange::ProgressUpdated { percent: 5 }]);

        assert_eq!(manager.advance_step(), 1);
        assert_eq!(manager.advance_step(), 2);
    }

    #[test]
    fn test_finish_run_uninterrupted() {
        let manager = StateManager::new();
        manager.try_begin_run();
        for _ in 0..20 {
            manager.advance_step();
        }

        let changes = manager.finish_run(20, false);
        assert_eq!(
            changes,
            vec![StateChange::RunFinished {
                interrupted: false,
                step: 0
            }]
        );
    }

    #[test]
    fn test_finish_run_interrupted_keeps_step() {
        let manager = StateManager::new();
        manager.try_begin_run();
        manager.advance_step();
        manager.advance_step();
        manager.request_interrupt();

        let changes = manager.finish_run(20, false);
        assert_eq!(
            changes,
            vec![StateChange::RunFinished {
                interrupted: true,
                step: 2
            }]
        );
        assert_eq!(manager.read(|s| s.step), 2);
    }

    #[test]
    fn test_finish_run_after_last_step_ignores_late_stop() {
        let manager = StateManager::new();
        manager.try_begin_run();
        for _ in 0..3 {
            manager.advance_step();
        }
        manager.request_interrupt();

        let changes = manager.finish_run(3, false);
        assert_eq!(
            changes,
            vec![StateChange::RunFinished {
                interrupted: false,
                step: 0
            }]
        );
    }

    #[test]
    fn test_multiple_subscribers() {
        let manager = StateManager::new();
        let mut rx1 = manager.subscribe();
        let mut rx2 = manager.subscribe();

        manager.try_begin_run();

        assert!(rx1.try_recv().is_ok());
        assert!(rx2.try_recv().is_ok());
    }

    #[test]
    fn test_clone_shares_state() {
        let manager1 = StateManager::new();
        let manager2 = manager1.clone();

        manager1.set_progress(42);

        assert_eq!(manager2.read(|s| s.progress), 42);
    }
}
