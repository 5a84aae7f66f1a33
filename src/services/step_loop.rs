//! The step-incrementing work function driven by the controller.

use crate::models::RunSettings;
use crate::services::task::ProgressReporter;
use crate::state::StateManager;
use anyhow::Result;
use std::time::Duration;
use tokio::sync::watch;

/// Percentage shown for `step` in a run of `total_steps`.
///
/// Integer division by `total_steps - 1`, so step 0 maps to 0 and the last
/// step maps to 100. For the default 20 steps: 0, 5, 10, 15, 21, ... 100.
pub fn progress_percent(step: u32, total_steps: u32) -> i32 {
    let denominator = u64::from(total_steps.saturating_sub(1).max(1));
    let percent = u64::from(step) * 100 / denominator;
    i32::try_from(percent).unwrap_or(i32::MAX)
}

/// Loop that advances `step` once per tick until done or cancelled.
///
/// Reads and writes `step` through the [`StateManager`]. The cancel channel
/// is polled once per iteration, before any work for that iteration; a
/// dropped sender counts as "not cancelled".
pub struct StepLoop {
    state: StateManager,
    cancel_rx: watch::Receiver<bool>,
    total_steps: u32,
    tick: Duration,
}

impl StepLoop {
    pub fn new(
        state: StateManager,
        cancel_rx: watch::Receiver<bool>,
        settings: &RunSettings,
    ) -> Self {
        Self {
            state,
            cancel_rx,
            total_steps: settings.total_steps,
            tick: settings.tick_interval(),
        }
    }

    /// Run on the worker thread. Blocks for up to `total_steps` ticks.
    pub fn run(&self, progress: &ProgressReporter) -> Result<()> {
        tracing::info!("Thread started");

        loop {
            let step = self.state.read(|s| s.step);
            if step >= self.total_steps || self.is_cancelled() {
                break;
            }

            progress.report(progress_percent(step, self.total_steps));
            self.state.advance_step();
            std::thread::sleep(self.tick);
        }

        tracing::debug!(
            "Step loop exited at step {} (cancelled: {})",
            self.state.read(|s| s.step),
            self.is_cancelled()
        );
        Ok(())
    }

    fn is_cancelled(&self) -> bool {
        *self.cancel_rx.borrow()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::task::{Task, TaskEvent};
    use proptest::prelude::*;

    #[test]
    fn test_default_sequence_endpoints() {
        assert_eq!(progress_percent(0, 20), 0);
        assert_eq!(progress_percent(1, 20), 5);
        assert_eq!(progress_percent(4, 20), 21);
        assert_eq!(progress_percent(19, 20), 100);
    }

    #[test]
    fn test_degenerate_total_does_not_divide_by_zero() {
        assert_eq!(progress_percent(0, 1), 0);
        assert_eq!(progress_percent(0, 0), 0);
    }

    proptest! {
        #[test]
        fn prop_progress_is_monotonic_and_bounded(
            (total, step) in (2u32..500).prop_flat_map(|t| (Just(t), 0..t))
        ) {
            let p = progress_percent(step, total);
            prop_assert!((0..=100).contains(&p));
            if step + 1 < total {
                prop_assert!(progress_percent(step + 1, total) >= p);
            }
        }

        #[test]
        fn prop_last_step_is_full(total in 2u32..10_000) {
            prop_assert_eq!(progress_percent(total - 1, total), 100);
        }
    }

    fn fast_settings(total_steps: u32) -> RunSettings {
        RunSettings {
            total_steps,
            tick_interval_ms: 0,
            ..RunSettings::default()
        }
    }

    #[test]
    fn test_loop_runs_to_completion() {
        let state = StateManager::new();
        let (_cancel_tx, cancel_rx) = watch::channel(false);
        let step_loop = StepLoop::new(state.clone(), cancel_rx, &fast_settings(5));
        let task = Task::new("steps", move |progress| step_loop.run(progress));
        let mut rx = task.subscribe();

        task.run_inline();

        let mut percents = Vec::new();
        while let Ok(TaskEvent::Progress(p)) = rx.try_recv() {
            percents.push(p);
        }
        assert_eq!(percents, vec![0, 25, 50, 75, 100]);
        assert_eq!(state.read(|s| s.step), 5);
    }

    #[test]
    fn test_cancel_sent_before_start_skips_every_tick() {
        let state = StateManager::new();
        let (cancel_tx, cancel_rx) = watch::channel(false);
        cancel_tx.send(true).unwrap();
        let step_loop = StepLoop::new(state.clone(), cancel_rx, &fast_settings(20));
        let task = Task::new("steps", move |progress| step_loop.run(progress));
        let mut rx = task.subscribe();

        task.run_inline();

        assert_eq!(rx.try_recv().unwrap(), TaskEvent::Finished);
        assert_eq!(state.read(|s| s.step), 0);
    }

    #[test]
    fn test_loop_resumes_from_stale_step() {
        let state = StateManager::new();
        state.update(|s| s.step = 18);
        let (_cancel_tx, cancel_rx) = watch::channel(false);
        let step_loop = StepLoop::new(state.clone(), cancel_rx, &fast_settings(20));
        let task = Task::new("steps", move |progress| step_loop.run(progress));
        let mut rx = task.subscribe();

        task.run_inline();

        assert_eq!(rx.try_recv().unwrap(), TaskEvent::Progress(94));
        assert_eq!(rx.try_recv().unwrap(), TaskEvent::Progress(100));
        assert_eq!(rx.try_recv().unwrap(), TaskEvent::Finished);
    }
}
