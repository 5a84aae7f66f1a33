// Run metrics module
//
// Lightweight counters for how runs ended and how much traffic reached the UI

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Process-wide run metrics
///
/// Atomic counters shared by the controller, its event listener and the UI
/// bridge. Logged once on shutdown.
#[derive(Debug)]
pub struct Metrics {
    /// Runs that passed the `active` check and were submitted
    pub runs_started: AtomicU64,

    /// Runs that reached the last step
    pub runs_completed: AtomicU64,

    /// Runs that ended after a stop request
    pub runs_interrupted: AtomicU64,

    /// Error notifications received from tasks
    pub task_errors: AtomicU64,

    /// Progress notifications received from tasks
    pub progress_ticks: AtomicU64,

    /// UI updates queued onto the event loop
    pub ui_updates: AtomicU64,

    /// UI updates dropped because the bridge channel was full
    pub ui_update_channel_full: AtomicU64,

    start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            runs_started: AtomicU64::new(0),
            runs_completed: AtomicU64::new(0),
            runs_interrupted: AtomicU64::new(0),
            task_errors: AtomicU64::new(0),
            progress_ticks: AtomicU64::new(0),
            ui_updates: AtomicU64::new(0),
            ui_update_channel_full: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record_run_started(&self) {
        self.runs_started.fetch_add(1, Ordering::Relaxed);
    }

    /// Record how a run ended
    pub fn record_run_finished(&self, interrupted: bool) {
        if interrupted {
            self.runs_interrupted.fetch_add(1, Ordering::Relaxed);
        } else {
            self.runs_completed.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_task_error(&self) {
        self.task_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_progress_tick(&self) {
        self.progress_ticks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_ui_update(&self) {
        self.ui_updates.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_ui_channel_full(&self) {
        self.ui_update_channel_full.fetch_add(1, Ordering::Relaxed);
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Log metrics summary
    pub fn log_summary(&self) {
        tracing::info!("=== Run Metrics Summary ===");
        tracing::info!("Uptime: {:.2}s", self.uptime().as_secs_f64());
        tracing::info!(
            "Runs: {} started, {} completed, {} interrupted, {} errors",
            self.runs_started.load(Ordering::Relaxed),
            self.runs_completed.load(Ordering::Relaxed),
            self.runs_interrupted.load(Ordering::Relaxed),
            self.task_errors.load(Ordering::Relaxed)
        );
        tracing::info!(
            "Progress ticks: {}, UI updates: {}, channel full drops: {}",
            self.progress_ticks.load(Ordering::Relaxed),
            self.ui_updates.load(Ordering::Relaxed),
            self.ui_update_channel_full.load(Ordering::Relaxed)
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new();
        assert_eq!(metrics.runs_started.load(Ordering::Relaxed), 0);
        assert_eq!(metrics.task_errors.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_record_run_outcomes() {
        let metrics = Metrics::new();

        metrics.record_run_started();
        metrics.record_run_started();
        metrics.record_run_finished(false);
        metrics.record_run_finished(true);

        assert_eq!(metrics.runs_started.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.runs_completed.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.runs_interrupted.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_uptime() {
        let metrics = Metrics::new();
        thread::sleep(Duration::from_millis(10));
        assert!(metrics.uptime().as_millis() >= 10);
    }

    #[test]
    fn test_event_and_ui_counters() {
        let metrics = Metrics::new();

        metrics.record_task_error();
        metrics.record_progress_tick();
        metrics.record_progress_tick();
        metrics.record_ui_update();
        metrics.record_ui_channel_full();

        assert_eq!(metrics.task_errors.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.progress_ticks.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.ui_updates.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.ui_update_channel_full.load(Ordering::Relaxed), 1);
    }
}
