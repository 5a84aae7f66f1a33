//! Services module - the run lifecycle, free of any GUI code.
//!
//! # Components
//!
//! - [`TaskRunner`] / [`Task`]: run a blocking work function off the caller's
//!   thread and publish [`TaskEvent`]s (`Progress`, `Error`, `Finished`).
//!   `Finished` is always the last event, whether the work succeeded, returned
//!   an error or panicked.
//! - [`StepLoop`]: the work function itself. Advances `step` once per tick,
//!   reports `step * 100 / (total_steps - 1)` and polls a
//!   `tokio::sync::watch` cancel channel before each tick.
//! - [`RunController`]: Start/Stop with the one-run-at-a-time rule; folds task
//!   notifications into [`StateManager`](crate::state::StateManager).
//!
//! # Usage Example
//!
//! ```ignore
//! use progress_bar_thread::services::{Task, TaskEvent, TaskRunner};
//!
//! let runner = TaskRunner::new(runtime.handle().clone());
//! let task = Task::new("download", |progress| {
//!     progress.report(50);
//!     Ok(())
//! });
//! let mut events = task.subscribe();
//! runner.start(task);
//! ```

pub mod controller;
pub mod step_loop;
pub mod task;

pub use controller::RunController;
pub use step_loop::{StepLoop, progress_percent};
pub use task::{FaultKind, ProgressReporter, Task, TaskError, TaskEvent, TaskRunner};
