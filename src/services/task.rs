//! Background task runner with progress, error and completion notifications.
//!
//! A [`Task`] wraps a blocking work function. Subscribers attach with
//! [`Task::subscribe`] before the task is handed to a [`TaskRunner`], which
//! executes it on tokio's blocking pool. The work function receives a
//! [`ProgressReporter`]; everything it reports, plus the outcome, arrives at
//! every subscriber as a [`TaskEvent`]:
//!
//! - `Progress(n)` for each report
//! - `Error(TaskError)` if the function returned `Err` or panicked
//! - `Finished` exactly once, after everything else, on every path

use std::any::Any;
use std::backtrace::Backtrace;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// How a work function failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    /// The function returned `Err`
    Error,
    /// The function panicked
    Panic,
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FaultKind::Error => write!(f, "error"),
            FaultKind::Panic => write!(f, "panic"),
        }
    }
}

/// Captured fault: kind, value and formatted trace.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind} in task: {message}")]
pub struct TaskError {
    pub kind: FaultKind,
    pub message: String,
    pub trace: String,
}

impl TaskError {
    fn from_error(err: &anyhow::Error) -> Self {
        Self {
            kind: FaultKind::Error,
            message: err.to_string(),
            // Debug output of anyhow carries the cause chain and backtrace
            trace: format!("{:?}", err),
        }
    }

    fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };

        Self {
            kind: FaultKind::Panic,
            trace: format!("task panicked: {}\n{}", message, Backtrace::capture()),
            message,
        }
    }
}

/// Notification emitted by a running task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskEvent {
    Progress(i32),
    Error(TaskError),
    Finished,
}

/// Handle injected into the work function for reporting progress
#[derive(Clone)]
pub struct ProgressReporter {
    tx: broadcast::Sender<TaskEvent>,
}

impl ProgressReporter {
    pub fn report(&self, percent: i32) {
        // No subscribers is fine
        let _ = self.tx.send(TaskEvent::Progress(percent));
    }
}

type WorkFn = Box<dyn FnOnce(&ProgressReporter) -> anyhow::Result<()> + Send + 'static>;

/// A unit of work plus its notification channel
pub struct Task {
    name: String,
    work: WorkFn,
    events_tx: broadcast::Sender<TaskEvent>,
}

impl Task {
    /// Wrap `work` with a 100-event notification buffer
    pub fn new<F>(name: impl Into<String>, work: F) -> Self
    where
        F: FnOnce(&ProgressReporter) -> anyhow::Result<()> + Send + 'static,
    {
        Self::with_capacity(name, 100, work)
    }

    /// Wrap `work` with a custom notification buffer size
    pub fn with_capacity<F>(name: impl Into<String>, capacity: usize, work: F) -> Self
    where
        F: FnOnce(&ProgressReporter) -> anyhow::Result<()> + Send + 'static,
    {
        let (events_tx, _) = broadcast::channel(capacity);
        Self {
            name: name.into(),
            work: Box::new(work),
            events_tx,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Attach a subscriber. Only events sent after this call are received,
    /// so subscribe before starting the task.
    pub fn subscribe(&self) -> broadcast::Receiver<TaskEvent> {
        self.events_tx.subscribe()
    }

    /// Run the work function on the current thread, emitting notifications.
    ///
    /// [`TaskRunner::start`] calls this on a blocking-pool thread.
    pub fn run_inline(self) {
        let Task {
            name,
            work,
            events_tx,
        } = self;

        let reporter = ProgressReporter {
            tx: events_tx.clone(),
        };

        tracing::debug!(task = %name, "Task running");

        let failure = match panic::catch_unwind(AssertUnwindSafe(move || work(&reporter))) {
            Ok(Ok(())) => None,
            Ok(Err(err)) => Some(TaskError::from_error(&err)),
            Err(payload) => Some(TaskError::from_panic(payload)),
        };

        if let Some(err) = failure {
            tracing::error!(task = %name, "{}", err.trace);
            let _ = events_tx.send(TaskEvent::Error(err));
        }

        let _ = events_tx.send(TaskEvent::Finished);
        tracing::debug!(task = %name, "Task finished");
    }
}

/// Executes tasks on the tokio blocking pool, off the caller's thread
#[derive(Clone)]
pub struct TaskRunner {
    tokio_handle: tokio::runtime::Handle,
}

impl TaskRunner {
    pub fn new(tokio_handle: tokio::runtime::Handle) -> Self {
        Self { tokio_handle }
    }

    /// Submit a task. The work function may block freely.
    pub fn start(&self, task: Task) -> JoinHandle<()> {
        tracing::debug!(task = %task.name(), "Submitting task");
        self.tokio_handle.spawn_blocking(move || task.run_inline())
    }

    /// Runtime handle, for spawning listeners next to the task
    pub fn handle(&self) -> &tokio::runtime::Handle {
        &self.tokio_handle
    }
}
