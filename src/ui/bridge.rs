// EventLoopBridge - Marshals UI updates from background threads onto the Slint event loop
//
// Slint components may only be touched on the event loop thread. Worker-side
// code queues closures here; a forwarding thread hands each one to
// `upgrade_in_event_loop`, which runs it on the UI thread.

use crate::metrics::Metrics;
use slint::{ComponentHandle, Weak};
use std::sync::Arc;
use tokio::sync::mpsc;

type UiUpdate<T> = Box<dyn FnOnce(&T) + Send>;

/// Cloneable sender of UI updates
///
/// The queue is bounded; when the UI falls behind, new updates are dropped and
/// counted rather than buffered without limit.
///
/// # Example
/// ```ignore
/// let bridge = EventLoopBridge::new(&ui, 100, metrics);
/// std::thread::spawn(move || {
///     bridge.update_ui(|ui| ui.set_progress_value(42));
/// });
/// ```
pub struct EventLoopBridge<T: ComponentHandle> {
    ui_update_tx: mpsc::Sender<UiUpdate<T>>,
    metrics: Arc<Metrics>,
}

// Manual Clone implementation to avoid requiring T: Clone
impl<T: ComponentHandle> Clone for EventLoopBridge<T> {
    fn clone(&self) -> Self {
        Self {
            ui_update_tx: self.ui_update_tx.clone(),
            metrics: Arc::clone(&self.metrics),
        }
    }
}

impl<T: ComponentHandle + 'static> EventLoopBridge<T> {
    /// Create the bridge and its forwarding thread
    ///
    /// # Arguments
    /// * `ui` - The Slint component updates are applied to
    /// * `capacity` - Maximum number of queued updates
    /// * `metrics` - Counters for delivered and dropped updates
    pub fn new(ui: &T, capacity: usize, metrics: Arc<Metrics>) -> Self {
        let ui_weak: Weak<T> = ui.as_weak();
        let (ui_update_tx, mut ui_update_rx) = mpsc::channel::<UiUpdate<T>>(capacity);

        std::thread::spawn(move || {
            tracing::debug!("EventLoopBridge forwarding thread started");

            while let Some(update) = ui_update_rx.blocking_recv() {
                if let Err(e) = ui_weak.upgrade_in_event_loop(move |ui| update(&ui)) {
                    // The event loop is gone; nothing left to update
                    tracing::warn!("Failed to queue UI update to event loop: {:?}", e);
                    break;
                }
            }

            tracing::debug!("EventLoopBridge forwarding thread terminated");
        });

        Self {
            ui_update_tx,
            metrics,
        }
    }

    /// Queue a UI update from any thread
    pub fn update_ui<F>(&self, update: F)
    where
        F: FnOnce(&T) + Send + 'static,
    {
        match self.ui_update_tx.try_send(Box::new(update)) {
            Ok(()) => self.metrics.record_ui_update(),
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.metrics.record_ui_channel_full();
                tracing::warn!("UI update channel full - dropping update");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::warn!("Failed to send UI update - forwarding thread has stopped");
            }
        }
    }
}
