//! Interval-based publishing.
//!
//! [`PeriodicPublisher`] runs a ticker thread that publishes a freshly
//! supplied event once per period, until cancelled or until the bus worker
//! goes away.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, select, tick, Sender};

use crate::event::Event;

use super::dispatcher::{publish_via, PublishMsg};

/// Handle to a running interval publisher.
pub struct PeriodicPublisher {
    stop_tx: Sender<()>,
    cancelled: AtomicBool,
    join: Mutex<Option<JoinHandle<()>>>,
}

impl PeriodicPublisher {
    pub(crate) fn spawn<F>(publish_tx: Sender<PublishMsg>, period: Duration, supplier: F) -> Self
    where
        F: Fn() -> Event + Send + 'static,
    {
        let (stop_tx, stop_rx) = bounded::<()>(1);

        let join = thread::Builder::new()
            .name("procvar-ticker".to_string())
            .spawn(move || {
                let ticker = tick(period);
                loop {
                    select! {
                        // Fires on explicit cancel and on handle drop alike.
                        recv(stop_rx) -> _ => break,
                        recv(ticker) -> msg => {
                            if msg.is_err() {
                                break;
                            }
                            if publish_via(&publish_tx, supplier()).is_err() {
                                // Bus worker is gone; nothing left to publish to.
                                break;
                            }
                        }
                    }
                }
            })
            .expect("failed to spawn procvar ticker");

        Self {
            stop_tx,
            cancelled: AtomicBool::new(false),
            join: Mutex::new(Some(join)),
        }
    }

    /// Stops the ticker and waits for it to exit.
    ///
    /// Idempotent. After `cancel` returns, no further publishes are issued
    /// by this handle.
    pub fn cancel(&self) {
        if self.cancelled.swap(true, Ordering::AcqRel) {
            return;
        }

        let _ = self.stop_tx.try_send(());

        if let Ok(mut guard) = self.join.lock() {
            if let Some(handle) = guard.take() {
                let _ = handle.join();
            }
        }
    }

    /// Returns true once `cancel` has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl Drop for PeriodicPublisher {
    fn drop(&mut self) {
        // Signal without joining; dropping `stop_tx` disconnects the stop
        // channel and the ticker exits on its next select.
        if !self.cancelled.swap(true, Ordering::AcqRel) {
            let _ = self.stop_tx.try_send(());
        }
    }
}

impl std::fmt::Debug for PeriodicPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeriodicPublisher")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
