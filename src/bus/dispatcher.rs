//! Event bus dispatch worker.
//!
//! This module owns subscription registrations and delivers published events
//! to matching callbacks. All registration, cancellation, and delivery is
//! serialized through one worker thread, so fan-out always sees a consistent
//! membership snapshot. Publishes are acknowledged after delivery, which
//! keeps the embedded bus deterministic for callers.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, RwLock};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, never, select, Receiver, Sender};

use crate::error::TransportError;
use crate::event::{Event, EventKey};
use crate::service::{EventCallback, EventService, Subscription, SubscriptionId};

use super::periodic::PeriodicPublisher;
use super::subscription::BusSubscription;

/// Capacity knobs for the bus channels.
#[derive(Debug, Clone)]
pub struct EventBusConfig {
    /// Max queued publishes before senders block.
    pub publish_queue_capacity: usize,
    /// Max queued control messages (subscribe/unsubscribe).
    pub control_queue_capacity: usize,
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self {
            publish_queue_capacity: 4096,
            control_queue_capacity: 1024,
        }
    }
}

pub(crate) enum ControlMsg {
    Subscribe {
        subscription_id: SubscriptionId,
        key: EventKey,
        on_event: EventCallback,
        reply: Sender<Result<(), TransportError>>,
    },
    Unsubscribe {
        subscription_id: SubscriptionId,
    },
}

pub(crate) struct PublishMsg {
    pub(crate) event: Event,
    pub(crate) reply: Sender<Result<(), TransportError>>,
}

/// Sends one event through the worker and waits for the delivery ack.
pub(crate) fn publish_via(
    publish_tx: &Sender<PublishMsg>,
    event: Event,
) -> Result<(), TransportError> {
    let (reply_tx, reply_rx) = bounded::<Result<(), TransportError>>(1);

    publish_tx
        .send(PublishMsg {
            event,
            reply: reply_tx,
        })
        .map_err(|_| TransportError::Disconnected {
            path: "bus_publish".to_string(),
        })?;

    reply_rx.recv().map_err(|_| TransportError::Disconnected {
        path: "bus_publish".to_string(),
    })?
}

struct SubscriptionEntry {
    key: EventKey,
    on_event: EventCallback,
}

/// In-process event bus: owns subscription registrations and delivers
/// published events on a dedicated worker thread.
///
/// A publish is acknowledged after fan-out, so delivery callbacks MUST NOT
/// publish back into the same bus synchronously; hand the write off to
/// another thread instead.
///
/// Dropping the bus closes its channels and detaches the worker; the worker
/// exits once the last sender (including outstanding subscription handles)
/// is gone.
pub struct EventBus {
    control_tx: Sender<ControlMsg>,
    publish_tx: Sender<PublishMsg>,
    retained: Arc<RwLock<HashMap<EventKey, Event>>>,
    join: Mutex<Option<JoinHandle<()>>>,
}

impl EventBus {
    /// Starts the bus worker with the given channel capacities.
    #[must_use]
    pub fn new(cfg: EventBusConfig) -> Self {
        let publish_queue_capacity = cfg.publish_queue_capacity.max(1);
        let control_queue_capacity = cfg.control_queue_capacity.max(1);

        let (control_tx, control_rx) = bounded::<ControlMsg>(control_queue_capacity);
        let (publish_tx, publish_rx) = bounded::<PublishMsg>(publish_queue_capacity);

        let retained = Arc::new(RwLock::new(HashMap::new()));

        let worker_retained = Arc::clone(&retained);
        let join = thread::Builder::new()
            .name("procvar-bus".to_string())
            .spawn(move || worker_loop(worker_retained, control_rx, publish_rx))
            .expect("failed to spawn procvar bus worker");

        Self {
            control_tx,
            publish_tx,
            retained,
            join: Mutex::new(Some(join)),
        }
    }

    /// Publishes `supplier()` every `period` until the returned handle is
    /// cancelled or the bus goes away.
    pub fn publish_every<F>(&self, period: Duration, supplier: F) -> PeriodicPublisher
    where
        F: Fn() -> Event + Send + 'static,
    {
        PeriodicPublisher::spawn(self.publish_tx.clone(), period, supplier)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(EventBusConfig::default())
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus").finish_non_exhaustive()
    }
}

impl EventService for EventBus {
    fn publish(&self, event: Event) -> Result<(), TransportError> {
        publish_via(&self.publish_tx, event)
    }

    fn subscribe(
        &self,
        key: &EventKey,
        on_event: EventCallback,
    ) -> Result<Box<dyn Subscription>, TransportError> {
        let subscription_id = SubscriptionId::new();

        let (reply_tx, reply_rx) = bounded::<Result<(), TransportError>>(1);
        self.control_tx
            .send(ControlMsg::Subscribe {
                subscription_id,
                key: key.clone(),
                on_event,
                reply: reply_tx,
            })
            .map_err(|_| TransportError::Disconnected {
                path: "bus_control".to_string(),
            })?;

        // Wait for ack (or error) before handing out the handle.
        reply_rx.recv().map_err(|_| TransportError::Disconnected {
            path: "bus_control".to_string(),
        })??;

        Ok(Box::new(BusSubscription::new(
            subscription_id,
            self.control_tx.clone(),
        )))
    }

    fn latest(&self, key: &EventKey) -> Result<Option<Event>, TransportError> {
        let retained = self.retained.read().map_err(|_| TransportError::Backend {
            message: "retained event map lock poisoned".to_string(),
        })?;

        Ok(retained.get(key).cloned())
    }
}

impl Drop for EventBus {
    fn drop(&mut self) {
        // Close channels first so the worker can terminate.
        let (dummy_control_tx, _) = bounded::<ControlMsg>(1);
        let old_control = std::mem::replace(&mut self.control_tx, dummy_control_tx);
        drop(old_control);

        let (dummy_publish_tx, _) = bounded::<PublishMsg>(1);
        let old_publish = std::mem::replace(&mut self.publish_tx, dummy_publish_tx);
        drop(old_publish);

        if let Ok(mut guard) = self.join.lock() {
            if let Some(handle) = guard.take() {
                // Do not join here.
                //
                // Callers may keep subscription handles alive beyond the bus
                // lifetime, and each handle holds a clone of `control_tx`. If
                // we join here, the worker can stay alive (channel remains
                // open) and Drop would deadlock.
                //
                // Detaching is safe: the worker exits once the last sender is
                // dropped.
                drop(handle);
            }
        }
    }
}

fn worker_loop(
    retained: Arc<RwLock<HashMap<EventKey, Event>>>,
    control_rx: Receiver<ControlMsg>,
    publish_rx: Receiver<PublishMsg>,
) {
    let mut subs: HashMap<SubscriptionId, SubscriptionEntry> = HashMap::new();

    // A disconnected channel is swapped for `never()` so the select does not
    // spin on it while the other side stays open.
    let mut control_rx = control_rx;
    let mut publish_rx = publish_rx;
    let mut control_closed = false;
    let mut publish_closed = false;

    loop {
        select! {
            recv(control_rx) -> msg => {
                match msg {
                    Ok(ControlMsg::Subscribe { subscription_id, key, on_event, reply }) => {
                        subs.insert(subscription_id, SubscriptionEntry { key, on_event });
                        let _ = reply.send(Ok(()));
                    }
                    Ok(ControlMsg::Unsubscribe { subscription_id }) => {
                        subs.remove(&subscription_id);
                    }
                    Err(_) => {
                        control_closed = true;
                        control_rx = never();
                    }
                }
            }
            recv(publish_rx) -> msg => {
                match msg {
                    Ok(PublishMsg { event, reply }) => {
                        let retained_ok = match retained.write() {
                            Ok(mut map) => {
                                map.insert(event.key().clone(), event.clone());
                                true
                            }
                            Err(_) => false,
                        };

                        if retained_ok {
                            // Deliver to every matching subscription, the
                            // publisher's own included.
                            for entry in subs.values().filter(|e| &e.key == event.key()) {
                                (entry.on_event)(&event);
                            }

                            let _ = reply.send(Ok(()));
                        } else {
                            let _ = reply.send(Err(TransportError::Backend {
                                message: "retained event map lock poisoned".to_string(),
                            }));
                        }
                    }
                    Err(_) => {
                        publish_closed = true;
                        publish_rx = never();
                    }
                }
            }
        }

        if control_closed && publish_closed {
            break;
        }
    }
}
