//! Process variables: live bindings to one named value in an event stream.
//!
//! A [`ProcessVariable`] owns a typed key, the latest snapshot of an event
//! carrying that key, and a set of attached observers. It subscribes to the
//! underlying stream at most once no matter how many observers attach, keeps
//! the last observed value available for synchronous reads, and notifies
//! every attached observer when a fresh delivery updates the value.

use std::sync::{Arc, Mutex, RwLock, Weak};

use crate::error::{PvError, PvResult};
use crate::event::{Event, EventKey};
use crate::key::Key;
use crate::params::Params;
use crate::service::{EventService, Subscription};
use crate::value::FieldValue;

/// Capability implemented by consumers that want to be told "a value you
/// depend on changed".
///
/// `context` is the delivered event's parameter set; the variable does not
/// interpret it. A returned error is logged and contained per observer: it
/// never interrupts the fan-out pass or reaches other observers.
///
/// `refresh` runs on the stream's delivery context. It must not call `set`
/// on a variable bound to the same service synchronously; hand writes off
/// to another thread.
pub trait Refreshable: Send + Sync {
    /// Reacts to a changed value.
    ///
    /// # Errors
    /// Implementation-defined; errors are logged by the caller and otherwise
    /// ignored.
    fn refresh(&self, context: &Params) -> PvResult<()>;
}

fn lock_err(context: &'static str) -> PvError {
    PvError::internal(format!("poisoned lock: {context}"))
}

enum SubscriptionState {
    /// No subscription has ever succeeded. A bind may (re)attempt one.
    Idle,
    /// The stream subscription is live.
    Active(Box<dyn Subscription>),
}

/// State shared with the inbound delivery callback.
///
/// The callback holds this weakly so the service's delivery path never keeps
/// a dead variable alive.
struct PvShared {
    event_key: EventKey,
    latest: RwLock<Event>,
    observers: Mutex<Vec<Weak<dyn Refreshable>>>,
}

impl PvShared {
    /// Applies one inbound delivery: replaces the snapshot and fans out.
    fn apply_inbound(&self, event: &Event) {
        {
            let mut latest = match self.latest.write() {
                Ok(guard) => guard,
                Err(_) => {
                    tracing::warn!(event_key = %self.event_key, "snapshot lock poisoned; delivery dropped");
                    return;
                }
            };

            // A slow echo of an older revision must not overwrite a newer
            // local write.
            if event.time() < latest.time() {
                tracing::debug!(
                    event_key = %self.event_key,
                    inbound = %event.id(),
                    "discarding stale delivery"
                );
                return;
            }

            *latest = event.clone();
        }

        for observer in self.observer_snapshot() {
            if let Err(error) = observer.refresh(event.params()) {
                tracing::warn!(
                    event_key = %self.event_key,
                    %error,
                    "observer refresh failed"
                );
            }
        }
    }

    /// Upgrades the current membership, pruning dead observers.
    fn observer_snapshot(&self) -> Vec<Arc<dyn Refreshable>> {
        let Ok(mut observers) = self.observers.lock() else {
            tracing::warn!(event_key = %self.event_key, "observer set lock poisoned; fan-out skipped");
            return Vec::new();
        };

        let mut live: Vec<Arc<dyn Refreshable>> = Vec::with_capacity(observers.len());
        observers.retain(|weak| match weak.upgrade() {
            Some(observer) => {
                live.push(observer);
                true
            }
            None => false,
        });

        live
    }
}

/// A live, observable binding to one typed parameter carried by a streamed
/// event.
///
/// # Examples
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use procvar::{int_key, Event, EventBus, ProcessVariable, Refreshable};
///
/// let bus = Arc::new(EventBus::default());
/// let temperature = ProcessVariable::new(
///     Event::system("TCS", "filter"),
///     int_key("temperature"),
///     bus,
/// );
///
/// temperature.set(42)?;
/// assert_eq!(temperature.get()?, 42);
/// ```
pub struct ProcessVariable<T: FieldValue> {
    key: Key<T>,
    service: Arc<dyn EventService>,
    shared: Arc<PvShared>,
    subscription: Mutex<SubscriptionState>,
}

impl<T: FieldValue> ProcessVariable<T> {
    /// Creates a variable bound to `key` inside events identified by the
    /// initial snapshot's event key.
    ///
    /// The event key is fixed for the variable's lifetime even though the
    /// snapshot itself is replaced on every update.
    #[must_use]
    pub fn new(initial: Event, key: Key<T>, service: Arc<dyn EventService>) -> Self {
        let event_key = initial.key().clone();

        Self {
            key,
            service,
            shared: Arc::new(PvShared {
                event_key,
                latest: RwLock::new(initial),
                observers: Mutex::new(Vec::new()),
            }),
            subscription: Mutex::new(SubscriptionState::Idle),
        }
    }

    /// The stream identity this variable is bound to.
    #[must_use]
    pub fn event_key(&self) -> &EventKey {
        &self.shared.event_key
    }

    /// The key this variable reads and writes.
    #[must_use]
    pub const fn key(&self) -> &Key<T> {
        &self.key
    }

    /// Attaches an observer and lazily starts the stream subscription.
    ///
    /// Membership is set semantics by allocation identity: re-binding the
    /// same observer does not duplicate notifications. The first successful
    /// bind opens exactly one subscription for the variable's lifetime;
    /// concurrent first binds serialize so only one request is issued.
    ///
    /// # Errors
    /// [`PvError::Subscribe`] when opening the subscription fails. The
    /// observer stays attached and the variable stays unsubscribed, so a
    /// later bind retries.
    pub fn bind(&self, observer: &Arc<dyn Refreshable>) -> PvResult<()> {
        {
            let mut observers = self
                .shared
                .observers
                .lock()
                .map_err(|_| lock_err("observers"))?;

            let candidate = Arc::downgrade(observer);
            let already_bound = observers
                .iter()
                .any(|existing| Weak::ptr_eq(existing, &candidate));
            if !already_bound {
                observers.push(candidate);
            }
        }

        self.ensure_subscribed()
    }

    /// Merges `value` into the current snapshot and publishes the result.
    ///
    /// The local snapshot is replaced before the publish is attempted, so a
    /// `get` immediately after `set` returns `value` even if the publish has
    /// not round-tripped yet. Local subscribers are NOT notified here;
    /// notification rides on the subscription's inbound deliveries,
    /// including the echo of this very publish.
    ///
    /// # Errors
    /// [`PvError::Publish`] when the outbound publish fails; the local
    /// snapshot keeps the written value regardless.
    pub fn set(&self, value: T) -> PvResult<()> {
        let param = self.key.set(value);

        let event = {
            let mut latest = self
                .shared
                .latest
                .write()
                .map_err(|_| lock_err("latest"))?;

            let updated = latest.add(param);
            *latest = updated.clone();
            updated
        };

        self.service.publish(event).map_err(PvError::Publish)
    }

    /// Extracts the first value of the bound key from the latest snapshot.
    ///
    /// Synchronous and non-blocking.
    ///
    /// # Errors
    /// - [`PvError::NotFound`] when the key has never been populated
    /// - [`PvError::TypeMismatch`] when the stored value has another type
    pub fn get(&self) -> PvResult<T> {
        let latest = self
            .shared
            .latest
            .read()
            .map_err(|_| lock_err("latest"))?;

        latest.params().first_value(&self.key)
    }

    /// A clone of the latest snapshot.
    ///
    /// # Errors
    /// [`PvError::Internal`] on a poisoned snapshot lock.
    pub fn latest_event(&self) -> PvResult<Event> {
        let latest = self
            .shared
            .latest
            .read()
            .map_err(|_| lock_err("latest"))?;

        Ok(latest.clone())
    }

    /// Number of currently live observers.
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.shared.observer_snapshot().len()
    }

    /// Returns true while the stream subscription is live.
    #[must_use]
    pub fn is_subscribed(&self) -> bool {
        self.subscription
            .lock()
            .map(|state| matches!(*state, SubscriptionState::Active(_)))
            .unwrap_or(false)
    }

    /// Cancels the stream subscription, if any.
    ///
    /// Observers stay attached; the next `bind` re-subscribes.
    pub fn unsubscribe(&self) {
        let Ok(mut state) = self.subscription.lock() else {
            return;
        };

        if let SubscriptionState::Active(subscription) = &*state {
            subscription.cancel();
        }
        *state = SubscriptionState::Idle;
    }

    fn ensure_subscribed(&self) -> PvResult<()> {
        let mut state = self
            .subscription
            .lock()
            .map_err(|_| lock_err("subscription"))?;

        if matches!(*state, SubscriptionState::Active(_)) {
            return Ok(());
        }

        let shared = Arc::downgrade(&self.shared);
        let callback = Box::new(move |event: &Event| {
            if let Some(shared) = shared.upgrade() {
                shared.apply_inbound(event);
            }
        });

        // The state lock is held across the round trip on purpose: it is
        // what serializes concurrent first binds down to one request.
        let subscription = self
            .service
            .subscribe(&self.shared.event_key, callback)
            .map_err(PvError::Subscribe)?;

        *state = SubscriptionState::Active(subscription);
        Ok(())
    }
}

impl<T: FieldValue> std::fmt::Debug for ProcessVariable<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessVariable")
            .field("event_key", &self.shared.event_key)
            .field("key", &self.key.name())
            .field("subscribed", &self.is_subscribed())
            .finish_non_exhaustive()
    }
}
