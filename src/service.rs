//! Abstract event-service collaborator contract.
//!
//! The core binds against these traits, not a concrete transport. The
//! embedded [`EventBus`](crate::bus::EventBus) implements them in-process; a
//! networked backend can implement them over a wire protocol without the
//! core changing.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TransportError;
use crate::event::{Event, EventKey};

/// Unique identifier for a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    /// Creates a new random subscription id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wraps an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for SubscriptionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Callback invoked once per inbound event matching a subscribed key.
///
/// Callbacks run on the service's delivery context and must not panic; a
/// panicking callback takes the delivery worker down with it.
pub type EventCallback = Box<dyn Fn(&Event) + Send + Sync>;

/// Handle to an active subscription.
pub trait Subscription: Send + Sync {
    /// The subscription's id.
    fn id(&self) -> SubscriptionId;

    /// Best-effort, idempotent, non-blocking teardown. Deliveries already in
    /// flight may still reach the callback.
    fn cancel(&self);

    /// Returns true once `cancel` has been requested.
    fn is_cancelled(&self) -> bool;
}

/// Publish/subscribe contract of the underlying event stream.
pub trait EventService: Send + Sync {
    /// Sends an event to the stream. Returns once the stream has accepted
    /// it.
    ///
    /// # Errors
    /// Any [`TransportError`]; the caller decides whether to retry.
    fn publish(&self, event: Event) -> Result<(), TransportError>;

    /// Registers `on_event` for every inbound event matching `key`.
    ///
    /// # Errors
    /// Any [`TransportError`]; a failed registration leaves no callback
    /// behind.
    fn subscribe(
        &self,
        key: &EventKey,
        on_event: EventCallback,
    ) -> Result<Box<dyn Subscription>, TransportError>;

    /// The most recent retained event for `key`, if any.
    ///
    /// # Errors
    /// Any [`TransportError`].
    fn latest(&self, key: &EventKey) -> Result<Option<Event>, TransportError>;
}
