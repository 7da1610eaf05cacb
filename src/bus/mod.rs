//! Embedded in-process event bus.
//!
//! This implementation is embedded-first: one dedicated worker thread owns
//! all subscription state, and publish/control traffic reaches it over
//! bounded channels. A networked deployment can implement
//! [`EventService`](crate::service::EventService) over a transport instead;
//! the core does not care which backend it binds to.

/// Bus worker and dispatch loop.
pub mod dispatcher;
/// Interval-based publishing utility.
pub mod periodic;
/// Subscription handle.
pub mod subscription;

pub use dispatcher::{EventBus, EventBusConfig};
pub use periodic::PeriodicPublisher;
pub use subscription::BusSubscription;
