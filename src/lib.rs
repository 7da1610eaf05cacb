//! # procvar - Live Process-Variable Bindings
//!
//! procvar binds a typed, named value ("process variable") to a stream of
//! published events. Many independent observers can depend on the same
//! value: the binding subscribes to the stream at most once, keeps the most
//! recent snapshot available for synchronous reads, and fans a refresh
//! notification out to every attached observer when a fresh event arrives.
//!
//! ## Core Concepts
//!
//! - **Event**: An immutable snapshot (identity, timestamp, typed
//!   parameters) routed by a stable event key
//! - **Key**: A named, type-tagged accessor into an event's parameters
//! - **ProcessVariable**: A lazy-subscribing, multi-observer read/write
//!   binding to one key
//! - **Refreshable**: The notification capability observers implement
//! - **EventBus**: An embedded in-process event service backing it all
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use procvar::{int_key, Event, EventBus, ProcessVariable, Refreshable};
//!
//! let bus = Arc::new(EventBus::default());
//!
//! let temperature = ProcessVariable::new(
//!     Event::system("TCS", "filter"),
//!     int_key("temperature"),
//!     bus.clone(),
//! );
//!
//! temperature.set(42)?;
//! assert_eq!(temperature.get()?, 42);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod bus;
pub mod error;
pub mod event;
pub mod key;
pub mod params;
pub mod service;
pub mod value;
pub mod variable;

// Re-export primary types at crate root for convenience
pub use bus::{BusSubscription, EventBus, EventBusConfig, PeriodicPublisher};
pub use error::{PvError, PvResult, TransportError};
pub use event::{Event, EventId, EventInfo, EventKey, EventKind};
pub use key::{bool_key, double_key, int_key, string_key, time_key, Key, Units};
pub use params::{Parameter, Params};
pub use service::{EventCallback, EventService, Subscription, SubscriptionId};
pub use value::{FieldValue, Value};
pub use variable::{ProcessVariable, Refreshable};
