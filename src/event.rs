//! Event snapshots and their identities.
//!
//! An [`Event`] is an immutable structured record: a stable [`EventKey`]
//! identity, a timestamp, and a [`Params`] collection. Two kinds exist,
//! system and observe; both carry the same payload shape and support the
//! same merge and extract operations, so code holding an `Event` never needs
//! to branch on kind.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::params::{Parameter, Params};

/// Globally unique identifier for one event revision.
///
/// Every merge produces a new revision with a fresh id; the id never
/// identifies a key, only a concrete snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(Uuid);

impl EventId {
    /// Creates a new random event id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wraps an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stable string identity routing stream deliveries.
///
/// Rendered as `source.name`, e.g. `TCS.filter.wheel.position` for a source
/// prefix `TCS.filter.wheel` and event name `position`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventKey {
    source: String,
    name: String,
}

impl EventKey {
    /// Creates a key from a source prefix and an event name.
    #[must_use]
    pub fn new(source: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            name: name.into(),
        }
    }

    /// Parses a full `source.name` string. The last dot-separated segment is
    /// the event name; everything before it is the source prefix.
    #[must_use]
    pub fn parse(full: &str) -> Option<Self> {
        let (source, name) = full.rsplit_once('.')?;
        if source.is_empty() || name.is_empty() {
            return None;
        }
        Some(Self::new(source, name))
    }

    /// The source prefix.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The event name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for EventKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.source, self.name)
    }
}

/// The two event kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Generic system state event.
    System,
    /// Observation-flow event.
    Observe,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::System => write!(f, "system"),
            Self::Observe => write!(f, "observe"),
        }
    }
}

/// Payload shared by both event kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventInfo {
    /// Identifier of this revision.
    pub id: EventId,
    /// Stable routing identity.
    pub key: EventKey,
    /// Revision timestamp.
    pub time: DateTime<Utc>,
    /// Named fields.
    pub params: Params,
}

impl EventInfo {
    fn fresh(key: EventKey) -> Self {
        Self {
            id: EventId::new(),
            key,
            time: Utc::now(),
            params: Params::new(),
        }
    }
}

/// An immutable event snapshot.
///
/// # Examples
///
/// ```
/// use procvar::{int_key, Event};
///
/// let temperature = int_key("temperature");
/// let event = Event::system("TCS", "filter").add(temperature.set(42));
/// assert_eq!(event.params().first_value(&temperature).unwrap(), 42);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "event", rename_all = "snake_case")]
pub enum Event {
    /// Generic system state event.
    System(EventInfo),
    /// Observation-flow event.
    Observe(EventInfo),
}

impl Event {
    /// Creates an empty system event.
    #[must_use]
    pub fn system(source: impl Into<String>, name: impl Into<String>) -> Self {
        Self::System(EventInfo::fresh(EventKey::new(source, name)))
    }

    /// Creates an empty observe event.
    #[must_use]
    pub fn observe(source: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Observe(EventInfo::fresh(EventKey::new(source, name)))
    }

    /// The shared payload.
    #[must_use]
    pub const fn info(&self) -> &EventInfo {
        match self {
            Self::System(info) | Self::Observe(info) => info,
        }
    }

    /// This event's kind tag.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::System(_) => EventKind::System,
            Self::Observe(_) => EventKind::Observe,
        }
    }

    /// Identifier of this revision.
    #[must_use]
    pub const fn id(&self) -> EventId {
        self.info().id
    }

    /// Stable routing identity.
    #[must_use]
    pub const fn key(&self) -> &EventKey {
        &self.info().key
    }

    /// Revision timestamp.
    #[must_use]
    pub const fn time(&self) -> DateTime<Utc> {
        self.info().time
    }

    /// Named fields.
    #[must_use]
    pub const fn params(&self) -> &Params {
        &self.info().params
    }

    /// Returns a new revision with `param` upserted.
    ///
    /// The returned event keeps the kind and key but carries a fresh id and
    /// timestamp; `self` is never mutated.
    #[must_use]
    pub fn add(&self, param: Parameter) -> Self {
        self.revised(self.params().with(param))
    }

    /// Returns a new revision with every parameter upserted.
    #[must_use]
    pub fn madd(&self, params: impl IntoIterator<Item = Parameter>) -> Self {
        self.revised(self.params().madd(params))
    }

    fn revised(&self, params: Params) -> Self {
        let info = EventInfo {
            id: EventId::new(),
            key: self.info().key.clone(),
            time: Utc::now(),
            params,
        };

        match self {
            Self::System(_) => Self::System(info),
            Self::Observe(_) => Self::Observe(info),
        }
    }
}
