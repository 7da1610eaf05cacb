//! Error types for procvar.
//!
//! All errors are strongly typed using thiserror. Transport-level failures
//! (the event-stream collaborator) are kept separate from the crate-level
//! taxonomy so callers can pattern match on the condition they can actually
//! handle.

use thiserror::Error;

/// Failures reported by the event-stream collaborator.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The collaborator could not be reached.
    #[error("Connection failed: {message}")]
    ConnectionFailed {
        /// Human-readable cause.
        message: String,
    },

    /// A channel to the collaborator closed.
    #[error("Disconnected: {path}")]
    Disconnected {
        /// Which internal path disconnected.
        path: String,
    },

    /// A bounded queue refused the message.
    #[error("Queue full: {path}")]
    QueueFull {
        /// Which internal queue was full.
        path: String,
    },

    /// The collaborator did not answer in time.
    #[error("Operation timed out after {duration_ms}ms")]
    Timeout {
        /// Elapsed wait in milliseconds.
        duration_ms: u64,
    },

    /// The collaborator's backing state is unusable.
    #[error("Transport backend error: {message}")]
    Backend {
        /// Human-readable cause.
        message: String,
    },
}

/// Top-level error type for procvar operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PvError {
    /// A read found no value for the bound parameter name.
    ///
    /// Raised by `get()` when the parameter was never populated in any
    /// snapshot observed so far.
    #[error("Parameter not found: {name}")]
    NotFound {
        /// The parameter name that was looked up.
        name: String,
    },

    /// A read found the parameter, but it holds a differently-typed value.
    #[error("Parameter '{name}' holds {actual}, expected {expected}")]
    TypeMismatch {
        /// The parameter name that was looked up.
        name: String,
        /// Type name the key is bound to.
        expected: &'static str,
        /// Type name actually stored.
        actual: &'static str,
    },

    /// An outbound publish failed. Local state has already been updated.
    #[error("Publish failed: {0}")]
    Publish(TransportError),

    /// Opening the stream subscription failed.
    #[error("Subscription failed: {0}")]
    Subscribe(TransportError),

    /// Internal invariant violation.
    #[error("Internal error: {message}")]
    Internal {
        /// Human-readable cause.
        message: String,
    },
}

impl PvError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this is a not-found error.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns true if this is a type-mismatch error.
    #[must_use]
    pub const fn is_type_mismatch(&self) -> bool {
        matches!(self, Self::TypeMismatch { .. })
    }

    /// Returns true if this error originated in the transport.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Publish(_) | Self::Subscribe(_))
    }

    /// Returns true if this is an internal error.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Internal { .. })
    }

    /// Returns true if retrying the same operation can succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            // A missing value appears once a write or delivery lands.
            Self::NotFound { .. } => true,
            // Wrong key type won't change on retry.
            Self::TypeMismatch { .. } => false,
            Self::Publish(e) | Self::Subscribe(e) => match e {
                TransportError::ConnectionFailed { .. }
                | TransportError::QueueFull { .. }
                | TransportError::Timeout { .. } => true,
                TransportError::Disconnected { .. } | TransportError::Backend { .. } => false,
            },
            Self::Internal { .. } => false,
        }
    }
}

/// Result type alias for procvar operations.
pub type PvResult<T> = Result<T, PvError>;
