//! Registry error types and result alias.
//!
//! Every [`RegistrationRepository`](crate::RegistrationRepository) and
//! [`KeyChainRepository`](crate::KeyChainRepository) implementation maps its
//! internal failures onto [`RegistryError`]. "Not found" is *not* an error for
//! lookups: repositories return `Ok(None)` and reserve `Err` for
//! infrastructure failures, so callers can tell a permanent miss from a
//! transient outage.
//!
//! # Example
//!
//! ```
//! use lti_core_registration::{RegistryError, RegistryResult};
//!
//! fn lookup(client_id: &str) -> RegistryResult<Option<String>> {
//!     Err(RegistryError::connection(format!("registry unreachable for {client_id}")))
//! }
//!
//! assert!(lookup("client-1").unwrap_err().is_transient());
//! ```

use std::sync::Arc;

use thiserror::Error;

/// A shared error type for source chain tracking.
pub type BoxError = Arc<dyn std::error::Error + Send + Sync>;

/// Result type alias for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Errors that can occur while reading or writing registrations and key chains.
///
/// # Non-exhaustive
///
/// New variants may be added in minor releases. Downstream match expressions
/// must include a wildcard arm (`_ =>`).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RegistryError {
    /// The entity targeted by a mutation does not exist.
    #[error("Entity not found: {id}")]
    NotFound {
        /// Identifier of the missing entity.
        id: String,
    },

    /// An entity with the same identifier already exists.
    #[error("Entity already exists: {id}")]
    Conflict {
        /// Identifier that collided.
        id: String,
    },

    /// The backing store could not be reached.
    #[error("Connection error: {message}")]
    Connection {
        /// Description of the connection failure.
        message: String,
        /// The underlying error, if any.
        #[source]
        source: Option<BoxError>,
    },

    /// The backing store did not answer in time.
    #[error("Operation timeout")]
    Timeout,

    /// Catch-all for backend-specific failures.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the failure.
        message: String,
        /// The underlying error, if any.
        #[source]
        source: Option<BoxError>,
    },
}

impl RegistryError {
    /// Creates a new `NotFound` error.
    #[must_use]
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into() }
    }

    /// Creates a new `Conflict` error.
    #[must_use]
    pub fn conflict(id: impl Into<String>) -> Self {
        Self::Conflict { id: id.into() }
    }

    /// Creates a new `Connection` error with the given message.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection { message: message.into(), source: None }
    }

    /// Creates a new `Connection` error with a message and source error.
    #[must_use]
    pub fn connection_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Connection { message: message.into(), source: Some(Arc::new(source)) }
    }

    /// Creates a new `Timeout` error.
    #[must_use]
    pub fn timeout() -> Self {
        Self::Timeout
    }

    /// Creates a new `Internal` error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal { message: message.into(), source: None }
    }

    /// Creates a new `Internal` error with a message and source error.
    #[must_use]
    pub fn internal_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Internal { message: message.into(), source: Some(Arc::new(source)) }
    }

    /// Returns `true` for failures a caller may reasonably retry.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Connection { .. } | Self::Timeout)
    }
}
