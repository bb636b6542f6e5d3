//! Error handling for FieldCanvas
//!
//! Provides error types for every layer of the canvas:
//! - Backend errors (create/update/delete/fetch failures)
//! - Validation errors (field invariants rejected before dispatch)
//! - Sync errors (id resolution and finalize failures)
//!
//! All error types use `thiserror` for ergonomic error handling.

use thiserror::Error;

use crate::data::{FieldKey, LocalId};

/// Backend error type
///
/// Failures reported by the remote field store. The canvas keeps its
/// optimistic local state on any of these; the next scheduled write is the
/// retry path.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BackendError {
    /// Network failure reaching the backend
    #[error("Network error: {message}")]
    Network {
        /// A message describing the failure.
        message: String,
    },

    /// Request timed out
    #[error("Backend request timed out after {timeout_ms}ms")]
    Timeout {
        /// The timeout duration in milliseconds.
        timeout_ms: u64,
    },

    /// Addressed record does not exist
    #[error("Not found: {what}")]
    NotFound {
        /// What was looked up.
        what: String,
    },

    /// Backend refused the request
    #[error("Request rejected ({status}): {reason}")]
    Rejected {
        /// Status code returned by the backend.
        status: u16,
        /// The reason given for the rejection.
        reason: String,
    },
}

impl BackendError {
    pub fn network(message: impl Into<String>) -> Self {
        BackendError::Network {
            message: message.into(),
        }
    }

    /// Transient failures are retried by the next scheduled write.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            BackendError::Network { .. } | BackendError::Timeout { .. }
        )
    }
}

/// Validation error type
///
/// Field invariants checked synchronously before a patch is dispatched, so
/// the originating form can block its save.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Radio fields must belong to a group
    #[error("Radio field {key} has no group id")]
    RadioWithoutGroup {
        /// The offending field.
        key: FieldKey,
    },

    /// Select fields need at least one option
    #[error("Select field {key} has no options")]
    SelectWithoutOptions {
        /// The offending field.
        key: FieldKey,
    },

    /// Checkbox/radio fields are single line
    #[error("Boolean field {key} cannot span {line_count} lines")]
    MultiLineBoolean {
        /// The offending field.
        key: FieldKey,
        /// The requested line count.
        line_count: u32,
    },

    /// Line count must be at least one
    #[error("Field {key} has a zero line count")]
    ZeroLineCount {
        /// The offending field.
        key: FieldKey,
    },

    /// Geometry is non-finite or outside the image
    #[error("Invalid geometry for {key}: {reason}")]
    InvalidGeometry {
        /// The offending field.
        key: FieldKey,
        /// What is wrong with it.
        reason: String,
    },
}

/// Sync error type
///
/// Failures of the create/update pipeline that outlive a single request.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SyncError {
    /// Create response carried no id
    #[error("Create response for {local} carried no id")]
    MissingId {
        /// The field still addressed locally.
        local: LocalId,
    },

    /// Some writes still failed after a flush
    #[error("Finalize failed: {failures} write(s) did not complete")]
    FinalizeFailed {
        /// Number of failed writes.
        failures: usize,
    },

    /// In-flight creates did not resolve in time
    #[error("Timed out waiting for {pending} create(s)")]
    CreateTimeout {
        /// Number of creates still in flight.
        pending: usize,
    },

    /// No field is addressed by this key
    #[error("Unknown field {key}")]
    UnknownField {
        /// The key that failed to resolve.
        key: FieldKey,
    },
}

/// Main error type for FieldCanvas
///
/// A unified error type that can represent any error from all layers.
#[derive(Error, Debug)]
pub enum Error {
    /// Backend error
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// Validation error
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Sync error
    #[error(transparent)]
    Sync(#[from] SyncError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an error from a string message
    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }

    /// Check if this is a transient backend failure
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Backend(e) if e.is_transient())
    }

    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation(_))
    }

    /// Check if this is a sync error
    pub fn is_sync(&self) -> bool {
        matches!(self, Error::Sync(_))
    }
}

/// Result type using Error
pub type Result<T> = std::result::Result<T, Error>;
