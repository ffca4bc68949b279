//! Shared error type for the cycle tracker.

use thiserror::Error;

/// Errors produced by the engine and its storage layer.
///
/// Validation failures are raised before any write happens, and "absent"
/// (`NotFound`) is kept distinct from "broken" (`Sqlite`) so callers can
/// tell the two apart.
#[derive(Debug, Error)]
pub enum Error {
    /// Input was rejected before any write.
    #[error("validation error: {0}")]
    Validation(String),

    /// The requested entity does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Failed to parse a persisted timestamp.
    #[error("invalid timestamp for cycle {id}: {value}")]
    TimestampParse {
        id: i64,
        value: String,
        #[source]
        source: chrono::ParseError,
    },
}

impl Error {
    /// Returns true if this error denotes a missing entity rather than a
    /// storage or validation failure.
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Convenience alias used across the workspace.
pub type Result<T, E = Error> = std::result::Result<T, E>;
