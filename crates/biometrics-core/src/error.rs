//! Ledger-level errors
//!
//! These are the only errors the ledgers and the chart aggregator return.
//! Callers map them without looking inside the storage layer; "nothing
//! found" results are `None`/`false`, not errors.

use thiserror::Error;

use crate::storage::StorageError;

/// Errors returned by ledger and aggregator operations
#[derive(Error, Debug)]
pub enum Error {
    /// A caller-supplied value violates a documented constraint
    #[error("Invalid input: {0}")]
    Validation(String),

    /// A local day string did not parse as `YYYY-MM-DD`
    #[error("Invalid day '{day}': expected a calendar date in YYYY-MM-DD form")]
    InvalidDayFormat { day: String },

    /// The underlying store failed
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// An explicitly addressed event does not exist
    #[error("Not found: {0}")]
    NotFound(String),
}

impl Error {
    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }

    /// Whether the caller supplied bad input (as opposed to a storage fault)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::Validation(_) | Error::InvalidDayFormat { .. } | Error::NotFound(_)
        )
    }
}

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, Error>;
