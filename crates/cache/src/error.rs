//! Cache Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A cache error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for cache operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("index database error")]
    Database,
    #[display("index database migration error")]
    Migration,
    /// Another process kept the cache directory locked, or the lock file
    /// could not be opened.
    #[display("could not lock cache directory {}", _0.display())]
    Lock(#[error(not(source))] PathBuf),
    /// Reading or writing a backing file failed.
    #[display("image storage error")]
    Storage,
    /// An index record points at a backing file that no longer exists. The
    /// record has already been dropped; treat this as a miss.
    #[display("cache corruption: backing file for {_0} is missing")]
    Corruption(#[error(not(source))] String),
    /// The image alone is larger than the whole cache budget.
    #[display("image of {size} bytes exceeds the cache budget of {budget} bytes")]
    ExceedsBudget { size: u64, budget: u64 },
    /// Serialization/deserialization error.
    #[display("invalid cache data: {_0}")]
    InvalidData(#[error(not(source))] &'static str),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Corruption(_))
    }
}
