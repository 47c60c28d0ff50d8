//! Configuration Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A configuration error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for configuration operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// No configuration file; `wallrand init` creates one.
    #[display("configuration file not found: {} (run `wallrand init` to create one)", _0.display())]
    NotFound(#[error(not(source))] PathBuf),
    /// The file exists but is not valid YAML for the expected shape.
    #[display("could not parse configuration file {}", _0.display())]
    Parse(#[error(not(source))] PathBuf),
    /// The configuration parsed but its values are unusable.
    #[display("invalid configuration: {_0}")]
    Validation(#[error(not(source))] String),
    #[display("could not write {}", _0.display())]
    Io(#[error(not(source))] PathBuf),
    /// Refusing to overwrite an existing file without `--force`.
    #[display("configuration file already exists: {}", _0.display())]
    AlreadyExists(#[error(not(source))] PathBuf),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}
