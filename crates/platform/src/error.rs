//! Platform Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A platform error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for platform operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// None of the tools this desktop can use are installed.
    #[display("no wallpaper tool found; install one of: {_0}")]
    ToolNotFound(#[error(not(source))] &'static str),
    /// A tool could not be started at all.
    #[display("could not run {_0}")]
    Spawn(#[error(not(source))] String),
    /// A tool ran and reported failure.
    #[display("{program} failed ({status}): {stderr}")]
    CommandFailed { program: String, status: String, stderr: String },
    #[display("image file not found: {}", _0.display())]
    FileNotFound(#[error(not(source))] PathBuf),
    /// This build cannot drive the requested desktop.
    #[display("setting the wallpaper on {_0} is not supported by this build")]
    Unsupported(#[error(not(source))] &'static str),
    /// A native desktop API call failed.
    #[display("desktop API call failed")]
    Native,
    #[display("unknown {field}: {value}")]
    ParseError { field: &'static str, value: String },
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::CommandFailed { .. } | Self::Native)
    }
}
