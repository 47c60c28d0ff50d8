//! Library Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A library error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Why a selection run ended without a wallpaper.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Every candidate was rejected, or the attempt limit was reached.
    #[display("no suitable wallpaper found after {attempts} attempts: {summary}")]
    NoCandidates { attempts: u32, summary: String },
    /// The overall deadline passed before a candidate validated.
    #[display("gave up after {attempts} attempts when the deadline passed: {summary}")]
    Timeout { attempts: u32, summary: String },
    /// The image cache failed in a way that no other candidate would avoid.
    #[display("image cache failure")]
    Cache,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::NoCandidates { .. } | Self::Timeout { .. })
    }
}
