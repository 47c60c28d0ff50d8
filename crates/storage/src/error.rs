//! Storage Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A storage error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for storage operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Failures of a [`StorageBackend`](crate::StorageBackend) operation.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// No image file at this cache-relative path.
    #[display("no such file in the image store: {}", _0.display())]
    NotFound(#[error(not(source))] PathBuf),
    #[display("cache directory is not writable: {}", _0.display())]
    PermissionDenied(#[error(not(source))] PathBuf),
    #[display("image store I/O failed: {_0}")]
    Io(std::io::Error),
    /// Escapes the image directory, or is not a usable root directory.
    #[display("invalid image store path: {}", _0.display())]
    InvalidPath(#[error(not(source))] PathBuf),
    /// A directory walk produced an entry outside the backend root.
    #[display("{} is outside of the image store", _0.display())]
    OutsideRoot(#[error(not(source))] PathBuf),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_names_the_path() {
        assert_eq!(
            ErrorKind::NotFound(PathBuf::from("ab/abcdef.png")).to_string(),
            "no such file in the image store: ab/abcdef.png"
        );
        assert_eq!(ErrorKind::InvalidPath(PathBuf::from("../x")).to_string(), "invalid image store path: ../x");
    }

    #[test]
    fn test_only_io_is_retryable() {
        assert!(!ErrorKind::NotFound(PathBuf::from("x")).is_retryable());
        assert!(!ErrorKind::OutsideRoot(PathBuf::from("/etc")).is_retryable());
        assert!(ErrorKind::Io(std::io::Error::other("disk full")).is_retryable());
    }
}
