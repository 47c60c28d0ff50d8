//! Error types for the [`download`](super) module.
//!
//! Every kind except [`ErrorKind::Cache`] is about one candidate only; the
//! [`Selector`](crate::Selector) records it and moves on to the next
//! candidate.

use derive_more::{Display, Error};
use wallrand_fetch::ImageFormat;

/// A per-candidate validation error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for download and validation.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Timeout, connection failure or a non-2xx response.
    #[display("could not download {_0}")]
    Download(#[error(not(source))] String),
    /// The bytes are not an image in a supported format.
    #[display("{_0} is not a supported image")]
    Decode(#[error(not(source))] String),
    /// The decoded image is too small or in a format that is not allowed.
    #[display("{width}x{height} {format} image does not meet the requirements")]
    ResolutionRejected { width: u32, height: u32, format: ImageFormat },
    /// The image alone is larger than the whole cache budget.
    #[display("image of {size} bytes exceeds the cache budget of {budget} bytes")]
    ExceedsBudget { size: u64, budget: u64 },
    /// The cache index or image storage failed.
    #[display("image cache failure")]
    Cache,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Download(_))
    }
}
