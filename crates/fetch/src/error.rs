//! Fetch Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A fetch error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for fetch operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// A source could not be listed; other sources are unaffected.
    #[display("source r/{_0} is unavailable")]
    SourceUnavailable(#[error(not(source))] String),
    /// The listing API rejected the configured credentials.
    #[display("authentication with the listing API failed")]
    Authentication,
    /// Connection failure or timeout.
    #[display("request to the listing API failed")]
    Request,
    /// The API answered with a non-success status code.
    #[display("listing API responded with status {_0}")]
    Status(#[error(not(source))] u16),
    /// The response body did not have the expected shape.
    #[display("unexpected listing payload")]
    InvalidPayload,
    /// A sort mode, time window or format name was not recognised.
    #[display("unknown {field}: {value}")]
    ParseError { field: &'static str, value: String },
    /// The HTTP client could not be constructed from the given settings.
    #[display("invalid client configuration: {_0}")]
    InvalidConfig(#[error(not(source))] &'static str),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Request | Self::SourceUnavailable(_) => true,
            Self::Status(code) => *code == 429 || *code >= 500,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(ErrorKind::Status(503), true)]
    #[case(ErrorKind::Status(429), true)]
    #[case(ErrorKind::Status(404), false)]
    #[case(ErrorKind::Authentication, false)]
    #[case(ErrorKind::Request, true)]
    fn test_retryable(#[case] kind: ErrorKind, #[case] expected: bool) {
        assert_eq!(kind.is_retryable(), expected);
    }

    #[test]
    fn test_display() {
        assert_eq!(ErrorKind::SourceUnavailable("wallpapers".into()).to_string(), "source r/wallpapers is unavailable");
    }
}
