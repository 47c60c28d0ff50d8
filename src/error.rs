//! CLI Error Types
//!
//! Each kind carries the human-readable message of the failure underneath
//! it, which is what ends up on stderr.

use derive_more::{Display, Error};

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("{_0}")]
    Config(#[error(not(source))] String),
    #[display("{_0}")]
    Cache(#[error(not(source))] String),
    /// Building an HTTP client or listing source failed.
    #[display("{_0}")]
    Setup(#[error(not(source))] String),
    #[display("{_0}")]
    Selection(#[error(not(source))] String),
    #[display("the selected image is not stored on disk")]
    NotOnDisk,
    #[display("failed to set the wallpaper with the {_0} adapter")]
    Wallpaper(#[error(not(source))] &'static str),
}

/// Raise a lower-level error into `kind`, keeping its message.
pub fn context<T, E>(result: std::result::Result<T, exn::Exn<E>>, kind: impl FnOnce(String) -> ErrorKind) -> Result<T>
where
    E: std::error::Error + Send + Sync + 'static,
{
    use exn::ResultExt;
    match result {
        Ok(value) => Ok(value),
        Err(err) => {
            let message = (*err).to_string();
            Err(err).or_raise(|| kind(message))
        },
    }
}
