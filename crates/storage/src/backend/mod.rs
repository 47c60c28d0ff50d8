//! Storage backend trait and implementations.
//!
//! The image cache never touches the filesystem directly; it goes through a
//! [`StorageBackend`] so that tests can swap the local filesystem for an
//! in-memory [`MockBackend`].

mod local;
#[cfg(feature = "mock")]
mod mock;

pub use self::local::LocalBackend;
#[cfg(feature = "mock")]
pub use self::mock::MockBackend;
use crate::error::Result;
use crate::file::FileInfo;
use async_trait::async_trait;
use futures::{Stream, TryStreamExt};
use std::path::{Path, PathBuf};
use std::pin::Pin;

pub(crate) type FileInfoStream<'a> = Pin<Box<dyn Stream<Item = Result<FileInfo>> + Send + 'a>>;

/// Unified interface for storage backends.
///
/// # Path Handling
/// All paths are relative to the storage root and must be validated using
/// [`validate_path`](crate::validate_path) before use. Implementations should
/// enforce this validation.
///
/// # Examples
///
/// ```
/// use wallrand_storage::{backend::StorageBackend, error::Result};
///
/// async fn bytes_on_disk(backend: &dyn StorageBackend) -> Result<u64> {
///     Ok(backend.list().await?.iter().map(|file| file.size).sum())
/// }
/// ```
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Absolute location of a relative path, for backends that have one.
    ///
    /// The platform adapter needs a real file on disk to hand to the
    /// desktop environment; in-memory backends return `None`.
    fn locate(&self, path: &Path) -> Option<PathBuf>;

    /// List every file in the backend.
    ///
    /// Default implementation collects [`list_stream()`](Self::list_stream)
    /// into a [`Vec`].
    async fn list(&self) -> Result<Vec<FileInfo>> {
        self.list_stream().try_collect().await
    }

    /// Stream metadata for every file in the backend. An empty or missing
    /// root yields an empty stream rather than an error.
    fn list_stream(&self) -> FileInfoStream<'_>;

    /// Check if a file exists.
    async fn exists(&self, path: &Path) -> Result<bool>;

    /// Write file contents, creating parent directories as needed and
    /// overwriting any existing file.
    async fn write(&self, path: &Path, data: &[u8]) -> Result<()>;

    /// Delete a file.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the file
    /// does not exist.
    async fn delete(&self, path: &Path) -> Result<()>;

    /// Rename a file within the same backend, overwriting the destination.
    ///
    /// Used to publish a fully written file under its final name so a
    /// half-written image is never visible at a cache path.
    async fn rename(&self, from: &Path, to: &Path) -> Result<()>;
}
