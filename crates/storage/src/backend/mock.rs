//! In-memory storage backend for testing.

use super::FileInfoStream;
use crate::StorageBackend;
use crate::error::{ErrorKind, Result};
use crate::file::FileInfo;
use crate::path::validate as validate_path;
use async_stream::stream;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

/// In-memory storage backend for testing.
///
/// Files are stored in a `HashMap` behind a [`RwLock`], so all trait methods
/// operate on `&self` without external synchronisation.
///
/// # Examples
///
/// ```
/// use wallrand_storage::backend::{MockBackend, StorageBackend};
/// use std::path::Path;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let backend = MockBackend::with_files([("ab/abc.png", b"png bytes")]);
/// assert!(backend.exists(Path::new("ab/abc.png")).await.unwrap());
/// # }
/// ```
pub struct MockBackend {
    storage: RwLock<HashMap<PathBuf, Vec<u8>>>,
}

impl MockBackend {
    /// Create a mock backend pre-populated with files.
    ///
    /// Panics if any path fails validation; a broken test setup should not
    /// produce a passing test.
    pub fn with_files(files: impl IntoIterator<Item = (impl Into<PathBuf>, impl Into<Vec<u8>>)>) -> Self {
        let map = files
            .into_iter()
            .map(|(path, data)| {
                let path = path.into();
                let Ok(validated) = validate_path(&path) else {
                    panic!("MockBackend::with_files: invalid path {}", path.display());
                };
                (validated, data.into())
            })
            .collect();
        Self { storage: RwLock::new(map) }
    }

    /// Number of files currently stored.
    pub async fn len(&self) -> usize {
        self.storage.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.storage.read().await.is_empty()
    }

    /// Contents of a stored file, if present.
    pub async fn contents(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        let path = validate_path(path).ok()?;
        self.storage.read().await.get(&path).cloned()
    }

    fn missing(path: PathBuf) -> crate::error::Error {
        exn::Exn::from(ErrorKind::NotFound(path))
    }
}
impl Default for MockBackend {
    fn default() -> Self {
        let files: [(&str, &[u8]); 0] = [];
        Self::with_files(files)
    }
}

#[async_trait]
impl StorageBackend for MockBackend {
    fn locate(&self, _path: &Path) -> Option<PathBuf> {
        None
    }

    fn list_stream(&self) -> FileInfoStream<'_> {
        Box::pin(stream! {
            // Snapshot under the read lock, then release it before yielding.
            let entries: Vec<FileInfo> = {
                let guard = self.storage.read().await;
                guard.iter().map(|(path, data)| FileInfo::new(path.clone(), data.len() as u64)).collect()
            };
            for info in entries {
                yield Ok(info);
            }
        })
    }

    async fn exists(&self, path: &Path) -> Result<bool> {
        let path = validate_path(path)?;
        Ok(self.storage.read().await.contains_key(&path))
    }

    async fn write(&self, path: &Path, data: &[u8]) -> Result<()> {
        let path = validate_path(path)?;
        self.storage.write().await.insert(path, data.to_vec());
        Ok(())
    }

    async fn delete(&self, path: &Path) -> Result<()> {
        let path = validate_path(path)?;
        self.storage.write().await.remove(&path).map(|_| ()).ok_or_else(|| Self::missing(path))
    }

    async fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        let from = validate_path(from)?;
        let to = validate_path(to)?;
        let mut guard = self.storage.write().await;
        let data = guard.remove(&from).ok_or_else(|| Self::missing(from))?;
        guard.insert(to, data);
        Ok(())
    }
}
