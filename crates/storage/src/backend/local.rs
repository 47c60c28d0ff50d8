//! Local filesystem storage backend.
//!
//! Files are stored under a root directory and accessed via `tokio::fs`.

use crate::backend::FileInfoStream;
use crate::error::ErrorKind;
use crate::{FileInfo, StorageBackend, error::Result, path::validate as validate_path};
use async_stream::stream;
use async_trait::async_trait;
use exn::ResultExt;
use std::fs::create_dir_all as sync_create_dir;
use std::path::{Path, PathBuf};
use tokio::fs::{self, DirEntry};
use tracing::{debug, trace};

enum WalkEntry {
    File(FileInfo),
    Descend(PathBuf),
    Skip,
}

/// Local filesystem storage backend.
///
/// # Examples
///
/// ```no_run
/// use wallrand_storage::backend::LocalBackend;
///
/// let backend = LocalBackend::new("/home/me/.cache/wallrand/images");
/// assert!(backend.is_ok());
/// ```
#[derive(Clone)]
pub struct LocalBackend {
    root: PathBuf,
}
impl LocalBackend {
    /// Create a new local filesystem backend, creating the root directory if
    /// it does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidPath`](ErrorKind::InvalidPath) if the path is not
    /// absolute or exists but is not a directory.
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_absolute() {
            exn::bail!(ErrorKind::InvalidPath(root));
        }
        if root.exists() {
            if !root.is_dir() {
                exn::bail!(ErrorKind::InvalidPath(root));
            }
        } else {
            // Non-async on purpose; it happens once per run and isn't worth
            // making the constructor async.
            sync_create_dir(&root).map_err(|e| Self::map_io_error(e, &root))?;
            debug!(root = %root.display(), "created image directory");
        }
        Ok(Self { root })
    }

    fn absolute_path(&self, path: impl AsRef<Path>) -> Result<PathBuf> {
        let validated = validate_path(path.as_ref())?;
        Ok(self.root.join(validated))
    }

    fn relative_path(&self, absolute: impl AsRef<Path>) -> Result<PathBuf> {
        let absolute = absolute.as_ref();
        let relative = absolute.strip_prefix(&self.root).or_raise(|| ErrorKind::OutsideRoot(absolute.to_path_buf()))?;
        validate_path(relative)
    }

    fn map_io_error(e: std::io::Error, path: &Path) -> ErrorKind {
        match e.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::NotFound(path.to_path_buf()),
            std::io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied(path.to_path_buf()),
            _ => ErrorKind::Io(e),
        }
    }

    /// Classifies one directory entry so the walking stream below can stay
    /// free of `?`-less error juggling.
    async fn process_entry(&self, entry: DirEntry) -> Result<WalkEntry> {
        let path = entry.path();
        let metadata = entry.metadata().await.map_err(|e| Self::map_io_error(e, &path))?;
        if metadata.is_dir() {
            return Ok(WalkEntry::Descend(path));
        }
        if metadata.is_file() {
            return Ok(WalkEntry::File(FileInfo::new(self.relative_path(&path)?, metadata.len())));
        }
        // Broken symlinks and other oddities are silently dropped.
        Ok(WalkEntry::Skip)
    }
}

#[async_trait]
impl StorageBackend for LocalBackend {
    fn locate(&self, path: &Path) -> Option<PathBuf> {
        self.absolute_path(path).ok()
    }

    fn list_stream(&self) -> FileInfoStream<'_> {
        let mut stack = vec![self.root.clone()];
        Box::pin(stream! {
            'dirs: while let Some(current) = stack.pop() {
                let mut entries = match fs::read_dir(&current).await {
                    Ok(entries) => entries,
                    Err(err) if err.kind() == std::io::ErrorKind::NotFound => continue 'dirs,
                    Err(err) => {
                        yield Err(exn::Exn::from(Self::map_io_error(err, &current)));
                        continue 'dirs;
                    }
                };
                'entries: loop {
                    let entry = match entries.next_entry().await {
                        Ok(Some(entry)) => entry,
                        Ok(None) => break 'entries,
                        Err(e) => { yield Err(exn::Exn::from(Self::map_io_error(e, &current))); continue 'entries; },
                    };
                    match self.process_entry(entry).await {
                        Ok(WalkEntry::File(f)) => yield Ok(f),
                        Ok(WalkEntry::Descend(d)) => stack.push(d),
                        Ok(WalkEntry::Skip) => {},
                        Err(e) => yield Err(e),
                    };
                }
            }
        })
    }

    async fn exists(&self, path: &Path) -> Result<bool> {
        let abs_path = self.absolute_path(path)?;
        Ok(fs::try_exists(&abs_path).await.map_err(ErrorKind::Io)?)
    }

    async fn write(&self, path: &Path, data: &[u8]) -> Result<()> {
        let abs_path = self.absolute_path(path)?;
        if let Some(parent) = abs_path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| Self::map_io_error(e, path))?;
        }
        Ok(fs::write(&abs_path, data).await.map_err(|e| Self::map_io_error(e, path))?)
    }

    async fn delete(&self, path: &Path) -> Result<()> {
        let abs_path = self.absolute_path(path)?;
        fs::remove_file(&abs_path).await.map_err(|e| Self::map_io_error(e, path))?;
        // Prune the fan-out directory once its last image is gone; failure
        // just means it still has siblings.
        if let Some(parent) = abs_path.parent()
            && parent != self.root
            && fs::remove_dir(parent).await.is_ok()
        {
            trace!(dir = %parent.display(), "pruned empty fan-out directory");
        }
        Ok(())
    }

    async fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        let from_path = self.absolute_path(from)?;
        let to_path = self.absolute_path(to)?;
        if let Some(parent) = to_path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| Self::map_io_error(e, to))?;
        }
        Ok(fs::rename(&from_path, &to_path).await.map_err(|e| Self::map_io_error(e, from))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> (tempfile::TempDir, LocalBackend) {
        let temp_dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new(temp_dir.path()).unwrap();
        (temp_dir, backend)
    }

    #[test]
    fn test_new_requires_absolute_path() {
        let temp_dir = tempfile::tempdir().unwrap();
        assert!(LocalBackend::new(temp_dir.path()).is_ok());
        assert!(LocalBackend::new("relative/path").is_err());
    }

    #[test]
    fn test_new_creates_root() {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path().join("nested/images");
        LocalBackend::new(&root).unwrap();
        assert!(root.is_dir());
    }

    #[test]
    fn test_locate() {
        let (temp_dir, backend) = backend();
        assert_eq!(backend.locate(Path::new("ab/abc.png")), Some(temp_dir.path().join("ab/abc.png")));
        assert_eq!(backend.locate(Path::new("../escape.png")), None);
    }

    #[tokio::test]
    async fn test_write_then_list() {
        let (temp_dir, backend) = backend();
        backend.write(Path::new("ab/abc.png"), b"not really a png").await.unwrap();
        assert_eq!(std::fs::read(temp_dir.path().join("ab/abc.png")).unwrap(), b"not really a png");
        let files = backend.list().await.unwrap();
        assert_eq!(files, vec![FileInfo::new("ab/abc.png", 16)]);
    }

    #[tokio::test]
    async fn test_delete_prunes_empty_fanout_directory() {
        let (temp_dir, backend) = backend();
        backend.write(Path::new("ab/abc.png"), b"data").await.unwrap();
        backend.delete(Path::new("ab/abc.png")).await.unwrap();
        assert!(!backend.exists(Path::new("ab/abc.png")).await.unwrap());
        assert!(!temp_dir.path().join("ab").exists());
        let err = backend.delete(Path::new("ab/abc.png")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[tokio::test]
    async fn test_rename_publishes_file() {
        let (temp_dir, backend) = backend();
        backend.write(Path::new("ab/abc.png.part"), b"data").await.unwrap();
        backend.rename(Path::new("ab/abc.png.part"), Path::new("ab/abc.png")).await.unwrap();
        assert!(!backend.exists(Path::new("ab/abc.png.part")).await.unwrap());
        assert_eq!(std::fs::read(temp_dir.path().join("ab/abc.png")).unwrap(), b"data");
    }

    #[tokio::test]
    async fn test_list_recurses_into_fanout_directories() {
        let (_temp_dir, backend) = backend();
        assert!(backend.list().await.unwrap().is_empty());
        backend.write(Path::new("ab/one.png"), b"1").await.unwrap();
        backend.write(Path::new("ab/two.jpg"), b"22").await.unwrap();
        backend.write(Path::new("cd/three.png"), b"333").await.unwrap();
        let mut files = backend.list().await.unwrap();
        files.sort_by(|a, b| a.path.cmp(&b.path));
        let sizes: Vec<u64> = files.iter().map(|f| f.size).collect();
        assert_eq!(sizes, vec![1, 2, 3]);
        assert_eq!(files[2].path, PathBuf::from("cd/three.png"));
    }

    #[tokio::test]
    async fn test_path_security() {
        let (_temp_dir, backend) = backend();
        assert!(backend.exists(Path::new("../etc/passwd")).await.is_err());
        assert!(backend.write(Path::new("../escape"), b"data").await.is_err());
        assert!(backend.delete(Path::new("../../file")).await.is_err());
        assert!(backend.rename(Path::new("ok.png"), Path::new("../out.png")).await.is_err());
    }
}
