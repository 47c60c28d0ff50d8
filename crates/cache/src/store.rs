//! The size-bounded image cache.

use crate::Database;
use crate::error::{ErrorKind, Result};
use crate::lock::{DirectoryGuard, DirectoryLock};
use crate::models::{CacheKey, CacheStats, CachedImage, VerifyReport};
use crate::repo::{NewImage, Repository};
use exn::ResultExt;
use futures::TryStreamExt;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use time::UtcDateTime;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info, instrument, warn};
use wallrand_storage::backend::LocalBackend;
use wallrand_storage::error::ErrorKind as StorageErrorKind;
use wallrand_storage::{BackendHandle, StorageBackend};

const INDEX_FILE: &str = "index.sqlite";
const IMAGE_DIR: &str = "images";
const PARTIAL_SUFFIX: &str = "part";

/// Budget and integrity settings for a [`CacheStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheOptions {
    /// Upper bound on the summed size of all cached images, in bytes.
    pub budget: u64,
    /// When set, an index record whose backing file has vanished makes
    /// [`CacheStore::get`] fail with [`ErrorKind::Corruption`] instead of
    /// reporting a plain miss.
    pub strict: bool,
}
impl CacheOptions {
    pub fn from_megabytes(megabytes: u64, strict: bool) -> Self {
        Self { budget: megabytes.saturating_mul(1024 * 1024), strict }
    }
}

/// Size-bounded, least-recently-used store of validated wallpaper images.
///
/// Image bytes live in a [`StorageBackend`] (the `images/` directory in
/// production) and the index lives in SQLite. Every mutation holds an
/// in-process lock and, for a store opened on a directory, an exclusive lock
/// on that directory shared with other processes. Both are held across the
/// index transaction and the file work around it.
pub struct CacheStore {
    db: Database,
    repo: Repository,
    backend: BackendHandle,
    options: CacheOptions,
    lock: Mutex<()>,
    directory: Option<DirectoryLock>,
}

/// Both halves of a store's exclusive access; released together on drop.
struct Exclusive<'a> {
    _local: MutexGuard<'a, ()>,
    _directory: Option<DirectoryGuard>,
}

impl CacheStore {
    pub fn new(db: Database, backend: BackendHandle, options: CacheOptions) -> Self {
        let repo = Repository::from(&db);
        Self { db, repo, backend, options, lock: Mutex::new(()), directory: None }
    }

    /// Open (or create) the cache under `cache_dir`: `index.sqlite` plus an
    /// `images/` directory of fanned-out backing files.
    #[instrument("opening image cache", skip_all, fields(dir = %cache_dir.as_ref().display()))]
    pub async fn open(cache_dir: impl AsRef<Path>, options: CacheOptions) -> Result<Self> {
        let cache_dir = cache_dir.as_ref();
        let backend = LocalBackend::new(cache_dir.join(IMAGE_DIR)).or_raise(|| ErrorKind::Storage)?;
        let db = Database::connect(cache_dir.join(INDEX_FILE)).await?;
        let mut store = Self::new(db, Arc::new(backend), options);
        store.directory = Some(DirectoryLock::new(cache_dir));
        Ok(store)
    }

    async fn exclusive(&self) -> Result<Exclusive<'_>> {
        let local = self.lock.lock().await;
        let directory = match &self.directory {
            Some(directory) => Some(directory.acquire().await?),
            None => None,
        };
        Ok(Exclusive { _local: local, _directory: directory })
    }

    fn hydrate(&self, mut image: CachedImage) -> CachedImage {
        image.local_path = self.backend.locate(&image.path);
        image
    }

    /// Look up an image and mark it most recently used.
    ///
    /// A record whose backing file is missing is removed from the index. In
    /// strict mode that is reported as [`ErrorKind::Corruption`]; otherwise
    /// it is a miss.
    #[instrument(skip(self, key), fields(%key))]
    pub async fn get(&self, key: &CacheKey) -> Result<Option<CachedImage>> {
        let _guard = self.exclusive().await?;
        let Some(image) = self.repo.get(key).await? else {
            return Ok(None);
        };
        let present = self.backend.exists(&image.path).await.or_raise(|| ErrorKind::Storage)?;
        if !present {
            self.repo.delete(key).await?;
            if self.options.strict {
                exn::bail!(ErrorKind::Corruption(key.to_string()));
            }
            warn!(path = %image.path.display(), "dropped cache record with missing backing file");
            return Ok(None);
        }
        let touched = self.repo.touch(key, UtcDateTime::now()).await?;
        debug!(hit = touched.is_some(), "cache lookup");
        Ok(touched.map(|image| self.hydrate(image)))
    }

    /// Store an already validated image, then evict least recently used
    /// entries until the cache fits its budget again. The new entry is never
    /// evicted by its own insertion.
    #[instrument(skip(self, key, bytes), fields(%key, size = bytes.len()))]
    pub async fn put(&self, key: &CacheKey, bytes: &[u8], width: u32, height: u32, format: &str) -> Result<CachedImage> {
        let size = bytes.len() as u64;
        if size > self.options.budget {
            exn::bail!(ErrorKind::ExceedsBudget { size, budget: self.options.budget });
        }
        let _guard = self.exclusive().await?;
        let previous = self.repo.get(key).await?;
        let path = key.storage_path(format);
        // Publish under the final name only once fully written.
        let partial = path.with_extension(format!("{format}.{PARTIAL_SUFFIX}"));
        self.backend.write(&partial, bytes).await.or_raise(|| ErrorKind::Storage)?;
        self.backend.rename(&partial, &path).await.or_raise(|| ErrorKind::Storage)?;

        let record = NewImage { key, path: &path, byte_size: size, width, height, format };
        let inserted = match self.repo.insert_and_evict(record, UtcDateTime::now(), self.options.budget).await {
            Ok(inserted) => inserted,
            Err(err) => {
                self.remove_file(&path).await;
                return Err(err);
            },
        };
        if let Some(previous) = previous
            && previous.path != path
        {
            self.remove_file(&previous.path).await;
        }
        for victim in &inserted.evicted {
            info!(key = %victim.key, size = victim.byte_size, "evicted least recently used image");
            self.remove_file(&victim.path).await;
        }
        Ok(self.hydrate(inserted.image))
    }

    /// Evict least recently used entries until the running total fits the
    /// budget. Returns the number of evicted entries.
    pub async fn evict_to_budget(&self) -> Result<usize> {
        let _guard = self.exclusive().await?;
        let evicted = self.repo.evict_to_budget(self.options.budget).await?;
        for victim in &evicted {
            self.remove_file(&victim.path).await;
        }
        Ok(evicted.len())
    }

    /// Delete every backing file (tracked or not) and reset the index.
    /// Returns the number of files removed.
    #[instrument(skip(self))]
    pub async fn clear(&self) -> Result<u64> {
        let _guard = self.exclusive().await?;
        let records = self.repo.clear().await?;
        let files = self.backend.list().await.or_raise(|| ErrorKind::Storage)?;
        let mut removed = 0;
        for file in files {
            self.delete_file(&file.path).await?;
            removed += 1;
        }
        info!(records, files = removed, "cleared image cache");
        Ok(removed)
    }

    pub async fn stats(&self) -> Result<CacheStats> {
        let (entries, total_bytes) = self.repo.totals().await?;
        Ok(CacheStats { entries, total_bytes, budget: self.options.budget })
    }

    /// Reconcile the index with the image directory: drop records whose
    /// files vanished and delete files no record points at.
    #[instrument(skip(self))]
    pub async fn verify(&self) -> Result<VerifyReport> {
        let _guard = self.exclusive().await?;
        let mut report = VerifyReport::default();
        let mut tracked = HashSet::new();
        for image in self.repo.list().await? {
            if self.backend.exists(&image.path).await.or_raise(|| ErrorKind::Storage)? {
                tracked.insert(image.path);
            } else {
                self.repo.delete(&image.key).await?;
                report.dropped_records += 1;
            }
        }
        let untracked: Vec<PathBuf> = self
            .backend
            .list_stream()
            .map_ok(|file| file.path)
            .try_filter(|path| futures::future::ready(!tracked.contains(path)))
            .try_collect()
            .await
            .or_raise(|| ErrorKind::Storage)?;
        for path in untracked {
            self.delete_file(&path).await?;
            report.removed_files += 1;
        }
        if report != VerifyReport::default() {
            info!(?report, "repaired image cache");
        }
        Ok(report)
    }

    async fn delete_file(&self, path: &Path) -> Result<()> {
        match self.backend.delete(path).await {
            Ok(()) => Ok(()),
            Err(err) if matches!(&*err, StorageErrorKind::NotFound(_)) => Ok(()),
            Err(err) => Err(err).or_raise(|| ErrorKind::Storage),
        }
    }

    /// Best effort; a leftover file is picked up by [`verify`](Self::verify).
    async fn remove_file(&self, path: &Path) {
        if let Err(err) = self.delete_file(path).await {
            warn!(path = %path.display(), ?err, "could not delete cached image file");
        }
    }

    /// Close the index database.
    pub async fn close(&self) {
        self.db.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use wallrand_storage::backend::MockBackend;

    const UNIT: u64 = 1024;

    async fn store(budget: u64, strict: bool) -> (CacheStore, Arc<MockBackend>) {
        let db = Database::connect_in_memory().await.unwrap();
        let backend = Arc::new(MockBackend::default());
        let store = CacheStore::new(db, backend.clone(), CacheOptions { budget, strict });
        (store, backend)
    }

    async fn put(store: &CacheStore, name: &str, size: usize) -> CachedImage {
        let key = CacheKey::for_url(&format!("https://i.redd.it/{name}.png"));
        store.put(&key, &vec![0u8; size], 1920, 1080, "png").await.unwrap()
    }

    fn key(name: &str) -> CacheKey {
        CacheKey::for_url(&format!("https://i.redd.it/{name}.png"))
    }

    #[tokio::test]
    async fn test_put_then_get_hits() {
        let (store, backend) = store(1_000, true).await;
        let stored = put(&store, "a", 100).await;
        assert_eq!(stored.byte_size, 100);
        assert_eq!(backend.contents(&stored.path).await.unwrap().len(), 100);
        let hit = store.get(&key("a")).await.unwrap().unwrap();
        assert_eq!((hit.width, hit.height), (1920, 1080));
        assert!(store.get(&key("missing")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_no_partial_file_left_behind() {
        let (store, backend) = store(1_000, true).await;
        put(&store, "a", 10).await;
        let files = backend.list().await.unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].path.extension().is_some_and(|ext| ext == "png"));
    }

    #[tokio::test]
    async fn test_evicts_least_recently_used_scaled_example() {
        // 3 entries totalling 480 units, budget 500 units, insert 40 units.
        let (store, _backend) = store(500 * UNIT, true).await;
        put(&store, "oldest", (160 * UNIT) as usize).await;
        put(&store, "middle", (160 * UNIT) as usize).await;
        put(&store, "newest", (160 * UNIT) as usize).await;
        put(&store, "incoming", (40 * UNIT) as usize).await;
        assert!(store.get(&key("oldest")).await.unwrap().is_none());
        assert!(store.get(&key("middle")).await.unwrap().is_some());
        let stats = store.stats().await.unwrap();
        assert_eq!(stats.total_bytes, 360 * UNIT);
        assert!(stats.total_bytes <= stats.budget);
    }

    #[tokio::test]
    async fn test_get_makes_entry_evict_last() {
        let (store, backend) = store(300, true).await;
        put(&store, "a", 100).await;
        put(&store, "b", 100).await;
        put(&store, "c", 100).await;
        store.get(&key("a")).await.unwrap().unwrap();
        put(&store, "d", 100).await;
        assert!(store.get(&key("b")).await.unwrap().is_none());
        assert!(store.get(&key("a")).await.unwrap().is_some());
        assert_eq!(backend.len().await, 3);
    }

    #[rstest]
    #[case(&[100, 200, 50, 300, 250, 10])]
    #[case(&[400, 400, 400])]
    #[case(&[1, 2, 3, 4, 5, 500])]
    #[tokio::test]
    async fn test_running_total_never_exceeds_budget(#[case] sizes: &[usize]) {
        let (store, backend) = store(500, true).await;
        for (n, size) in sizes.iter().enumerate() {
            let stored = put(&store, &n.to_string(), *size).await;
            let stats = store.stats().await.unwrap();
            assert!(stats.total_bytes <= 500);
            let on_disk: u64 = backend.list().await.unwrap().iter().map(|f| f.size).sum();
            assert_eq!(on_disk, stats.total_bytes);
            // The entry just inserted always survives its own insertion.
            assert!(backend.exists(&stored.path).await.unwrap());
        }
    }

    #[tokio::test]
    async fn test_image_larger_than_budget_is_rejected() {
        let (store, backend) = store(100, true).await;
        let err = store.put(&key("huge"), &[0u8; 101], 10, 10, "png").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::ExceedsBudget { size: 101, budget: 100 }));
        assert!(backend.is_empty().await);
    }

    #[tokio::test]
    async fn test_reinsert_with_new_format_replaces_file() {
        let (store, backend) = store(1_000, true).await;
        put(&store, "a", 10).await;
        store.put(&key("a"), &[1u8; 20], 10, 10, "jpg").await.unwrap();
        let files = backend.list().await.unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(store.stats().await.unwrap().total_bytes, 20);
    }

    #[tokio::test]
    async fn test_missing_file_in_strict_mode_is_corruption_then_miss() {
        let (store, backend) = store(1_000, true).await;
        let stored = put(&store, "a", 10).await;
        backend.delete(&stored.path).await.unwrap();
        let err = store.get(&key("a")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Corruption(_)));
        assert!(store.get(&key("a")).await.unwrap().is_none());
        assert_eq!(store.stats().await.unwrap().entries, 0);
    }

    #[tokio::test]
    async fn test_missing_file_in_lenient_mode_is_a_miss() {
        let (store, backend) = store(1_000, false).await;
        let stored = put(&store, "a", 10).await;
        backend.delete(&stored.path).await.unwrap();
        assert!(store.get(&key("a")).await.unwrap().is_none());
        assert_eq!(store.stats().await.unwrap().entries, 0);
    }

    #[tokio::test]
    async fn test_clear_removes_everything() {
        let (store, backend) = store(1_000, true).await;
        for name in ["a", "b", "c"] {
            put(&store, name, 10).await;
        }
        backend.write(Path::new("zz/leftover.png.part"), b"junk").await.unwrap();
        assert_eq!(store.clear().await.unwrap(), 4);
        for name in ["a", "b", "c"] {
            assert!(store.get(&key(name)).await.unwrap().is_none());
        }
        assert!(backend.is_empty().await);
        assert_eq!(store.stats().await.unwrap().entries, 0);
    }

    #[tokio::test]
    async fn test_evict_to_budget_after_shrinking() {
        let db = Database::connect_in_memory().await.unwrap();
        let backend = Arc::new(MockBackend::default());
        let store = CacheStore::new(db.clone(), backend.clone(), CacheOptions { budget: 1_000, strict: true });
        for name in ["a", "b", "c", "d"] {
            put(&store, name, 100).await;
        }
        let smaller = CacheStore::new(db, backend.clone(), CacheOptions { budget: 250, strict: true });
        assert_eq!(smaller.evict_to_budget().await.unwrap(), 2);
        assert!(smaller.get(&key("a")).await.unwrap().is_none());
        assert!(smaller.get(&key("c")).await.unwrap().is_some());
        assert_eq!(backend.len().await, 2);
    }

    #[tokio::test]
    async fn test_verify_reconciles_index_and_files() {
        let (store, backend) = store(1_000, true).await;
        let a = put(&store, "a", 10).await;
        put(&store, "b", 10).await;
        backend.delete(&a.path).await.unwrap();
        backend.write(Path::new("ff/stray.png"), b"stray").await.unwrap();
        let report = store.verify().await.unwrap();
        assert_eq!(report, VerifyReport { dropped_records: 1, removed_files: 1 });
        assert_eq!(backend.len().await, 1);
        assert_eq!(store.verify().await.unwrap(), VerifyReport::default());
    }

    #[tokio::test]
    async fn test_open_on_disk_and_reopen() {
        let temp_dir = tempfile::tempdir().unwrap();
        let options = CacheOptions::from_megabytes(1, true);
        let store = CacheStore::open(temp_dir.path(), options).await.unwrap();
        let stored = put(&store, "a", 64).await;
        let local = stored.local_path.clone().unwrap();
        assert!(local.starts_with(temp_dir.path().join("images")));
        assert!(local.is_file());
        store.close().await;

        let reopened = CacheStore::open(temp_dir.path(), options).await.unwrap();
        assert!(reopened.get(&key("a")).await.unwrap().is_some());
        assert_eq!(reopened.clear().await.unwrap(), 1);
        assert!(!local.exists());
        assert!(temp_dir.path().join("index.sqlite").exists());
        reopened.close().await;
    }

    #[tokio::test]
    async fn test_stores_sharing_a_directory_serialize_their_file_work() {
        const IMAGES: usize = 100;
        let temp_dir = tempfile::tempdir().unwrap();
        let options = CacheOptions::from_megabytes(1024, true);
        // Each store has its own in-process mutex, so only the directory lock
        // keeps them apart, exactly as for two separate processes.
        let writer = CacheStore::open(temp_dir.path(), options).await.unwrap();
        let checker = CacheStore::open(temp_dir.path(), options).await.unwrap();
        let writing = async {
            for n in 0..IMAGES {
                writer.put(&key(&format!("w{n}")), &[n as u8; 4096], 1920, 1080, "png").await.unwrap();
            }
        };
        let checking = async {
            for _ in 0..IMAGES {
                checker.verify().await.unwrap();
            }
        };
        tokio::join!(writing, checking);

        assert_eq!(writer.stats().await.unwrap().entries, IMAGES as u64);
        assert_eq!(checker.verify().await.unwrap(), VerifyReport::default());
        for n in 0..IMAGES {
            let hit = checker.get(&key(&format!("w{n}"))).await.unwrap().unwrap();
            assert!(hit.local_path.unwrap().is_file());
        }
        writer.close().await;
        checker.close().await;
    }

    #[tokio::test]
    async fn test_clear_waits_for_other_store() {
        let temp_dir = tempfile::tempdir().unwrap();
        let options = CacheOptions::from_megabytes(1, true);
        let writer = CacheStore::open(temp_dir.path(), options).await.unwrap();
        let clearer = CacheStore::open(temp_dir.path(), options).await.unwrap();
        let (_, cleared) = tokio::join!(
            async {
                for name in ["a", "b", "c"] {
                    put(&writer, name, 64).await;
                }
            },
            clearer.clear(),
        );
        // Whatever interleaving happened, files and records agree afterwards.
        let cleared = cleared.unwrap();
        let remaining = writer.stats().await.unwrap().entries;
        assert_eq!(cleared + remaining, 3);
        assert_eq!(writer.verify().await.unwrap(), VerifyReport::default());
        writer.close().await;
        clearer.close().await;
    }
}
