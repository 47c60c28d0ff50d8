use crate::error::{Error, ErrorKind, Result};
use derive_more::Display;
use exn::ResultExt;
use std::path::PathBuf;
use time::UtcDateTime;

/// Identity of a cached image: the BLAKE3 digest of its source URL.
///
/// # Examples
///
/// ```
/// use wallrand_cache::CacheKey;
///
/// let key = CacheKey::for_url("https://i.redd.it/abc123.png");
/// assert_eq!(key.as_str().len(), 64);
/// assert_eq!(key, CacheKey::for_url("  https://i.redd.it/abc123.png\n"));
/// assert!(key.storage_path("png").starts_with(&key.as_str()[..2]));
/// ```
#[derive(Debug, Display, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn for_url(url: &str) -> Self {
        Self(blake3::hash(url.trim().as_bytes()).to_hex().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Fan-out location of the backing file, relative to the image directory:
    /// `<key[0..2]>/<key>.<ext>`.
    pub fn storage_path(&self, extension: &str) -> PathBuf {
        PathBuf::from(&self.0[..2]).join(format!("{}.{}", self.0, extension))
    }
}

/// An image stored in the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedImage {
    pub key: CacheKey,
    /// Path of the backing file relative to the image directory.
    pub path: PathBuf,
    /// Absolute path of the backing file, when the storage backend has one.
    pub local_path: Option<PathBuf>,
    pub byte_size: u64,
    pub width: u32,
    pub height: u32,
    /// File extension of the decoded format.
    pub format: String,
    pub last_used: UtcDateTime,
    pub(crate) use_seq: i64,
}

/// Snapshot of cache occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[display("{entries} images, {total_bytes} of {budget} bytes")]
pub struct CacheStats {
    pub entries: u64,
    pub total_bytes: u64,
    pub budget: u64,
}

/// Outcome of [`CacheStore::verify`](crate::CacheStore::verify).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VerifyReport {
    /// Index records dropped because their backing file was gone.
    pub dropped_records: u64,
    /// Files deleted because no index record referenced them.
    pub removed_files: u64,
}

pub(crate) fn unix_nanos(at: UtcDateTime) -> Result<i64> {
    i64::try_from(at.unix_timestamp_nanos()).or_raise(|| ErrorKind::InvalidData("timestamp"))
}

#[derive(sqlx::FromRow)]
pub(crate) struct ImageRow {
    key: String,
    path: String,
    byte_size: i64,
    width: i64,
    height: i64,
    format: String,
    last_used_at: i64,
    use_seq: i64,
    #[allow(dead_code)]
    inserted_seq: i64,
}

impl TryFrom<ImageRow> for CachedImage {
    type Error = Error;
    fn try_from(row: ImageRow) -> std::result::Result<Self, Self::Error> {
        Ok(Self {
            key: CacheKey(row.key),
            path: PathBuf::from(row.path),
            local_path: None,
            byte_size: u64::try_from(row.byte_size).or_raise(|| ErrorKind::InvalidData("byte size"))?,
            width: u32::try_from(row.width).or_raise(|| ErrorKind::InvalidData("width"))?,
            height: u32::try_from(row.height).or_raise(|| ErrorKind::InvalidData("height"))?,
            format: row.format,
            last_used: UtcDateTime::from_unix_timestamp_nanos(i128::from(row.last_used_at))
                .or_raise(|| ErrorKind::InvalidData("last used timestamp"))?,
            use_seq: row.use_seq,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_is_stable_hex() {
        let key = CacheKey::for_url("https://i.imgur.com/abcdef.jpg");
        assert_eq!(key, CacheKey::for_url("https://i.imgur.com/abcdef.jpg"));
        assert_ne!(key, CacheKey::for_url("https://i.imgur.com/abcdeg.jpg"));
        assert!(key.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_storage_path_fans_out() {
        let key = CacheKey::for_url("https://i.redd.it/wall.png");
        let path = key.storage_path("png");
        let expected = PathBuf::from(&key.as_str()[..2]).join(format!("{key}.png"));
        assert_eq!(path, expected);
    }

    #[test]
    fn test_row_to_model() {
        let now = UtcDateTime::now();
        let row = ImageRow {
            key: "ab".repeat(32),
            path: format!("ab/{}.jpg", "ab".repeat(32)),
            byte_size: 2048,
            width: 1920,
            height: 1080,
            format: "jpg".to_string(),
            last_used_at: unix_nanos(now).unwrap(),
            use_seq: 3,
            inserted_seq: 1,
        };
        let image = CachedImage::try_from(row).unwrap();
        assert_eq!((image.width, image.height, image.byte_size), (1920, 1080, 2048));
        assert_eq!(image.last_used, now);
        assert_eq!(image.local_path, None);
    }

    #[test]
    fn test_row_with_negative_size_is_invalid() {
        let row = ImageRow {
            key: "cd".repeat(32),
            path: "cd/x.png".to_string(),
            byte_size: -1,
            width: 1,
            height: 1,
            format: "png".to_string(),
            last_used_at: 0,
            use_seq: 1,
            inserted_seq: 1,
        };
        let err = CachedImage::try_from(row).unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidData("byte size")));
    }
}
