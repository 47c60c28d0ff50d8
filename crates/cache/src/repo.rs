//! Repository for the `images` index table.
//!
//! All recency bookkeeping happens in SQL: every upsert or touch takes the
//! next value of the `use_seq` logical clock, and eviction walks the table in
//! `(use_seq, inserted_seq)` order. Mutations that change the running total
//! run inside one write transaction so that a concurrent process never
//! observes the index over budget.

use crate::Database;
use crate::error::{ErrorKind, Result};
use crate::models::{CacheKey, CachedImage, ImageRow, unix_nanos};
use exn::{OptionExt, ResultExt};
use sqlx::{SqliteConnection, SqlitePool};
use std::path::Path;
use time::UtcDateTime;

/// Values for a new (or replacement) index record.
pub(crate) struct NewImage<'a> {
    pub key: &'a CacheKey,
    pub path: &'a Path,
    pub byte_size: u64,
    pub width: u32,
    pub height: u32,
    pub format: &'a str,
}

/// Result of an insert: the stored record plus every record evicted to make
/// room for it. The caller owns deleting the evicted backing files.
pub(crate) struct Inserted {
    pub image: CachedImage,
    pub evicted: Vec<CachedImage>,
}

#[derive(Debug, Clone)]
pub(crate) struct Repository {
    pool: SqlitePool,
}
impl From<&Database> for Repository {
    fn from(db: &Database) -> Self {
        Self { pool: db.pool().clone() }
    }
}
impl Repository {
    fn sqlx_hates_paths(path: &Path) -> Result<String> {
        Ok(path.to_str().ok_or_raise(|| ErrorKind::InvalidData("path"))?.to_string())
    }

    fn size(value: u64) -> Result<i64> {
        i64::try_from(value).or_raise(|| ErrorKind::InvalidData("byte size"))
    }

    pub async fn get(&self, key: &CacheKey) -> Result<Option<CachedImage>> {
        let row: Option<ImageRow> = sqlx::query_as(include_str!("../queries/get_image.sql"))
            .bind(key.as_str())
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        row.map(CachedImage::try_from).transpose()
    }

    /// Mark an entry as most recently used.
    pub async fn touch(&self, key: &CacheKey, at: UtcDateTime) -> Result<Option<CachedImage>> {
        let row: Option<ImageRow> = sqlx::query_as(include_str!("../queries/touch_image.sql"))
            .bind(key.as_str())
            .bind(unix_nanos(at)?)
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        row.map(CachedImage::try_from).transpose()
    }

    /// Upsert a record and evict least recently used records until the
    /// running total fits the budget again. The new record is never evicted.
    pub async fn insert_and_evict(&self, image: NewImage<'_>, at: UtcDateTime, budget: u64) -> Result<Inserted> {
        let mut tx = self.pool.begin().await.or_raise(|| ErrorKind::Database)?;
        let row: ImageRow = sqlx::query_as(include_str!("../queries/upsert_image.sql"))
            .bind(image.key.as_str())
            .bind(Self::sqlx_hates_paths(image.path)?)
            .bind(Self::size(image.byte_size)?)
            .bind(i64::from(image.width))
            .bind(i64::from(image.height))
            .bind(image.format)
            .bind(unix_nanos(at)?)
            .fetch_one(&mut *tx)
            .await
            .or_raise(|| ErrorKind::Database)?;
        let evicted = Self::evict_within(&mut *tx, Some(image.key), budget).await?;
        tx.commit().await.or_raise(|| ErrorKind::Database)?;
        Ok(Inserted { image: row.try_into()?, evicted })
    }

    /// Evict least recently used records until the running total fits the
    /// budget. Returns the evicted records.
    pub async fn evict_to_budget(&self, budget: u64) -> Result<Vec<CachedImage>> {
        let mut tx = self.pool.begin().await.or_raise(|| ErrorKind::Database)?;
        let evicted = Self::evict_within(&mut *tx, None, budget).await?;
        tx.commit().await.or_raise(|| ErrorKind::Database)?;
        Ok(evicted)
    }

    async fn evict_within(conn: &mut SqliteConnection, keep: Option<&CacheKey>, budget: u64) -> Result<Vec<CachedImage>> {
        let (_, mut total) = Self::totals_on(&mut *conn).await?;
        if total <= budget {
            return Ok(Vec::new());
        }
        let rows: Vec<ImageRow> = sqlx::query_as(include_str!("../queries/eviction_candidates.sql"))
            .bind(keep.map(CacheKey::as_str))
            .fetch_all(&mut *conn)
            .await
            .or_raise(|| ErrorKind::Database)?;
        let mut evicted = Vec::new();
        for row in rows {
            if total <= budget {
                break;
            }
            let image = CachedImage::try_from(row)?;
            sqlx::query(include_str!("../queries/delete_image.sql"))
                .bind(image.key.as_str())
                .execute(&mut *conn)
                .await
                .or_raise(|| ErrorKind::Database)?;
            total = total.saturating_sub(image.byte_size);
            evicted.push(image);
        }
        Ok(evicted)
    }

    /// Returns `true` if a record was removed.
    pub async fn delete(&self, key: &CacheKey) -> Result<bool> {
        let result = sqlx::query(include_str!("../queries/delete_image.sql"))
            .bind(key.as_str())
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(result.rows_affected() > 0)
    }

    /// Remove every record, returning how many there were.
    pub async fn clear(&self) -> Result<u64> {
        let result = sqlx::query(include_str!("../queries/clear_images.sql"))
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(result.rows_affected())
    }

    /// All records, least recently used first.
    pub async fn list(&self) -> Result<Vec<CachedImage>> {
        let rows: Vec<ImageRow> = sqlx::query_as(include_str!("../queries/list_images.sql"))
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        rows.into_iter().map(CachedImage::try_from).collect()
    }

    /// `(entry count, total bytes)`.
    pub async fn totals(&self) -> Result<(u64, u64)> {
        let mut conn = self.pool.acquire().await.or_raise(|| ErrorKind::Database)?;
        Self::totals_on(&mut conn).await
    }

    async fn totals_on(conn: &mut SqliteConnection) -> Result<(u64, u64)> {
        let (count, total): (i64, i64) = sqlx::query_as(include_str!("../queries/totals.sql"))
            .fetch_one(&mut *conn)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok((
            u64::try_from(count).or_raise(|| ErrorKind::InvalidData("entry count"))?,
            u64::try_from(total).or_raise(|| ErrorKind::InvalidData("total size"))?,
        ))
    }
}
