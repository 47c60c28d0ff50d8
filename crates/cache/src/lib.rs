//! Size-bounded, least-recently-used cache of validated wallpaper images.
//!
//! The cache is a directory with two parts:
//! - `index.sqlite`: one record per image with its size, dimensions and a
//!   logical "last used" clock that orders eviction.
//! - `images/<key[0..2]>/<key>.<ext>`: the backing files, keyed by the BLAKE3
//!   digest of the image's source URL.
//! - `.lock`: taken exclusively by whichever process is mutating the cache.
//!
//! The index is the source of truth for what is cached. After every mutating
//! operation the summed size of all records is within the configured budget,
//! and every record points at a readable file (records found without one are
//! dropped on sight).

mod db;
pub mod error;
mod lock;
mod models;
mod repo;
mod store;

pub use crate::db::Database;
pub use crate::models::{CacheKey, CacheStats, CachedImage, VerifyReport};
pub use crate::store::{CacheOptions, CacheStore};
