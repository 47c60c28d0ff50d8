//! Storage backends for cached wallpaper images.
//!
//! Every path handed to a backend is relative to the backend's root and is
//! validated with [`validate_path`] before use, so a cache key can never
//! address a file outside of the cache directory.

pub mod backend;
pub mod error;
pub mod file;
mod path;

pub use crate::backend::StorageBackend;
pub use crate::file::FileInfo;
pub use crate::path::validate as validate_path;
use std::sync::Arc;

pub type BackendHandle = Arc<dyn StorageBackend + Send + Sync>;
