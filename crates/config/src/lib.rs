//! Configuration for wallrand.
//!
//! A YAML file (see [`TEMPLATE`]) overlaid with `WALLRAND_*` environment
//! variables, extracted with `figment` and validated before any network
//! activity takes place.

pub mod error;
mod loader;
mod settings;

pub use crate::loader::{ENV_PREFIX, TEMPLATE, locate, user_config_path, write_template};
pub use crate::settings::{Config, PostFilter, RedditSettings, Resolution, WallpaperTool};
