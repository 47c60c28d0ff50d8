//! Finding, reading and creating the configuration file.

use crate::error::{ErrorKind, Result};
use crate::settings::Config;
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Yaml};
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

/// Commented starting point written by `wallrand init`.
pub const TEMPLATE: &str = include_str!("../config.yaml.template");
/// Environment variables with this prefix override file values; `__`
/// separates nested keys (`WALLRAND_REDDIT__CLIENT_SECRET`).
pub const ENV_PREFIX: &str = "WALLRAND_";
const FILE_NAME: &str = "config.yaml";

/// `config.yaml` in the platform configuration directory.
pub fn user_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "wallrand").map(|dirs| dirs.config_dir().join(FILE_NAME))
}

/// Resolve which configuration file to use: an explicit path always wins,
/// then `./config.yaml`, then the platform configuration directory.
pub fn locate(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    let local = PathBuf::from(FILE_NAME);
    if local.is_file() {
        return local;
    }
    user_config_path().unwrap_or(local)
}

impl Config {
    /// Read `path`, apply environment overrides and validate the result.
    #[instrument(level = "debug", skip_all, fields(path = %path.display()))]
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            exn::bail!(ErrorKind::NotFound(path.to_path_buf()));
        }
        let config: Self = Figment::new()
            .merge(Yaml::file_exact(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .or_raise(|| ErrorKind::Parse(path.to_path_buf()))?;
        config.validate()?;
        debug!(subreddits = config.subreddits.len(), "configuration loaded");
        Ok(config)
    }
}

/// Write [`TEMPLATE`] to `path`, creating parent directories. An existing
/// file is only replaced when `force` is set.
pub fn write_template(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        exn::bail!(ErrorKind::AlreadyExists(path.to_path_buf()));
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).or_raise(|| ErrorKind::Io(parent.to_path_buf()))?;
    }
    std::fs::write(path, TEMPLATE).or_raise(|| ErrorKind::Io(path.to_path_buf()))?;
    info!(path = %path.display(), "wrote configuration template");
    Ok(())
}
