use crate::adapter::{PlatformAdapter, for_desktop};
use crate::detect::Desktop;
use crate::error::{ErrorKind, Result};
use crate::fill::FillMode;
use crate::shell::{Shell, SystemShell};
use exn::ResultExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, instrument};

/// Applies wallpapers through the adapter chosen for this session.
///
/// The desktop is resolved once, at construction; every later call goes
/// straight to the same adapter.
pub struct WallpaperSetter {
    adapter: Box<dyn PlatformAdapter>,
}

impl WallpaperSetter {
    /// Use `preferred` when configured, otherwise detect the running desktop.
    pub fn detect(preferred: Option<Desktop>) -> Self {
        let desktop = preferred.or_else(Desktop::detect);
        Self::with_shell(desktop, Arc::new(SystemShell))
    }

    pub fn with_shell(desktop: Option<Desktop>, shell: Arc<dyn Shell>) -> Self {
        let adapter = for_desktop(desktop, shell);
        info!(desktop = desktop.as_ref().map(Desktop::as_str).unwrap_or("unknown"), adapter = adapter.name(), "selected wallpaper adapter");
        Self { adapter }
    }

    pub fn adapter_name(&self) -> &'static str {
        self.adapter.name()
    }

    /// Apply `image` as the desktop background.
    ///
    /// Failures (including desktops this build cannot drive) are logged and
    /// reported as `false`; they never propagate.
    #[instrument(skip(self), fields(adapter = self.adapter.name()))]
    pub fn apply_wallpaper(&self, image: &Path, fill: FillMode) -> bool {
        match self.try_apply(image, fill) {
            Ok(path) => {
                info!(path = %path.display(), %fill, "wallpaper applied");
                true
            },
            Err(err) => {
                error!(error = ?err, "failed to apply wallpaper");
                false
            },
        }
    }

    fn try_apply(&self, image: &Path, fill: FillMode) -> Result<PathBuf> {
        let path = std::path::absolute(image).or_raise(|| ErrorKind::FileNotFound(image.to_path_buf()))?;
        if !path.is_file() {
            exn::bail!(ErrorKind::FileNotFound(path));
        }
        self.adapter.apply(&path, fill)?;
        Ok(path)
    }
}
