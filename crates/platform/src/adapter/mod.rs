//! One adapter per desktop, selected once at startup.

mod gsettings;
mod kde;
mod macos;
mod wayland;
#[cfg(windows)]
mod windows;
mod x11;
mod xfce;

use crate::detect::Desktop;
use crate::error::{ErrorKind, Result};
use crate::fill::FillMode;
use crate::shell::Shell;
use exn::OptionExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Applies an image file as the desktop background.
pub trait PlatformAdapter: Send + Sync {
    /// Name of the adapter (used for logging only).
    fn name(&self) -> &'static str;

    /// `image` is an absolute path to an existing file.
    fn apply(&self, image: &Path, fill: FillMode) -> Result<()>;
}

/// Pick the adapter for a desktop; unidentified Linux desktops get the
/// GNOME adapter, which also covers most GNOME derivatives.
pub(crate) fn for_desktop(desktop: Option<Desktop>, shell: Arc<dyn Shell>) -> Box<dyn PlatformAdapter> {
    use self::gsettings::{Flavour, GSettingsAdapter};
    match desktop {
        None | Some(Desktop::Gnome) => Box::new(GSettingsAdapter::new(Flavour::Gnome, shell)),
        Some(Desktop::Mate) => Box::new(GSettingsAdapter::new(Flavour::Mate, shell)),
        Some(Desktop::Cinnamon) => Box::new(GSettingsAdapter::new(Flavour::Cinnamon, shell)),
        Some(Desktop::Kde) => Box::new(kde::KdeAdapter::new(shell)),
        Some(Desktop::Xfce) => Box::new(xfce::XfceAdapter::new(shell)),
        Some(Desktop::I3) => Box::new(x11::X11Adapter::new(shell)),
        Some(Desktop::Sway) => Box::new(wayland::SwayAdapter::new(shell)),
        Some(Desktop::Hyprland) => Box::new(wayland::HyprlandAdapter::new(shell)),
        Some(Desktop::MacOs) => Box::new(macos::MacOsAdapter::new(shell)),
        #[cfg(windows)]
        Some(Desktop::Windows) => Box::new(self::windows::WindowsAdapter),
        #[cfg(not(windows))]
        Some(Desktop::Windows) => Box::new(Unsupported("windows")),
    }
}

/// Look a tool up on `PATH`, or fail naming it.
pub(crate) fn require(shell: &dyn Shell, tool: &'static str) -> Result<PathBuf> {
    shell.which(tool).ok_or_raise(|| ErrorKind::ToolNotFound(tool))
}

#[cfg(not(windows))]
struct Unsupported(&'static str);

#[cfg(not(windows))]
impl PlatformAdapter for Unsupported {
    fn name(&self) -> &'static str {
        "unsupported"
    }

    fn apply(&self, _image: &Path, _fill: FillMode) -> Result<()> {
        exn::bail!(ErrorKind::Unsupported(self.0))
    }
}
