//! wlroots-style compositors, where the wallpaper is drawn by a client.

use super::{PlatformAdapter, require};
use crate::error::{ErrorKind, Result};
use crate::fill::FillMode;
use crate::shell::{Shell, args};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

/// Replace any running `swaybg` with a new instance showing `image`.
fn restart_swaybg(shell: &dyn Shell, image: &Path, fill: FillMode) -> Result<()> {
    let swaybg = require(shell, "swaybg")?;
    if let Some(pkill) = shell.which("pkill") {
        // Exits non-zero when nothing matched.
        _ = shell.run(&pkill, &args!["-x", "swaybg"]);
    }
    shell.spawn(&swaybg, &args!["-i", image, "-m", fill.swaybg()])
}

pub(crate) struct SwayAdapter {
    shell: Arc<dyn Shell>,
}

impl SwayAdapter {
    pub(crate) fn new(shell: Arc<dyn Shell>) -> Self {
        Self { shell }
    }
}

impl PlatformAdapter for SwayAdapter {
    fn name(&self) -> &'static str {
        "sway"
    }

    fn apply(&self, image: &Path, fill: FillMode) -> Result<()> {
        match restart_swaybg(self.shell.as_ref(), image, fill) {
            Ok(()) => return Ok(()),
            Err(err) => debug!(?err, "swaybg unavailable, asking sway directly"),
        }
        let Some(swaymsg) = self.shell.which("swaymsg") else {
            exn::bail!(ErrorKind::ToolNotFound("swaybg, swaymsg"));
        };
        // swaymsg takes a single command string; quote the path for sway's parser.
        let quoted = format!("\"{}\"", image.display().to_string().replace('"', "\\\""));
        self.shell.run(&swaymsg, &args!["output", "*", "bg", quoted, fill.swaybg()])?;
        Ok(())
    }
}

pub(crate) struct HyprlandAdapter {
    shell: Arc<dyn Shell>,
}

impl HyprlandAdapter {
    pub(crate) fn new(shell: Arc<dyn Shell>) -> Self {
        Self { shell }
    }

    fn hyprpaper(&self, image: &Path) -> Result<()> {
        let hyprctl = require(self.shell.as_ref(), "hyprctl")?;
        self.shell.run(&hyprctl, &args!["hyprpaper", "preload", image])?;
        // An empty monitor name means "every monitor".
        self.shell.run(&hyprctl, &args!["hyprpaper", "wallpaper", format!(",{}", image.display())])?;
        Ok(())
    }
}

impl PlatformAdapter for HyprlandAdapter {
    fn name(&self) -> &'static str {
        "hyprland"
    }

    fn apply(&self, image: &Path, fill: FillMode) -> Result<()> {
        match self.hyprpaper(image) {
            Ok(()) => {
                if fill != FillMode::Zoom {
                    debug!(%fill, "hyprpaper always covers the screen; fill mode ignored");
                }
                return Ok(());
            },
            Err(err) => warn!(?err, "hyprpaper failed, falling back to swaybg"),
        }
        restart_swaybg(self.shell.as_ref(), image, fill)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shell::recording::RecordingShell;

    #[test]
    fn test_sway_restarts_swaybg() {
        let shell = Arc::new(RecordingShell::with_tools(["swaybg", "pkill"]));
        SwayAdapter::new(shell.clone()).apply(Path::new("/img.png"), FillMode::Fill).unwrap();
        assert_eq!(
            shell.calls(),
            vec![vec!["pkill", "-x", "swaybg"], vec!["swaybg", "-i", "/img.png", "-m", "fit"]]
        );
    }

    #[test]
    fn test_sway_falls_back_to_swaymsg() {
        let shell = Arc::new(RecordingShell::with_tools(["swaymsg"]));
        SwayAdapter::new(shell.clone()).apply(Path::new("/my img.png"), FillMode::Zoom).unwrap();
        assert_eq!(shell.calls(), vec![vec!["swaymsg", "output", "*", "bg", "\"/my img.png\"", "fill"]]);
    }

    #[test]
    fn test_sway_without_tools() {
        let err = SwayAdapter::new(Arc::new(RecordingShell::default()))
            .apply(Path::new("/img.png"), FillMode::Zoom)
            .unwrap_err();
        assert!(matches!(&*err, ErrorKind::ToolNotFound("swaybg, swaymsg")));
    }

    #[test]
    fn test_hyprland_uses_hyprpaper() {
        let shell = Arc::new(RecordingShell::with_tools(["hyprctl", "swaybg"]));
        HyprlandAdapter::new(shell.clone()).apply(Path::new("/img.png"), FillMode::Zoom).unwrap();
        assert_eq!(
            shell.calls(),
            vec![
                vec!["hyprctl", "hyprpaper", "preload", "/img.png"],
                vec!["hyprctl", "hyprpaper", "wallpaper", ",/img.png"],
            ]
        );
    }

    #[test]
    fn test_hyprland_falls_back_to_swaybg() {
        let shell = Arc::new(RecordingShell::with_tools(["hyprctl", "swaybg"]).failing(["hyprctl"]));
        HyprlandAdapter::new(shell.clone()).apply(Path::new("/img.png"), FillMode::Center).unwrap();
        let calls = shell.calls();
        assert_eq!(calls.last().unwrap(), &vec!["swaybg", "-i", "/img.png", "-m", "center"]);
    }
}
