use super::{PlatformAdapter, require};
use crate::error::{ErrorKind, Result};
use crate::fill::FillMode;
use crate::shell::{Shell, args};
use exn::OptionExt;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

const QDBUS: [&str; 4] = ["qdbus", "qdbus6", "qdbus-qt6", "qdbus-qt5"];

/// KDE Plasma: `plasma-apply-wallpaperimage` when available, otherwise a
/// Plasma shell script over D-Bus. The fill mode is only reachable through
/// the script.
pub(crate) struct KdeAdapter {
    shell: Arc<dyn Shell>,
}

impl KdeAdapter {
    pub(crate) fn new(shell: Arc<dyn Shell>) -> Self {
        Self { shell }
    }

    fn evaluate(&self, script: String) -> Result<()> {
        let qdbus = QDBUS
            .iter()
            .find_map(|tool| self.shell.which(tool))
            .ok_or_raise(|| ErrorKind::ToolNotFound("plasma-apply-wallpaperimage or qdbus"))?;
        self.shell.run(&qdbus, &args!["org.kde.plasmashell", "/PlasmaShell", "org.kde.PlasmaShell.evaluateScript", script])?;
        Ok(())
    }
}

/// Plasma shell script setting the wallpaper config group of every desktop.
pub(crate) fn plasma_script(image: Option<&Path>, fill: FillMode) -> String {
    let image = image
        .map(|path| {
            let escaped = path.display().to_string().replace('\\', "\\\\").replace('"', "\\\"");
            format!("    d.writeConfig(\"Image\", \"file://{escaped}\");\n")
        })
        .unwrap_or_default();
    format!(
        "for (const d of desktops()) {{\n    d.wallpaperPlugin = \"org.kde.image\";\n    d.currentConfigGroup = [\"Wallpaper\", \"org.kde.image\", \"General\"];\n{image}    d.writeConfig(\"FillMode\", \"{}\");\n}}\n",
        fill.kde_fill_mode()
    )
}

impl PlatformAdapter for KdeAdapter {
    fn name(&self) -> &'static str {
        "kde"
    }

    fn apply(&self, image: &Path, fill: FillMode) -> Result<()> {
        if let Ok(apply) = require(self.shell.as_ref(), "plasma-apply-wallpaperimage") {
            match self.shell.run(&apply, &args![image]) {
                Ok(_) => {
                    if let Err(err) = self.evaluate(plasma_script(None, fill)) {
                        warn!(?err, "wallpaper set but fill mode could not be applied");
                    }
                    return Ok(());
                },
                Err(err) => debug!(?err, "plasma-apply-wallpaperimage failed, falling back to D-Bus"),
            }
        }
        self.evaluate(plasma_script(Some(image), fill))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shell::recording::RecordingShell;

    #[test]
    fn test_script_sets_image_and_fill_mode() {
        let script = plasma_script(Some(Path::new("/cache/a \"b\".png")), FillMode::Fill);
        assert!(script.contains(r#"d.writeConfig("Image", "file:///cache/a \"b\".png");"#));
        assert!(script.contains(r#"d.writeConfig("FillMode", "1");"#));
        assert!(!plasma_script(None, FillMode::Zoom).contains("Image"));
    }

    #[test]
    fn test_prefers_plasma_apply() {
        let shell = Arc::new(RecordingShell::with_tools(["plasma-apply-wallpaperimage", "qdbus6"]));
        KdeAdapter::new(shell.clone()).apply(Path::new("/img.png"), FillMode::Zoom).unwrap();
        let calls = shell.calls();
        assert_eq!(calls[0], vec!["plasma-apply-wallpaperimage", "/img.png"]);
        assert_eq!(calls[1][0], "qdbus6");
        assert!(calls[1][4].contains("\"FillMode\", \"2\""));
    }

    #[test]
    fn test_falls_back_to_dbus_script() {
        let shell = Arc::new(
            RecordingShell::with_tools(["plasma-apply-wallpaperimage", "qdbus"]).failing(["plasma-apply-wallpaperimage"]),
        );
        KdeAdapter::new(shell.clone()).apply(Path::new("/img.png"), FillMode::Zoom).unwrap();
        let calls = shell.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls[1][4].contains("file:///img.png"));
    }

    #[test]
    fn test_no_tools() {
        let err = KdeAdapter::new(Arc::new(RecordingShell::default()))
            .apply(Path::new("/img.png"), FillMode::Zoom)
            .unwrap_err();
        assert!(matches!(&*err, ErrorKind::ToolNotFound(_)));
    }
}
