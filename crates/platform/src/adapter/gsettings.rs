use super::{PlatformAdapter, require};
use crate::error::Result;
use crate::fill::FillMode;
use crate::shell::{Shell, args};
use std::path::Path;
use std::sync::Arc;
use tracing::warn;

/// Desktops configured through `gsettings`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flavour {
    Gnome,
    Mate,
    Cinnamon,
}

impl Flavour {
    fn schema(&self) -> &'static str {
        match self {
            Self::Gnome => "org.gnome.desktop.background",
            Self::Mate => "org.mate.background",
            Self::Cinnamon => "org.cinnamon.desktop.background",
        }
    }
}

pub(crate) struct GSettingsAdapter {
    flavour: Flavour,
    shell: Arc<dyn Shell>,
}

impl GSettingsAdapter {
    pub(crate) fn new(flavour: Flavour, shell: Arc<dyn Shell>) -> Self {
        Self { flavour, shell }
    }
}

impl PlatformAdapter for GSettingsAdapter {
    fn name(&self) -> &'static str {
        match self.flavour {
            Flavour::Gnome => "gnome",
            Flavour::Mate => "mate",
            Flavour::Cinnamon => "cinnamon",
        }
    }

    fn apply(&self, image: &Path, fill: FillMode) -> Result<()> {
        let gsettings = require(self.shell.as_ref(), "gsettings")?;
        let schema = self.flavour.schema();
        let uri = format!("file://{}", image.display());
        match self.flavour {
            // MATE wants a plain path rather than a URI.
            Flavour::Mate => self.shell.run(&gsettings, &args!["set", schema, "picture-filename", image])?,
            Flavour::Gnome | Flavour::Cinnamon => self.shell.run(&gsettings, &args!["set", schema, "picture-uri", &uri])?,
        };
        let mut extras = vec![args!["set", schema, "picture-options", fill.gsettings()]];
        if self.flavour == Flavour::Gnome {
            extras.push(args!["set", schema, "picture-uri-dark", &uri]);
        }
        for extra in extras {
            if let Err(err) = self.shell.run(&gsettings, &extra) {
                warn!(adapter = self.name(), ?err, "could not apply secondary wallpaper setting");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shell::recording::RecordingShell;

    #[test]
    fn test_gnome_sets_uri_options_and_dark_variant() {
        let shell = Arc::new(RecordingShell::with_tools(["gsettings"]));
        let adapter = GSettingsAdapter::new(Flavour::Gnome, shell.clone());
        adapter.apply(Path::new("/cache/images/ab/abc.png"), FillMode::Zoom).unwrap();
        assert_eq!(
            shell.calls(),
            vec![
                vec!["gsettings", "set", "org.gnome.desktop.background", "picture-uri", "file:///cache/images/ab/abc.png"],
                vec!["gsettings", "set", "org.gnome.desktop.background", "picture-options", "zoom"],
                vec!["gsettings", "set", "org.gnome.desktop.background", "picture-uri-dark", "file:///cache/images/ab/abc.png"],
            ]
        );
    }

    #[test]
    fn test_mate_uses_plain_path() {
        let shell = Arc::new(RecordingShell::with_tools(["gsettings"]));
        let adapter = GSettingsAdapter::new(Flavour::Mate, shell.clone());
        adapter.apply(Path::new("/img.jpg"), FillMode::Tile).unwrap();
        let calls = shell.calls();
        assert_eq!(calls[0], vec!["gsettings", "set", "org.mate.background", "picture-filename", "/img.jpg"]);
        assert_eq!(calls[1], vec!["gsettings", "set", "org.mate.background", "picture-options", "wallpaper"]);
        assert_eq!(calls.len(), 2);
    }

    #[test]
    fn test_cinnamon_has_no_dark_variant() {
        let shell = Arc::new(RecordingShell::with_tools(["gsettings"]));
        let adapter = GSettingsAdapter::new(Flavour::Cinnamon, shell.clone());
        adapter.apply(Path::new("/img.jpg"), FillMode::Center).unwrap();
        let calls = shell.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0][3], "picture-uri");
        assert_eq!(calls[1][4], "centered");
    }

    #[test]
    fn test_missing_gsettings() {
        let adapter = GSettingsAdapter::new(Flavour::Gnome, Arc::new(RecordingShell::default()));
        assert!(adapter.apply(Path::new("/img.jpg"), FillMode::Zoom).is_err());
    }
}
