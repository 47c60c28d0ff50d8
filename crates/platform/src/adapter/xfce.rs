use super::{PlatformAdapter, require};
use crate::error::Result;
use crate::fill::FillMode;
use crate::shell::{Shell, args};
use std::path::Path;
use std::sync::Arc;
use tracing::warn;

const CHANNEL: &str = "xfce4-desktop";
const DEFAULT_PROPERTY: &str = "/backdrop/screen0/monitor0/workspace0/last-image";

/// XFCE keeps one `last-image` property per monitor and workspace; all of
/// them are updated.
pub(crate) struct XfceAdapter {
    shell: Arc<dyn Shell>,
}

impl XfceAdapter {
    pub(crate) fn new(shell: Arc<dyn Shell>) -> Self {
        Self { shell }
    }
}

pub(crate) fn image_properties(listing: &str) -> Vec<String> {
    let properties: Vec<String> = listing
        .lines()
        .map(str::trim)
        .filter(|line| line.starts_with("/backdrop/") && line.ends_with("/last-image"))
        .map(str::to_string)
        .collect();
    if properties.is_empty() { vec![DEFAULT_PROPERTY.to_string()] } else { properties }
}

impl PlatformAdapter for XfceAdapter {
    fn name(&self) -> &'static str {
        "xfce"
    }

    fn apply(&self, image: &Path, fill: FillMode) -> Result<()> {
        let xfconf = require(self.shell.as_ref(), "xfconf-query")?;
        let listing = self.shell.run(&xfconf, &args!["-c", CHANNEL, "-l"]).unwrap_or_default();
        for property in image_properties(&listing) {
            self.shell.run(&xfconf, &args!["-c", CHANNEL, "-p", &property, "-s", image])?;
            let Some(workspace) = property.strip_suffix("/last-image") else {
                continue;
            };
            let style = format!("{workspace}/image-style");
            if let Err(err) = self.shell.run(&xfconf, &args!["-c", CHANNEL, "-p", &style, "-s", fill.xfce_style()]) {
                warn!(property = %style, ?err, "could not set image style");
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
    fn test_image_properties() {
        let listing = "/backdrop/screen0/monitorDP-1/workspace0/last-image\n\
                       /backdrop/screen0/monitorDP-1/workspace0/image-style\n\
                       /backdrop/screen0/monitorHDMI-1/workspace0/last-image\n\
                       /desktop-icons/style\n";
        assert_eq!(
            image_properties(listing),
            vec![
                "/backdrop/screen0/monitorDP-1/workspace0/last-image",
                "/backdrop/screen0/monitorHDMI-1/workspace0/last-image"
            ]
        );
        assert_eq!(image_properties(""), vec![DEFAULT_PROPERTY]);
    }

    #[test]
    fn test_sets_image_and_style() {
        let shell = Arc::new(RecordingShell::with_tools(["xfconf-query"]));
        XfceAdapter::new(shell.clone()).apply(Path::new("/img.png"), FillMode::Stretch).unwrap();
        let calls = shell.calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[1], vec!["xfconf-query", "-c", CHANNEL, "-p", DEFAULT_PROPERTY, "-s", "/img.png"]);
        assert_eq!(
            calls[2],
            vec!["xfconf-query", "-c", CHANNEL, "-p", "/backdrop/screen0/monitor0/workspace0/image-style", "-s", "3"]
        );
    }
}
