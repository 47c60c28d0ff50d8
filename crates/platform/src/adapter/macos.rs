use super::{PlatformAdapter, require};
use crate::error::Result;
use crate::fill::FillMode;
use crate::shell::{Shell, args};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// macOS through System Events, which sets the picture on every desktop
/// (one per display and Space).
pub(crate) struct MacOsAdapter {
    shell: Arc<dyn Shell>,
}

impl MacOsAdapter {
    pub(crate) fn new(shell: Arc<dyn Shell>) -> Self {
        Self { shell }
    }
}

pub(crate) fn apple_script(image: &Path) -> String {
    let escaped = image.display().to_string().replace('\\', "\\\\").replace('"', "\\\"");
    format!("tell application \"System Events\" to tell every desktop to set picture to \"{escaped}\"")
}

impl PlatformAdapter for MacOsAdapter {
    fn name(&self) -> &'static str {
        "macos"
    }

    fn apply(&self, image: &Path, fill: FillMode) -> Result<()> {
        let osascript = require(self.shell.as_ref(), "osascript")?;
        if fill != FillMode::Zoom {
            debug!(%fill, "System Events cannot change picture placement; fill mode ignored");
        }
        self.shell.run(&osascript, &args!["-e", apple_script(image)])?;
        Ok(())
    }
}
