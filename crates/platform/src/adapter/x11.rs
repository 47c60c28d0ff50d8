use super::PlatformAdapter;
use crate::error::{ErrorKind, Result};
use crate::fill::FillMode;
use crate::shell::{Shell, args};
use std::ffi::OsString;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

type Invocation = (&'static str, fn(&Path, FillMode) -> Vec<OsString>);

/// Tools that set the root window background, in order of preference.
const TOOLS: [Invocation; 3] = [
    ("feh", |image, fill| args!["--no-fehbg", fill.feh(), image]),
    ("nitrogen", |image, fill| args![fill.nitrogen(), "--save", image]),
    ("xwallpaper", |image, fill| args![fill.xwallpaper(), image]),
];

/// Bare X11 window managers such as i3.
pub(crate) struct X11Adapter {
    shell: Arc<dyn Shell>,
}

impl X11Adapter {
    pub(crate) fn new(shell: Arc<dyn Shell>) -> Self {
        Self { shell }
    }
}

impl PlatformAdapter for X11Adapter {
    fn name(&self) -> &'static str {
        "x11"
    }

    fn apply(&self, image: &Path, fill: FillMode) -> Result<()> {
        let mut last_error = None;
        for (tool, arguments) in TOOLS {
            let Some(program) = self.shell.which(tool) else {
                debug!(tool, "not installed");
                continue;
            };
            match self.shell.run(&program, &arguments(image, fill)) {
                Ok(_) => return Ok(()),
                Err(err) => {
                    warn!(tool, ?err, "wallpaper tool failed, trying the next one");
                    last_error = Some(err);
                },
            }
        }
        match last_error {
            Some(err) => Err(err),
            None => exn::bail!(ErrorKind::ToolNotFound("feh, nitrogen, xwallpaper")),
        }
    }
}
