//! Running external wallpaper tools.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::trace;

/// The boundary between adapters and the operating system.
///
/// Adapters only decide *which* tool to run with *which* arguments; the shell
/// finds and runs it.
pub trait Shell: Send + Sync {
    /// Locate a tool on `PATH`.
    fn which(&self, tool: &str) -> Option<PathBuf>;

    /// Run a tool to completion; a non-zero exit status is an error.
    fn run(&self, program: &Path, args: &[OsString]) -> Result<String>;

    /// Start a long-running tool (such as `swaybg`) without waiting for it.
    fn spawn(&self, program: &Path, args: &[OsString]) -> Result<()>;
}

/// [`Shell`] backed by `which` and [`std::process::Command`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemShell;

impl Shell for SystemShell {
    fn which(&self, tool: &str) -> Option<PathBuf> {
        which::which(tool).ok()
    }

    fn run(&self, program: &Path, args: &[OsString]) -> Result<String> {
        trace!(program = %program.display(), ?args, "running wallpaper tool");
        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .or_raise(|| ErrorKind::Spawn(program.display().to_string()))?;
        if !output.status.success() {
            exn::bail!(ErrorKind::CommandFailed {
                program: program.display().to_string(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn spawn(&self, program: &Path, args: &[OsString]) -> Result<()> {
        trace!(program = %program.display(), ?args, "starting wallpaper daemon");
        Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .or_raise(|| ErrorKind::Spawn(program.display().to_string()))?;
        Ok(())
    }
}

/// Build an argument vector from a mix of strings and paths.
macro_rules! args {
    ($($arg:expr),* $(,)?) => {
        vec![$(::std::ffi::OsString::from($arg)),*]
    };
}
pub(crate) use args;
