//! Which desktop environment (or operating system) we are running under.

use crate::error::{Error, ErrorKind};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::process::Command;
use std::str::FromStr;
use tracing::{debug, trace};

/// A desktop with its own way of setting the wallpaper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Desktop {
    Gnome,
    Kde,
    Xfce,
    Mate,
    Cinnamon,
    I3,
    Sway,
    Hyprland,
    #[serde(rename = "macos")]
    MacOs,
    Windows,
}

impl Desktop {
    pub const ALL: [Self; 10] = [
        Self::Gnome,
        Self::Kde,
        Self::Xfce,
        Self::Mate,
        Self::Cinnamon,
        Self::I3,
        Self::Sway,
        Self::Hyprland,
        Self::MacOs,
        Self::Windows,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gnome => "gnome",
            Self::Kde => "kde",
            Self::Xfce => "xfce",
            Self::Mate => "mate",
            Self::Cinnamon => "cinnamon",
            Self::I3 => "i3",
            Self::Sway => "sway",
            Self::Hyprland => "hyprland",
            Self::MacOs => "macos",
            Self::Windows => "windows",
        }
    }

    /// Detect the running desktop. `None` means "some Linux desktop we could
    /// not identify".
    pub fn detect() -> Option<Self> {
        if cfg!(target_os = "macos") {
            return Some(Self::MacOs);
        }
        if cfg!(windows) {
            return Some(Self::Windows);
        }
        if let Some(desktop) = from_environment(|name| std::env::var(name).ok()) {
            debug!(%desktop, "detected desktop from environment");
            return Some(desktop);
        }
        let wayland = std::env::var_os("WAYLAND_DISPLAY").is_some_and(|v| !v.is_empty());
        let output = Command::new("ps").args(["-A", "-o", "comm="]).output().ok()?;
        let processes = String::from_utf8_lossy(&output.stdout);
        let desktop = from_processes(&processes, wayland);
        trace!(?desktop, wayland, "detected desktop from process list");
        desktop
    }
}

impl FromStr for Desktop {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "gnome" | "ubuntu" => Self::Gnome,
            "kde" | "plasma" => Self::Kde,
            "xfce" | "xfce4" => Self::Xfce,
            "mate" => Self::Mate,
            "cinnamon" => Self::Cinnamon,
            "i3" | "i3wm" => Self::I3,
            "sway" => Self::Sway,
            "hyprland" => Self::Hyprland,
            "macos" | "darwin" | "osx" => Self::MacOs,
            "windows" => Self::Windows,
            _ => exn::bail!(ErrorKind::ParseError { field: "desktop", value: s.to_string() }),
        })
    }
}

impl Display for Desktop {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// Tiling compositors are checked first: they often run inside a session
/// that still advertises a full desktop in `XDG_CURRENT_DESKTOP`.
pub(crate) fn from_environment(var: impl Fn(&str) -> Option<String>) -> Option<Desktop> {
    let lower = |name: &str| var(name).unwrap_or_default().to_ascii_lowercase();
    let is_set = |name: &str| var(name).is_some_and(|v| !v.is_empty());
    let desktop = lower("XDG_CURRENT_DESKTOP");
    let session = lower("DESKTOP_SESSION");
    let mentions = |needle: &str| desktop.contains(needle) || session.contains(needle);

    if mentions("sway") || is_set("SWAYSOCK") {
        return Some(Desktop::Sway);
    }
    if mentions("hyprland") || is_set("HYPRLAND_INSTANCE_SIGNATURE") {
        return Some(Desktop::Hyprland);
    }
    if mentions("i3") {
        return Some(Desktop::I3);
    }
    if desktop.contains("gnome") || desktop == "ubuntu" {
        Some(Desktop::Gnome)
    } else if desktop.contains("kde") || desktop.contains("plasma") {
        Some(Desktop::Kde)
    } else if desktop.contains("xfce") {
        Some(Desktop::Xfce)
    } else if desktop.contains("mate") {
        Some(Desktop::Mate)
    } else if desktop.contains("cinnamon") {
        Some(Desktop::Cinnamon)
    } else {
        None
    }
}

/// Fallback for sessions started without the usual environment, based on
/// `ps -A -o comm=` output (one process name per line).
pub(crate) fn from_processes(processes: &str, wayland: bool) -> Option<Desktop> {
    let names: Vec<&str> = processes.lines().map(str::trim).collect();
    let running = |name: &str| names.contains(&name);
    if wayland && running("sway") {
        Some(Desktop::Sway)
    } else if wayland && running("Hyprland") {
        Some(Desktop::Hyprland)
    } else if running("i3") {
        Some(Desktop::I3)
    } else if running("gnome-shell") {
        Some(Desktop::Gnome)
    } else if running("plasmashell") || names.iter().any(|n| n.starts_with("kwin")) {
        Some(Desktop::Kde)
    } else if names.iter().any(|n| n.starts_with("xfce4-")) {
        Some(Desktop::Xfce)
    } else {
        None
    }
}
