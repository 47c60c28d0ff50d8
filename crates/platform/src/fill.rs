//! How an image is fitted to the screen, and what each tool calls it.

use crate::error::{Error, ErrorKind};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Placement of the wallpaper on the screen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FillMode {
    /// Scale to cover the screen, preserving aspect ratio; edges are cropped.
    #[default]
    Zoom,
    /// Scale to fit inside the screen, preserving aspect ratio; no cropping.
    Fill,
    /// Unscaled, centered.
    Center,
    /// Scale to the screen size, ignoring aspect ratio.
    Stretch,
    /// Repeat the unscaled image.
    Tile,
}

impl FillMode {
    pub const ALL: [Self; 5] = [Self::Zoom, Self::Fill, Self::Center, Self::Stretch, Self::Tile];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Zoom => "zoom",
            Self::Fill => "fill",
            Self::Center => "center",
            Self::Stretch => "stretch",
            Self::Tile => "tile",
        }
    }

    /// `picture-options` value for GNOME, MATE and Cinnamon.
    pub(crate) fn gsettings(&self) -> &'static str {
        match self {
            Self::Zoom => "zoom",
            Self::Fill => "scaled",
            Self::Center => "centered",
            Self::Stretch => "stretched",
            Self::Tile => "wallpaper",
        }
    }

    /// `xfce4-desktop` `image-style`.
    pub(crate) fn xfce_style(&self) -> &'static str {
        match self {
            Self::Center => "1",
            Self::Tile => "2",
            Self::Stretch => "3",
            Self::Fill => "4",
            Self::Zoom => "5",
        }
    }

    /// `org.kde.image` `FillMode`.
    pub(crate) fn kde_fill_mode(&self) -> u8 {
        match self {
            Self::Stretch => 0,
            Self::Fill => 1,
            Self::Zoom => 2,
            Self::Tile => 3,
            Self::Center => 6,
        }
    }

    pub(crate) fn feh(&self) -> &'static str {
        match self {
            Self::Zoom => "--bg-fill",
            Self::Fill => "--bg-max",
            Self::Center => "--bg-center",
            Self::Stretch => "--bg-scale",
            Self::Tile => "--bg-tile",
        }
    }

    pub(crate) fn nitrogen(&self) -> &'static str {
        match self {
            Self::Zoom => "--set-zoom-fill",
            Self::Fill => "--set-zoom",
            Self::Center => "--set-centered",
            Self::Stretch => "--set-scaled",
            Self::Tile => "--set-tiled",
        }
    }

    pub(crate) fn xwallpaper(&self) -> &'static str {
        match self {
            Self::Zoom => "--zoom",
            Self::Fill => "--maximize",
            Self::Center => "--center",
            Self::Stretch => "--stretch",
            Self::Tile => "--tile",
        }
    }

    /// `swaybg --mode`.
    pub(crate) fn swaybg(&self) -> &'static str {
        match self {
            Self::Zoom => "fill",
            Self::Fill => "fit",
            Self::Center => "center",
            Self::Stretch => "stretch",
            Self::Tile => "tile",
        }
    }
}

impl FromStr for FillMode {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "zoom" | "crop" => Self::Zoom,
            "fill" | "fit" | "scaled" => Self::Fill,
            "center" | "centre" | "centered" => Self::Center,
            "stretch" | "stretched" => Self::Stretch,
            "tile" | "tiled" => Self::Tile,
            _ => exn::bail!(ErrorKind::ParseError { field: "fill mode", value: s.to_string() }),
        })
    }
}

impl Display for FillMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}
