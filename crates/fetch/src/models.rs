//! Listing vocabulary shared by sources, the selector and configuration.

use crate::error::{Error, ErrorKind};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

fn parse_error(field: &'static str, value: &str) -> Error {
    exn::Exn::from(ErrorKind::ParseError { field, value: value.to_string() })
}

/// Raster formats a wallpaper can be delivered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    #[serde(alias = "jpg")]
    Jpeg,
    Png,
    Webp,
    Gif,
}
impl ImageFormat {
    pub const ALL: [Self; 4] = [Self::Jpeg, Self::Png, Self::Webp, Self::Gif];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpeg",
            Self::Png => "png",
            Self::Webp => "webp",
            Self::Gif => "gif",
        }
    }

    /// File extension used for the cached copy.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            other => other.as_str(),
        }
    }

    /// Format implied by a URL's file extension, ignoring any query string
    /// or fragment.
    ///
    /// ```
    /// use wallrand_fetch::ImageFormat;
    ///
    /// assert_eq!(ImageFormat::from_url("https://i.redd.it/a.JPG?width=640"), Some(ImageFormat::Jpeg));
    /// assert_eq!(ImageFormat::from_url("https://imgur.com/gallery/abc"), None);
    /// ```
    pub fn from_url(url: &str) -> Option<Self> {
        let path = url.split(['?', '#']).next().unwrap_or(url);
        let file = path.rsplit('/').next()?;
        let (_, extension) = file.rsplit_once('.')?;
        extension.parse().ok()
    }
}
impl FromStr for ImageFormat {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Self::Jpeg,
            "png" => Self::Png,
            "webp" => Self::Webp,
            "gif" => Self::Gif,
            _ => return Err(parse_error("image format", s)),
        })
    }
}
impl Display for ImageFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// Listing order, delegated to the remote API.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortMode {
    Hot,
    New,
    #[default]
    Top,
    Controversial,
    Rising,
}
impl SortMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hot => "hot",
            Self::New => "new",
            Self::Top => "top",
            Self::Controversial => "controversial",
            Self::Rising => "rising",
        }
    }

    /// Only `top` and `controversial` listings accept a time window.
    pub fn takes_time_window(&self) -> bool {
        matches!(self, Self::Top | Self::Controversial)
    }
}
impl FromStr for SortMode {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "hot" => Self::Hot,
            "new" => Self::New,
            "top" => Self::Top,
            "controversial" => Self::Controversial,
            "rising" => Self::Rising,
            _ => return Err(parse_error("sort mode", s)),
        })
    }
}
impl Display for SortMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeWindow {
    Hour,
    Day,
    Week,
    #[default]
    Month,
    Year,
    All,
}
impl TimeWindow {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hour => "hour",
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
            Self::Year => "year",
            Self::All => "all",
        }
    }
}
impl FromStr for TimeWindow {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "hour" => Self::Hour,
            "day" => Self::Day,
            "week" => Self::Week,
            "month" => Self::Month,
            "year" => Self::Year,
            "all" => Self::All,
            _ => return Err(parse_error("time window", s)),
        })
    }
}
impl Display for TimeWindow {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// How the selector orders candidates before trying them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionMode {
    /// Listing order, across sources in configured order.
    First,
    /// The whole listing, shuffled.
    #[default]
    Random,
}
impl SelectionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::First => "first",
            Self::Random => "random",
        }
    }
}
impl FromStr for SelectionMode {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "first" => Self::First,
            "random" => Self::Random,
            _ => return Err(parse_error("selection mode", s)),
        })
    }
}
impl Display for SelectionMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// Parameters for one listing request per source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListingQuery {
    pub sort: SortMode,
    pub time_window: TimeWindow,
    /// Maximum number of posts requested from each source.
    pub limit: u32,
    /// Drop posts marked NSFW.
    pub filter_nsfw: bool,
}
impl Default for ListingQuery {
    fn default() -> Self {
        Self { sort: SortMode::default(), time_window: TimeWindow::default(), limit: 100, filter_nsfw: true }
    }
}

/// A wallpaper candidate as advertised by a listing. Nothing here is trusted
/// until the image has been downloaded and decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateImage {
    /// Name of the source (subreddit) the candidate was listed in.
    pub source_id: String,
    pub url: String,
    pub title: String,
    pub known_width: Option<u32>,
    pub known_height: Option<u32>,
    pub format_hint: Option<ImageFormat>,
    pub permalink: Option<String>,
    pub nsfw: bool,
}
impl CandidateImage {
    /// A candidate with nothing but a URL; the format hint is derived from
    /// the URL's extension.
    pub fn new(source_id: impl Into<String>, url: impl Into<String>, title: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            source_id: source_id.into(),
            format_hint: ImageFormat::from_url(&url),
            url,
            title: title.into(),
            known_width: None,
            known_height: None,
            permalink: None,
            nsfw: false,
        }
    }

    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.known_width = Some(width);
        self.known_height = Some(height);
        self
    }

    /// Both listed dimensions, when the listing carried them.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.known_width.zip(self.known_height)
    }
}
