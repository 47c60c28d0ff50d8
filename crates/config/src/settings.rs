use crate::error::{ErrorKind, Result};
use directories::{BaseDirs, ProjectDirs};
use exn::OptionExt;
use serde::Deserialize;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::{Path, PathBuf};
use std::time::Duration;
use wallrand_fetch::source::RedditCredentials;
use wallrand_fetch::{ImageFormat, ListingQuery, SelectionMode, SortMode, TimeWindow};
use wallrand_platform::{Desktop, FillMode};

/// Values `wallrand init` writes and that must be replaced before use.
const PLACEHOLDERS: [&str; 2] = ["YOUR_CLIENT_ID_HERE", "YOUR_CLIENT_SECRET_HERE"];
/// Reddit refuses larger listing pages.
const MAX_LIMIT: u32 = 100;

/// Everything a `wallrand` run needs, as read from the YAML file and
/// `WALLRAND_*` environment overrides.
///
/// Missing keys take the defaults below; [`validate`](Self::validate) is what
/// decides whether the result is usable.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub subreddits: Vec<String>,
    pub min_resolution: Resolution,
    pub formats: Vec<ImageFormat>,
    pub post_filter: PostFilter,
    pub reddit: RedditSettings,
    /// Raw value from the file; use [`cache_dir()`](Self::cache_dir) for the
    /// resolved location.
    #[serde(rename = "cache_dir")]
    pub cache_dir_setting: Option<PathBuf>,
    pub max_cache_size_mb: u64,
    pub strict_cache: bool,
    pub download_timeout_secs: u64,
    pub deadline_secs: Option<u64>,
    pub fill_mode: FillMode,
    pub wallpaper_tool: WallpaperTool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            subreddits: Vec::new(),
            min_resolution: Resolution::default(),
            formats: vec![ImageFormat::Jpeg, ImageFormat::Png],
            post_filter: PostFilter::default(),
            reddit: RedditSettings::default(),
            cache_dir_setting: None,
            max_cache_size_mb: 500,
            strict_cache: true,
            download_timeout_secs: 30,
            deadline_secs: None,
            fill_mode: FillMode::default(),
            wallpaper_tool: WallpaperTool::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Default for Resolution {
    fn default() -> Self {
        Self { width: 1920, height: 1080 }
    }
}

impl Display for Resolution {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}x{}", self.width, self.height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PostFilter {
    pub sort: SortMode,
    pub time_filter: TimeWindow,
    pub limit: u32,
    pub selection_mode: SelectionMode,
    /// Maximum number of candidates downloaded and validated per run.
    pub retry_count: u32,
    pub filter_nsfw: bool,
}

impl Default for PostFilter {
    fn default() -> Self {
        Self {
            sort: SortMode::default(),
            time_filter: TimeWindow::default(),
            limit: MAX_LIMIT,
            selection_mode: SelectionMode::default(),
            retry_count: 5,
            filter_nsfw: true,
        }
    }
}

#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RedditSettings {
    pub client_id: String,
    pub client_secret: String,
    pub user_agent: String,
}

impl Default for RedditSettings {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            user_agent: format!("wallrand/{} (desktop wallpaper randomizer)", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl std::fmt::Debug for RedditSettings {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("RedditSettings")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

impl RedditSettings {
    pub fn credentials(&self) -> RedditCredentials {
        RedditCredentials {
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            user_agent: self.user_agent.clone(),
        }
    }
}

/// Override for desktop detection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WallpaperTool {
    pub tool: Option<Desktop>,
}

impl Config {
    /// Collect every problem with the configuration into one
    /// [`Validation`](ErrorKind::Validation) error.
    pub fn validate(&self) -> Result<()> {
        let mut problems = Vec::new();
        if self.subreddits.is_empty() {
            problems.push("'subreddits' must be a non-empty list".to_string());
        }
        for name in &self.subreddits {
            let bare = name.trim().trim_start_matches("/r/").trim_start_matches("r/");
            if bare.is_empty() || !bare.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                problems.push(format!("'{name}' is not a subreddit name"));
            }
        }
        if self.min_resolution.width == 0 || self.min_resolution.height == 0 {
            problems.push("resolution width and height must be positive".to_string());
        }
        if self.formats.is_empty() {
            problems.push("'formats' must list at least one image format".to_string());
        }
        if !(1..=MAX_LIMIT).contains(&self.post_filter.limit) {
            problems.push(format!("'post_filter.limit' must be between 1 and {MAX_LIMIT}"));
        }
        if self.post_filter.retry_count == 0 {
            problems.push("'post_filter.retry_count' must be at least 1".to_string());
        }
        for (key, value) in [("client_id", &self.reddit.client_id), ("client_secret", &self.reddit.client_secret)] {
            if value.trim().is_empty() || PLACEHOLDERS.contains(&value.trim()) {
                problems.push(format!("Reddit {key} not configured; add your Reddit API credentials"));
            }
        }
        if self.reddit.user_agent.trim().is_empty() {
            problems.push("'reddit.user_agent' must not be empty".to_string());
        }
        if self.max_cache_size_mb == 0 {
            problems.push("'max_cache_size_mb' must be positive".to_string());
        }
        if self.download_timeout_secs == 0 {
            problems.push("'download_timeout_secs' must be positive".to_string());
        }
        if self.deadline_secs == Some(0) {
            problems.push("'deadline_secs' must be positive when set".to_string());
        }
        if self.cache_dir().is_err() {
            problems.push("could not determine a cache directory".to_string());
        }
        if !problems.is_empty() {
            exn::bail!(ErrorKind::Validation(problems.join("; ")));
        }
        Ok(())
    }

    /// The cache directory: the configured one with `~` expanded and made
    /// absolute, or the platform cache directory.
    pub fn cache_dir(&self) -> Result<PathBuf> {
        let unresolved = || ErrorKind::Validation("could not determine a cache directory".to_string());
        let Some(configured) = &self.cache_dir_setting else {
            let dirs = ProjectDirs::from("", "", "wallrand").ok_or_raise(unresolved)?;
            return Ok(dirs.cache_dir().to_path_buf());
        };
        let expanded = expand_home(configured).ok_or_raise(unresolved)?;
        std::path::absolute(&expanded).ok().ok_or_raise(unresolved)
    }

    pub fn listing_query(&self) -> ListingQuery {
        ListingQuery {
            sort: self.post_filter.sort,
            time_window: self.post_filter.time_filter,
            limit: self.post_filter.limit,
            filter_nsfw: self.post_filter.filter_nsfw,
        }
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_secs.map(Duration::from_secs)
    }
}

fn expand_home(path: &Path) -> Option<PathBuf> {
    match path.strip_prefix("~") {
        Ok(rest) => BaseDirs::new().map(|dirs| dirs.home_dir().join(rest)),
        Err(_) => Some(path.to_path_buf()),
    }
}
