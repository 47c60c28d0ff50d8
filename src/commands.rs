//! One function per subcommand. User-facing output goes to stdout; logs go
//! to stderr through `tracing`.

use crate::cli::{Cli, Command};
use crate::error::{ErrorKind, Result, context};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};
use wallrand_cache::{CacheOptions, CacheStore};
use wallrand_config::Config;
use wallrand_fetch::Fetcher;
use wallrand_fetch::source::RedditSource;
use wallrand_library::{DEFAULT_USER_AGENT, Filter, HttpDownloader, SelectionOptions, Selector, Validator};
use wallrand_platform::{FillMode, WallpaperSetter};

const MEGABYTE: f64 = 1024.0 * 1024.0;

impl Cli {
    pub async fn execute(&self) -> Result<()> {
        match &self.command {
            Command::Init { force } => init(&self.init_path(), *force),
            Command::Set { fill_mode } => set(&self.load()?, *fill_mode).await,
            Command::ClearCache => clear_cache(&self.load()?).await,
            Command::TestConfig => test_config(&self.load()?),
        }
    }

    fn load(&self) -> Result<Config> {
        let path = wallrand_config::locate(self.config.as_deref());
        debug!(path = %path.display(), "loading configuration");
        context(Config::load(&path), ErrorKind::Config)
    }

    fn init_path(&self) -> PathBuf {
        self.config
            .clone()
            .or_else(wallrand_config::user_config_path)
            .unwrap_or_else(|| PathBuf::from("config.yaml"))
    }
}

fn init(path: &Path, force: bool) -> Result<()> {
    context(wallrand_config::write_template(path, force), ErrorKind::Config)?;
    println!("Created configuration file: {}", path.display());
    println!();
    println!("Next steps:");
    println!("1. Go to https://www.reddit.com/prefs/apps");
    println!("2. Click 'Create App' or 'Create Another App'");
    println!("3. Select 'script' as the app type");
    println!("4. Fill in the form (the redirect uri can be http://localhost:8080)");
    println!("5. Copy the client id and secret into {}", path.display());
    Ok(())
}

fn test_config(config: &Config) -> Result<()> {
    let cache_dir = context(config.cache_dir(), ErrorKind::Config)?;
    println!("Configuration loaded");
    println!("  Subreddits:         {}", config.subreddits.join(", "));
    println!("  Minimum resolution: {}", config.min_resolution);
    let formats: Vec<&str> = config.formats.iter().map(|f| f.as_str()).collect();
    println!("  Formats:            {}", formats.join(", "));
    let filter = &config.post_filter;
    if filter.sort.takes_time_window() {
        println!("  Post filter:        {} (time: {})", filter.sort, filter.time_filter);
    } else {
        println!("  Post filter:        {}", filter.sort);
    }
    println!("  Selection:          {}, up to {} attempts", filter.selection_mode, filter.retry_count);
    println!("  Cache directory:    {}", cache_dir.display());
    println!("  Cache budget:       {}MB", config.max_cache_size_mb);
    match config.wallpaper_tool.tool {
        Some(desktop) => println!("  Wallpaper adapter:  {desktop} (configured)"),
        None => println!("  Wallpaper adapter:  {}", WallpaperSetter::detect(None).adapter_name()),
    }
    println!();
    println!("Configuration is valid!");
    Ok(())
}

async fn clear_cache(config: &Config) -> Result<()> {
    let cache_dir = context(config.cache_dir(), ErrorKind::Config)?;
    if !cache_dir.exists() {
        println!("Cache directory doesn't exist");
        return Ok(());
    }
    let cache = open_cache(config, &cache_dir).await?;
    let removed = context(cache.clear().await, ErrorKind::Cache);
    cache.close().await;
    println!("Removed {} cached images", removed?);
    Ok(())
}

fn cache_options(config: &Config) -> CacheOptions {
    CacheOptions::from_megabytes(config.max_cache_size_mb, config.strict_cache)
}

async fn open_cache(config: &Config, cache_dir: &Path) -> Result<CacheStore> {
    context(CacheStore::open(cache_dir, cache_options(config)).await, ErrorKind::Cache)
}

async fn set(config: &Config, fill_mode: Option<FillMode>) -> Result<()> {
    let cache_dir = context(config.cache_dir(), ErrorKind::Config)?;
    let source = context(RedditSource::new(config.reddit.credentials(), config.download_timeout()), ErrorKind::Setup)?;
    let fetcher = Fetcher::new(Arc::new(source), config.subreddits.iter().cloned());
    let downloader = context(HttpDownloader::new(config.download_timeout(), DEFAULT_USER_AGENT), ErrorKind::Setup)?
        .with_size_limit(cache_options(config).budget);
    let filter = Filter::new(config.min_resolution.width, config.min_resolution.height, config.formats.iter().copied());
    let cache = open_cache(config, &cache_dir).await?;
    match cache.verify().await {
        Ok(report) if report != Default::default() => debug!(?report, "reconciled cache index with image files"),
        Ok(_) => {},
        Err(err) => warn!(?err, "could not verify cache"),
    }

    let outcome = apply(config, &fetcher, &cache, Arc::new(downloader), filter, fill_mode).await;
    if outcome.is_ok() {
        match cache.stats().await {
            Ok(stats) => println!(
                "Cache size: {:.1}MB / {}MB ({} images)",
                stats.total_bytes as f64 / MEGABYTE,
                config.max_cache_size_mb,
                stats.entries
            ),
            Err(err) => warn!(?err, "could not read cache statistics"),
        }
    }
    cache.close().await;
    outcome
}

async fn apply(
    config: &Config,
    fetcher: &Fetcher,
    cache: &CacheStore,
    downloader: Arc<HttpDownloader>,
    filter: Filter,
    fill_mode: Option<FillMode>,
) -> Result<()> {
    let validator = Validator::new(cache, downloader, filter);
    let options = SelectionOptions {
        mode: config.post_filter.selection_mode,
        max_attempts: config.post_filter.retry_count,
        deadline: config.deadline(),
    };
    println!("Fetching posts from {} subreddits...", config.subreddits.len());
    let selected = context(Selector::new(fetcher, &validator, options).select(&config.listing_query()).await, ErrorKind::Selection)?;
    for warning in &selected.warnings {
        println!("Warning: {warning}");
    }
    println!();
    println!("Selected wallpaper:");
    println!("  Title:     {}", selected.candidate.title);
    println!("  Subreddit: r/{}", selected.candidate.source_id);
    println!("  URL:       {}", selected.candidate.url);
    println!("  Size:      {}x{}", selected.image.width, selected.image.height);
    if !selected.failures.is_empty() {
        println!("  Skipped:   {} candidates", selected.failures.len());
    }

    let Some(path) = selected.local_path() else {
        exn::bail!(ErrorKind::NotOnDisk);
    };
    let setter = WallpaperSetter::detect(config.wallpaper_tool.tool);
    if !setter.apply_wallpaper(path, fill_mode.unwrap_or(config.fill_mode)) {
        exn::bail!(ErrorKind::Wallpaper(setter.adapter_name()));
    }
    println!();
    println!("Wallpaper set successfully!");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_init_writes_template_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        init(&path, false).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), wallrand_config::TEMPLATE);

        let err = init(&path, false).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Config(message) if message.contains("already exists")));
        init(&path, true).unwrap();
    }

    #[test]
    fn test_init_path_prefers_explicit_config() {
        let cli = Cli { config: Some(PathBuf::from("/tmp/custom.yaml")), verbose: 0, command: Command::TestConfig };
        assert_eq!(cli.init_path(), PathBuf::from("/tmp/custom.yaml"));
    }

    #[test]
    fn test_load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let cli = Cli { config: Some(dir.path().join("absent.yaml")), verbose: 0, command: Command::TestConfig };
        let err = cli.load().unwrap_err();
        assert!(matches!(&*err, ErrorKind::Config(message) if message.contains("wallrand init")));
    }

    #[tokio::test]
    async fn test_clear_cache_without_directory() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config { cache_dir_setting: Some(dir.path().join("never-created")), ..Config::default() };
        clear_cache(&config).await.unwrap();
        assert!(!dir.path().join("never-created").exists());
    }

    #[tokio::test]
    async fn test_clear_cache_empties_directory() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config { cache_dir_setting: Some(dir.path().to_path_buf()), ..Config::default() };
        let cache = open_cache(&config, dir.path()).await.unwrap();
        let key = wallrand_cache::CacheKey::for_url("https://i.redd.it/a.png");
        cache.put(&key, b"png", 1, 1, "png").await.unwrap();
        cache.close().await;

        clear_cache(&config).await.unwrap();
        let cache = open_cache(&config, dir.path()).await.unwrap();
        assert_eq!(cache.stats().await.unwrap().entries, 0);
        cache.close().await;
    }
}
