//! Downloading candidates and turning them into validated cache entries.
//!
//! Listing metadata is never trusted: an image only reaches the cache after
//! its bytes have been decoded and its real dimensions and format checked.

pub mod error;
mod http;
#[cfg(test)]
pub(crate) mod mock;

pub use self::http::{DEFAULT_USER_AGENT, HttpDownloader};
use crate::filter::Filter;
use async_trait::async_trait;
use exn::ResultExt;
use self::error::{ErrorKind, Result};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use wallrand_cache::error::ErrorKind as CacheErrorKind;
use wallrand_cache::{CacheKey, CacheStore, CachedImage};
use wallrand_fetch::{CandidateImage, ImageFormat};

/// Fetches the raw bytes behind a candidate URL.
#[async_trait]
pub trait ImageDownloader: Send + Sync {
    /// Timeouts, connection failures and non-2xx responses are
    /// [`ErrorKind::Download`].
    async fn download(&self, url: &str) -> Result<Vec<u8>>;
}

/// Cache-first download and validation of single candidates.
pub struct Validator<'a> {
    cache: &'a CacheStore,
    downloader: Arc<dyn ImageDownloader>,
    filter: Filter,
}

impl<'a> Validator<'a> {
    pub fn new(cache: &'a CacheStore, downloader: Arc<dyn ImageDownloader>, filter: Filter) -> Self {
        Self { cache, downloader, filter }
    }

    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    /// Produce a validated cache entry for `candidate`, reusing the cached
    /// copy when there is one.
    ///
    /// Failures other than [`ErrorKind::Cache`] concern this candidate only.
    #[instrument(skip_all, fields(url = %candidate.url))]
    pub async fn fetch_and_validate(&self, candidate: &CandidateImage) -> Result<CachedImage> {
        let key = CacheKey::for_url(&candidate.url);
        if let Some(hit) = self.cached(&key).await? {
            let Ok(format) = hit.format.parse::<ImageFormat>() else {
                exn::bail!(ErrorKind::Decode(candidate.url.clone()));
            };
            self.check(hit.width, hit.height, format)?;
            debug!(%key, "reusing cached image");
            return Ok(hit);
        }

        let bytes = self.downloader.download(&candidate.url).await?;
        let url = candidate.url.clone();
        let (bytes, width, height, format) = tokio::task::spawn_blocking(move || {
            let (width, height, format) = decode(&url, &bytes)?;
            Ok::<_, error::Error>((bytes, width, height, format))
        })
        .await
        .or_raise(|| ErrorKind::Decode(candidate.url.clone()))??;
        self.check(width, height, format)?;

        let image = match self.cache.put(&key, &bytes, width, height, format.extension()).await {
            Ok(image) => image,
            Err(err) => {
                if let CacheErrorKind::ExceedsBudget { size, budget } = &*err {
                    let (size, budget) = (*size, *budget);
                    return Err(err).or_raise(|| ErrorKind::ExceedsBudget { size, budget });
                }
                return Err(err).or_raise(|| ErrorKind::Cache);
            },
        };
        info!(%key, width, height, %format, size = image.byte_size, "cached new image");
        Ok(image)
    }

    /// A lookup that heals corruption: a vanished backing file only means the
    /// image has to be downloaded again.
    async fn cached(&self, key: &CacheKey) -> Result<Option<CachedImage>> {
        match self.cache.get(key).await {
            Ok(hit) => Ok(hit),
            Err(err) if matches!(&*err, CacheErrorKind::Corruption(_)) => {
                warn!(%key, "cached file went missing, downloading again");
                Ok(None)
            },
            Err(err) => Err(err).or_raise(|| ErrorKind::Cache),
        }
    }

    fn check(&self, width: u32, height: u32, format: ImageFormat) -> Result<()> {
        if !self.filter.accepts(width, height, format) {
            exn::bail!(ErrorKind::ResolutionRejected { width, height, format });
        }
        Ok(())
    }
}

/// Identify the format from the bytes themselves and decode the whole image,
/// so truncated files are caught here rather than by the desktop.
fn decode(url: &str, bytes: &[u8]) -> Result<(u32, u32, ImageFormat)> {
    let invalid = || ErrorKind::Decode(url.to_string());
    let guessed = image::guess_format(bytes).or_raise(invalid)?;
    let format = match guessed {
        image::ImageFormat::Jpeg => ImageFormat::Jpeg,
        image::ImageFormat::Png => ImageFormat::Png,
        image::ImageFormat::WebP => ImageFormat::Webp,
        image::ImageFormat::Gif => ImageFormat::Gif,
        _ => exn::bail!(invalid()),
    };
    let decoded = image::load_from_memory_with_format(bytes, guessed).or_raise(invalid)?;
    Ok((decoded.width(), decoded.height(), format))
}

#[cfg(test)]
mod tests {
    use super::mock::{MockDownloader, encode};
    use super::*;
    use wallrand_cache::CacheOptions;

    const URL: &str = "https://i.redd.it/mountains.png";

    async fn store(dir: &tempfile::TempDir, budget: u64) -> CacheStore {
        CacheStore::open(dir.path(), CacheOptions { budget, strict: true }).await.unwrap()
    }

    fn filter() -> Filter {
        Filter::new(64, 48, [ImageFormat::Png, ImageFormat::Jpeg])
    }

    fn candidate(url: &str) -> CandidateImage {
        CandidateImage::new("wallpapers", url, "Mountains")
    }

    #[tokio::test]
    async fn test_downloads_validates_and_caches() {
        let dir = tempfile::tempdir().unwrap();
        let cache = store(&dir, 1 << 20).await;
        let downloader = Arc::new(MockDownloader::default().with_file(URL, encode(80, 60, image::ImageFormat::Png)));
        let validator = Validator::new(&cache, downloader.clone(), filter());

        let image = validator.fetch_and_validate(&candidate(URL)).await.unwrap();
        assert_eq!((image.width, image.height), (80, 60));
        assert_eq!(image.format, "png");
        assert!(image.local_path.as_ref().unwrap().is_file());

        // The second lookup is served from the cache.
        let again = validator.fetch_and_validate(&candidate(URL)).await.unwrap();
        assert_eq!(again.key, image.key);
        assert_eq!(downloader.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_listing_metadata_is_not_trusted() {
        let dir = tempfile::tempdir().unwrap();
        let cache = store(&dir, 1 << 20).await;
        let downloader = Arc::new(MockDownloader::default().with_file(URL, encode(32, 24, image::ImageFormat::Png)));
        let validator = Validator::new(&cache, downloader, filter());

        let listed = candidate(URL).with_dimensions(3840, 2160);
        let err = validator.fetch_and_validate(&listed).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::ResolutionRejected { width: 32, height: 24, .. }));
        assert_eq!(cache.stats().await.unwrap().entries, 0);
    }

    #[tokio::test]
    async fn test_real_format_is_checked() {
        let dir = tempfile::tempdir().unwrap();
        let cache = store(&dir, 1 << 20).await;
        // Advertised as PNG, actually a JPEG, and only PNG is allowed.
        let downloader = Arc::new(MockDownloader::default().with_file(URL, encode(80, 60, image::ImageFormat::Jpeg)));
        let validator = Validator::new(&cache, downloader, Filter::new(64, 48, [ImageFormat::Png]));
        let err = validator.fetch_and_validate(&candidate(URL)).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::ResolutionRejected { format: ImageFormat::Jpeg, .. }));
    }

    #[tokio::test]
    async fn test_undecodable_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let cache = store(&dir, 1 << 20).await;
        let mut truncated = encode(80, 60, image::ImageFormat::Png);
        truncated.truncate(truncated.len() / 2);
        let downloader = Arc::new(
            MockDownloader::default()
                .with_file(URL, b"<html>not an image</html>".to_vec())
                .with_file("https://i.redd.it/truncated.png", truncated),
        );
        let validator = Validator::new(&cache, downloader, filter());
        let err = validator.fetch_and_validate(&candidate(URL)).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Decode(_)));
        let err = validator.fetch_and_validate(&candidate("https://i.redd.it/truncated.png")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Decode(_)));
    }

    #[tokio::test]
    async fn test_download_failure() {
        let dir = tempfile::tempdir().unwrap();
        let cache = store(&dir, 1 << 20).await;
        let validator = Validator::new(&cache, Arc::new(MockDownloader::default()), filter());
        let err = validator.fetch_and_validate(&candidate(URL)).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Download(_)));
    }

    #[tokio::test]
    async fn test_image_larger_than_budget() {
        let dir = tempfile::tempdir().unwrap();
        let cache = store(&dir, 16).await;
        let downloader = Arc::new(MockDownloader::default().with_file(URL, encode(80, 60, image::ImageFormat::Png)));
        let validator = Validator::new(&cache, downloader, filter());
        let err = validator.fetch_and_validate(&candidate(URL)).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::ExceedsBudget { budget: 16, .. }));
    }

    #[tokio::test]
    async fn test_missing_cached_file_is_downloaded_again() {
        let dir = tempfile::tempdir().unwrap();
        let cache = store(&dir, 1 << 20).await;
        let downloader = Arc::new(MockDownloader::default().with_file(URL, encode(80, 60, image::ImageFormat::Png)));
        let validator = Validator::new(&cache, downloader.clone(), filter());

        let image = validator.fetch_and_validate(&candidate(URL)).await.unwrap();
        std::fs::remove_file(image.local_path.unwrap()).unwrap();

        let healed = validator.fetch_and_validate(&candidate(URL)).await.unwrap();
        assert!(healed.local_path.unwrap().is_file());
        assert_eq!(downloader.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_cached_image_rechecked_against_stricter_filter() {
        let dir = tempfile::tempdir().unwrap();
        let cache = store(&dir, 1 << 20).await;
        let downloader = Arc::new(MockDownloader::default().with_file(URL, encode(80, 60, image::ImageFormat::Png)));
        Validator::new(&cache, downloader.clone(), filter()).fetch_and_validate(&candidate(URL)).await.unwrap();

        let stricter = Validator::new(&cache, downloader.clone(), Filter::new(1920, 1080, [ImageFormat::Png]));
        let err = stricter.fetch_and_validate(&candidate(URL)).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::ResolutionRejected { width: 80, .. }));
        assert_eq!(downloader.requests().len(), 1);
    }
}
