use super::ImageDownloader;
use super::error::{ErrorKind, Result};
use async_trait::async_trait;
use exn::ResultExt;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, instrument};

/// Some image hosts refuse requests that do not look like a browser.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// Downloads over HTTP(S) with a per-request timeout and an optional cap on
/// the body size.
pub struct HttpDownloader {
    client: Client,
    max_bytes: u64,
}

impl HttpDownloader {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .or_raise(|| ErrorKind::Download("(building HTTP client)".to_string()))?;
        Ok(Self { client, max_bytes: u64::MAX })
    }

    /// Refuse bodies larger than `max_bytes` (normally the cache budget),
    /// without reading more of them than necessary.
    pub fn with_size_limit(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    fn too_large(&self, size: u64) -> Result<()> {
        if size > self.max_bytes {
            exn::bail!(ErrorKind::ExceedsBudget { size, budget: self.max_bytes });
        }
        Ok(())
    }
}

#[async_trait]
impl ImageDownloader for HttpDownloader {
    #[instrument(skip(self))]
    async fn download(&self, url: &str) -> Result<Vec<u8>> {
        let failed = || ErrorKind::Download(url.to_string());
        let mut response = self.client.get(url).send().await.or_raise(failed)?;
        let status = response.status();
        if !status.is_success() {
            exn::bail!(ErrorKind::Download(format!("{url} (HTTP {status})")));
        }
        if let Some(announced) = response.content_length() {
            self.too_large(announced)?;
        }
        // The announced length may be missing or wrong; count what arrives.
        let mut bytes = Vec::new();
        while let Some(chunk) = response.chunk().await.or_raise(failed)? {
            bytes.extend_from_slice(&chunk);
            self.too_large(bytes.len() as u64)?;
        }
        debug!(size = bytes.len(), "downloaded image");
        Ok(bytes)
    }
}
