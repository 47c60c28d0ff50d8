//! Canned listings for testing.

use super::ListingSource;
use crate::error::{ErrorKind, Result};
use crate::models::{CandidateImage, ListingQuery};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Listing source that serves fixed candidates per source name.
///
/// Sources registered with [`failing`](Self::failing) (or never registered
/// at all) answer with [`ErrorKind::Status`]`(503)`.
#[derive(Default)]
pub struct MockSource {
    listings: HashMap<String, Vec<CandidateImage>>,
    requests: AtomicUsize,
}

impl MockSource {
    pub fn with_listing(mut self, source: impl Into<String>, candidates: Vec<CandidateImage>) -> Self {
        self.listings.insert(source.into(), candidates);
        self
    }

    /// Convenience for listings of bare URLs.
    pub fn with_urls<'a>(self, source: &str, urls: impl IntoIterator<Item = &'a str>) -> Self {
        let candidates = urls.into_iter().map(|url| CandidateImage::new(source, url, url)).collect();
        self.with_listing(source, candidates)
    }

    pub fn failing(mut self, source: impl Into<String>) -> Self {
        self.listings.remove(&source.into());
        self
    }

    /// Number of `list` calls served so far.
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ListingSource for MockSource {
    fn name(&self) -> &str {
        "mock"
    }

    async fn list(&self, source: &str, query: &ListingQuery) -> Result<Vec<CandidateImage>> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let Some(candidates) = self.listings.get(source) else {
            exn::bail!(ErrorKind::Status(503));
        };
        Ok(candidates
            .iter()
            .filter(|c| !(query.filter_nsfw && c.nsfw))
            .take(query.limit as usize)
            .cloned()
            .collect())
    }
}
