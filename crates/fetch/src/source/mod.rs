//! Remote listing APIs.

#[cfg(any(test, feature = "mock"))]
mod mock;
mod reddit;

#[cfg(any(test, feature = "mock"))]
pub use self::mock::MockSource;
pub use self::reddit::{RedditCredentials, RedditSource};
use crate::error::Result;
use crate::models::{CandidateImage, ListingQuery};
use async_trait::async_trait;

/// A remote API that lists image posts for a named source (a subreddit).
///
/// Implementations return candidates in the API's own order and apply the
/// image-post and NSFW filtering themselves; deduplication across sources is
/// the [`Fetcher`](crate::Fetcher)'s job.
#[async_trait]
pub trait ListingSource: Send + Sync {
    /// Name of the API (used for logging only).
    fn name(&self) -> &str;

    async fn list(&self, source: &str, query: &ListingQuery) -> Result<Vec<CandidateImage>>;
}
