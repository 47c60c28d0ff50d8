//! Merged, deduplicated candidate listing across all configured sources.

use crate::error::{ErrorKind, Result};
use crate::models::{CandidateImage, ListingQuery};
use crate::source::ListingSource;
use async_stream::stream;
use exn::ResultExt;
use futures::Stream;
use std::collections::HashSet;
use std::pin::Pin;
use std::sync::Arc;
use tracing::{info, warn};

pub type CandidateStream<'a> = Pin<Box<dyn Stream<Item = Result<CandidateImage>> + Send + 'a>>;

/// Lists candidates from each configured source, in configured order.
pub struct Fetcher {
    api: Arc<dyn ListingSource>,
    sources: Vec<String>,
}

impl Fetcher {
    pub fn new(api: Arc<dyn ListingSource>, sources: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self { api, sources: sources.into_iter().map(Into::into).collect() }
    }

    /// A lazy, finite stream of candidates.
    ///
    /// A source is only queried once the consumer has pulled every candidate
    /// of the sources before it. Within a source the API's order is kept, and
    /// a URL already yielded by an earlier source is skipped. A source that
    /// cannot be listed yields one [`ErrorKind::SourceUnavailable`] item and
    /// listing carries on with the next source.
    pub fn list_candidates<'a>(&'a self, query: &'a ListingQuery) -> CandidateStream<'a> {
        Box::pin(stream! {
            let mut seen = HashSet::new();
            for source in &self.sources {
                let listed = self
                    .api
                    .list(source, query)
                    .await
                    .or_raise(|| ErrorKind::SourceUnavailable(source.clone()));
                let candidates = match listed {
                    Ok(candidates) => candidates,
                    Err(err) => {
                        warn!(api = self.api.name(), source, ?err, "could not list source, skipping");
                        yield Err(err);
                        continue;
                    },
                };
                let total = candidates.len();
                let mut fresh = 0usize;
                for candidate in candidates {
                    if seen.insert(candidate.url.clone()) {
                        fresh += 1;
                        yield Ok(candidate);
                    }
                }
                info!(source, total, fresh, "listed image posts");
            }
        })
    }
}
