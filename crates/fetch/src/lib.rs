//! Candidate wallpaper listings.
//!
//! A [`ListingSource`](source::ListingSource) talks to a remote API (Reddit)
//! and turns one subreddit listing into [`CandidateImage`]s. The [`Fetcher`]
//! walks the configured subreddits in order and merges their listings into a
//! single lazy, deduplicated stream in which an unreachable subreddit is a
//! recoverable item rather than the end of the stream.

pub mod error;
mod fetcher;
mod models;
pub mod source;

pub use crate::fetcher::{CandidateStream, Fetcher};
pub use crate::models::{CandidateImage, ImageFormat, ListingQuery, SelectionMode, SortMode, TimeWindow};
