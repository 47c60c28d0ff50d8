//! The wallpaper selection pipeline.
//!
//! A [`Selector`] pulls candidates from a
//! [`Fetcher`](wallrand_fetch::Fetcher), screens them with a [`Filter`] and
//! hands survivors to a [`Validator`], which downloads, decodes and caches
//! them. The first candidate that validates is the wallpaper.

pub mod download;
pub mod error;
mod filter;
mod select;

pub use crate::download::{DEFAULT_USER_AGENT, HttpDownloader, ImageDownloader, Validator};
pub use crate::filter::Filter;
pub use crate::select::{Failure, FailureKind, SelectionOptions, SelectionResult, Selector};
