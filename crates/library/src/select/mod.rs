//! Picking one wallpaper.
//!
//! [`Selector::select`] is an explicit state machine:
//!
//! ```text
//! Fetching -> Filtering -> Validating(candidate) -> Success
//!                 ^                |
//!                 +----------------+ (candidate failed)
//!             Filtering -> Exhausted (listing empty or attempts used up)
//! ```
//!
//! Candidates are tried strictly one at a time. Per-candidate failures are
//! recorded and never end the run; only exhaustion, the deadline or a broken
//! cache do.

use crate::download::Validator;
use crate::download::error::{Error as DownloadError, ErrorKind as DownloadErrorKind};
use crate::error::{ErrorKind, Result};
use derive_more::Display;
use exn::ResultExt;
use futures::StreamExt;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::future::Future;
use std::path::Path;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};
use wallrand_cache::CachedImage;
use wallrand_fetch::{CandidateImage, CandidateStream, Fetcher, ListingQuery, SelectionMode};

/// Why a candidate was passed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum FailureKind {
    #[display("download failed")]
    Download,
    #[display("not a supported image")]
    Decode,
    #[display("rejected resolution or format")]
    ResolutionRejected,
    #[display("larger than the cache")]
    ExceedsBudget,
}

impl FailureKind {
    const ALL: [Self; 4] = [Self::Download, Self::Decode, Self::ResolutionRejected, Self::ExceedsBudget];

    /// `None` for errors that are not about the candidate itself.
    fn of(err: &DownloadErrorKind) -> Option<Self> {
        match err {
            DownloadErrorKind::Download(_) => Some(Self::Download),
            DownloadErrorKind::Decode(_) => Some(Self::Decode),
            DownloadErrorKind::ResolutionRejected { .. } => Some(Self::ResolutionRejected),
            DownloadErrorKind::ExceedsBudget { .. } => Some(Self::ExceedsBudget),
            DownloadErrorKind::Cache => None,
        }
    }
}

/// One candidate that did not make it.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
#[display("{url}: {message}")]
pub struct Failure {
    pub url: String,
    pub kind: FailureKind,
    pub message: String,
}

/// A validated, cached wallpaper and how it was found.
#[derive(Debug, Clone)]
pub struct SelectionResult {
    pub image: CachedImage,
    pub candidate: CandidateImage,
    /// Validation attempts made, including the successful one.
    pub attempts: u32,
    pub failures: Vec<Failure>,
    /// Sources that could not be listed.
    pub warnings: Vec<String>,
}

impl SelectionResult {
    /// Absolute path of the image, when the cache keeps images on disk.
    pub fn local_path(&self) -> Option<&Path> {
        self.image.local_path.as_deref()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionOptions {
    pub mode: SelectionMode,
    /// Upper bound on download-and-validate attempts per run.
    pub max_attempts: u32,
    /// Overall time limit for the run.
    pub deadline: Option<Duration>,
}

impl Default for SelectionOptions {
    fn default() -> Self {
        Self { mode: SelectionMode::default(), max_attempts: 5, deadline: None }
    }
}

enum Queue<'s> {
    /// Pulled lazily, in listing order.
    Listing(CandidateStream<'s>),
    Shuffled(std::vec::IntoIter<CandidateImage>),
}

impl Queue<'_> {
    async fn next(&mut self, warnings: &mut Vec<String>) -> Option<CandidateImage> {
        match self {
            Self::Shuffled(candidates) => candidates.next(),
            Self::Listing(stream) => loop {
                match stream.next().await? {
                    Ok(candidate) => return Some(candidate),
                    Err(err) => warnings.push((*err).to_string()),
                }
            },
        }
    }
}

enum State<'s> {
    Fetching,
    Filtering(Queue<'s>),
    Validating(Queue<'s>, CandidateImage),
    Success(CandidateImage, CachedImage),
    Exhausted,
}

#[derive(Default)]
struct Run {
    attempts: u32,
    failures: Vec<Failure>,
    warnings: Vec<String>,
}

impl Run {
    fn fail(&mut self, candidate: &CandidateImage, kind: FailureKind, message: String) {
        debug!(url = %candidate.url, %kind, %message, "candidate failed");
        self.failures.push(Failure { url: candidate.url.clone(), kind, message });
    }

    fn summary(&self) -> String {
        let counts: Vec<String> = FailureKind::ALL
            .iter()
            .filter_map(|kind| {
                let count = self.failures.iter().filter(|f| f.kind == *kind).count();
                (count > 0).then(|| format!("{kind}: {count}"))
            })
            .collect();
        let mut summary = if counts.is_empty() { "no usable candidates listed".to_string() } else { counts.join(", ") };
        for warning in &self.warnings {
            summary.push_str("; ");
            summary.push_str(warning);
        }
        summary
    }

    fn exhausted(&self) -> ErrorKind {
        ErrorKind::NoCandidates { attempts: self.attempts, summary: self.summary() }
    }

    fn timed_out(&self) -> ErrorKind {
        ErrorKind::Timeout { attempts: self.attempts, summary: self.summary() }
    }
}

/// Runs a future against an optional deadline; `None` means it expired.
async fn within<F: Future>(deadline: Option<Instant>, future: F) -> Option<F::Output> {
    match deadline {
        Some(deadline) => tokio::time::timeout_at(deadline, future).await.ok(),
        None => Some(future.await),
    }
}

/// Drains a listing, keeping candidates and source warnings apart.
async fn drain(mut stream: CandidateStream<'_>) -> (Vec<CandidateImage>, Vec<String>) {
    let mut candidates = Vec::new();
    let mut warnings = Vec::new();
    while let Some(item) = stream.next().await {
        match item {
            Ok(candidate) => candidates.push(candidate),
            Err(err) => warnings.push((*err).to_string()),
        }
    }
    (candidates, warnings)
}

/// Chooses and validates one wallpaper from the fetcher's listing.
pub struct Selector<'a> {
    fetcher: &'a Fetcher,
    validator: &'a Validator<'a>,
    options: SelectionOptions,
    seed: Option<u64>,
}

impl<'a> Selector<'a> {
    pub fn new(fetcher: &'a Fetcher, validator: &'a Validator<'a>, options: SelectionOptions) -> Self {
        Self { fetcher, validator, options, seed: None }
    }

    /// Make the random order reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    fn shuffle(&self, mut candidates: Vec<CandidateImage>) -> Vec<CandidateImage> {
        match self.seed {
            Some(seed) => candidates.shuffle(&mut StdRng::seed_from_u64(seed)),
            None => candidates.shuffle(&mut rand::rng()),
        }
        candidates
    }

    #[instrument(skip_all, fields(mode = %self.options.mode, max_attempts = self.options.max_attempts))]
    pub async fn select(&self, query: &ListingQuery) -> Result<SelectionResult> {
        let deadline = self.options.deadline.map(|limit| Instant::now() + limit);
        let mut run = Run::default();
        let mut state = State::Fetching;
        loop {
            state = match state {
                State::Fetching => {
                    let stream = self.fetcher.list_candidates(query);
                    match self.options.mode {
                        SelectionMode::First => State::Filtering(Queue::Listing(stream)),
                        SelectionMode::Random => {
                            let drained = within(deadline, drain(stream)).await;
                            let Some((candidates, warnings)) = drained else {
                                exn::bail!(run.timed_out());
                            };
                            run.warnings = warnings;
                            debug!(candidates = candidates.len(), "shuffling listing");
                            State::Filtering(Queue::Shuffled(self.shuffle(candidates).into_iter()))
                        },
                    }
                },
                State::Filtering(mut queue) => {
                    let next = within(deadline, queue.next(&mut run.warnings)).await;
                    let Some(next) = next else {
                        exn::bail!(run.timed_out());
                    };
                    match next {
                        None => State::Exhausted,
                        Some(candidate) if !self.validator.filter().prefilter(&candidate) => {
                            let (width, height) = candidate.dimensions().unwrap_or_default();
                            run.fail(&candidate, FailureKind::ResolutionRejected, format!("listed as {width}x{height}"));
                            State::Filtering(queue)
                        },
                        Some(_) if run.attempts >= self.options.max_attempts => {
                            info!(attempts = run.attempts, "attempt limit reached");
                            State::Exhausted
                        },
                        Some(candidate) => State::Validating(queue, candidate),
                    }
                },
                State::Validating(queue, candidate) => {
                    run.attempts += 1;
                    let outcome = within(deadline, self.validator.fetch_and_validate(&candidate)).await;
                    let Some(outcome) = outcome else {
                        exn::bail!(run.timed_out());
                    };
                    match outcome {
                        Ok(image) => State::Success(candidate, image),
                        Err(err) => match FailureKind::of(&err) {
                            Some(kind) => {
                                run.fail(&candidate, kind, (*err).to_string());
                                State::Filtering(queue)
                            },
                            None => return Err::<SelectionResult, DownloadError>(err).or_raise(|| ErrorKind::Cache),
                        },
                    }
                },
                State::Success(candidate, image) => {
                    info!(url = %candidate.url, source = %candidate.source_id, title = %candidate.title, attempts = run.attempts, "selected wallpaper");
                    let Run { attempts, failures, warnings } = run;
                    return Ok(SelectionResult { image, candidate, attempts, failures, warnings });
                },
                State::Exhausted => {
                    warn!(attempts = run.attempts, summary = %run.summary(), "no suitable wallpaper");
                    exn::bail!(run.exhausted());
                },
            };
        }
    }
}
