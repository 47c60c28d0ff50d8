//! Reddit listings via application-only OAuth.

use super::ListingSource;
use crate::error::{ErrorKind, Result};
use crate::models::{CandidateImage, ImageFormat, ListingQuery};
use async_trait::async_trait;
use exn::ResultExt;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, instrument};

const AUTH_URL: &str = "https://www.reddit.com/api/v1/access_token";
const API_BASE: &str = "https://oauth.reddit.com";
const IMAGE_EXTENSIONS: [&str; 5] = [".jpg", ".jpeg", ".png", ".webp", ".gif"];

/// Credentials of a Reddit "script" or "web" application.
#[derive(Clone, PartialEq, Eq)]
pub struct RedditCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub user_agent: String,
}
impl std::fmt::Debug for RedditCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedditCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

#[derive(Deserialize)]
struct AccessToken {
    access_token: String,
}

#[derive(Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Child>,
}

#[derive(Deserialize)]
struct Child {
    data: Post,
}

#[derive(Deserialize)]
struct Post {
    url: Option<String>,
    #[serde(default)]
    title: String,
    permalink: Option<String>,
    #[serde(default)]
    over_18: bool,
    post_hint: Option<String>,
    preview: Option<Preview>,
}

#[derive(Deserialize)]
struct Preview {
    #[serde(default)]
    images: Vec<PreviewImage>,
}

#[derive(Deserialize)]
struct PreviewImage {
    source: PreviewSource,
}

#[derive(Deserialize)]
struct PreviewSource {
    width: u32,
    height: u32,
}

/// Lists subreddit posts through `oauth.reddit.com`.
///
/// The bearer token is requested on first use and reused for the lifetime
/// of the source. A failed token request is not cached, so every source
/// listed afterwards tries (and reports) authentication again.
pub struct RedditSource {
    client: Client,
    credentials: RedditCredentials,
    token: OnceCell<String>,
}

impl RedditSource {
    pub fn new(credentials: RedditCredentials, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(credentials.user_agent.as_str())
            .timeout(timeout)
            .build()
            .or_raise(|| ErrorKind::InvalidConfig("HTTP client"))?;
        Ok(Self { client, credentials, token: OnceCell::new() })
    }

    async fn access_token(&self) -> Result<&str> {
        let token = self
            .token
            .get_or_try_init(|| async {
                debug!(client_id = %self.credentials.client_id, "requesting Reddit access token");
                let response = self
                    .client
                    .post(AUTH_URL)
                    .basic_auth(&self.credentials.client_id, Some(&self.credentials.client_secret))
                    .form(&[("grant_type", "client_credentials")])
                    .send()
                    .await
                    .or_raise(|| ErrorKind::Request)?;
                let status = response.status();
                if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                    exn::bail!(ErrorKind::Authentication);
                }
                if !status.is_success() {
                    exn::bail!(ErrorKind::Status(status.as_u16()));
                }
                let token: AccessToken = response.json().await.or_raise(|| ErrorKind::Authentication)?;
                Ok::<_, crate::error::Error>(token.access_token)
            })
            .await?;
        Ok(token.as_str())
    }
}

#[async_trait]
impl ListingSource for RedditSource {
    fn name(&self) -> &str {
        "reddit"
    }

    #[instrument(skip(self, query), fields(sort = %query.sort, limit = query.limit))]
    async fn list(&self, source: &str, query: &ListingQuery) -> Result<Vec<CandidateImage>> {
        let url = listing_url(API_BASE, source, query)?;
        let token = self.access_token().await?;
        let response = self.client.get(&url).bearer_auth(token).send().await.or_raise(|| ErrorKind::Request)?;
        let status = response.status();
        if !status.is_success() {
            exn::bail!(ErrorKind::Status(status.as_u16()));
        }
        let body = response.bytes().await.or_raise(|| ErrorKind::Request)?;
        let candidates = parse_listing(source, &body, query.filter_nsfw)?;
        debug!(found = candidates.len(), "listed image posts");
        Ok(candidates)
    }
}

/// Subreddit names are letters, digits and underscores; an `r/` prefix is
/// tolerated.
fn subreddit_name(source: &str) -> Result<&str> {
    let name = source.trim().trim_start_matches("/r/").trim_start_matches("r/");
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        exn::bail!(ErrorKind::ParseError { field: "subreddit", value: source.to_string() });
    }
    Ok(name)
}

pub(crate) fn listing_url(api_base: &str, source: &str, query: &ListingQuery) -> Result<String> {
    let name = subreddit_name(source)?;
    let mut url = format!("{api_base}/r/{name}/{}?limit={}&raw_json=1", query.sort, query.limit);
    if query.sort.takes_time_window() {
        url.push_str("&t=");
        url.push_str(query.time_window.as_str());
    }
    Ok(url)
}

/// Direct image links, imgur pages and posts Reddit itself marks as images.
pub(crate) fn is_image_post(url: &str, post_hint: Option<&str>) -> bool {
    let lower = url.to_ascii_lowercase();
    IMAGE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
        || (lower.contains("imgur.com") && !lower.ends_with('/'))
        || post_hint == Some("image")
}

/// Imgur serves the raw image when `.jpg` is appended to a bare link.
pub(crate) fn normalize_url(url: &str) -> String {
    let lower = url.to_ascii_lowercase();
    let has_extension = IMAGE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext));
    if lower.contains("imgur.com") && !has_extension && !lower.ends_with('/') {
        format!("{url}.jpg")
    } else {
        url.to_string()
    }
}

pub(crate) fn parse_listing(source: &str, body: &[u8], filter_nsfw: bool) -> Result<Vec<CandidateImage>> {
    let listing: Listing = serde_json::from_slice(body).or_raise(|| ErrorKind::InvalidPayload)?;
    let candidates = listing
        .data
        .children
        .into_iter()
        .map(|child| child.data)
        .filter(|post| !(filter_nsfw && post.over_18))
        .filter_map(|post| {
            let url = post.url.as_deref()?;
            if !is_image_post(url, post.post_hint.as_deref()) {
                return None;
            }
            let url = normalize_url(url);
            let dimensions = post
                .preview
                .as_ref()
                .and_then(|preview| preview.images.first())
                .map(|image| (image.source.width, image.source.height));
            Some(CandidateImage {
                source_id: source.to_string(),
                format_hint: ImageFormat::from_url(&url),
                url,
                title: post.title,
                known_width: dimensions.map(|(w, _)| w),
                known_height: dimensions.map(|(_, h)| h),
                permalink: post.permalink.map(|p| format!("https://reddit.com{p}")),
                nsfw: post.over_18,
            })
        })
        .collect();
    Ok(candidates)
}
