//! Image download and rehosting.
//!
//! Candidate image URLs from discovery pages and source adapters are
//! fetched with a plainly identified client, filtered for junk, and
//! uploaded to first-party object storage. Every download is paced by the
//! shared governor like any other outbound request. A failed candidate is
//! skipped, never fatal; the completeness gate downstream handles the
//! zero-image case.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::session::{image_client_user_agent, RateGovernor, SessionError};
use crate::storage::{ObjectStore, StorageError};

/// Hard cap on images stored per item.
pub const MAX_IMAGES_PER_ITEM: usize = 5;

/// URL substrings that mark tracking pixels, site chrome, and other
/// non-preview images.
const DENY_SUBSTRINGS: &[&str] = &[
    "pixel",
    "placeholder",
    "avatar",
    "logo",
    "icon",
    "spacer",
    "badge",
    "emoji",
    "gravatar",
];

const FETCH_TIMEOUT: Duration = Duration::from_secs(20);

/// Why one candidate failed. Logged and skipped, never fatal to the item.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The download request failed or returned a non-success status.
    #[error("image download failed: {0}")]
    Fetch(#[from] reqwest::Error),

    /// The object store rejected the upload.
    #[error(transparent)]
    Store(#[from] StorageError),
}

/// What one ingestion run produced.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IngestedImages {
    /// Public first-party URLs, in candidate order.
    pub hosted_urls: Vec<String>,
}

impl IngestedImages {
    /// First hosted image, used as the catalog thumbnail.
    #[must_use]
    pub fn thumbnail(&self) -> Option<&str> {
        self.hosted_urls.first().map(String::as_str)
    }
}

/// Downloads candidate images and rehosts them.
pub struct ImageIngestor {
    store: Arc<dyn ObjectStore>,
    client: reqwest::Client,
    folder: String,
}

impl ImageIngestor {
    /// Creates an ingestor storing under `folder/` in the object store.
    ///
    /// # Errors
    ///
    /// Returns the underlying error when the HTTP client cannot be built.
    pub fn new(store: Arc<dyn ObjectStore>, folder: &str) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(image_client_user_agent())
            .timeout(FETCH_TIMEOUT)
            .build()?;
        Ok(Self {
            store,
            client,
            folder: folder.trim_matches('/').to_string(),
        })
    }

    /// Fetches up to [`MAX_IMAGES_PER_ITEM`] acceptable candidates and
    /// uploads them, returning their first-party URLs. Each download is
    /// paced through the governor; individual candidate failures are
    /// logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] when a governor rotation due before a
    /// download cannot build its client.
    pub async fn ingest(
        &self,
        title: &str,
        candidates: &[String],
        governor: &mut RateGovernor,
    ) -> Result<IngestedImages, SessionError> {
        let slug = slugify(title);
        let stamp = unix_millis();
        let mut hosted_urls = Vec::new();

        for candidate in candidates {
            if hosted_urls.len() >= MAX_IMAGES_PER_ITEM {
                break;
            }
            if !is_acceptable_candidate(candidate) {
                debug!(url = %candidate, "skipping denied image candidate");
                continue;
            }
            let host = Url::parse(candidate)
                .ok()
                .and_then(|u| u.host_str().map(str::to_string));
            let Some(host) = host else {
                debug!(url = %candidate, "image candidate has no host");
                continue;
            };

            governor.pace(&host).await?;

            match self.fetch_and_store(candidate, &slug, stamp, hosted_urls.len()).await {
                Ok(Some(url)) => hosted_urls.push(url),
                Ok(None) => debug!(url = %candidate, "candidate is not an image"),
                Err(error) => warn!(url = %candidate, %error, "image candidate failed"),
            }
        }

        Ok(IngestedImages { hosted_urls })
    }

    async fn fetch_and_store(
        &self,
        url: &str,
        slug: &str,
        stamp: u128,
        index: usize,
    ) -> Result<Option<String>, IngestError> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        let Some(extension) = extension_for(&content_type) else {
            return Ok(None);
        };

        let bytes = response.bytes().await?.to_vec();
        if bytes.is_empty() {
            return Ok(None);
        }

        let path = format!("{}/{slug}-{stamp}-{index}.{extension}", self.folder);
        let media_type = content_type
            .split(';')
            .next()
            .unwrap_or(&content_type)
            .trim()
            .to_string();
        let hosted = self.store.put(&path, bytes, &media_type).await?;
        Ok(Some(hosted))
    }
}

/// Rejects data URIs and deny-listed junk.
fn is_acceptable_candidate(url: &str) -> bool {
    let lowered = url.to_lowercase();
    if lowered.starts_with("data:") {
        return false;
    }
    !DENY_SUBSTRINGS.iter().any(|junk| lowered.contains(junk))
}

/// File extension for a supported image content type; `None` skips the
/// candidate.
fn extension_for(content_type: &str) -> Option<&'static str> {
    let media_type = content_type.split(';').next().unwrap_or("").trim();
    match media_type {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        _ => None,
    }
}

/// Lowercase, hyphen-joined object-key fragment from a title.
fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut last_was_hyphen = true;
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_was_hyphen = false;
        } else if !last_was_hyphen {
            slug.push('-');
            last_was_hyphen = true;
        }
    }
    let slug = slug.trim_matches('-').to_string();
    if slug.is_empty() {
        "item".to_string()
    } else {
        slug
    }
}

fn unix_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
}
