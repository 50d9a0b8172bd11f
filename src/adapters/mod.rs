//! Per-platform detail scrapers behind a host-resolved registry.
//!
//! Every external URL resolves, by host substring, to one [`SourceAdapter`]
//! (or the generic fallback). An adapter issues exactly one paced GET and
//! extracts a [`SourceDetail`]. Blocked and unavailable responses are
//! *expected* outcomes on these platforms, so they are modeled in
//! [`DetailFetch`] rather than as errors — many content platforms
//! deliberately reject automated clients and the pipeline must degrade, not
//! abort.

mod curseforge;
mod generic;
mod marketplace;
mod patreon;
mod tumblr;

pub use curseforge::CurseForgeAdapter;
pub use generic::GenericAdapter;
pub use marketplace::MarketplaceAdapter;
pub use patreon::PatreonAdapter;
pub use tumblr::TumblrAdapter;

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use url::Url;
use tracing::debug;

use crate::session::{is_blocked_status, parse_retry_after, RateGovernor, SessionError};

/// Response-body substrings that identify a bot-challenge page.
pub const CHALLENGE_MARKERS: &[&str] = &[
    "just a moment",
    "checking your browser",
    "attention required",
    "cf-browser-verification",
    "verify you are human",
    "enable javascript and cookies to continue",
];

/// The platform a detail was scraped from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourcePlatform {
    /// Resource marketplace (The Sims Resource).
    TheSimsResource,
    /// Subscription-content platform (Patreon).
    Patreon,
    /// Microblogging platform (Tumblr).
    Tumblr,
    /// Collective mod hub (CurseForge).
    CurseForge,
    /// Any other host.
    Generic,
}

impl SourcePlatform {
    /// Stable identifier stored in the catalog.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TheSimsResource => "thesimsresource",
            Self::Patreon => "patreon",
            Self::Tumblr => "tumblr",
            Self::CurseForge => "curseforge",
            Self::Generic => "generic",
        }
    }
}

/// Normalized detail scraped from a source platform page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceDetail {
    /// Page description, when one was found. May still be rejected by the
    /// breadcrumb filter downstream.
    pub description: Option<String>,
    /// Primary preview image URL (third-party; rehosted downstream).
    pub thumbnail: Option<String>,
    /// Gallery image URLs (third-party; rehosted downstream).
    pub images: Vec<String>,
    /// False when the platform marks the content as locked/premium.
    pub is_free: bool,
    /// Platform-native identifier extracted from the URL, when present.
    pub source_id: Option<String>,
}

/// Outcome of one adapter call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetailFetch {
    /// Detail page fetched and parsed.
    Detail(SourceDetail),
    /// The platform is blocking automated access (403/429 or challenge
    /// page). The session has already been marked for rotation.
    Blocked,
    /// No detail available (server error, unreachable, unparseable). Not an
    /// error; the orchestrator synthesizes a detail instead.
    Unavailable,
}

/// Trait all source adapters implement.
///
/// Object-safe via `async_trait` so the registry can hold
/// `Box<dyn SourceAdapter>`.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// The platform this adapter scrapes.
    fn platform(&self) -> SourcePlatform;

    /// Whether this adapter handles the given host.
    fn handles(&self, host: &str) -> bool;

    /// Fetches and parses the detail page behind `url`. One GET, paced.
    async fn fetch_detail(
        &self,
        url: &str,
        governor: &mut RateGovernor,
    ) -> Result<DetailFetch, SessionError>;
}

/// Host-resolved collection of source adapters with a generic fallback.
pub struct AdapterRegistry {
    adapters: Vec<Box<dyn SourceAdapter>>,
    fallback: GenericAdapter,
}

impl AdapterRegistry {
    /// Builds the standard registry: marketplace, subscription platform,
    /// microblog, mod hub, then the generic fallback.
    #[must_use]
    pub fn standard() -> Self {
        Self {
            adapters: vec![
                Box::new(MarketplaceAdapter::new()),
                Box::new(PatreonAdapter::new()),
                Box::new(TumblrAdapter::new()),
                Box::new(CurseForgeAdapter::new()),
            ],
            fallback: GenericAdapter::new(),
        }
    }

    /// Resolves the adapter for an external URL by host substring match.
    /// Unparseable URLs and unmatched hosts get the generic adapter.
    #[must_use]
    pub fn adapter_for(&self, url: &str) -> &dyn SourceAdapter {
        let host = Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_ascii_lowercase));
        let Some(host) = host else {
            return &self.fallback;
        };
        match self.adapters.iter().find(|adapter| adapter.handles(&host)) {
            Some(adapter) => adapter.as_ref(),
            None => &self.fallback,
        }
    }
}

impl std::fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let platforms: Vec<&str> = self.adapters.iter().map(|a| a.platform().as_str()).collect();
        f.debug_struct("AdapterRegistry")
            .field("adapters", &platforms)
            .finish()
    }
}

/// Host match helper: the host itself or any subdomain of it.
pub(crate) fn host_matches(host: &str, platform_host: &str) -> bool {
    host == platform_host || host.ends_with(&format!(".{platform_host}"))
}

/// Result of the shared page fetch used by every adapter.
#[derive(Debug)]
pub(crate) enum PageFetch {
    Body { html: String },
    Blocked,
    Unavailable,
}

/// One paced GET with blocked/unavailable classification.
///
/// 403/429 and challenge-marker bodies mark the session blocked (rotation
/// before the next request, longer backoff) and map to `Blocked`. Server
/// errors and transport failures map to `Unavailable`.
pub(crate) async fn fetch_page(
    url: &str,
    governor: &mut RateGovernor,
) -> Result<PageFetch, SessionError> {
    let host = Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_else(|| "unknown".to_string());
    governor.pace(&host).await?;

    let response = match governor.client().get(url).send().await {
        Ok(response) => response,
        Err(error) => {
            debug!(url, error = %error, "detail request failed");
            return Ok(PageFetch::Unavailable);
        }
    };

    let status = response.status();
    if is_blocked_status(status) {
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_retry_after);
        governor.note_blocked(retry_after);
        return Ok(PageFetch::Blocked);
    }
    if !status.is_success() {
        debug!(url, status = status.as_u16(), "detail fetch non-success");
        return Ok(PageFetch::Unavailable);
    }

    let Ok(html) = response.text().await else {
        return Ok(PageFetch::Unavailable);
    };

    if contains_challenge_marker(&html) {
        governor.note_blocked(None);
        return Ok(PageFetch::Blocked);
    }

    Ok(PageFetch::Body { html })
}

/// Whether a response body is a bot-challenge page.
#[must_use]
pub fn contains_challenge_marker(body: &str) -> bool {
    let normalized = body.to_ascii_lowercase();
    CHALLENGE_MARKERS
        .iter()
        .any(|marker| normalized.contains(marker))
}

static OG_DESCRIPTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(
        r#"(?is)<meta\s+[^>]*(?:property|name)\s*=\s*["']og:description["'][^>]*content\s*=\s*["']([^"']+)["']"#,
    )
    .unwrap()
});

static META_DESCRIPTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(
        r#"(?is)<meta\s+[^>]*name\s*=\s*["']description["'][^>]*content\s*=\s*["']([^"']+)["']"#,
    )
    .unwrap()
});

static OG_IMAGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(
        r#"(?is)<meta\s+[^>]*(?:property|name)\s*=\s*["']og:image["'][^>]*content\s*=\s*["']([^"']+)["']"#,
    )
    .unwrap()
});

/// og:description with a plain meta-description fallback.
#[must_use]
pub(crate) fn extract_description(html: &str) -> Option<String> {
    first_capture(html, &OG_DESCRIPTION_RE).or_else(|| first_capture(html, &META_DESCRIPTION_RE))
}

/// All og:image values in document order, deduplicated.
#[must_use]
pub(crate) fn extract_og_images(html: &str) -> Vec<String> {
    let mut images = Vec::new();
    for caps in OG_IMAGE_RE.captures_iter(html) {
        if let Some(value) = caps.get(1) {
            let value = value.as_str().trim().to_string();
            if !value.is_empty() && !images.contains(&value) {
                images.push(value);
            }
        }
    }
    images
}

pub(crate) fn first_capture(html: &str, re: &Regex) -> Option<String> {
    re.captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
}
