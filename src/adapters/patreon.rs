//! Subscription-content platform adapter (`patreon.com`).
//!
//! Patreon blocks most automated clients outright; a `Blocked` or
//! `Unavailable` outcome here is routine and the orchestrator synthesizes
//! the detail instead.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;

use crate::session::{RateGovernor, SessionError};

use super::{
    extract_description, extract_og_images, fetch_page, first_capture, host_matches, DetailFetch,
    PageFetch, SourceAdapter, SourceDetail, SourcePlatform,
};

const PLATFORM_HOST: &str = "patreon.com";

/// Post ids trail the slug: `/posts/ponytail-braid-99188276`.
static SOURCE_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r"/posts/(?:[\w-]+-)?(\d+)").unwrap()
});

/// Markers on locked, patron-only posts.
const LOCKED_MARKERS: &[&str] = &["patron-only", "unlock this post", "join now to access"];

/// Adapter for the subscription-content platform.
#[derive(Debug, Default)]
pub struct PatreonAdapter;

impl PatreonAdapter {
    /// Creates the adapter.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    #[must_use]
    pub(crate) fn parse(html: &str, url: &str) -> SourceDetail {
        let images = extract_og_images(html);
        let normalized = html.to_ascii_lowercase();
        let locked = LOCKED_MARKERS
            .iter()
            .any(|marker| normalized.contains(marker));

        SourceDetail {
            description: extract_description(html),
            thumbnail: images.first().cloned(),
            is_free: !locked,
            source_id: first_capture(url, &SOURCE_ID_RE),
            images,
        }
    }
}

#[async_trait]
impl SourceAdapter for PatreonAdapter {
    fn platform(&self) -> SourcePlatform {
        SourcePlatform::Patreon
    }

    fn handles(&self, host: &str) -> bool {
        host_matches(host, PLATFORM_HOST)
    }

    #[tracing::instrument(skip(self, governor), fields(adapter = "patreon"))]
    async fn fetch_detail(
        &self,
        url: &str,
        governor: &mut RateGovernor,
    ) -> Result<DetailFetch, SessionError> {
        match fetch_page(url, governor).await? {
            PageFetch::Body { html } => Ok(DetailFetch::Detail(Self::parse(&html, url))),
            PageFetch::Blocked => Ok(DetailFetch::Blocked),
            PageFetch::Unavailable => Ok(DetailFetch::Unavailable),
        }
    }
}
