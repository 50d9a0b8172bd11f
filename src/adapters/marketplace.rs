//! Resource-marketplace adapter (`thesimsresource.com`).

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;

use crate::session::{RateGovernor, SessionError};

use super::{
    extract_description, extract_og_images, fetch_page, first_capture, host_matches, DetailFetch,
    PageFetch, SourceAdapter, SourceDetail, SourcePlatform,
};

const PLATFORM_HOST: &str = "thesimsresource.com";

/// Marketplace download ids live at the end of the path.
static SOURCE_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r"/(?:downloads|details)/(?:[\w-]+/)*?(?:id/)?(\d+)").unwrap()
});

/// Subscriber-only downloads carry the locked-download marker.
static LOCKED_MARKER_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r#"class\s*=\s*["'][^"']*(?:download-locked|vip-download)[^"']*["']"#).unwrap()
});

/// Full-size marketplace gallery images.
static GALLERY_IMG_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r#"["'](https?://[^"']*thesimsresource\.com[^"']*/downloads/[^"']+\.(?:jpg|jpeg|png|webp))["']"#)
        .unwrap()
});

/// Adapter for the resource marketplace.
#[derive(Debug, Default)]
pub struct MarketplaceAdapter;

impl MarketplaceAdapter {
    /// Creates the adapter.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Pure extraction from a fetched detail page.
    #[must_use]
    pub(crate) fn parse(html: &str, url: &str) -> SourceDetail {
        let mut images = extract_og_images(html);
        for caps in GALLERY_IMG_RE.captures_iter(html) {
            if let Some(m) = caps.get(1) {
                let value = m.as_str().to_string();
                if !images.contains(&value) {
                    images.push(value);
                }
            }
        }

        SourceDetail {
            description: extract_description(html),
            thumbnail: images.first().cloned(),
            is_free: !LOCKED_MARKER_RE.is_match(html),
            source_id: first_capture(url, &SOURCE_ID_RE),
            images,
        }
    }
}

#[async_trait]
impl SourceAdapter for MarketplaceAdapter {
    fn platform(&self) -> SourcePlatform {
        SourcePlatform::TheSimsResource
    }

    fn handles(&self, host: &str) -> bool {
        host_matches(host, PLATFORM_HOST)
    }

    #[tracing::instrument(skip(self, governor), fields(adapter = "thesimsresource"))]
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
