//! Collective mod-hub adapter (`curseforge.com`).

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;

use crate::session::{RateGovernor, SessionError};

use super::{
    extract_description, extract_og_images, fetch_page, first_capture, host_matches, DetailFetch,
    PageFetch, SourceAdapter, SourceDetail, SourcePlatform,
};

const PLATFORM_HOST: &str = "curseforge.com";

/// Project slug: `/sims4/mods/<slug>` (the hub keys projects by slug).
static SOURCE_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r"/(?:sims4|members)/(?:mods|create-a-sim|build-buy)/([\w-]+)").unwrap()
});

/// Adapter for the collective hub. Hub downloads are free.
#[derive(Debug, Default)]
pub struct CurseForgeAdapter;

impl CurseForgeAdapter {
    /// Creates the adapter.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    #[must_use]
    pub(crate) fn parse(html: &str, url: &str) -> SourceDetail {
        let images = extract_og_images(html);
        SourceDetail {
            description: extract_description(html),
            thumbnail: images.first().cloned(),
            is_free: true,
            source_id: first_capture(url, &SOURCE_ID_RE),
            images,
        }
    }
}

#[async_trait]
impl SourceAdapter for CurseForgeAdapter {
    fn platform(&self) -> SourcePlatform {
        SourcePlatform::CurseForge
    }

    fn handles(&self, host: &str) -> bool {
        host_matches(host, PLATFORM_HOST)
    }

    #[tracing::instrument(skip(self, governor), fields(adapter = "curseforge"))]
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
