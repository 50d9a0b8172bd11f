//! Generic fallback adapter for hosts without a specialized scraper.
//!
//! Extracts only what common meta tags offer. Anything it cannot find is
//! left empty for the orchestrator's synthesis fallback to fill.

use async_trait::async_trait;

use crate::session::{RateGovernor, SessionError};

use super::{
    extract_description, extract_og_images, fetch_page, DetailFetch, PageFetch, SourceAdapter,
    SourceDetail, SourcePlatform,
};

/// Fallback adapter for unmatched hosts.
#[derive(Debug, Default)]
pub struct GenericAdapter;

impl GenericAdapter {
    /// Creates the adapter.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    #[must_use]
    pub(crate) fn parse(html: &str) -> SourceDetail {
        let images = extract_og_images(html);
        SourceDetail {
            description: extract_description(html),
            thumbnail: images.first().cloned(),
            is_free: true,
            source_id: None,
            images,
        }
    }
}

#[async_trait]
impl SourceAdapter for GenericAdapter {
    fn platform(&self) -> SourcePlatform {
        SourcePlatform::Generic
    }

    fn handles(&self, _host: &str) -> bool {
        true
    }

    #[tracing::instrument(skip(self, governor), fields(adapter = "generic"))]
    async fn fetch_detail(
        &self,
        url: &str,
        governor: &mut RateGovernor,
    ) -> Result<DetailFetch, SessionError> {
        match fetch_page(url, governor).await? {
            PageFetch::Body { html } => Ok(DetailFetch::Detail(Self::parse(&html))),
            PageFetch::Blocked => Ok(DetailFetch::Blocked),
            PageFetch::Unavailable => Ok(DetailFetch::Unavailable),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_meta_tags_only() {
        let html = r#"
            <meta name="description" content="A standalone download page."/>
            <meta property="og:image" content="https://files.example/preview.jpg"/>"#;
        let detail = GenericAdapter::parse(html);
        assert_eq!(detail.description.as_deref(), Some("A standalone download page."));
        assert_eq!(detail.thumbnail.as_deref(), Some("https://files.example/preview.jpg"));
        assert!(detail.is_free);
        assert_eq!(detail.source_id, None);
    }

    #[test]
    fn test_bare_page_yields_empty_detail() {
        let detail = GenericAdapter::parse("<html><body>download</body></html>");
        assert_eq!(detail.description, None);
        assert!(detail.images.is_empty());
    }
}
