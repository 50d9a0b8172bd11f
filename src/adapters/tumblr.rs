//! Microblogging platform adapter (`tumblr.com`).

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;

use crate::session::{RateGovernor, SessionError};

use super::{
    extract_description, extract_og_images, fetch_page, first_capture, host_matches, DetailFetch,
    PageFetch, SourceAdapter, SourceDetail, SourcePlatform,
};

const PLATFORM_HOST: &str = "tumblr.com";

/// Numeric post id in `/post/<id>` or `/post/<id>/slug` paths.
static SOURCE_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r"/post/(\d+)").unwrap()
});

/// Full-size media hosted on the tumblr CDN.
static MEDIA_IMG_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r#"["'](https?://(?:64|44)\.media\.tumblr\.com/[^"']+\.(?:jpg|jpeg|png|gif|webp))["']"#)
        .unwrap()
});

/// Adapter for the microblogging platform. Posts are public, so content is
/// always treated as free.
#[derive(Debug, Default)]
pub struct TumblrAdapter;

impl TumblrAdapter {
    /// Creates the adapter.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    #[must_use]
    pub(crate) fn parse(html: &str, url: &str) -> SourceDetail {
        let mut images = extract_og_images(html);
        for caps in MEDIA_IMG_RE.captures_iter(html) {
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
            is_free: true,
            source_id: first_capture(url, &SOURCE_ID_RE),
            images,
        }
    }
}

#[async_trait]
impl SourceAdapter for TumblrAdapter {
    fn platform(&self) -> SourcePlatform {
        SourcePlatform::Tumblr
    }

    fn handles(&self, host: &str) -> bool {
        host_matches(host, PLATFORM_HOST)
    }

    #[tracing::instrument(skip(self, governor), fields(adapter = "tumblr"))]
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

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_source_id_from_post_path() {
        let detail = TumblrAdapter::parse(
            "<html></html>",
            "https://janecreates.tumblr.com/post/715023998812345/ponytail-braid",
        );
        assert_eq!(detail.source_id.as_deref(), Some("715023998812345"));
    }

    #[test]
    fn test_media_images_collected_after_og() {
        let html = r#"
            <meta property="og:image" content="https://64.media.tumblr.com/abc/cover.jpg"/>
            <img src="https://64.media.tumblr.com/def/gallery.png">"#;
        let detail = TumblrAdapter::parse(html, "https://janecreates.tumblr.com/post/1");
        assert_eq!(
            detail.images,
            vec![
                "https://64.media.tumblr.com/abc/cover.jpg",
                "https://64.media.tumblr.com/def/gallery.png"
            ]
        );
        assert!(detail.is_free);
    }
}
