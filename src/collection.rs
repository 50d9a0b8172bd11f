//! Collection-page extraction.
//!
//! A collection page is a listicle on the discovery site: numbered headings
//! ("3. Ponytail Braid by JaneCreates") each followed by preview images and
//! an outbound link to the platform actually hosting the content. This
//! module turns one such page into [`DiscoveredItem`]s. Pure extraction: no
//! network, no classification, no persistence.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;
use tracing::debug;

/// Maximum sibling elements inspected after a matched heading.
const SIBLING_LOOKAHEAD: usize = 10;

/// Maximum candidate images collected per item.
pub const MAX_CANDIDATE_IMAGES: usize = 5;

/// Hosts that actually host content. An outbound link only qualifies when
/// its host lands on this list (the discovery site is never a source).
pub const CONTENT_PLATFORM_HOSTS: &[&str] = &[
    "thesimsresource.com",
    "patreon.com",
    "tumblr.com",
    "curseforge.com",
    "simfileshare.net",
    "modthesims.info",
    "itch.io",
];

/// Heading shape: ordinal prefix, title, authorship marker.
static HEADING_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r"(?i)^\s*\d+\s*[.):]\s*(.+?)\s+by\s+(\S.*?)\s*$").unwrap()
});

/// One item discovered on a collection page, prior to detail scraping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredItem {
    /// Item title, stripped of the ordinal prefix.
    pub title: String,
    /// Creator name from the authorship marker.
    pub author: String,
    /// Outbound link to the hosting platform.
    pub external_url: String,
    /// The collection page this item was found on.
    pub discovery_source_url: String,
    /// Third-party image URLs, best candidates first.
    pub candidate_image_urls: Vec<String>,
}

/// Extracts discovered items from one collection page, using the standard
/// platform allow-list.
#[must_use]
pub fn extract_items(html: &str, page_url: &Url) -> Vec<DiscoveredItem> {
    extract_items_from(html, page_url, CONTENT_PLATFORM_HOSTS)
}

/// Extracts discovered items from one collection page.
///
/// An item is emitted only when both a title+author heading and a
/// qualifying external link were found. The link must leave the discovery
/// site for one of `allowed_hosts`. Items without images are still
/// emitted; the image-ingestion gate drops them later.
#[must_use]
pub fn extract_items_from(
    html: &str,
    page_url: &Url,
    allowed_hosts: &[&str],
) -> Vec<DiscoveredItem> {
    #[allow(clippy::unwrap_used)]
    let heading_selector = Selector::parse("h3, h4").unwrap();
    #[allow(clippy::unwrap_used)]
    let img_selector = Selector::parse("img").unwrap();
    #[allow(clippy::unwrap_used)]
    let link_selector = Selector::parse("a[href]").unwrap();

    let document = Html::parse_document(html);
    let mut items = Vec::new();

    for heading in document.select(&heading_selector) {
        let heading_text = heading.text().collect::<String>();
        let Some(caps) = HEADING_RE.captures(heading_text.trim()) else {
            continue;
        };
        let title = caps[1].trim().to_string();
        let author = caps[2].trim().to_string();

        let mut images: Vec<String> = Vec::new();
        let mut external_url: Option<String> = None;

        let siblings = heading
            .next_siblings()
            .filter_map(ElementRef::wrap)
            .take(SIBLING_LOOKAHEAD);

        for sibling in siblings {
            // Stop at the next item's heading.
            let name = sibling.value().name();
            if name == "h3" || name == "h4" {
                break;
            }

            let own_img = (name == "img").then_some(sibling);
            for img in own_img.into_iter().chain(sibling.select(&img_selector)) {
                if images.len() >= MAX_CANDIDATE_IMAGES {
                    break;
                }
                if let Some(src) = preferred_image_source(img) {
                    if let Some(absolute) = absolutize(&src, page_url) {
                        if !images.contains(&absolute) {
                            images.push(absolute);
                        }
                    }
                }
            }

            if external_url.is_none() {
                let own_link = (name == "a").then_some(sibling);
                for link in own_link.into_iter().chain(sibling.select(&link_selector)) {
                    let Some(href) = link.value().attr("href") else {
                        continue;
                    };
                    if let Some(qualified) = qualifying_external_link(href, page_url, allowed_hosts)
                    {
                        external_url = Some(qualified);
                        break;
                    }
                }
            }
        }

        let Some(external_url) = external_url else {
            debug!(title = %title, "heading matched but no qualifying external link");
            continue;
        };

        items.push(DiscoveredItem {
            title,
            author,
            external_url,
            discovery_source_url: page_url.to_string(),
            candidate_image_urls: images,
        });
    }

    items
}

/// Picks the best image source attribute. Lazily-loaded attributes beat the
/// displayed `src`, which is frequently a placeholder.
fn preferred_image_source(img: ElementRef<'_>) -> Option<String> {
    let value = img
        .value()
        .attr("data-lazy-src")
        .or_else(|| img.value().attr("data-src"))
        .or_else(|| img.value().attr("src"))?;
    let value = value.trim();
    if value.is_empty() || value.starts_with("data:") {
        return None;
    }
    Some(value.to_string())
}

/// Resolves a possibly-relative URL against the page.
fn absolutize(candidate: &str, page_url: &Url) -> Option<String> {
    page_url.join(candidate).ok().map(|u| u.to_string())
}

/// Returns the absolute link when it leaves the discovery site for an
/// allow-listed content platform.
fn qualifying_external_link(
    href: &str,
    page_url: &Url,
    allowed_hosts: &[&str],
) -> Option<String> {
    let url = page_url.join(href).ok()?;
    let host = url.host_str()?;
    if Some(host) == page_url.host_str() {
        return None;
    }
    if !host_on_allow_list(host, allowed_hosts) {
        return None;
    }
    Some(url.to_string())
}

/// Standard allow-list check, matching the host itself or any subdomain.
#[must_use]
pub fn is_content_platform_host(host: &str) -> bool {
    host_on_allow_list(host, CONTENT_PLATFORM_HOSTS)
}

fn host_on_allow_list(host: &str, allowed_hosts: &[&str]) -> bool {
    let host = host.to_ascii_lowercase();
    allowed_hosts.iter().any(|platform| {
        host == *platform || host.ends_with(&format!(".{platform}"))
    })
}
