//! Sitemap-driven crawl discovery.
//!
//! Fetches the discovery site's sitemap index, resolves the content
//! sub-sitemaps, and yields a flat, deduplicated, order-preserving list of
//! content-page URLs with last-modified hints. Extraction is regex-based so
//! both namespaced (`<ns0:loc>`) and plain documents parse identically.
//!
//! A failed sub-sitemap fetch is logged and skipped. An unreachable root
//! sitemap yields an empty list; the orchestrator treats that as "no work",
//! not as an error.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use url::Url;
use tracing::{debug, info, instrument, warn};

use crate::session::{is_blocked_status, parse_retry_after, RateGovernor};

/// One content page discovered via the sitemap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SitemapEntry {
    /// Absolute URL of the content page.
    pub url: String,
    /// The sitemap's `<lastmod>` value, verbatim, when present.
    pub last_modified: Option<String>,
}

/// Sub-sitemaps carrying content pages follow the usual CMS convention.
static CONTENT_SITEMAP_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r"post-sitemap[^/]*\.xml$").unwrap()
});

/// `<url>`/`<sitemap>` blocks, tolerant of namespace prefixes.
static BLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r"(?is)<(?:\w+:)?(url|sitemap)\s*>(.*?)</(?:\w+:)?(?:url|sitemap)\s*>").unwrap()
});

static LOC_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r"(?is)<(?:\w+:)?loc\s*>\s*([^<]+?)\s*</(?:\w+:)?loc\s*>").unwrap()
});

static LASTMOD_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r"(?is)<(?:\w+:)?lastmod\s*>\s*([^<]+?)\s*</(?:\w+:)?lastmod\s*>").unwrap()
});

/// Path patterns that never point at a content page.
const NON_CONTENT_PATH_SEGMENTS: &[&str] = &["/category/", "/tag/", "/author/"];

/// Walks the site's sitemaps and returns the content-page entries.
///
/// Tries `<origin>/sitemap_index.xml` first, then `<origin>/sitemap.xml`.
/// Returns an empty vec when neither root document is reachable.
///
/// # Errors
///
/// Only session construction failures propagate; fetch failures degrade to
/// an empty or partial result.
#[instrument(skip(governor), fields(origin = %origin))]
pub async fn walk(
    origin: &Url,
    governor: &mut RateGovernor,
) -> Result<Vec<SitemapEntry>, crate::session::SessionError> {
    let root_candidates = ["sitemap_index.xml", "sitemap.xml"];

    let mut index_body = None;
    for candidate in root_candidates {
        let Ok(candidate_url) = origin.join(candidate) else {
            continue;
        };
        if let Some(body) = fetch_xml(&candidate_url, governor).await? {
            index_body = Some(body);
            break;
        }
    }

    let Some(index_body) = index_body else {
        warn!("root sitemap unreachable; nothing to crawl");
        return Ok(Vec::new());
    };

    let (sub_sitemaps, direct_entries) = parse_sitemap_document(&index_body);

    let mut seen: HashSet<String> = HashSet::new();
    let mut entries: Vec<SitemapEntry> = Vec::new();

    // A flat sitemap (no index) carries page entries directly.
    for entry in direct_entries {
        if is_content_url(&entry.url, origin) && seen.insert(entry.url.clone()) {
            entries.push(entry);
        }
    }

    for sub in sub_sitemaps {
        if !CONTENT_SITEMAP_RE.is_match(&sub) {
            debug!(sitemap = %sub, "skipping non-content sub-sitemap");
            continue;
        }
        let Ok(sub_url) = Url::parse(&sub) else {
            continue;
        };
        let Some(body) = fetch_xml(&sub_url, governor).await? else {
            warn!(sitemap = %sub, "sub-sitemap fetch failed; skipping");
            continue;
        };
        let (_, sub_entries) = parse_sitemap_document(&body);
        for entry in sub_entries {
            if is_content_url(&entry.url, origin) && seen.insert(entry.url.clone()) {
                entries.push(entry);
            }
        }
    }

    info!(pages = entries.len(), "sitemap walk complete");
    Ok(entries)
}

/// Fetches one sitemap document. Returns `None` on any failure, rotating
/// the session first when the remote signaled blocking.
async fn fetch_xml(
    url: &Url,
    governor: &mut RateGovernor,
) -> Result<Option<String>, crate::session::SessionError> {
    let host = url.host_str().unwrap_or("unknown").to_string();
    governor.pace(&host).await?;

    let response = match governor.client().get(url.clone()).send().await {
        Ok(response) => response,
        Err(error) => {
            debug!(url = %url, error = %error, "sitemap request failed");
            return Ok(None);
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
        return Ok(None);
    }
    if !status.is_success() {
        debug!(url = %url, status = status.as_u16(), "sitemap fetch non-success");
        return Ok(None);
    }

    match response.text().await {
        Ok(body) => Ok(Some(body)),
        Err(error) => {
            debug!(url = %url, error = %error, "sitemap body read failed");
            Ok(None)
        }
    }
}

/// Splits a sitemap document into sub-sitemap URLs and page entries.
fn parse_sitemap_document(xml: &str) -> (Vec<String>, Vec<SitemapEntry>) {
    let mut sitemaps = Vec::new();
    let mut entries = Vec::new();

    for caps in BLOCK_RE.captures_iter(xml) {
        let kind = caps.get(1).map_or("", |m| m.as_str()).to_ascii_lowercase();
        let block = caps.get(2).map_or("", |m| m.as_str());

        let Some(loc) = LOC_RE
            .captures(block)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string())
        else {
            // Unparseable entry: silently skipped per the error policy.
            continue;
        };

        if kind == "sitemap" {
            sitemaps.push(loc);
        } else {
            let last_modified = LASTMOD_RE
                .captures(block)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().trim().to_string());
            entries.push(SitemapEntry {
                url: loc,
                last_modified,
            });
        }
    }

    (sitemaps, entries)
}

/// Whether a sitemap URL points at an actual content page on the origin.
fn is_content_url(candidate: &str, origin: &Url) -> bool {
    let Ok(url) = Url::parse(candidate) else {
        return false;
    };
    if url.host_str() != origin.host_str() {
        return false;
    }
    let path = url.path();
    if path == "/" || path.is_empty() {
        return false;
    }
    !NON_CONTENT_PATH_SEGMENTS
        .iter()
        .any(|segment| path.contains(segment))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_urlset() {
        let xml = r#"<?xml version="1.0"?>
            <urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
              <url><loc>https://example.com/best-hair-cc/</loc><lastmod>2024-05-01</lastmod></url>
              <url><loc>https://example.com/kitchen-sets/</loc></url>
            </urlset>"#;
        let (sitemaps, entries) = parse_sitemap_document(xml);
        assert!(sitemaps.is_empty());
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].url, "https://example.com/best-hair-cc/");
        assert_eq!(entries[0].last_modified.as_deref(), Some("2024-05-01"));
        assert_eq!(entries[1].last_modified, None);
    }

    #[test]
    fn test_parse_namespaced_index() {
        let xml = r#"<ns0:sitemapindex xmlns:ns0="http://www.sitemaps.org/schemas/sitemap/0.9">
              <ns0:sitemap><ns0:loc>https://example.com/post-sitemap1.xml</ns0:loc></ns0:sitemap>
              <ns0:sitemap><ns0:loc>https://example.com/page-sitemap.xml</ns0:loc></ns0:sitemap>
            </ns0:sitemapindex>"#;
        let (sitemaps, entries) = parse_sitemap_document(xml);
        assert_eq!(sitemaps.len(), 2);
        assert!(entries.is_empty());
    }

    #[test]
    fn test_content_sitemap_naming_convention() {
        assert!(CONTENT_SITEMAP_RE.is_match("https://example.com/post-sitemap.xml"));
        assert!(CONTENT_SITEMAP_RE.is_match("https://example.com/post-sitemap12.xml"));
        assert!(!CONTENT_SITEMAP_RE.is_match("https://example.com/page-sitemap.xml"));
        assert!(!CONTENT_SITEMAP_RE.is_match("https://example.com/category-sitemap.xml"));
    }

    #[test]
    fn test_non_content_paths_excluded() {
        let origin = Url::parse("https://example.com").unwrap();
        assert!(is_content_url("https://example.com/best-hair/", &origin));
        assert!(!is_content_url("https://example.com/category/hair/", &origin));
        assert!(!is_content_url("https://example.com/tag/alpha/", &origin));
        assert!(!is_content_url("https://example.com/author/jane/", &origin));
        assert!(!is_content_url("https://example.com/", &origin));
        assert!(!is_content_url("https://elsewhere.com/best-hair/", &origin));
        assert!(!is_content_url("not a url", &origin));
    }

    #[test]
    fn test_entry_without_loc_is_skipped() {
        let xml = "<urlset><url><lastmod>2024-01-01</lastmod></url></urlset>";
        let (_, entries) = parse_sitemap_document(xml);
        assert!(entries.is_empty());
    }
}
