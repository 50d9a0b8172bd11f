//! Content-type and theme classification.
//!
//! Classification is a three-step priority chain. An explicit category
//! segment in either the source URL or the discovery page URL wins
//! outright. Failing that, ordered keyword groups are matched against the
//! title first and only then against the description, so the title always
//! outvotes body prose. Finally, room themes are detected for content
//! types that carry a room context.

mod tables;

use url::Url;

pub use tables::{CategoryMapping, KeywordGroup};
use tables::{KEYWORD_GROUPS, ROOM_CONTEXT_TYPES, ROOM_THEMES, URL_CATEGORY_MAPPINGS};

/// Content type assigned when nothing matches.
pub const FALLBACK_CONTENT_TYPE: &str = "other";

/// The classifier's verdict for one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// Canonical content type, or [`FALLBACK_CONTENT_TYPE`].
    pub content_type: String,
    /// Room themes, deduplicated, in detection order.
    pub themes: Vec<String>,
    /// URL path segment that looked categorical but had no mapping.
    /// Surfaced so unmapped taxonomy can be added to the tables.
    pub unmapped_segment: Option<String>,
}

/// Classifies an item from its title, description, and the URLs it was
/// found through.
#[must_use]
pub fn classify(
    title: &str,
    description: &str,
    source_url: Option<&Url>,
    page_url: &Url,
) -> Classification {
    let title_lower = title.to_lowercase();
    let description_lower = description.to_lowercase();

    let mut unmapped_segment = None;
    let mut content_type = None;
    let mut themes: Vec<String> = Vec::new();

    // Step 1: explicit URL hints. A mapped segment in the source URL is
    // more specific than one in the discovery page, so it is consulted
    // first. Unmapped segments are taxonomy candidates only when they
    // come from the discovery page; platform path words like "posts"
    // are never category material.
    let source_mapping = source_url.and_then(|url| match segment_hint(url) {
        SegmentHint::Mapped(mapping) => Some(mapping),
        _ => None,
    });
    let mapping = match segment_hint(page_url) {
        SegmentHint::Mapped(page_mapping) => Some(source_mapping.unwrap_or(page_mapping)),
        SegmentHint::Unmapped(segment) => {
            unmapped_segment = Some(segment);
            source_mapping
        }
        SegmentHint::None => source_mapping,
    };
    if let Some(mapping) = mapping {
        content_type = Some(mapping.content_type.to_string());
        if let Some(theme) = mapping.theme {
            themes.push(theme.to_string());
        }
    }

    // Step 2: ordered keyword groups, full title pass before any
    // description keyword is considered.
    if content_type.is_none() {
        content_type = keyword_match(&title_lower)
            .or_else(|| keyword_match(&description_lower))
            .map(str::to_string);
    }

    let content_type = content_type.unwrap_or_else(|| FALLBACK_CONTENT_TYPE.to_string());

    // Step 3: room-theme detection for room-context types.
    if ROOM_CONTEXT_TYPES.contains(&content_type.as_str()) {
        let haystack = format!("{title_lower} {description_lower}");
        for (theme, keywords) in ROOM_THEMES {
            if themes.iter().any(|t| t == theme) {
                continue;
            }
            if keywords.iter().any(|kw| haystack.contains(kw)) {
                themes.push((*theme).to_string());
            }
        }
    }

    Classification {
        content_type,
        themes,
        unmapped_segment,
    }
}

enum SegmentHint {
    Mapped(&'static CategoryMapping),
    Unmapped(String),
    None,
}

/// Inspects all non-final path segments of `url` for a category mapping.
/// The final segment is the item slug and never categorical; the segment
/// just before it is reported when unmapped.
fn segment_hint(url: &Url) -> SegmentHint {
    let Some(segments) = url.path_segments() else {
        return SegmentHint::None;
    };
    let segments: Vec<&str> = segments.filter(|s| !s.is_empty()).collect();
    if segments.len() < 2 {
        return SegmentHint::None;
    }

    let candidates = &segments[..segments.len() - 1];
    for segment in candidates {
        let normalized = segment.to_lowercase();
        if let Some(mapping) = URL_CATEGORY_MAPPINGS
            .iter()
            .find(|m| m.segment == normalized)
        {
            return SegmentHint::Mapped(mapping);
        }
    }

    // The segment immediately before the slug is the likeliest category
    // candidate; surface it when it looks like a word rather than an id.
    let before_slug = candidates[candidates.len() - 1];
    if before_slug.chars().any(|c| c.is_ascii_alphabetic()) {
        SegmentHint::Unmapped(before_slug.to_lowercase())
    } else {
        SegmentHint::None
    }
}

/// Returns the first keyword group with a hit in `text`, in group order.
fn keyword_match(text: &str) -> Option<&'static str> {
    KEYWORD_GROUPS
        .iter()
        .find(|group| group.keywords.iter().any(|kw| text.contains(kw)))
        .map(|group| group.content_type)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_url_segment_beats_keywords() {
        // Title says hair, URL says bathroom; the URL hint wins and
        // carries its room theme.
        let page = url("https://index.example/bathroom/glossy-fixture-set/");
        let verdict = classify("Glossy Hair Fixture Set", "", None, &page);
        assert_eq!(verdict.content_type, "furniture");
        assert_eq!(verdict.themes, vec!["bathroom"]);
        assert_eq!(verdict.unmapped_segment, None);
    }

    #[test]
    fn test_source_url_checked_before_page_url() {
        let page = url("https://index.example/poses/collection-12/");
        let source = url("https://example.com/hair/ponytail-braid/");
        let verdict = classify("Untitled", "", Some(&source), &page);
        assert_eq!(verdict.content_type, "hair");
    }

    #[test]
    fn test_title_keyword_beats_description_keyword() {
        let page = url("https://index.example/finds/weekly-roundup/");
        let verdict = classify(
            "Ponytail Braid",
            "Pairs well with the new dress collection",
            None,
            &page,
        );
        assert_eq!(verdict.content_type, "hair");
    }

    #[test]
    fn test_description_keywords_used_when_title_is_opaque() {
        let page = url("https://index.example/finds/weekly-roundup/");
        let verdict = classify("Nova Set", "A cozy sweater and skirt combo", None, &page);
        assert_eq!(verdict.content_type, "clothing");
    }

    #[test]
    fn test_room_theme_detected_for_furniture() {
        let page = url("https://index.example/finds/roundup/");
        let verdict = classify("Marble Vanity Counter", "Fits any modern bathroom", None, &page);
        assert_eq!(verdict.content_type, "furniture");
        assert!(verdict.themes.contains(&"bathroom".to_string()));
    }

    #[test]
    fn test_no_room_theme_for_non_room_types() {
        let page = url("https://index.example/finds/roundup/");
        let verdict = classify("Ponytail Braid", "Perfect for bathroom selfies", None, &page);
        assert_eq!(verdict.content_type, "hair");
        assert!(verdict.themes.is_empty());
    }

    #[test]
    fn test_fallback_and_unmapped_segment_reported() {
        let page = url("https://index.example/miscellanea/strange-find/");
        let verdict = classify("Strange Find", "No recognizable terms here", None, &page);
        assert_eq!(verdict.content_type, FALLBACK_CONTENT_TYPE);
        assert_eq!(verdict.unmapped_segment.as_deref(), Some("miscellanea"));
    }

    #[test]
    fn test_segment_theme_not_duplicated_by_keywords() {
        let page = url("https://index.example/bathroom/vanity-set/");
        let verdict = classify("Vanity Set", "A bathroom vanity", None, &page);
        assert_eq!(verdict.themes, vec!["bathroom"]);
    }

    #[test]
    fn test_source_platform_path_not_reported_unmapped() {
        // "posts" is platform routing, not a category; the page URL's
        // mapping still applies.
        let source = url("https://www.patreon.com/posts/vanity-99188276");
        let page = url("https://index.example/bathroom/vanity-roundup/");
        let verdict = classify("Marble Vanity", "", Some(&source), &page);
        assert_eq!(verdict.content_type, "furniture");
        assert_eq!(verdict.unmapped_segment, None);

        let page = url("https://index.example/roundup/");
        let verdict = classify("Ponytail Braid", "", Some(&source), &page);
        assert_eq!(verdict.content_type, "hair");
        assert_eq!(verdict.unmapped_segment, None);
    }

    #[test]
    fn test_root_level_page_has_no_segment_hint() {
        let page = url("https://index.example/roundup/");
        let verdict = classify("Ponytail Braid", "", None, &page);
        assert_eq!(verdict.content_type, "hair");
        assert_eq!(verdict.unmapped_segment, None);
    }
}
