//! Description originality filtering and synthesis.
//!
//! Index sites frequently stuff their meta descriptions with breadcrumb
//! trails ("Home - Sims 4 - Hair - Downloads") that would read as spam in
//! a catalog. Those are rejected and a neutral description is synthesized
//! from what is known about the item instead.

/// Separators breadcrumb trails are joined with.
const BREADCRUMB_SEPARATORS: &[char] = &['-', '\u{2013}', '|', '>', '\u{00bb}'];

/// Segments at or below this word count look like navigation labels.
const MAX_LABEL_WORDS: usize = 4;

/// Minimum number of short separated segments before a description is
/// treated as a breadcrumb trail.
const MIN_BREADCRUMB_SEGMENTS: usize = 3;

/// Returns true when `description` is breadcrumb-shaped or merely repeats
/// the title, and therefore should not be imported verbatim.
#[must_use]
pub fn is_breadcrumb_description(description: &str, title: &str) -> bool {
    let trimmed = description.trim();
    if trimmed.is_empty() {
        return true;
    }
    if trimmed.eq_ignore_ascii_case(title.trim()) {
        return true;
    }

    let segments: Vec<&str> = trimmed
        .split(BREADCRUMB_SEPARATORS)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    segments.len() >= MIN_BREADCRUMB_SEGMENTS
        && segments
            .iter()
            .all(|s| s.split_whitespace().count() <= MAX_LABEL_WORDS)
}

/// Synthesizes a neutral first-party description from item facts.
///
/// Deterministic on its inputs so re-runs do not churn catalog rows.
#[must_use]
pub fn synthesize_description(title: &str, author: &str, content_type: &str) -> String {
    let noun = match content_type {
        "hair" => "hairstyle",
        "makeup" => "makeup set",
        "skin-details" => "skin detail",
        "eyes" => "eye set",
        "eyebrows" => "eyebrow set",
        "eyelashes" => "eyelash set",
        "clothing" => "clothing item",
        "shoes" => "pair of shoes",
        "accessories" => "accessory",
        "tattoos" => "tattoo set",
        "poses" => "pose pack",
        "furniture" => "furniture piece",
        "decor" => "decor piece",
        "clutter" => "clutter set",
        "lighting" => "lighting piece",
        "rugs" => "rug",
        "curtains" => "curtain set",
        "plants" => "plant set",
        "wall-art" => "wall art piece",
        "gameplay" => "gameplay mod",
        "pet-items" => "pet item",
        "lots" => "lot build",
        _ => "custom content item",
    };

    let author = author.trim();
    if author.is_empty() {
        format!("{title} is a custom {noun} for The Sims 4.")
    } else {
        format!("{title} is a custom {noun} for The Sims 4 created by {author}.")
    }
}
