//! Classification reference data.
//!
//! Everything the classifier matches against lives here as constant
//! tables, so taxonomy drift is a data edit, not a code edit. Group order
//! matters: the most specific categories come first and win ties.

/// A URL-path-segment to taxonomy mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryMapping {
    /// Normalized URL path segment on the discovery site.
    pub segment: &'static str,
    /// Canonical content type.
    pub content_type: &'static str,
    /// Room/theme hint carried by the segment itself.
    pub theme: Option<&'static str>,
}

/// Static lookup for explicit URL-category hints. A hit here
/// short-circuits keyword detection.
pub const URL_CATEGORY_MAPPINGS: &[CategoryMapping] = &[
    CategoryMapping { segment: "hair", content_type: "hair", theme: None },
    CategoryMapping { segment: "hairstyles", content_type: "hair", theme: None },
    CategoryMapping { segment: "makeup", content_type: "makeup", theme: None },
    CategoryMapping { segment: "skin", content_type: "skin-details", theme: None },
    CategoryMapping { segment: "skins", content_type: "skin-details", theme: None },
    CategoryMapping { segment: "eyes", content_type: "eyes", theme: None },
    CategoryMapping { segment: "eyebrows", content_type: "eyebrows", theme: None },
    CategoryMapping { segment: "eyelashes", content_type: "eyelashes", theme: None },
    CategoryMapping { segment: "clothing", content_type: "clothing", theme: None },
    CategoryMapping { segment: "clothes", content_type: "clothing", theme: None },
    CategoryMapping { segment: "dresses", content_type: "clothing", theme: None },
    CategoryMapping { segment: "shoes", content_type: "shoes", theme: None },
    CategoryMapping { segment: "accessories", content_type: "accessories", theme: None },
    CategoryMapping { segment: "jewelry", content_type: "accessories", theme: None },
    CategoryMapping { segment: "tattoos", content_type: "tattoos", theme: None },
    CategoryMapping { segment: "poses", content_type: "poses", theme: None },
    CategoryMapping { segment: "furniture", content_type: "furniture", theme: None },
    CategoryMapping { segment: "decor", content_type: "decor", theme: None },
    CategoryMapping { segment: "clutter", content_type: "clutter", theme: None },
    CategoryMapping { segment: "lighting", content_type: "lighting", theme: None },
    CategoryMapping { segment: "rugs", content_type: "rugs", theme: None },
    CategoryMapping { segment: "curtains", content_type: "curtains", theme: None },
    CategoryMapping { segment: "plants", content_type: "plants", theme: None },
    CategoryMapping { segment: "wall-art", content_type: "wall-art", theme: None },
    CategoryMapping { segment: "bathroom", content_type: "furniture", theme: Some("bathroom") },
    CategoryMapping { segment: "kitchen", content_type: "furniture", theme: Some("kitchen") },
    CategoryMapping { segment: "bedroom", content_type: "furniture", theme: Some("bedroom") },
    CategoryMapping { segment: "living-room", content_type: "furniture", theme: Some("living-room") },
    CategoryMapping { segment: "dining-room", content_type: "furniture", theme: Some("dining-room") },
    CategoryMapping { segment: "office", content_type: "furniture", theme: Some("office") },
    CategoryMapping { segment: "kids-room", content_type: "furniture", theme: Some("kids-room") },
    CategoryMapping { segment: "nursery", content_type: "furniture", theme: Some("nursery") },
    CategoryMapping { segment: "outdoor", content_type: "furniture", theme: Some("outdoor") },
    CategoryMapping { segment: "mods", content_type: "gameplay", theme: None },
    CategoryMapping { segment: "gameplay", content_type: "gameplay", theme: None },
    CategoryMapping { segment: "traits", content_type: "gameplay", theme: None },
    CategoryMapping { segment: "careers", content_type: "gameplay", theme: None },
    CategoryMapping { segment: "pets", content_type: "pet-items", theme: None },
    CategoryMapping { segment: "lots", content_type: "lots", theme: None },
    CategoryMapping { segment: "builds", content_type: "lots", theme: None },
];

/// One ordered keyword group. Evaluated top to bottom; granular face and
/// body categories sit above the generic ones they would otherwise lose to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeywordGroup {
    /// Canonical content type this group detects.
    pub content_type: &'static str,
    /// Lowercase keywords matched against title and description.
    pub keywords: &'static [&'static str],
}

/// Ordered keyword groups for content-type detection.
pub const KEYWORD_GROUPS: &[KeywordGroup] = &[
    KeywordGroup { content_type: "hair", keywords: &["hair", "hairstyle", "ponytail", "braid", "curls", "bangs", "bun ", "locs", "afro"] },
    KeywordGroup { content_type: "eyebrows", keywords: &["eyebrow", "brows"] },
    KeywordGroup { content_type: "eyelashes", keywords: &["eyelash", "lashes"] },
    KeywordGroup { content_type: "eyes", keywords: &["eye color", "eyes", "heterochromia", "iris"] },
    KeywordGroup { content_type: "skin-details", keywords: &["skinblend", "skin blend", "skin detail", "overlay", "freckles", "blemish"] },
    KeywordGroup { content_type: "makeup", keywords: &["makeup", "lipstick", "lip gloss", "eyeshadow", "eyeliner", "blush", "contour"] },
    KeywordGroup { content_type: "tattoos", keywords: &["tattoo"] },
    KeywordGroup { content_type: "shoes", keywords: &["shoes", "sneakers", "boots", "heels", "sandals"] },
    KeywordGroup { content_type: "clothing", keywords: &["dress", "outfit", "top ", "blouse", "sweater", "hoodie", "jeans", "skirt", "shorts", "jacket", "coat", "shirt", "pants", "swimsuit", "lingerie", "clothing"] },
    KeywordGroup { content_type: "accessories", keywords: &["earrings", "necklace", "bracelet", "ring ", "piercing", "glasses", "hat ", "beanie", "bag ", "choker", "accessory", "accessories"] },
    KeywordGroup { content_type: "clutter", keywords: &["clutter", "knick-knack", "deco box"] },
    KeywordGroup { content_type: "lighting", keywords: &["lamp", "light fixture", "chandelier", "sconce", "lighting"] },
    KeywordGroup { content_type: "rugs", keywords: &["rug", "carpet"] },
    KeywordGroup { content_type: "curtains", keywords: &["curtain", "drapes", "blinds"] },
    KeywordGroup { content_type: "plants", keywords: &["plant", "succulent", "flowers", "greenery"] },
    KeywordGroup { content_type: "wall-art", keywords: &["wall art", "poster", "painting", "wall print", "artwork"] },
    KeywordGroup { content_type: "furniture", keywords: &["sofa", "couch", "chair", "table", "desk", "bed ", "bookshelf", "dresser", "wardrobe", "cabinet", "counter", "furniture", "vanity"] },
    KeywordGroup { content_type: "decor", keywords: &["decor", "decoration", "mirror", "vase", "shelf"] },
    KeywordGroup { content_type: "poses", keywords: &["pose pack", "poses", "pose "] },
    KeywordGroup { content_type: "gameplay", keywords: &["mod ", "script", "trait", "career", "gameplay", "override", "tuning", "cheat"] },
    KeywordGroup { content_type: "pet-items", keywords: &["pet ", "cat ", "dog ", "puppy", "kitten"] },
    KeywordGroup { content_type: "lots", keywords: &["lot ", "house", "home build", "apartment", "residential", "build "] },
];

/// Content types that commonly carry a room context; room-theme detection
/// always runs for these.
pub const ROOM_CONTEXT_TYPES: &[&str] = &[
    "furniture", "decor", "clutter", "lighting", "plants", "rugs", "curtains", "wall-art",
];

/// Room themes and the keywords that imply them.
pub const ROOM_THEMES: &[(&str, &[&str])] = &[
    ("bathroom", &["bathroom", "bathtub", "shower", "sink", "toilet", "vanity"]),
    ("kitchen", &["kitchen", "stove", "fridge", "countertop", "dining counter"]),
    ("bedroom", &["bedroom", "bed frame", "nightstand", "headboard"]),
    ("living-room", &["living room", "livingroom", "sofa", "couch", "tv stand", "coffee table"]),
    ("dining-room", &["dining room", "dining table", "dining set"]),
    ("office", &["office", "desk", "study", "workspace"]),
    ("kids-room", &["kids room", "kid's room", "children", "toddler", "playroom"]),
    ("nursery", &["nursery", "baby", "crib", "infant"]),
    ("outdoor", &["outdoor", "garden", "patio", "backyard", "porch", "pool"]),
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_url_mapping_segments_unique() {
        let mut seen = HashSet::new();
        for mapping in URL_CATEGORY_MAPPINGS {
            assert!(seen.insert(mapping.segment), "duplicate segment {}", mapping.segment);
        }
    }

    #[test]
    fn test_room_context_types_exist_in_taxonomy() {
        let known: HashSet<&str> = URL_CATEGORY_MAPPINGS
            .iter()
            .map(|m| m.content_type)
            .chain(KEYWORD_GROUPS.iter().map(|g| g.content_type))
            .collect();
        for content_type in ROOM_CONTEXT_TYPES {
            assert!(known.contains(content_type), "unknown room-context type {content_type}");
        }
    }

    #[test]
    fn test_keywords_are_lowercase() {
        for group in KEYWORD_GROUPS {
            for keyword in group.keywords {
                assert_eq!(*keyword, keyword.to_lowercase(), "keyword not lowercase");
            }
        }
    }
}
