//! Catalog persistence: records, taxonomy, and visit freshness.
//!
//! The [`CatalogStore`] trait is the seam between the pipeline and
//! SQLite; [`gateway::UpsertGateway`] implements the dedup-and-merge
//! policy on top of it.

pub mod gateway;
mod sqlite;

use async_trait::async_trait;
use thiserror::Error;

pub use gateway::{UpsertGateway, UpsertOutcome};
pub use sqlite::SqliteCatalog;

/// Catalog persistence errors.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// What: another record already owns a unique key being inserted.
    /// Why: a concurrent or earlier import claimed the same item.
    /// Fix: nothing; the item is treated as already cataloged.
    #[error("record already exists")]
    Duplicate,

    /// What: a query against the catalog database failed.
    /// Why: schema drift, lock contention, or a corrupt database file.
    /// Fix: check the database file and rerun; migrations run on startup.
    #[error("catalog query failed: {0}")]
    Query(sqlx::Error),

    /// What: a JSON column could not be encoded or decoded.
    /// Why: a stored array column holds malformed JSON.
    /// Fix: inspect the offending row; this does not happen for rows
    /// written by this tool.
    #[error("catalog column encoding failed: {0}")]
    Encoding(#[from] serde_json::Error),
}

impl From<sqlx::Error> for CatalogError {
    fn from(error: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_error) = &error {
            if db_error.is_unique_violation() {
                return Self::Duplicate;
            }
        }
        Self::Query(error)
    }
}

/// Taxonomy facet families the catalog tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaxonomyKind {
    ContentType,
    VisualStyle,
    Theme,
}

impl TaxonomyKind {
    /// Column value stored in the `taxonomy_values.kind` column.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ContentType => "content_type",
            Self::VisualStyle => "visual_style",
            Self::Theme => "theme",
        }
    }
}

/// A fully assembled item ready for the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapedDetail {
    pub title: String,
    pub author: String,
    pub description: String,
    /// First-party thumbnail URL.
    pub thumbnail_url: Option<String>,
    /// First-party image URLs, thumbnail first.
    pub images: Vec<String>,
    /// External page the item is obtained from; the primary dedup key.
    pub download_url: String,
    pub source_platform: String,
    /// Platform-native identifier when the platform exposes one.
    pub source_id: Option<String>,
    pub content_type: String,
    pub visual_style: Option<String>,
    pub game_context: String,
    pub tags: Vec<String>,
    pub themes: Vec<String>,
    pub is_free: bool,
    pub is_nsfw: bool,
}

/// Persistence operations the upsert gateway and pipeline need.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Record id owning `download_url`, if any.
    async fn find_by_download_url(&self, url: &str) -> Result<Option<i64>, CatalogError>;

    /// Record id owning the platform-native identifier, if any.
    async fn find_by_platform_source_id(
        &self,
        platform: &str,
        source_id: &str,
    ) -> Result<Option<i64>, CatalogError>;

    /// Record id with the same normalized title and author, if any.
    async fn find_by_title_author(
        &self,
        title: &str,
        author: &str,
    ) -> Result<Option<i64>, CatalogError>;

    /// Inserts a new record and returns its id.
    async fn create(&self, detail: &ScrapedDetail, verified: bool) -> Result<i64, CatalogError>;

    /// Refreshes record `id` from `detail`. Title, images, and facets are
    /// overwritten; description and author are kept when the new value is
    /// empty.
    async fn update(
        &self,
        id: i64,
        detail: &ScrapedDetail,
        verified: bool,
    ) -> Result<(), CatalogError>;

    /// Creates the taxonomy value if it does not exist yet.
    async fn ensure_taxonomy_value(
        &self,
        kind: TaxonomyKind,
        value: &str,
        display_name: &str,
    ) -> Result<(), CatalogError>;

    /// Last-modified stamp recorded for a previously visited page.
    async fn page_last_modified(&self, url: &str) -> Result<Option<String>, CatalogError>;

    /// Records that `url` was fully processed at its current stamp.
    async fn record_page_visit(
        &self,
        url: &str,
        last_modified: Option<&str>,
    ) -> Result<(), CatalogError>;
}
