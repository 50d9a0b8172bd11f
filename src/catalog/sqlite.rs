//! SQLite-backed [`CatalogStore`].

use async_trait::async_trait;
use tracing::instrument;

use crate::db::Database;

use super::{CatalogError, CatalogStore, ScrapedDetail, TaxonomyKind};

/// Catalog store over the shared connection pool.
#[derive(Debug, Clone)]
pub struct SqliteCatalog {
    db: Database,
}

impl SqliteCatalog {
    /// Wraps an open database.
    #[must_use]
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Underlying connection pool, for ad-hoc queries.
    #[must_use]
    pub fn pool(&self) -> &sqlx::SqlitePool {
        self.db.pool()
    }
}

#[async_trait]
impl CatalogStore for SqliteCatalog {
    async fn find_by_download_url(&self, url: &str) -> Result<Option<i64>, CatalogError> {
        let id: Option<i64> = sqlx::query_scalar("SELECT id FROM mods WHERE download_url = ?1")
            .bind(url)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(id)
    }

    async fn find_by_platform_source_id(
        &self,
        platform: &str,
        source_id: &str,
    ) -> Result<Option<i64>, CatalogError> {
        let id: Option<i64> = sqlx::query_scalar(
            "SELECT id FROM mods WHERE source_platform = ?1 AND source_id = ?2",
        )
        .bind(platform)
        .bind(source_id)
        .fetch_optional(self.db.pool())
        .await?;
        Ok(id)
    }

    async fn find_by_title_author(
        &self,
        title: &str,
        author: &str,
    ) -> Result<Option<i64>, CatalogError> {
        let id: Option<i64> = sqlx::query_scalar(
            "SELECT id FROM mods \
             WHERE title = ?1 COLLATE NOCASE AND author = ?2 COLLATE NOCASE",
        )
        .bind(title.trim())
        .bind(author.trim())
        .fetch_optional(self.db.pool())
        .await?;
        Ok(id)
    }

    #[instrument(skip(self, detail), fields(title = %detail.title))]
    async fn create(&self, detail: &ScrapedDetail, verified: bool) -> Result<i64, CatalogError> {
        let result = sqlx::query(
            "INSERT INTO mods (title, author, description, thumbnail_url, images, \
             download_url, source_platform, source_id, content_type, visual_style, \
             game_context, tags, themes, is_free, is_nsfw, verified) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
        )
        .bind(&detail.title)
        .bind(&detail.author)
        .bind(&detail.description)
        .bind(&detail.thumbnail_url)
        .bind(serde_json::to_string(&detail.images)?)
        .bind(&detail.download_url)
        .bind(&detail.source_platform)
        .bind(&detail.source_id)
        .bind(&detail.content_type)
        .bind(&detail.visual_style)
        .bind(&detail.game_context)
        .bind(serde_json::to_string(&detail.tags)?)
        .bind(serde_json::to_string(&detail.themes)?)
        .bind(detail.is_free)
        .bind(detail.is_nsfw)
        .bind(verified)
        .execute(self.db.pool())
        .await?;

        Ok(result.last_insert_rowid())
    }

    #[instrument(skip(self, detail), fields(title = %detail.title))]
    async fn update(
        &self,
        id: i64,
        detail: &ScrapedDetail,
        verified: bool,
    ) -> Result<(), CatalogError> {
        // Empty incoming description or author never clobbers a value a
        // previous run already captured.
        sqlx::query(
            "UPDATE mods SET \
             title = ?1, \
             author = CASE WHEN ?2 = '' THEN author ELSE ?2 END, \
             description = CASE WHEN ?3 = '' THEN description ELSE ?3 END, \
             thumbnail_url = ?4, \
             images = ?5, \
             source_platform = ?6, \
             source_id = COALESCE(?7, source_id), \
             content_type = ?8, \
             visual_style = ?9, \
             game_context = ?10, \
             tags = ?11, \
             themes = ?12, \
             is_free = ?13, \
             is_nsfw = ?14, \
             verified = ?15, \
             updated_at = datetime('now') \
             WHERE id = ?16",
        )
        .bind(&detail.title)
        .bind(&detail.author)
        .bind(&detail.description)
        .bind(&detail.thumbnail_url)
        .bind(serde_json::to_string(&detail.images)?)
        .bind(&detail.source_platform)
        .bind(&detail.source_id)
        .bind(&detail.content_type)
        .bind(&detail.visual_style)
        .bind(&detail.game_context)
        .bind(serde_json::to_string(&detail.tags)?)
        .bind(serde_json::to_string(&detail.themes)?)
        .bind(detail.is_free)
        .bind(detail.is_nsfw)
        .bind(verified)
        .bind(id)
        .execute(self.db.pool())
        .await?;

        Ok(())
    }

    async fn ensure_taxonomy_value(
        &self,
        kind: TaxonomyKind,
        value: &str,
        display_name: &str,
    ) -> Result<(), CatalogError> {
        sqlx::query(
            "INSERT INTO taxonomy_values (kind, value, display_name) \
             VALUES (?1, ?2, ?3) \
             ON CONFLICT (kind, value) DO NOTHING",
        )
        .bind(kind.as_str())
        .bind(value)
        .bind(display_name)
        .execute(self.db.pool())
        .await?;
        Ok(())
    }

    async fn page_last_modified(&self, url: &str) -> Result<Option<String>, CatalogError> {
        let stamp: Option<Option<String>> =
            sqlx::query_scalar("SELECT last_modified FROM page_visits WHERE url = ?1")
                .bind(url)
                .fetch_optional(self.db.pool())
                .await?;
        Ok(stamp.flatten())
    }

    async fn record_page_visit(
        &self,
        url: &str,
        last_modified: Option<&str>,
    ) -> Result<(), CatalogError> {
        sqlx::query(
            "INSERT INTO page_visits (url, last_modified, visited_at) \
             VALUES (?1, ?2, datetime('now')) \
             ON CONFLICT (url) DO UPDATE SET \
             last_modified = excluded.last_modified, \
             visited_at = excluded.visited_at",
        )
        .bind(url)
        .bind(last_modified)
        .execute(self.db.pool())
        .await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample_detail() -> ScrapedDetail {
        ScrapedDetail {
            title: "Ponytail Braid".into(),
            author: "JaneCreates".into(),
            description: "A sleek braided ponytail in all EA colors.".into(),
            thumbnail_url: Some("https://cdn.test/mods/braid-0.jpg".into()),
            images: vec!["https://cdn.test/mods/braid-0.jpg".into()],
            download_url: "https://www.patreon.com/posts/braid-99188276".into(),
            source_platform: "patreon".into(),
            source_id: Some("99188276".into()),
            content_type: "hair".into(),
            visual_style: None,
            game_context: "sims4".into(),
            tags: vec!["hair".into()],
            themes: vec![],
            is_free: true,
            is_nsfw: false,
        }
    }

    async fn store() -> SqliteCatalog {
        SqliteCatalog::new(Database::new_in_memory().await.unwrap())
    }

    #[tokio::test]
    async fn test_create_and_find_by_download_url() {
        let store = store().await;
        let detail = sample_detail();
        let id = store.create(&detail, true).await.unwrap();

        let found = store
            .find_by_download_url(&detail.download_url)
            .await
            .unwrap();
        assert_eq!(found, Some(id));
        assert_eq!(store.find_by_download_url("https://other").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_duplicate_download_url_maps_to_duplicate() {
        let store = store().await;
        let detail = sample_detail();
        store.create(&detail, true).await.unwrap();

        let err = store.create(&detail, true).await.unwrap_err();
        assert!(matches!(err, CatalogError::Duplicate));
    }

    #[tokio::test]
    async fn test_find_by_platform_source_id() {
        let store = store().await;
        let detail = sample_detail();
        let id = store.create(&detail, true).await.unwrap();

        let found = store
            .find_by_platform_source_id("patreon", "99188276")
            .await
            .unwrap();
        assert_eq!(found, Some(id));
        assert_eq!(
            store.find_by_platform_source_id("tumblr", "99188276").await.unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_find_by_title_author_is_case_insensitive() {
        let store = store().await;
        let detail = sample_detail();
        let id = store.create(&detail, true).await.unwrap();

        let found = store
            .find_by_title_author("PONYTAIL BRAID", "janecreates")
            .await
            .unwrap();
        assert_eq!(found, Some(id));
    }

    #[tokio::test]
    async fn test_update_keeps_description_when_empty() {
        let store = store().await;
        let detail = sample_detail();
        let id = store.create(&detail, true).await.unwrap();

        let mut refreshed = detail.clone();
        refreshed.description = String::new();
        refreshed.author = String::new();
        refreshed.title = "Ponytail Braid v2".into();
        store.update(id, &refreshed, true).await.unwrap();

        let (title, author, description): (String, String, String) =
            sqlx::query_as("SELECT title, author, description FROM mods WHERE id = ?1")
                .bind(id)
                .fetch_one(store.db.pool())
                .await
                .unwrap();
        assert_eq!(title, "Ponytail Braid v2");
        assert_eq!(author, "JaneCreates");
        assert_eq!(description, "A sleek braided ponytail in all EA colors.");
    }

    #[tokio::test]
    async fn test_ensure_taxonomy_value_is_idempotent() {
        let store = store().await;
        store
            .ensure_taxonomy_value(TaxonomyKind::ContentType, "hair", "Hair")
            .await
            .unwrap();
        store
            .ensure_taxonomy_value(TaxonomyKind::ContentType, "hair", "Hair")
            .await
            .unwrap();

        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM taxonomy_values WHERE kind = 'content_type' AND value = 'hair'",
        )
        .fetch_one(store.db.pool())
        .await
        .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_page_visit_roundtrip() {
        let store = store().await;
        let url = "https://index.example/roundup/";
        assert_eq!(store.page_last_modified(url).await.unwrap(), None);

        store
            .record_page_visit(url, Some("2026-08-01T00:00:00+00:00"))
            .await
            .unwrap();
        assert_eq!(
            store.page_last_modified(url).await.unwrap().as_deref(),
            Some("2026-08-01T00:00:00+00:00")
        );

        store
            .record_page_visit(url, Some("2026-08-15T00:00:00+00:00"))
            .await
            .unwrap();
        assert_eq!(
            store.page_last_modified(url).await.unwrap().as_deref(),
            Some("2026-08-15T00:00:00+00:00")
        );
    }
}
