//! Deduplicating upsert gateway.
//!
//! Every import funnels through [`UpsertGateway::upsert`], which resolves
//! an existing record by download URL, then platform-native id, then
//! normalized title and author, before deciding to create or update.
//! Taxonomy values referenced by the item are auto-created so facet
//! filters never dangle.

use tracing::{debug, instrument};

use super::{CatalogError, CatalogStore, ScrapedDetail, TaxonomyKind};

/// What the gateway did with an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// A new record was inserted.
    Created(i64),
    /// An existing record was refreshed.
    Updated(i64),
    /// The item lost an insert race and was left alone.
    Skipped,
}

/// Dedup-and-merge policy over a [`CatalogStore`].
pub struct UpsertGateway<'a> {
    store: &'a dyn CatalogStore,
}

impl<'a> UpsertGateway<'a> {
    /// Wraps a store.
    #[must_use]
    pub fn new(store: &'a dyn CatalogStore) -> Self {
        Self { store }
    }

    /// Creates or updates the record for `detail`.
    ///
    /// A record is marked verified only when at least one first-party
    /// image backs it.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] for query failures. A unique-key race on
    /// insert is not an error; it yields [`UpsertOutcome::Skipped`].
    #[instrument(skip(self, detail), fields(title = %detail.title, platform = %detail.source_platform))]
    pub async fn upsert(&self, detail: &ScrapedDetail) -> Result<UpsertOutcome, CatalogError> {
        self.ensure_taxonomy(detail).await?;

        let verified = !detail.images.is_empty();
        let existing = self.find_existing(detail).await?;

        match existing {
            Some(id) => {
                self.store.update(id, detail, verified).await?;
                debug!(id, "refreshed existing record");
                Ok(UpsertOutcome::Updated(id))
            }
            None => match self.store.create(detail, verified).await {
                Ok(id) => {
                    debug!(id, "created record");
                    Ok(UpsertOutcome::Created(id))
                }
                Err(CatalogError::Duplicate) => {
                    debug!("lost insert race, skipping");
                    Ok(UpsertOutcome::Skipped)
                }
                Err(error) => Err(error),
            },
        }
    }

    /// Resolves an existing record in dedup-criteria order.
    async fn find_existing(&self, detail: &ScrapedDetail) -> Result<Option<i64>, CatalogError> {
        if let Some(id) = self.store.find_by_download_url(&detail.download_url).await? {
            return Ok(Some(id));
        }
        if let Some(source_id) = &detail.source_id {
            if let Some(id) = self
                .store
                .find_by_platform_source_id(&detail.source_platform, source_id)
                .await?
            {
                return Ok(Some(id));
            }
        }
        if !detail.author.trim().is_empty() {
            if let Some(id) = self
                .store
                .find_by_title_author(&detail.title, &detail.author)
                .await?
            {
                return Ok(Some(id));
            }
        }
        Ok(None)
    }

    async fn ensure_taxonomy(&self, detail: &ScrapedDetail) -> Result<(), CatalogError> {
        self.store
            .ensure_taxonomy_value(
                TaxonomyKind::ContentType,
                &detail.content_type,
                &display_name(&detail.content_type),
            )
            .await?;
        if let Some(style) = &detail.visual_style {
            self.store
                .ensure_taxonomy_value(TaxonomyKind::VisualStyle, style, &display_name(style))
                .await?;
        }
        for theme in &detail.themes {
            self.store
                .ensure_taxonomy_value(TaxonomyKind::Theme, theme, &display_name(theme))
                .await?;
        }
        Ok(())
    }
}

/// Title-cases a slug value: `living-room` becomes `Living Room`.
fn display_name(value: &str) -> String {
    value
        .split(['-', '_'])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::catalog::SqliteCatalog;
    use crate::db::Database;

    fn detail(download_url: &str) -> ScrapedDetail {
        ScrapedDetail {
            title: "Ponytail Braid".into(),
            author: "JaneCreates".into(),
            description: "A sleek braided ponytail.".into(),
            thumbnail_url: Some("https://cdn.test/mods/braid-0.jpg".into()),
            images: vec!["https://cdn.test/mods/braid-0.jpg".into()],
            download_url: download_url.into(),
            source_platform: "patreon".into(),
            source_id: Some("99188276".into()),
            content_type: "hair".into(),
            visual_style: None,
            game_context: "sims4".into(),
            tags: vec!["hair".into()],
            themes: vec!["bathroom".into()],
            is_free: true,
            is_nsfw: false,
        }
    }

    async fn store() -> SqliteCatalog {
        SqliteCatalog::new(Database::new_in_memory().await.unwrap())
    }

    #[test]
    fn test_display_name() {
        assert_eq!(display_name("hair"), "Hair");
        assert_eq!(display_name("living-room"), "Living Room");
        assert_eq!(display_name("skin_details"), "Skin Details");
    }

    #[tokio::test]
    async fn test_second_run_updates_instead_of_duplicating() {
        let store = store().await;
        let gateway = UpsertGateway::new(&store);
        let item = detail("https://www.patreon.com/posts/braid-99188276");

        let first = gateway.upsert(&item).await.unwrap();
        assert!(matches!(first, UpsertOutcome::Created(_)));

        let second = gateway.upsert(&item).await.unwrap();
        assert!(matches!(second, UpsertOutcome::Updated(_)));

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM mods")
            .fetch_one(store.pool())
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_dedup_by_platform_source_id() {
        let store = store().await;
        let gateway = UpsertGateway::new(&store);

        let first = detail("https://www.patreon.com/posts/braid-99188276");
        let id = match gateway.upsert(&first).await.unwrap() {
            UpsertOutcome::Created(id) => id,
            other => panic!("expected Created, got {other:?}"),
        };

        // Same post reached through a different URL.
        let second = detail("https://www.patreon.com/posts/99188276");
        assert_eq!(
            gateway.upsert(&second).await.unwrap(),
            UpsertOutcome::Updated(id)
        );
    }

    #[tokio::test]
    async fn test_dedup_by_title_author() {
        let store = store().await;
        let gateway = UpsertGateway::new(&store);

        let mut first = detail("https://example.com/a");
        first.source_id = None;
        let id = match gateway.upsert(&first).await.unwrap() {
            UpsertOutcome::Created(id) => id,
            other => panic!("expected Created, got {other:?}"),
        };

        let mut second = detail("https://example.com/b");
        second.source_id = None;
        assert_eq!(
            gateway.upsert(&second).await.unwrap(),
            UpsertOutcome::Updated(id)
        );
    }

    #[tokio::test]
    async fn test_blank_author_never_matches_title_author() {
        let store = store().await;
        let gateway = UpsertGateway::new(&store);

        let mut first = detail("https://example.com/a");
        first.source_id = None;
        first.author = String::new();
        gateway.upsert(&first).await.unwrap();

        let mut second = detail("https://example.com/b");
        second.source_id = None;
        second.author = String::new();
        assert!(matches!(
            gateway.upsert(&second).await.unwrap(),
            UpsertOutcome::Created(_)
        ));
    }

    #[tokio::test]
    async fn test_taxonomy_values_auto_created() {
        let store = store().await;
        let gateway = UpsertGateway::new(&store);
        gateway
            .upsert(&detail("https://example.com/a"))
            .await
            .unwrap();

        let rows: Vec<(String, String, String)> = sqlx::query_as(
            "SELECT kind, value, display_name FROM taxonomy_values ORDER BY kind, value",
        )
        .fetch_all(store.pool())
        .await
        .unwrap();
        assert_eq!(
            rows,
            vec![
                ("content_type".into(), "hair".into(), "Hair".into()),
                ("theme".into(), "bathroom".into(), "Bathroom".into()),
            ]
        );
    }

    #[tokio::test]
    async fn test_record_without_images_is_unverified() {
        let store = store().await;
        let gateway = UpsertGateway::new(&store);

        let mut item = detail("https://example.com/a");
        item.images.clear();
        item.thumbnail_url = None;
        gateway.upsert(&item).await.unwrap();

        let verified: bool = sqlx::query_scalar("SELECT verified FROM mods LIMIT 1")
            .fetch_one(store.pool())
            .await
            .unwrap();
        assert!(!verified);
    }
}
