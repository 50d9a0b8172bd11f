//! End-to-end harvest orchestration.
//!
//! One run walks the discovery site's sitemaps, extracts items from each
//! collection page, scrapes per-platform detail, rehosts images, and
//! upserts into the catalog. Work is strictly sequential: one page at a
//! time, one item at a time, every request paced by the shared governor.
//! Per-item failures degrade to counters; only session construction and
//! catalog errors abort a run, and an aborted run still reports the
//! counters it accumulated.

use url::Url;
use tracing::{debug, info, instrument, warn};

use crate::adapters::{fetch_page, AdapterRegistry, DetailFetch, PageFetch};
use crate::catalog::{CatalogError, CatalogStore, ScrapedDetail, UpsertGateway, UpsertOutcome};
use crate::classify::classify;
use crate::collection::{
    extract_items_from, DiscoveredItem, CONTENT_PLATFORM_HOSTS, MAX_CANDIDATE_IMAGES,
};
use crate::describe::{is_breadcrumb_description, synthesize_description};
use crate::images::ImageIngestor;
use crate::session::{RateGovernor, SessionError};

/// Pipeline-fatal errors. Per-item and per-page failures are counted in
/// [`RunStats`] instead.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// A session client could not be built before any page was processed.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The run aborted mid-flight. `stats` covers the work finished
    /// before the failure.
    #[error("run aborted after partial progress: {source}")]
    Aborted {
        #[source]
        source: StageError,
        stats: RunStats,
    },
}

/// Errors that abort page processing once a run is underway.
#[derive(Debug, thiserror::Error)]
pub enum StageError {
    /// A session client could not be (re)built.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The catalog database failed.
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Options for one harvest run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Discovery site origin, e.g. `https://index.example/`.
    pub site: Url,
    /// Process at most this many collection pages.
    pub page_limit: Option<usize>,
    /// Discover and report without writing anything.
    pub dry_run: bool,
    /// Re-process pages whose last-modified stamp is unchanged.
    pub force: bool,
}

/// Counters reported at the end of a run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunStats {
    pub pages_scraped: u64,
    pub pages_skipped_fresh: u64,
    pub items_discovered: u64,
    pub created: u64,
    pub updated: u64,
    pub skipped: u64,
    pub images_uploaded: u64,
    pub errors: u64,
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The run walked the site and processed pages.
    Completed(RunStats),
    /// The root sitemap was unreachable or empty; nothing was attempted.
    NoWork,
}

/// What happened to one discovered item.
enum ItemOutcome {
    Imported(UpsertOutcome),
    /// No image survived ingestion; the item is incomplete and skipped.
    NoImage,
}

/// The harvest pipeline. Owns the governor and registry; borrows the
/// catalog store.
pub struct Pipeline<'a> {
    governor: RateGovernor,
    registry: AdapterRegistry,
    ingestor: ImageIngestor,
    catalog: &'a dyn CatalogStore,
    platform_hosts: Vec<String>,
}

impl<'a> Pipeline<'a> {
    /// Assembles a pipeline from its parts.
    #[must_use]
    pub fn new(
        governor: RateGovernor,
        registry: AdapterRegistry,
        ingestor: ImageIngestor,
        catalog: &'a dyn CatalogStore,
    ) -> Self {
        Self {
            governor,
            registry,
            ingestor,
            catalog,
            platform_hosts: CONTENT_PLATFORM_HOSTS
                .iter()
                .map(|host| (*host).to_string())
                .collect(),
        }
    }

    /// Overrides the hosts outbound collection-page links may point at.
    pub fn set_platform_hosts(&mut self, hosts: Vec<String>) {
        self.platform_hosts = hosts;
    }

    /// Runs one harvest.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] for session or catalog failures; remote
    /// blocking and per-item failures are absorbed into [`RunStats`].
    #[instrument(skip(self, options), fields(site = %options.site))]
    pub async fn run(&mut self, options: &RunOptions) -> Result<RunOutcome, PipelineError> {
        let entries = crate::sitemap::walk(&options.site, &mut self.governor).await?;
        if entries.is_empty() {
            return Ok(RunOutcome::NoWork);
        }

        let limit = options.page_limit.unwrap_or(entries.len());
        let mut stats = RunStats::default();
        let result = self.process_pages(entries, limit, options, &mut stats).await;

        // The summary covers aborted runs too: a failure mid-run still
        // reports the pages and items already processed.
        info!(
            pages = stats.pages_scraped,
            fresh = stats.pages_skipped_fresh,
            items = stats.items_discovered,
            created = stats.created,
            updated = stats.updated,
            skipped = stats.skipped,
            images = stats.images_uploaded,
            errors = stats.errors,
            aborted = result.is_err(),
            "run complete"
        );

        match result {
            Ok(()) => Ok(RunOutcome::Completed(stats)),
            Err(source) => Err(PipelineError::Aborted { source, stats }),
        }
    }

    async fn process_pages(
        &mut self,
        entries: Vec<crate::sitemap::SitemapEntry>,
        limit: usize,
        options: &RunOptions,
        stats: &mut RunStats,
    ) -> Result<(), StageError> {
        for entry in entries.into_iter().take(limit) {
            if !options.force && self.is_fresh(&entry).await? {
                debug!(page = %entry.url, "unchanged since last visit, skipping");
                stats.pages_skipped_fresh += 1;
                continue;
            }

            let Ok(page_url) = Url::parse(&entry.url) else {
                stats.errors += 1;
                continue;
            };

            match fetch_page(&entry.url, &mut self.governor).await? {
                PageFetch::Body { html } => {
                    stats.pages_scraped += 1;
                    let hosts: Vec<&str> =
                        self.platform_hosts.iter().map(String::as_str).collect();
                    let items = extract_items_from(&html, &page_url, &hosts);
                    stats.items_discovered += items.len() as u64;
                    info!(page = %entry.url, items = items.len(), "collection page scraped");

                    for item in items {
                        self.handle_item(item, &page_url, options, stats).await?;
                    }

                    if !options.dry_run {
                        self.catalog
                            .record_page_visit(&entry.url, entry.last_modified.as_deref())
                            .await?;
                    }
                }
                PageFetch::Blocked => {
                    // Expected on hostile days; the governor already set up
                    // rotation and backoff. Not an error.
                    warn!(page = %entry.url, "collection page blocked");
                }
                PageFetch::Unavailable => {
                    stats.errors += 1;
                    warn!(page = %entry.url, "collection page unavailable");
                }
            }
        }

        Ok(())
    }

    /// Whether the page's sitemap stamp matches the one recorded at the
    /// last full visit. Pages without a stamp are never considered fresh.
    async fn is_fresh(&self, entry: &crate::sitemap::SitemapEntry) -> Result<bool, CatalogError> {
        let Some(stamp) = &entry.last_modified else {
            return Ok(false);
        };
        let recorded = self.catalog.page_last_modified(&entry.url).await?;
        Ok(recorded.as_deref() == Some(stamp.as_str()))
    }

    async fn handle_item(
        &mut self,
        item: DiscoveredItem,
        page_url: &Url,
        options: &RunOptions,
        stats: &mut RunStats,
    ) -> Result<(), StageError> {
        if options.dry_run {
            info!(
                title = %item.title,
                author = %item.author,
                url = %item.external_url,
                "dry run: would import"
            );
            return Ok(());
        }

        match self.process_item(&item, page_url, stats).await? {
            ItemOutcome::Imported(UpsertOutcome::Created(id)) => {
                stats.created += 1;
                info!(title = %item.title, id, "imported");
            }
            ItemOutcome::Imported(UpsertOutcome::Updated(id)) => {
                stats.updated += 1;
                debug!(title = %item.title, id, "refreshed");
            }
            ItemOutcome::Imported(UpsertOutcome::Skipped) => {
                stats.skipped += 1;
            }
            ItemOutcome::NoImage => {
                stats.skipped += 1;
                warn!(title = %item.title, "no usable image, not imported");
            }
        }
        Ok(())
    }

    /// Scrapes detail, rehosts images, classifies, and upserts one item.
    async fn process_item(
        &mut self,
        item: &DiscoveredItem,
        page_url: &Url,
        stats: &mut RunStats,
    ) -> Result<ItemOutcome, StageError> {
        let adapter = self.registry.adapter_for(&item.external_url);
        let detail = match adapter
            .fetch_detail(&item.external_url, &mut self.governor)
            .await?
        {
            DetailFetch::Detail(detail) => Some(detail),
            DetailFetch::Blocked => {
                debug!(url = %item.external_url, "source blocked, synthesizing detail");
                None
            }
            DetailFetch::Unavailable => {
                debug!(url = %item.external_url, "source unavailable, synthesizing detail");
                None
            }
        };

        // Discovery-page images first; adapter gallery fills remaining
        // candidate slots.
        let mut candidates = item.candidate_image_urls.clone();
        if let Some(detail) = &detail {
            for image in detail.thumbnail.iter().chain(detail.images.iter()) {
                if candidates.len() >= MAX_CANDIDATE_IMAGES {
                    break;
                }
                if !candidates.contains(image) {
                    candidates.push(image.clone());
                }
            }
        }

        let ingested = self
            .ingestor
            .ingest(&item.title, &candidates, &mut self.governor)
            .await?;
        if ingested.hosted_urls.is_empty() {
            return Ok(ItemOutcome::NoImage);
        }
        stats.images_uploaded += ingested.hosted_urls.len() as u64;

        let source_url = Url::parse(&item.external_url).ok();
        let scraped_description = detail
            .as_ref()
            .and_then(|d| d.description.clone())
            .filter(|text| !is_breadcrumb_description(text, &item.title));

        // Classify on the scraped description when one survived the
        // originality filter; synthesis needs the content type, so it runs
        // after classification.
        let classification = classify(
            &item.title,
            scraped_description.as_deref().unwrap_or(""),
            source_url.as_ref(),
            page_url,
        );
        if let Some(segment) = &classification.unmapped_segment {
            debug!(segment = %segment, "unmapped category segment");
        }

        let description = scraped_description.unwrap_or_else(|| {
            synthesize_description(&item.title, &item.author, &classification.content_type)
        });

        let (platform, source_id, is_free) = match &detail {
            Some(detail) => (
                adapter.platform().as_str().to_string(),
                detail.source_id.clone(),
                detail.is_free,
            ),
            None => (adapter.platform().as_str().to_string(), None, true),
        };

        let scraped = ScrapedDetail {
            title: item.title.clone(),
            author: item.author.clone(),
            description,
            thumbnail_url: ingested.thumbnail().map(str::to_string),
            images: ingested.hosted_urls.clone(),
            download_url: item.external_url.clone(),
            source_platform: platform,
            source_id,
            content_type: classification.content_type.clone(),
            visual_style: None,
            game_context: "sims4".to_string(),
            tags: Vec::new(),
            themes: classification.themes.clone(),
            is_free,
            is_nsfw: false,
        };

        let gateway = UpsertGateway::new(self.catalog);
        let outcome = gateway.upsert(&scraped).await?;
        Ok(ItemOutcome::Imported(outcome))
    }
}
