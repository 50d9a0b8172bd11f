//! Modharvest Core Library
//!
//! This library implements a discovery-and-ingestion pipeline for game
//! custom content: it crawls a discovery site's sitemaps, extracts mod
//! listings from its collection pages, scrapes detail from the platforms
//! hosting the content, rehosts preview images to first-party storage,
//! and idempotently upserts everything into a local catalog.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`session`] - Browser identities, pacing, and session rotation
//! - [`sitemap`] - Sitemap-driven crawl discovery
//! - [`collection`] - Collection-page listing extraction
//! - [`adapters`] - Per-platform detail scrapers
//! - [`classify`] - Content-type and theme classification
//! - [`describe`] - Description originality filtering and synthesis
//! - [`images`] - Image download and rehosting
//! - [`storage`] - First-party object storage
//! - [`db`] - Database connection and schema management
//! - [`catalog`] - Catalog persistence and the dedup/upsert gateway
//! - [`pipeline`] - End-to-end orchestration

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod adapters;
pub mod catalog;
pub mod classify;
pub mod collection;
pub mod db;
pub mod describe;
pub mod images;
pub mod pipeline;
pub mod session;
pub mod sitemap;
pub mod storage;

// Re-export commonly used types
pub use adapters::{AdapterRegistry, DetailFetch, SourceAdapter, SourceDetail, SourcePlatform};
pub use catalog::{
    CatalogError, CatalogStore, ScrapedDetail, SqliteCatalog, TaxonomyKind, UpsertGateway,
    UpsertOutcome,
};
pub use classify::{classify, Classification};
pub use collection::{extract_items, extract_items_from, DiscoveredItem, CONTENT_PLATFORM_HOSTS};
pub use db::{Database, DbError};
pub use describe::{is_breadcrumb_description, synthesize_description};
pub use images::{ImageIngestor, IngestError, IngestedImages, MAX_IMAGES_PER_ITEM};
pub use pipeline::{Pipeline, PipelineError, RunOptions, RunOutcome, RunStats, StageError};
pub use session::{
    GovernorLimits, RateGovernor, SessionError, StealthProfile,
};
pub use sitemap::SitemapEntry;
pub use storage::{InMemoryObjectStore, ObjectStore, S3ObjectStore, S3Settings, StorageError};
