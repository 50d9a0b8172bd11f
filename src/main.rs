//! CLI entry point for the modharvest tool.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use modharvest::{
    AdapterRegistry, Database, ImageIngestor, InMemoryObjectStore, ObjectStore, Pipeline,
    RateGovernor, RunOptions, RunOutcome, S3ObjectStore, S3Settings, SqliteCatalog,
};
use tracing::{debug, info};
use url::Url;

mod cli;

use cli::Args;

/// Object-store folder preview images land under.
const IMAGE_FOLDER: &str = "mods";

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Determine log level based on verbose/quiet flags
    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    debug!(?args, "CLI arguments parsed");

    let site = Url::parse(&args.site)
        .with_context(|| format!("invalid site URL: {}", args.site))?;

    let db = Database::new(&args.db).await?;
    let catalog = SqliteCatalog::new(db.clone());

    // Dry runs never upload, so they get a throwaway in-memory store and
    // need no credentials.
    let store: Arc<dyn ObjectStore> = if args.dry_run {
        Arc::new(InMemoryObjectStore::new())
    } else {
        Arc::new(S3ObjectStore::new(&s3_settings_from_env()?)?)
    };
    let ingestor = ImageIngestor::new(store, IMAGE_FOLDER)?;

    let governor = RateGovernor::new(args.profile)?;
    let mut pipeline = Pipeline::new(governor, AdapterRegistry::standard(), ingestor, &catalog);

    let options = RunOptions {
        site,
        page_limit: args.limit,
        dry_run: args.dry_run,
        force: args.force,
    };

    info!(site = %options.site, dry_run = options.dry_run, "harvest starting");

    match pipeline.run(&options).await? {
        RunOutcome::Completed(stats) => {
            info!(
                pages = stats.pages_scraped,
                fresh = stats.pages_skipped_fresh,
                discovered = stats.items_discovered,
                created = stats.created,
                updated = stats.updated,
                skipped = stats.skipped,
                images = stats.images_uploaded,
                errors = stats.errors,
                "harvest complete"
            );
        }
        RunOutcome::NoWork => {
            info!("root sitemap unreachable or empty; nothing to do");
        }
    }

    db.close().await;
    Ok(())
}

/// Reads S3 connection settings from `MODHARVEST_S3_*` environment
/// variables.
fn s3_settings_from_env() -> Result<S3Settings> {
    let var = |name: &str| {
        std::env::var(name).with_context(|| format!("missing environment variable {name}"))
    };

    Ok(S3Settings {
        region: var("MODHARVEST_S3_REGION")?,
        bucket: var("MODHARVEST_S3_BUCKET")?,
        access_key: var("MODHARVEST_S3_ACCESS_KEY")?,
        secret_key: var("MODHARVEST_S3_SECRET_KEY")?,
        endpoint: std::env::var("MODHARVEST_S3_ENDPOINT").ok(),
        public_base_url: var("MODHARVEST_S3_PUBLIC_BASE_URL")?,
    })
}
