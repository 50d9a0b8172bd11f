//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

use modharvest::StealthProfile;

/// Harvest custom-content listings into a first-party catalog.
///
/// Modharvest crawls a discovery site's sitemaps, extracts mod listings
/// from its collection pages, scrapes detail from the hosting platforms,
/// rehosts preview images, and upserts everything into a local catalog.
#[derive(Parser, Debug)]
#[command(name = "modharvest")]
#[command(author, version, about)]
pub struct Args {
    /// Discovery site origin, e.g. https://example.com
    pub site: String,

    /// Process at most this many collection pages
    #[arg(short = 'n', long, value_name = "PAGES")]
    pub limit: Option<usize>,

    /// Discover and report without writing to the catalog or storage
    #[arg(long)]
    pub dry_run: bool,

    /// Re-process pages even when unchanged since the last visit
    #[arg(long)]
    pub force: bool,

    /// Pacing caution level
    #[arg(long, value_enum, default_value_t = StealthProfile::Default)]
    pub profile: StealthProfile,

    /// Catalog database file
    #[arg(long, default_value = "catalog.db", value_name = "PATH")]
    pub db: PathBuf,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_site_is_required() {
        let result = Args::try_parse_from(["modharvest"]);
        assert!(result.is_err());

        let args = Args::try_parse_from(["modharvest", "https://example.com"]).unwrap();
        assert_eq!(args.site, "https://example.com");
        assert_eq!(args.limit, None);
        assert!(!args.dry_run);
        assert!(!args.force);
        assert_eq!(args.profile, StealthProfile::Default);
    }

    #[test]
    fn test_cli_limit_flag() {
        let args = Args::try_parse_from(["modharvest", "https://example.com", "-n", "3"]).unwrap();
        assert_eq!(args.limit, Some(3));

        let args =
            Args::try_parse_from(["modharvest", "https://example.com", "--limit", "10"]).unwrap();
        assert_eq!(args.limit, Some(10));
    }

    #[test]
    fn test_cli_profile_values() {
        let args = Args::try_parse_from([
            "modharvest",
            "https://example.com",
            "--profile",
            "stealth",
        ])
        .unwrap();
        assert_eq!(args.profile, StealthProfile::Stealth);

        let args = Args::try_parse_from([
            "modharvest",
            "https://example.com",
            "--profile",
            "conservative",
        ])
        .unwrap();
        assert_eq!(args.profile, StealthProfile::Conservative);

        let result =
            Args::try_parse_from(["modharvest", "https://example.com", "--profile", "bogus"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_dry_run_and_force() {
        let args = Args::try_parse_from([
            "modharvest",
            "https://example.com",
            "--dry-run",
            "--force",
        ])
        .unwrap();
        assert!(args.dry_run);
        assert!(args.force);
    }

    #[test]
    fn test_cli_verbose_flag_increments_count() {
        let args = Args::try_parse_from(["modharvest", "https://example.com", "-v"]).unwrap();
        assert_eq!(args.verbose, 1);

        let args = Args::try_parse_from(["modharvest", "https://example.com", "-vv"]).unwrap();
        assert_eq!(args.verbose, 2);
    }

    #[test]
    fn test_cli_quiet_flag_sets_quiet() {
        let args = Args::try_parse_from(["modharvest", "https://example.com", "-q"]).unwrap();
        assert!(args.quiet);
    }

    #[test]
    fn test_cli_db_path_flag() {
        let args = Args::try_parse_from([
            "modharvest",
            "https://example.com",
            "--db",
            "/tmp/cat.db",
        ])
        .unwrap();
        assert_eq!(args.db, PathBuf::from("/tmp/cat.db"));
    }

    #[test]
    fn test_cli_help_flag_shows_usage() {
        let result = Args::try_parse_from(["modharvest", "--help"]);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_cli_invalid_flag_returns_error() {
        let result = Args::try_parse_from(["modharvest", "https://example.com", "--bogus"]);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::UnknownArgument);
    }
}
