//! # shelfsync CLI
//!
//! Command-line front-end for the reconciliation-and-sync engine.
//!
//! ## Usage
//!
//! ```bash
//! shelfsync --config connection.json --presets presets.json <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `shelfsync plan <feed.xml>` | Classify the feed as NEW/EXISTING without writing |
//! | `shelfsync create <feed.xml>` | Batch-create the NEW products |
//! | `shelfsync update <feed.xml>` | Batch-update stock/price of EXISTING products |
//! | `shelfsync cache status` | Show snapshot cache age and size |
//! | `shelfsync cache clear` | Delete the snapshot cache |
//!
//! Progress is written to stderr (`--progress off|human|json`); the run
//! summary goes to stdout.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use shelfsync::config;
use shelfsync::gateway::WooGateway;
use shelfsync::progress::ProgressMode;
use shelfsync::run::{self, Mode, RunOptions};
use shelfsync::snapshot::{CacheStatus, SnapshotStore, CACHE_EXPIRY_DAYS};

/// shelfsync — reconcile a catalog feed against a remote store and sync
/// it in batches.
#[derive(Parser, Debug)]
#[command(
    name = "shelfsync",
    about = "Reconcile an XML catalog feed against a WooCommerce store and sync it in batches",
    version,
    long_about = "shelfsync diffs an XML catalog export against the store's product \
    catalog by SKU, classifies every record as NEW or EXISTING, and submits creations \
    or stock/price updates in fixed-size batches with failure isolation and \
    rate-limit pacing. The remote catalog view is cached locally between runs."
)]
struct Cli {
    /// Path to the connection config (JSON: site_url, client_key, client_secret).
    #[arg(long, global = true, default_value = "connection.json")]
    config: PathBuf,

    /// Path to the preset fields applied to new products (JSON).
    #[arg(long, global = true, default_value = "presets.json")]
    presets: PathBuf,

    /// Snapshot cache file location.
    #[arg(long, global = true, default_value = "products_cache.json")]
    cache: PathBuf,

    /// Progress output on stderr: off, human, or json. Defaults to human
    /// when stderr is a terminal.
    #[arg(long, global = true)]
    progress: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// Shared flags for the three run modes.
#[derive(clap::Args, Debug)]
struct RunArgs {
    /// Path to the XML catalog feed.
    feed: PathBuf,

    /// Ignore the cached snapshot and refetch the remote catalog.
    #[arg(long)]
    refresh: bool,

    /// Records per batch submission.
    #[arg(
        long,
        default_value_t = shelfsync::batch::DEFAULT_BATCH_SIZE,
        value_parser = parse_batch_size
    )]
    batch_size: usize,

    /// Cap the number of records submitted.
    #[arg(long)]
    limit: Option<usize>,

    /// Persist resolved category ids to this file and reuse them across
    /// runs. Without it, categories are re-resolved every run.
    #[arg(long)]
    category_cache: Option<PathBuf>,
}

/// Top-level CLI commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Classify the feed against the remote catalog without writing.
    ///
    /// Builds (or loads) the catalog snapshot, diffs the feed by SKU,
    /// and reports how many records would be created or updated.
    Plan(RunArgs),

    /// Create the feed's NEW products in batches.
    ///
    /// Transforms each NEW record into the store's product schema
    /// (resolving categories on the fly) and submits batches of
    /// `--batch-size` products. A failed batch is skipped, not retried.
    Create(RunArgs),

    /// Update stock and price for the feed's EXISTING products.
    ///
    /// Submits minimal update payloads (id, stock, price) in batches.
    Update(RunArgs),

    /// Inspect or clear the snapshot cache.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

/// Snapshot cache subcommands.
#[derive(Subcommand, Debug)]
enum CacheAction {
    /// Show the cache's age, validity, and product count.
    Status,
    /// Delete the cache file so the next run refetches the catalog.
    Clear,
}

fn parse_batch_size(value: &str) -> Result<usize, String> {
    let size: usize = value.parse().map_err(|e| format!("{e}"))?;
    if size == 0 {
        return Err("batch size must be at least 1".to_string());
    }
    Ok(size)
}

fn parse_progress(value: Option<&str>) -> anyhow::Result<ProgressMode> {
    match value {
        None => Ok(ProgressMode::default_for_tty()),
        Some("off") => Ok(ProgressMode::Off),
        Some("human") => Ok(ProgressMode::Human),
        Some("json") => Ok(ProgressMode::Json),
        Some(other) => anyhow::bail!("invalid --progress '{}': use off, human, or json", other),
    }
}

fn cache_status(store: &SnapshotStore) {
    println!("cache {}", store.path().display());
    match store.load() {
        CacheStatus::Hit(snapshot) => {
            let created = store
                .cached_at()
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| "unknown".to_string());
            println!(
                "  status: valid (expires {} days after creation)",
                CACHE_EXPIRY_DAYS
            );
            println!("  created: {}", created);
            println!("  products: {}", snapshot.len());
        }
        CacheStatus::Expired(cached_at) => {
            println!("  status: expired");
            println!("  created: {}", cached_at.to_rfc3339());
        }
        CacheStatus::Missing => println!("  status: missing"),
        CacheStatus::Corrupt(why) => println!("  status: corrupt ({})", why),
    }
    println!("ok");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Cache maintenance needs no connection config.
    if let Commands::Cache { action } = &cli.command {
        let store = SnapshotStore::new(&cli.cache);
        match action {
            CacheAction::Status => cache_status(&store),
            CacheAction::Clear => {
                if store.clear()? {
                    println!("cache cleared: {}", store.path().display());
                } else {
                    println!("no cache at {}", store.path().display());
                }
                println!("ok");
            }
        }
        return Ok(());
    }

    let reporter = parse_progress(cli.progress.as_deref())?.reporter();
    let connection = config::load_connection(&cli.config)?;
    let presets = config::load_presets(&cli.presets)?;
    let gateway = WooGateway::new(&connection)?;

    let (mode, args) = match &cli.command {
        Commands::Plan(args) => (Mode::Plan, args),
        Commands::Create(args) => (Mode::Create, args),
        Commands::Update(args) => (Mode::Update, args),
        Commands::Cache { .. } => unreachable!("handled above"),
    };

    let opts = RunOptions {
        feed: args.feed.clone(),
        cache: cli.cache.clone(),
        refresh: args.refresh,
        batch_size: args.batch_size,
        limit: args.limit,
        category_cache: args.category_cache.clone(),
    };

    run::run(&gateway, &presets, mode, &opts, reporter.as_ref()).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_size_zero_is_rejected() {
        let err = Cli::try_parse_from(["shelfsync", "create", "feed.xml", "--batch-size", "0"])
            .unwrap_err();
        assert!(err.to_string().contains("batch size must be at least 1"));
    }

    #[test]
    fn batch_size_positive_is_accepted() {
        let cli =
            Cli::try_parse_from(["shelfsync", "create", "feed.xml", "--batch-size", "10"]).unwrap();
        match cli.command {
            Commands::Create(args) => assert_eq!(args.batch_size, 10),
            _ => panic!("expected create"),
        }
    }

    #[test]
    fn progress_values_parse() {
        assert_eq!(parse_progress(Some("off")).unwrap(), ProgressMode::Off);
        assert_eq!(parse_progress(Some("json")).unwrap(), ProgressMode::Json);
        assert!(parse_progress(Some("loud")).is_err());
    }
}
