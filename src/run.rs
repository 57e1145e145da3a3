//! Pipeline orchestration.
//!
//! Coordinates one reconciliation-and-sync run: feed parse → snapshot
//! (cache or paginated fetch) → classification → transform → batch
//! submission. One sequential task per run; pacing between remote calls
//! is handled further down in [`crate::reconcile`] and [`crate::batch`].
//!
//! Progress and warnings flow through the [`RunReporter`] on stderr;
//! only the final summary is printed to stdout.

use std::collections::HashSet;
use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::batch::{self, BatchOutcome};
use crate::feed::Feed;
use crate::gateway::CatalogGateway;
use crate::models::{FeedRecord, NormalizedProduct, Presets, ProductUpdate};
use crate::progress::{RunEvent, RunReporter, Severity};
use crate::reconcile;
use crate::snapshot::SnapshotStore;
use crate::transform::{CategoryCache, Transformer};

/// What a run does after classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Classify only; no writes to the remote.
    Plan,
    /// Submit the NEW set as product creations.
    Create,
    /// Submit the EXISTING set as stock/price updates.
    Update,
}

impl Mode {
    fn verb(self) -> &'static str {
        match self {
            Mode::Plan => "plan",
            Mode::Create => "create",
            Mode::Update => "update",
        }
    }
}

/// Per-run options from the command line.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub feed: PathBuf,
    /// Snapshot cache file location.
    pub cache: PathBuf,
    /// Ignore a cached snapshot and refetch the remote catalog.
    pub refresh: bool,
    pub batch_size: usize,
    /// Cap on records submitted (after classification).
    pub limit: Option<usize>,
    /// Optional persisted category name→id table.
    pub category_cache: Option<PathBuf>,
}

/// Run-level summary, always produced — even when batches failed.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub feed_records: usize,
    pub skipped_records: usize,
    pub new: usize,
    pub existing: usize,
    /// Submission outcome; `None` for a plan run.
    pub outcome: Option<BatchOutcome>,
}

/// Execute one run and print its summary to stdout.
pub async fn run(
    gateway: &dyn CatalogGateway,
    presets: &Presets,
    mode: Mode,
    opts: &RunOptions,
    reporter: &dyn RunReporter,
) -> Result<RunSummary> {
    let feed = Feed::parse_file(&opts.feed)
        .with_context(|| format!("Failed to load feed: {}", opts.feed.display()))?;
    if feed.skipped > 0 {
        reporter.log(
            Severity::Warn,
            &format!("{} feed records skipped (missing key field)", feed.skipped),
        );
    }

    let store = SnapshotStore::new(&opts.cache);
    let snapshot = reconcile::ensure_snapshot(&store, gateway, opts.refresh, reporter).await?;

    let classification = reconcile::classify(&feed, &snapshot);
    reporter.report(RunEvent::Classified {
        new: classification.new.len(),
        existing: classification.existing.len(),
    });

    let mut summary = RunSummary {
        feed_records: feed.records.len(),
        skipped_records: feed.skipped,
        new: classification.new.len(),
        existing: classification.existing.len(),
        outcome: None,
    };

    match mode {
        Mode::Plan => {}
        Mode::Create => {
            let category_cache = load_category_cache(opts, reporter);
            let mut transformer =
                Transformer::new(presets.clone(), gateway, reporter, category_cache);

            let mut records = select_records(&feed.records, &classification.new);
            truncate_with_notice(&mut records, opts.limit, reporter);
            let mut products: Vec<NormalizedProduct> = Vec::with_capacity(records.len());
            for record in records {
                products.push(transformer.transform(record).await);
            }

            let outcome =
                batch::submit_creates(gateway, products, opts.batch_size, reporter).await;
            save_category_cache(transformer.into_cache(), opts, reporter);
            summary.outcome = Some(outcome);
        }
        Mode::Update => {
            // Updates never touch categories; no cache needed.
            let transformer =
                Transformer::new(presets.clone(), gateway, reporter, CategoryCache::new());

            let mut records = select_records(&feed.records, &classification.existing);
            truncate_with_notice(&mut records, opts.limit, reporter);
            let mut updates: Vec<ProductUpdate> = Vec::with_capacity(records.len());
            for record in records {
                // Classified EXISTING, so the snapshot has it.
                if let Some(remote) = snapshot.get(&record.key) {
                    updates.push(transformer.update_payload(record, remote.id));
                }
            }

            let outcome = batch::submit_updates(gateway, updates, opts.batch_size, reporter).await;
            summary.outcome = Some(outcome);
        }
    }

    print_summary(mode, opts, &summary);
    Ok(summary)
}

/// Feed-order records whose keys were classified into `targets`.
/// Duplicate keys keep the first occurrence only.
fn select_records<'a>(records: &'a [FeedRecord], targets: &[String]) -> Vec<&'a FeedRecord> {
    let wanted: HashSet<&str> = targets.iter().map(String::as_str).collect();
    let mut seen = HashSet::new();
    records
        .iter()
        .filter(|r| wanted.contains(r.key.as_str()) && seen.insert(r.key.as_str()))
        .collect()
}

fn truncate_with_notice<T>(items: &mut Vec<T>, limit: Option<usize>, reporter: &dyn RunReporter) {
    if let Some(limit) = limit {
        if items.len() > limit {
            reporter.log(
                Severity::Info,
                &format!("limiting run to {} of {} records", limit, items.len()),
            );
            items.truncate(limit);
        }
    }
}

fn load_category_cache(opts: &RunOptions, reporter: &dyn RunReporter) -> CategoryCache {
    let Some(path) = &opts.category_cache else {
        return CategoryCache::new();
    };
    match CategoryCache::load(path) {
        Ok(cache) => {
            if !cache.is_empty() {
                reporter.log(
                    Severity::Info,
                    &format!("loaded {} cached category ids", cache.len()),
                );
            }
            cache
        }
        Err(e) => {
            reporter.log(Severity::Warn, &format!("ignoring category cache: {e:#}"));
            CategoryCache::new()
        }
    }
}

fn save_category_cache(cache: CategoryCache, opts: &RunOptions, reporter: &dyn RunReporter) {
    if let Some(path) = &opts.category_cache {
        if let Err(e) = cache.save(path) {
            reporter.log(
                Severity::Warn,
                &format!("could not persist category cache: {e:#}"),
            );
        }
    }
}

fn print_summary(mode: Mode, opts: &RunOptions, summary: &RunSummary) {
    println!("{} {}", mode.verb(), opts.feed.display());
    println!("  feed records: {}", summary.feed_records);
    if summary.skipped_records > 0 {
        println!("  skipped records: {}", summary.skipped_records);
    }
    println!("  new: {}", summary.new);
    println!("  existing: {}", summary.existing);
    if let Some(outcome) = &summary.outcome {
        let verb = match mode {
            Mode::Create => "created",
            _ => "updated",
        };
        println!("  {}: {}", verb, outcome.submitted_items);
        if outcome.failed_batches > 0 {
            println!(
                "  failed batches: {} ({} items)",
                outcome.failed_batches, outcome.failed_items
            );
        }
    }
    println!("ok");
}
