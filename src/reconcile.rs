//! Reconciliation engine.
//!
//! Builds the catalog snapshot (from cache or a paginated fetch) and
//! diffs the feed against it by SKU: a key absent from the snapshot is
//! NEW, a key present is EXISTING. Classification is a linear scan in
//! feed order with the snapshot held read-only.

use std::time::Duration;

use anyhow::{Context, Result};

use crate::feed::Feed;
use crate::gateway::{CatalogGateway, GatewayError};
use crate::models::Classification;
use crate::progress::{RunEvent, RunReporter, Severity};
use crate::snapshot::{CacheStatus, CatalogSnapshot, SnapshotStore};

/// Products requested per listing page.
pub const PAGE_SIZE: u32 = 100;

/// Pause between successive page fetches, as backpressure against remote
/// rate limits.
const PAGE_PACING: Duration = Duration::from_millis(500);

/// Classify every feed record as NEW or EXISTING against the snapshot.
///
/// Each feed key lands in exactly one of the two sets; duplicate feed
/// keys are classified once, at their first occurrence.
pub fn classify(feed: &Feed, snapshot: &CatalogSnapshot) -> Classification {
    let mut result = Classification::default();
    let mut seen = std::collections::HashSet::new();
    for record in &feed.records {
        if !seen.insert(record.key.as_str()) {
            continue;
        }
        if snapshot.contains_key(&record.key) {
            result.existing.push(record.key.clone());
        } else {
            result.new.push(record.key.clone());
        }
    }
    result
}

/// Fetch the full remote catalog page by page and build a snapshot.
///
/// Pages are fetched sequentially starting at 1, pausing between pages.
/// Fetching stops when a page comes back empty or the reported total
/// page count is reached. Any gateway failure aborts construction — a
/// partial snapshot is never returned or persisted.
pub async fn build_snapshot(
    gateway: &dyn CatalogGateway,
    reporter: &dyn RunReporter,
) -> Result<CatalogSnapshot, GatewayError> {
    let mut products = Vec::new();
    let mut page = 1u32;

    loop {
        reporter.report(RunEvent::FetchingPage {
            page,
            fetched: products.len(),
        });

        let fetched = gateway.fetch_page(PAGE_SIZE, page).await?;
        if fetched.products.is_empty() {
            break;
        }
        products.extend(fetched.products);

        if let Some(total) = fetched.total_pages {
            if page >= total {
                break;
            }
        }
        page += 1;
        tokio::time::sleep(PAGE_PACING).await;
    }

    Ok(CatalogSnapshot::from_products(products))
}

/// Produce the snapshot for this run: from the store if a fresh one is
/// cached (and no refresh was forced), otherwise by fetching and then
/// persisting it.
///
/// A gateway failure here is fatal to the run; a persist failure is not.
pub async fn ensure_snapshot(
    store: &SnapshotStore,
    gateway: &dyn CatalogGateway,
    refresh: bool,
    reporter: &dyn RunReporter,
) -> Result<CatalogSnapshot> {
    if !refresh {
        match store.load() {
            CacheStatus::Hit(snapshot) => {
                reporter.report(RunEvent::SnapshotReady {
                    products: snapshot.len(),
                    from_cache: true,
                });
                return Ok(snapshot);
            }
            CacheStatus::Expired(cached_at) => {
                reporter.log(
                    Severity::Info,
                    &format!("snapshot cache from {} has expired", cached_at.to_rfc3339()),
                );
            }
            CacheStatus::Missing => {
                reporter.log(Severity::Info, "no snapshot cache, fetching remote catalog");
            }
            CacheStatus::Corrupt(why) => {
                reporter.log(
                    Severity::Warn,
                    &format!("snapshot cache unreadable ({}), refetching", why),
                );
            }
        }
    }

    let snapshot = build_snapshot(gateway, reporter)
        .await
        .context("Failed to fetch the remote catalog")?;

    if let Err(e) = store.save(&snapshot) {
        reporter.log(Severity::Warn, &format!("could not persist snapshot: {e:#}"));
    }
    reporter.report(RunEvent::SnapshotReady {
        products: snapshot.len(),
        from_cache: false,
    });
    Ok(snapshot)
}
