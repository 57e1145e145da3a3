//! Batch synchronizer.
//!
//! Partitions transformed records into fixed-size batches and drives
//! them through the gateway sequentially. Failures are batch-local: a
//! rejected batch is reported and skipped, and the run carries on with
//! the next one. There is no retry and no rollback — the remote only
//! acknowledges whole batches, so a failed batch simply contributes
//! nothing to the run total.

use std::future::Future;
use std::time::Duration;

use crate::gateway::{CatalogGateway, GatewayError};
use crate::models::{NormalizedProduct, ProductUpdate};
use crate::progress::{RunEvent, RunReporter};

/// Items per batch unless overridden on the command line.
pub const DEFAULT_BATCH_SIZE: usize = 50;

/// Pause between batch submissions, as backpressure against remote rate
/// limits.
const BATCH_PACING: Duration = Duration::from_secs(2);

/// Outcome of driving one set of batches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Items in batches the remote accepted.
    pub submitted_items: usize,
    pub failed_batches: usize,
    /// Items in batches the remote rejected.
    pub failed_items: usize,
}

/// Split `items` into batches of at most `size`, preserving order.
///
/// Produces ceil(N/size) batches; every batch except possibly the last
/// holds exactly `size` items.
pub fn partition<T>(items: Vec<T>, size: usize) -> Vec<Vec<T>> {
    assert!(size > 0, "batch size must be positive");
    let mut batches = Vec::with_capacity(items.len().div_ceil(size));
    let mut current = Vec::with_capacity(size.min(items.len()));
    for item in items {
        current.push(item);
        if current.len() == size {
            batches.push(std::mem::replace(&mut current, Vec::with_capacity(size)));
        }
    }
    if !current.is_empty() {
        batches.push(current);
    }
    batches
}

/// Submit batches sequentially through `submit`, pausing between them.
///
/// Per-batch errors are reported and isolated; the driver always runs
/// every batch to completion and returns the aggregate outcome.
async fn drive<T, F, Fut>(
    batches: Vec<Vec<T>>,
    reporter: &dyn RunReporter,
    mut submit: F,
) -> BatchOutcome
where
    F: FnMut(Vec<T>) -> Fut,
    Fut: Future<Output = Result<(), GatewayError>>,
{
    let total = batches.len();
    let mut outcome = BatchOutcome::default();

    for (i, batch) in batches.into_iter().enumerate() {
        let index = i + 1;
        let items = batch.len();
        match submit(batch).await {
            Ok(()) => {
                outcome.submitted_items += items;
                reporter.report(RunEvent::BatchSubmitted {
                    index,
                    total,
                    items,
                });
            }
            Err(e) => {
                outcome.failed_batches += 1;
                outcome.failed_items += items;
                reporter.report(RunEvent::BatchFailed {
                    index,
                    total,
                    items,
                    error: e.to_string(),
                });
            }
        }
        if index < total {
            tokio::time::sleep(BATCH_PACING).await;
        }
    }

    outcome
}

/// Create products in batches of `batch_size`.
pub async fn submit_creates(
    gateway: &dyn CatalogGateway,
    products: Vec<NormalizedProduct>,
    batch_size: usize,
    reporter: &dyn RunReporter,
) -> BatchOutcome {
    let batches = partition(products, batch_size);
    drive(batches, reporter, |batch| async move {
        gateway.create_batch(&batch).await
    })
    .await
}

/// Update products in batches of `batch_size`.
pub async fn submit_updates(
    gateway: &dyn CatalogGateway,
    updates: Vec<ProductUpdate>,
    batch_size: usize,
    reporter: &dyn RunReporter,
) -> BatchOutcome {
    let batches = partition(updates, batch_size);
    drive(batches, reporter, |batch| async move {
        gateway.update_batch(&batch).await
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ProductPage, RemoteCategory};
    use crate::progress::NullReporter;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[test]
    fn partition_counts_and_order() {
        let batches = partition((0..103).collect::<Vec<_>>(), 50);
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[0].len(), 50);
        assert_eq!(batches[1].len(), 50);
        assert_eq!(batches[2].len(), 3);

        let rejoined: Vec<i32> = batches.into_iter().flatten().collect();
        assert_eq!(rejoined, (0..103).collect::<Vec<_>>());
    }

    #[test]
    fn partition_edge_cases() {
        assert!(partition(Vec::<i32>::new(), 50).is_empty());
        assert_eq!(partition(vec![1, 2], 50).len(), 1);
        // exact multiple: no trailing empty batch
        assert_eq!(partition((0..100).collect::<Vec<_>>(), 50).len(), 2);
    }

    /// Fails submission for the batch indices listed (1-based).
    struct FlakyGateway {
        fail_on: Vec<usize>,
        update_calls: Mutex<usize>,
        seen_updates: Mutex<Vec<Vec<ProductUpdate>>>,
    }

    impl FlakyGateway {
        fn new(fail_on: &[usize]) -> Self {
            Self {
                fail_on: fail_on.to_vec(),
                update_calls: Mutex::new(0),
                seen_updates: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl CatalogGateway for FlakyGateway {
        async fn fetch_page(&self, _: u32, _: u32) -> Result<ProductPage, GatewayError> {
            unimplemented!("not used in these tests")
        }
        async fn create_batch(&self, _: &[NormalizedProduct]) -> Result<(), GatewayError> {
            unimplemented!("not used in these tests")
        }
        async fn update_batch(&self, updates: &[ProductUpdate]) -> Result<(), GatewayError> {
            let mut calls = self.update_calls.lock().unwrap();
            *calls += 1;
            let index = *calls;
            self.seen_updates.lock().unwrap().push(updates.to_vec());
            if self.fail_on.contains(&index) {
                return Err(GatewayError::Status {
                    url: "test".to_string(),
                    status: reqwest::StatusCode::BAD_GATEWAY,
                });
            }
            Ok(())
        }
        async fn search_categories(&self, _: &str) -> Result<Vec<RemoteCategory>, GatewayError> {
            unimplemented!("not used in these tests")
        }
        async fn create_category(&self, _: &str) -> Result<RemoteCategory, GatewayError> {
            unimplemented!("not used in these tests")
        }
    }

    fn updates(n: usize) -> Vec<ProductUpdate> {
        (0..n)
            .map(|i| ProductUpdate {
                id: i as i64,
                stock_quantity: 1,
                regular_price: "1".to_string(),
            })
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn all_batches_succeed() {
        let gateway = FlakyGateway::new(&[]);
        let outcome = submit_updates(&gateway, updates(120), 50, &NullReporter).await;
        assert_eq!(
            outcome,
            BatchOutcome {
                submitted_items: 120,
                failed_batches: 0,
                failed_items: 0,
            }
        );
        assert_eq!(*gateway.update_calls.lock().unwrap(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_batch_is_isolated() {
        let gateway = FlakyGateway::new(&[2]);
        let outcome = submit_updates(&gateway, updates(120), 50, &NullReporter).await;
        // batch 2 fails; batches 1 and 3 are unaffected
        assert_eq!(outcome.submitted_items, 70);
        assert_eq!(outcome.failed_batches, 1);
        assert_eq!(outcome.failed_items, 50);
        assert_eq!(*gateway.update_calls.lock().unwrap(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn batches_arrive_in_feed_order() {
        let gateway = FlakyGateway::new(&[]);
        submit_updates(&gateway, updates(5), 2, &NullReporter).await;
        let seen = gateway.seen_updates.lock().unwrap();
        let ids: Vec<i64> = seen.iter().flatten().map(|u| u.id).collect();
        assert_eq!(ids, vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_input_submits_nothing() {
        let gateway = FlakyGateway::new(&[]);
        let outcome = submit_updates(&gateway, updates(0), 50, &NullReporter).await;
        assert_eq!(outcome, BatchOutcome::default());
        assert_eq!(*gateway.update_calls.lock().unwrap(), 0);
    }
}
