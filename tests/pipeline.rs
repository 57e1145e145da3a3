//! End-to-end pipeline tests over an in-memory gateway.
//!
//! These exercise the full run: feed parse → snapshot (cache or fetch) →
//! classification → transform → batch submission, with the remote store
//! replaced by a scripted fake behind the `CatalogGateway` trait.

use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use tempfile::TempDir;

use shelfsync::gateway::{CatalogGateway, GatewayError};
use shelfsync::models::{
    NormalizedProduct, Presets, ProductPage, ProductUpdate, RemoteCategory, RemoteProduct,
};
use shelfsync::progress::{NullReporter, RunEvent, RunReporter};
use shelfsync::run::{run, Mode, RunOptions};

const FEED: &str = r#"<?xml version="1.0"?>
<catalog>
  <book>
    <isbn>A</isbn>
    <title>Alpha</title>
    <price>10.00</price>
    <stock>3</stock>
  </book>
  <book>
    <isbn>B</isbn>
    <title>Beta</title>
    <price>20.00</price>
    <stock>N/A</stock>
    <multicat>Fiction</multicat>
    <dimensions>10 x 5 x 2</dimensions>
  </book>
  <book>
    <isbn>C</isbn>
    <title>Gamma</title>
  </book>
</catalog>"#;

/// Scripted remote store: a fixed product listing plus recorders for
/// batch calls. Batch indices listed in `fail_create_on` (1-based) are
/// rejected.
#[derive(Default)]
struct FakeStore {
    remote_products: Vec<RemoteProduct>,
    fail_create_on: Vec<usize>,
    create_calls: Mutex<Vec<Vec<NormalizedProduct>>>,
    update_calls: Mutex<Vec<Vec<ProductUpdate>>>,
    fetch_pages: Mutex<u32>,
}

impl FakeStore {
    fn with_products(skus: &[(&str, i64)]) -> Self {
        Self {
            remote_products: skus
                .iter()
                .map(|(sku, id)| RemoteProduct {
                    id: *id,
                    sku: sku.to_string(),
                    extra: serde_json::Map::new(),
                })
                .collect(),
            ..Default::default()
        }
    }
}

#[async_trait]
impl CatalogGateway for FakeStore {
    async fn fetch_page(&self, per_page: u32, page: u32) -> Result<ProductPage, GatewayError> {
        *self.fetch_pages.lock().unwrap() += 1;
        let start = ((page - 1) * per_page) as usize;
        let products: Vec<RemoteProduct> = self
            .remote_products
            .iter()
            .skip(start)
            .take(per_page as usize)
            .cloned()
            .collect();
        let total = (self.remote_products.len() as u32).div_ceil(per_page).max(1);
        Ok(ProductPage {
            products,
            total_pages: Some(total),
        })
    }

    async fn create_batch(&self, products: &[NormalizedProduct]) -> Result<(), GatewayError> {
        let mut calls = self.create_calls.lock().unwrap();
        calls.push(products.to_vec());
        if self.fail_create_on.contains(&calls.len()) {
            return Err(GatewayError::Status {
                url: "fake".to_string(),
                status: reqwest::StatusCode::BAD_GATEWAY,
            });
        }
        Ok(())
    }

    async fn update_batch(&self, updates: &[ProductUpdate]) -> Result<(), GatewayError> {
        self.update_calls.lock().unwrap().push(updates.to_vec());
        Ok(())
    }

    async fn search_categories(&self, _name: &str) -> Result<Vec<RemoteCategory>, GatewayError> {
        Ok(Vec::new())
    }

    async fn create_category(&self, name: &str) -> Result<RemoteCategory, GatewayError> {
        Ok(RemoteCategory {
            id: 500,
            name: name.to_string(),
        })
    }
}

/// Collects events so tests can assert on what the pipeline reported.
#[derive(Default)]
struct Recorder(Mutex<Vec<RunEvent>>);

impl RunReporter for Recorder {
    fn report(&self, event: RunEvent) {
        self.0.lock().unwrap().push(event);
    }
}

fn presets() -> Presets {
    Presets {
        tax_status: "taxable".to_string(),
        tax_class: "standard".to_string(),
        manage_stock: true,
        stock_status: "instock".to_string(),
        shipping_class: "books".to_string(),
        backorders: "no".to_string(),
    }
}

struct Env {
    _tmp: TempDir,
    feed: PathBuf,
    cache: PathBuf,
}

fn setup(feed_xml: &str) -> Env {
    let tmp = TempDir::new().unwrap();
    let feed = tmp.path().join("catalog.xml");
    std::fs::write(&feed, feed_xml).unwrap();
    let cache = tmp.path().join("products_cache.json");
    Env {
        _tmp: tmp,
        feed,
        cache,
    }
}

fn opts(env: &Env) -> RunOptions {
    RunOptions {
        feed: env.feed.clone(),
        cache: env.cache.clone(),
        refresh: false,
        batch_size: 50,
        limit: None,
        category_cache: None,
    }
}

#[tokio::test(start_paused = true)]
async fn plan_classifies_without_writing() {
    let env = setup(FEED);
    let store = FakeStore::with_products(&[("A", 1)]);

    let summary = run(&store, &presets(), Mode::Plan, &opts(&env), &NullReporter)
        .await
        .unwrap();

    assert_eq!(summary.feed_records, 3);
    assert_eq!(summary.new, 2);
    assert_eq!(summary.existing, 1);
    assert!(summary.outcome.is_none());
    assert!(store.create_calls.lock().unwrap().is_empty());
    assert!(store.update_calls.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn create_submits_only_new_records() {
    let env = setup(FEED);
    let store = FakeStore::with_products(&[("A", 1)]);

    let summary = run(&store, &presets(), Mode::Create, &opts(&env), &NullReporter)
        .await
        .unwrap();

    let outcome = summary.outcome.unwrap();
    assert_eq!(outcome.submitted_items, 2);
    assert_eq!(outcome.failed_batches, 0);

    let calls = store.create_calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    let skus: Vec<&str> = calls[0].iter().map(|p| p.sku.as_str()).collect();
    assert_eq!(skus, vec!["B", "C"]);

    // defaulting applied during transform
    let beta = &calls[0][0];
    assert_eq!(beta.stock_quantity, 0, "N/A stock defaults to 0");
    assert_eq!(beta.dimensions.as_ref().unwrap().width, "5");
    assert_eq!(beta.categories.len(), 1, "category created on the fly");
    let gamma = &calls[0][1];
    assert_eq!(gamma.regular_price, "0", "missing price defaults");
    assert!(gamma.dimensions.is_none());
}

#[tokio::test(start_paused = true)]
async fn update_submits_minimal_payloads_for_existing() {
    let env = setup(FEED);
    let store = FakeStore::with_products(&[("A", 41), ("Z", 42)]);

    let summary = run(&store, &presets(), Mode::Update, &opts(&env), &NullReporter)
        .await
        .unwrap();

    assert_eq!(summary.existing, 1);
    let calls = store.update_calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(
        calls[0],
        vec![ProductUpdate {
            id: 41,
            stock_quantity: 3,
            regular_price: "10.00".to_string(),
        }]
    );
}

#[tokio::test(start_paused = true)]
async fn failed_batch_does_not_stop_the_run() {
    // 120 new records at batch size 50 → 3 batches; batch 2 fails.
    let mut xml = String::from("<catalog>");
    for i in 0..120 {
        xml.push_str(&format!(
            "<book><isbn>K{i}</isbn><title>T{i}</title><price>1</price><stock>1</stock></book>"
        ));
    }
    xml.push_str("</catalog>");

    let env = setup(&xml);
    let mut store = FakeStore::with_products(&[]);
    store.fail_create_on = vec![2];

    let summary = run(&store, &presets(), Mode::Create, &opts(&env), &NullReporter)
        .await
        .unwrap();

    let outcome = summary.outcome.unwrap();
    assert_eq!(outcome.submitted_items, 70);
    assert_eq!(outcome.failed_batches, 1);
    assert_eq!(outcome.failed_items, 50);
    assert_eq!(store.create_calls.lock().unwrap().len(), 3, "all batches attempted");
}

#[tokio::test(start_paused = true)]
async fn snapshot_cache_is_reused_on_second_run() {
    let env = setup(FEED);
    let store = FakeStore::with_products(&[("A", 1)]);

    run(&store, &presets(), Mode::Plan, &opts(&env), &NullReporter)
        .await
        .unwrap();
    let fetches_after_first = *store.fetch_pages.lock().unwrap();
    assert!(fetches_after_first >= 1);

    let recorder = Recorder::default();
    run(&store, &presets(), Mode::Plan, &opts(&env), &recorder)
        .await
        .unwrap();
    assert_eq!(
        *store.fetch_pages.lock().unwrap(),
        fetches_after_first,
        "second run must not refetch"
    );
    let events = recorder.0.lock().unwrap();
    assert!(events.iter().any(|e| matches!(
        e,
        RunEvent::SnapshotReady {
            from_cache: true,
            ..
        }
    )));
}

#[tokio::test(start_paused = true)]
async fn refresh_flag_forces_a_refetch() {
    let env = setup(FEED);
    let store = FakeStore::with_products(&[("A", 1)]);

    run(&store, &presets(), Mode::Plan, &opts(&env), &NullReporter)
        .await
        .unwrap();
    let first = *store.fetch_pages.lock().unwrap();

    let mut o = opts(&env);
    o.refresh = true;
    run(&store, &presets(), Mode::Plan, &o, &NullReporter)
        .await
        .unwrap();
    assert!(*store.fetch_pages.lock().unwrap() > first);
}

#[tokio::test(start_paused = true)]
async fn limit_caps_submitted_records() {
    let env = setup(FEED);
    let store = FakeStore::with_products(&[]);

    let mut o = opts(&env);
    o.limit = Some(1);
    let summary = run(&store, &presets(), Mode::Create, &o, &NullReporter)
        .await
        .unwrap();

    assert_eq!(summary.outcome.unwrap().submitted_items, 1);
    let calls = store.create_calls.lock().unwrap();
    assert_eq!(calls[0].len(), 1);
    assert_eq!(calls[0][0].sku, "A");
}

#[tokio::test(start_paused = true)]
async fn category_cache_file_persists_resolved_ids() {
    let env = setup(FEED);
    let store = FakeStore::with_products(&[]);
    let cache_path = env.feed.parent().unwrap().join("categories.json");

    let mut o = opts(&env);
    o.category_cache = Some(cache_path.clone());
    run(&store, &presets(), Mode::Create, &o, &NullReporter)
        .await
        .unwrap();

    let saved: std::collections::HashMap<String, i64> =
        serde_json::from_str(&std::fs::read_to_string(&cache_path).unwrap()).unwrap();
    assert_eq!(saved.get("fiction"), Some(&500));
}

#[tokio::test(start_paused = true)]
async fn malformed_feed_aborts_the_run() {
    let env = setup("<catalog><book><isbn>A</book>");
    let store = FakeStore::with_products(&[]);
    let err = run(&store, &presets(), Mode::Plan, &opts(&env), &NullReporter)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Failed to load feed"));
    assert_eq!(*store.fetch_pages.lock().unwrap(), 0, "no remote calls");
}
