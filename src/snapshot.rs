//! Catalog snapshot store.
//!
//! Keeps a local, time-bounded view of the remote catalog keyed by SKU so
//! a run can diff the feed without re-fetching the whole catalog. The
//! snapshot persists as a JSON document with a creation timestamp and
//! expires after [`CACHE_EXPIRY_DAYS`]. Corrupt or unreadable state is a
//! cache miss, never an error: the caller falls back to a fresh fetch.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::models::RemoteProduct;

/// Snapshots older than this are treated as absent.
pub const CACHE_EXPIRY_DAYS: i64 = 31;

/// In-memory view of the remote catalog for one run.
///
/// Products live in a flat arena with a parallel key→index map, so the
/// structure read during classification is never aliased by writers.
/// Duplicate SKUs keep the first occurrence.
#[derive(Debug, Clone, Default)]
pub struct CatalogSnapshot {
    products: Vec<RemoteProduct>,
    index: HashMap<String, usize>,
}

impl CatalogSnapshot {
    pub fn from_products(products: Vec<RemoteProduct>) -> Self {
        let mut index = HashMap::with_capacity(products.len());
        for (i, p) in products.iter().enumerate() {
            index.entry(p.sku.clone()).or_insert(i);
        }
        Self { products, index }
    }

    /// Look up a remote product by SKU.
    pub fn get(&self, key: &str) -> Option<&RemoteProduct> {
        self.index.get(key).map(|&i| &self.products[i])
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    pub fn products(&self) -> &[RemoteProduct] {
        &self.products
    }
}

/// On-disk cache document.
#[derive(Debug, Serialize, Deserialize)]
struct CacheFile {
    cached_at: DateTime<Utc>,
    products: Vec<RemoteProduct>,
}

/// What `load` found on disk. Anything but `Hit` means the caller must
/// fetch fresh data.
#[derive(Debug)]
pub enum CacheStatus {
    /// A valid, unexpired snapshot.
    Hit(CatalogSnapshot),
    /// A snapshot exists but is past the expiry window.
    Expired(DateTime<Utc>),
    /// No cache file on disk.
    Missing,
    /// The file exists but could not be read or parsed.
    Corrupt(String),
}

/// Persists catalog snapshots across runs.
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted snapshot, if one exists and is fresh enough.
    pub fn load(&self) -> CacheStatus {
        self.load_at(Utc::now())
    }

    /// `load` with an explicit "now", for expiry tests.
    pub fn load_at(&self, now: DateTime<Utc>) -> CacheStatus {
        if !self.path.exists() {
            return CacheStatus::Missing;
        }
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) => return CacheStatus::Corrupt(e.to_string()),
        };
        let cache: CacheFile = match serde_json::from_str(&content) {
            Ok(c) => c,
            Err(e) => return CacheStatus::Corrupt(e.to_string()),
        };
        if now - cache.cached_at >= Duration::days(CACHE_EXPIRY_DAYS) {
            return CacheStatus::Expired(cache.cached_at);
        }
        CacheStatus::Hit(CatalogSnapshot::from_products(cache.products))
    }

    /// Persist a snapshot with the current timestamp.
    ///
    /// A failure here is non-fatal to the run; the caller reports it and
    /// carries on (the next run simply refetches).
    pub fn save(&self, snapshot: &CatalogSnapshot) -> Result<()> {
        let cache = CacheFile {
            cached_at: Utc::now(),
            products: snapshot.products.clone(),
        };
        let content = serde_json::to_string(&cache)?;
        std::fs::write(&self.path, content)
            .with_context(|| format!("Failed to write snapshot cache: {}", self.path.display()))?;
        Ok(())
    }

    /// Remove the cache file. Returns whether a file was removed.
    pub fn clear(&self) -> Result<bool> {
        if !self.path.exists() {
            return Ok(false);
        }
        std::fs::remove_file(&self.path)
            .with_context(|| format!("Failed to remove snapshot cache: {}", self.path.display()))?;
        Ok(true)
    }

    /// Age of the persisted snapshot, if one parses.
    pub fn cached_at(&self) -> Option<DateTime<Utc>> {
        let content = std::fs::read_to_string(&self.path).ok()?;
        let cache: CacheFile = serde_json::from_str(&content).ok()?;
        Some(cache.cached_at)
    }
}
