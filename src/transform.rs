//! Record transformer.
//!
//! Maps a raw [`FeedRecord`] into the remote product schema, applying
//! the defaulting and validation rules that keep transformation total:
//! for any record, however sparse, `transform` yields a well-formed
//! [`NormalizedProduct`] without erroring. Every silently applied
//! default is reported at debug severity for traceability.
//!
//! Category names are resolved to remote ids through a per-run
//! lookup-or-create cache. A category that fails to resolve is dropped
//! from that product with a warning; it never aborts the record.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};

use crate::gateway::CatalogGateway;
use crate::models::{
    Attribute, CategoryRef, Dimensions, FeedRecord, ImageRef, NormalizedProduct, Presets,
    ProductUpdate, TagRef,
};
use crate::progress::{RunReporter, Severity};

/// Replace characters the remote taxonomy rejects in category names and
/// strip control characters. `/` reads as "and" in shop taxonomies
/// ("History/War" becomes "History and War").
pub fn sanitize_category_name(name: &str) -> String {
    name.replace('/', " and ")
        .replace('\\', "")
        .chars()
        .filter(|c| !c.is_control())
        .collect::<String>()
        .trim()
        .to_string()
}

/// Per-run mapping from sanitized category name to remote id.
///
/// Lookups are case-insensitive. The cache is not persisted unless the
/// caller asks: by default every run re-resolves against the remote,
/// which tolerates remote-side renames at the cost of extra lookups.
#[derive(Debug, Default)]
pub struct CategoryCache {
    map: HashMap<String, i64>,
}

impl CategoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a previously saved name→id table. A missing file yields an
    /// empty cache.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read category cache: {}", path.display()))?;
        let map: HashMap<String, i64> = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse category cache: {}", path.display()))?;
        Ok(Self { map })
    }

    /// Persist the name→id table.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(&self.map)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write category cache: {}", path.display()))?;
        Ok(())
    }

    pub fn get(&self, sanitized: &str) -> Option<i64> {
        self.map.get(&sanitized.to_lowercase()).copied()
    }

    pub fn insert(&mut self, sanitized: &str, id: i64) {
        self.map.insert(sanitized.to_lowercase(), id);
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Transforms feed records into normalized products for one run.
pub struct Transformer<'a> {
    presets: Presets,
    gateway: &'a dyn CatalogGateway,
    reporter: &'a dyn RunReporter,
    cache: CategoryCache,
}

impl<'a> Transformer<'a> {
    pub fn new(
        presets: Presets,
        gateway: &'a dyn CatalogGateway,
        reporter: &'a dyn RunReporter,
        cache: CategoryCache,
    ) -> Self {
        Self {
            presets,
            gateway,
            reporter,
            cache,
        }
    }

    /// Hand the category cache back, e.g. for persisting after the run.
    pub fn into_cache(self) -> CategoryCache {
        self.cache
    }

    /// Transform one feed record. Total: never fails, defaults instead.
    pub async fn transform(&mut self, record: &FeedRecord) -> NormalizedProduct {
        let categories = self.resolve_categories(record).await;

        NormalizedProduct {
            name: record.title.clone().unwrap_or_default(),
            product_type: "simple".to_string(),
            sku: record.key.clone(),
            regular_price: self.price_for(record),
            stock_quantity: self.stock_for(record),
            description: record.description.clone().unwrap_or_default(),
            short_description: record.short_description.clone().unwrap_or_default(),
            categories,
            images: build_images(record),
            attributes: build_attributes(record),
            tags: split_tags(record.tags.as_deref()),
            dimensions: record.dimensions.as_deref().and_then(split_dimensions),
            presets: self.presets.clone(),
        }
    }

    /// Minimal update payload for an existing product: stock and price.
    pub fn update_payload(&self, record: &FeedRecord, remote_id: i64) -> ProductUpdate {
        ProductUpdate {
            id: remote_id,
            stock_quantity: self.stock_for(record),
            regular_price: self.price_for(record),
        }
    }

    fn price_for(&self, record: &FeedRecord) -> String {
        match record.price.as_deref().map(str::trim) {
            Some(p) if !p.is_empty() => p.to_string(),
            _ => {
                self.reporter.log(
                    Severity::Debug,
                    &format!("{}: missing price, defaulting to 0", record.key),
                );
                "0".to_string()
            }
        }
    }

    fn stock_for(&self, record: &FeedRecord) -> u32 {
        let raw = record.stock.as_deref().unwrap_or("").trim();
        match raw.parse::<u32>() {
            Ok(n) => n,
            Err(_) => {
                self.reporter.log(
                    Severity::Debug,
                    &format!("{}: unparseable stock '{}', defaulting to 0", record.key, raw),
                );
                0
            }
        }
    }

    async fn resolve_categories(&mut self, record: &FeedRecord) -> Vec<CategoryRef> {
        let Some(raw) = record.categories.as_deref() else {
            return Vec::new();
        };
        let mut refs = Vec::new();
        for name in raw.split(',') {
            if let Some(id) = self.resolve_category(name).await {
                refs.push(CategoryRef { id });
            }
        }
        refs
    }

    /// Resolve one category name: sanitize, consult the cache, then
    /// exact case-insensitive search, then create. Failure to resolve
    /// drops the category, not the record.
    async fn resolve_category(&mut self, raw: &str) -> Option<i64> {
        let sanitized = sanitize_category_name(raw);
        if sanitized.is_empty() {
            return None;
        }
        if let Some(id) = self.cache.get(&sanitized) {
            return Some(id);
        }

        match self.lookup_or_create(&sanitized).await {
            Ok(id) => {
                self.cache.insert(&sanitized, id);
                Some(id)
            }
            Err(e) => {
                self.reporter.log(
                    Severity::Warn,
                    &format!("could not resolve category '{}': {}", sanitized, e),
                );
                None
            }
        }
    }

    async fn lookup_or_create(
        &self,
        sanitized: &str,
    ) -> Result<i64, crate::gateway::GatewayError> {
        let candidates = self.gateway.search_categories(sanitized).await?;
        if let Some(exact) = candidates
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(sanitized))
        {
            return Ok(exact.id);
        }
        let created = self.gateway.create_category(sanitized).await?;
        self.reporter.log(
            Severity::Info,
            &format!("created category '{}' (id {})", created.name, created.id),
        );
        Ok(created.id)
    }
}

/// An image entry exists only when the feed supplied a URL; a null
/// source never produces a placeholder entry.
fn build_images(record: &FeedRecord) -> Vec<ImageRef> {
    match record.image_url.as_deref().map(str::trim) {
        Some(url) if !url.is_empty() => vec![ImageRef {
            src: url.to_string(),
        }],
        _ => Vec::new(),
    }
}

/// Build the attribute list. An attribute whose leading option is absent
/// is dropped entirely; present options are already strings.
fn build_attributes(record: &FeedRecord) -> Vec<Attribute> {
    let candidates: [(&str, Option<&String>); 9] = [
        ("Author", record.author.as_ref()),
        ("Publisher", record.publisher.as_ref()),
        ("ISBN", Some(&record.key)),
        ("Format", record.format.as_ref()),
        ("Pages", record.pages.as_ref()),
        ("Language", record.language.as_ref()),
        ("Dimensions", record.dimensions.as_ref()),
        ("Weight", record.weight.as_ref()),
        ("Publication Date", record.publication_date.as_ref()),
    ];

    candidates
        .into_iter()
        .filter_map(|(name, value)| {
            value.map(|v| Attribute {
                name: name.to_string(),
                options: vec![v.clone()],
            })
        })
        .collect()
}

/// Split the pipe-delimited tag string; empty segments are dropped.
fn split_tags(raw: Option<&str>) -> Vec<TagRef> {
    raw.map(|s| {
        s.split('|')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(|t| TagRef {
                name: t.to_string(),
            })
            .collect()
    })
    .unwrap_or_default()
}

/// Decompose a dimensions string on `x` or `/` separators.
///
/// Exactly three components yield a full [`Dimensions`]; anything else
/// yields `None` — the field is all-or-nothing, never partial.
fn split_dimensions(raw: &str) -> Option<Dimensions> {
    let parts: Vec<&str> = raw
        .split(|c| c == 'x' || c == 'X' || c == '/')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();
    match parts.as_slice() {
        [length, width, height] => Some(Dimensions {
            length: length.to_string(),
            width: width.to_string(),
            height: height.to_string(),
        }),
        _ => None,
    }
}
