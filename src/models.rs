//! Core data types used throughout shelfsync.
//!
//! These types represent the feed records, remote products, and normalized
//! payloads that flow through the reconciliation and sync pipeline.

use serde::{Deserialize, Serialize};

/// One raw entry from the catalog feed, as parsed from the XML export.
///
/// All fields except [`key`](FeedRecord::key) are optional in the feed;
/// defaulting rules are applied later by the transformer, not here.
/// A `FeedRecord` is immutable once parsed and lives for one run.
#[derive(Debug, Clone, Default)]
pub struct FeedRecord {
    /// Stable unique identifier linking the feed row to a remote product
    /// (an ISBN for book feeds).
    pub key: String,
    pub title: Option<String>,
    /// Decimal price as the feed supplies it (a string, not parsed).
    pub price: Option<String>,
    /// Raw stock text. May be non-numeric ("N/A"); parsed with a 0 default.
    pub stock: Option<String>,
    pub description: Option<String>,
    pub short_description: Option<String>,
    /// Comma-delimited category names.
    pub categories: Option<String>,
    /// Pipe-delimited tag names.
    pub tags: Option<String>,
    pub image_url: Option<String>,
    pub author: Option<String>,
    pub publisher: Option<String>,
    pub format: Option<String>,
    pub pages: Option<String>,
    pub language: Option<String>,
    /// Free-form "L x W x H" string, decomposed by the transformer.
    pub dimensions: Option<String>,
    pub weight: Option<String>,
    pub publication_date: Option<String>,
}

/// A product summary as reported by the remote catalog.
///
/// Only `id` and `sku` are interpreted; every other field the remote
/// returns is carried as opaque passthrough so the snapshot cache
/// round-trips without loss.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteProduct {
    pub id: i64,
    pub sku: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// One page of the remote product listing.
#[derive(Debug, Clone)]
pub struct ProductPage {
    pub products: Vec<RemoteProduct>,
    /// Total page count from pagination metadata, when the remote reports it.
    pub total_pages: Option<u32>,
}

/// A category record in the remote taxonomy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteCategory {
    pub id: i64,
    pub name: String,
}

/// Result of diffing the feed against the snapshot.
///
/// The two sets are disjoint and together cover every feed key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    /// Keys present in the feed but absent from the remote catalog.
    pub new: Vec<String>,
    /// Keys present in both the feed and the remote catalog.
    pub existing: Vec<String>,
}

/// Preset fields applied verbatim to every newly created product.
///
/// Loaded from the presets JSON document; flattened into
/// [`NormalizedProduct`] on serialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Presets {
    pub tax_status: String,
    pub tax_class: String,
    pub manage_stock: bool,
    pub stock_status: String,
    pub shipping_class: String,
    pub backorders: String,
}

/// A product attribute: a display name plus stringified option values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub options: Vec<String>,
}

/// Reference to a resolved remote category by id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CategoryRef {
    pub id: i64,
}

/// A product image by source URL.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImageRef {
    pub src: String,
}

/// A product tag by name. The remote creates tags on the fly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TagRef {
    pub name: String,
}

/// Physical dimensions, decomposed from the feed's dimensions string.
///
/// Either all three components are present or the field is omitted from
/// the product entirely; a partially filled value is never produced.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Dimensions {
    pub length: String,
    pub width: String,
    pub height: String,
}

/// A feed record transformed into the remote product schema, ready for
/// batch creation.
#[derive(Debug, Clone, Serialize)]
pub struct NormalizedProduct {
    pub name: String,
    #[serde(rename = "type")]
    pub product_type: String,
    pub sku: String,
    pub regular_price: String,
    pub stock_quantity: u32,
    pub description: String,
    pub short_description: String,
    pub categories: Vec<CategoryRef>,
    pub images: Vec<ImageRef>,
    pub attributes: Vec<Attribute>,
    pub tags: Vec<TagRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<Dimensions>,
    #[serde(flatten)]
    pub presets: Presets,
}

/// Minimal payload for a batch update of an existing product: only stock
/// and price change.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ProductUpdate {
    pub id: i64,
    pub stock_quantity: u32,
    pub regular_price: String,
}
