//! # shelfsync
//!
//! Reconciles a bookshop catalog feed (an XML export of book records)
//! against a WooCommerce-style store and synchronizes it in batches:
//! records absent from the store are created, records already present
//! get stock/price updates.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────────┐   ┌────────────┐   ┌─────────┐
//! │   Feed   │──▶│ Reconcile    │──▶│ Transform  │──▶│  Batch  │
//! │  (XML)   │   │ NEW/EXISTING │   │ normalize  │   │ submit  │
//! └──────────┘   └──────┬───────┘   └────────────┘   └────┬────┘
//!                       │                                 │
//!                ┌──────▼───────┐                  ┌──────▼──────┐
//!                │  Snapshot    │◀─────────────────│   Gateway   │
//!                │ (JSON cache) │  paginated fetch │ (REST API)  │
//!                └──────────────┘                  └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! shelfsync plan catalog.xml          # classify only, no writes
//! shelfsync create catalog.xml       # add NEW products in batches
//! shelfsync update catalog.xml       # update stock/price of EXISTING
//! shelfsync cache status             # inspect the snapshot cache
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | JSON connection + preset configuration |
//! | [`models`] | Core data types |
//! | [`feed`] | XML feed reader with legacy-encoding tolerance |
//! | [`snapshot`] | Time-bounded catalog snapshot cache |
//! | [`gateway`] | Remote catalog gateway (trait + REST client) |
//! | [`reconcile`] | Snapshot construction and NEW/EXISTING diffing |
//! | [`transform`] | Feed record → normalized product mapping |
//! | [`batch`] | Fixed-size batch partitioning and submission |
//! | [`progress`] | Structured run events (human/JSON/off) |
//! | [`run`] | Pipeline orchestration for the run modes |

pub mod batch;
pub mod config;
pub mod feed;
pub mod gateway;
pub mod models;
pub mod progress;
pub mod reconcile;
pub mod run;
pub mod snapshot;
pub mod transform;
