//! Remote catalog gateway.
//!
//! [`CatalogGateway`] is the seam between the sync engine and the remote
//! store: paginated product listing, batch create/update, and category
//! lookup. The production implementation ([`WooGateway`]) talks to a
//! WooCommerce-style REST API; tests substitute an in-memory fake.
//!
//! Every operation fails with [`GatewayError`] on a transport fault or a
//! non-2xx response. Nothing here retries or swallows errors — the
//! caller decides what a failure means (fatal for snapshot construction,
//! batch-local for submission).
//!
//! The batch endpoints report success at batch granularity only; there
//! is no per-record acknowledgment to rely on.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::json;

use crate::config::ConnectionConfig;
use crate::models::{NormalizedProduct, ProductPage, ProductUpdate, RemoteCategory, RemoteProduct};

/// A remote-call failure: transport fault, non-2xx status, or an
/// undecodable response body.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: StatusCode },
    #[error("could not decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Logical operations the sync engine needs from the remote catalog.
#[async_trait]
pub trait CatalogGateway: Send + Sync {
    /// Fetch one page of the product listing.
    async fn fetch_page(&self, per_page: u32, page: u32) -> Result<ProductPage, GatewayError>;

    /// Create a batch of products in one logical call.
    async fn create_batch(&self, products: &[NormalizedProduct]) -> Result<(), GatewayError>;

    /// Update a batch of products in one logical call.
    async fn update_batch(&self, updates: &[ProductUpdate]) -> Result<(), GatewayError>;

    /// Search categories by name. Matching is the remote's (substring);
    /// callers filter for exact matches themselves.
    async fn search_categories(&self, name: &str) -> Result<Vec<RemoteCategory>, GatewayError>;

    /// Create a category and return its record.
    async fn create_category(&self, name: &str) -> Result<RemoteCategory, GatewayError>;
}

/// WooCommerce REST API v3 client.
///
/// Authenticates with the consumer key/secret pair as query parameters,
/// which WooCommerce accepts over HTTPS.
pub struct WooGateway {
    client: reqwest::Client,
    base: String,
    key: String,
    secret: String,
}

impl WooGateway {
    pub fn new(config: &ConnectionConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base: format!("{}/wp-json/wc/v3", config.site_url.trim_end_matches('/')),
            key: config.client_key.clone(),
            secret: config.client_secret.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base, path)
    }

    fn auth(&self) -> [(&'static str, &str); 2] {
        [
            ("consumer_key", self.key.as_str()),
            ("consumer_secret", self.secret.as_str()),
        ]
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        url: &str,
    ) -> Result<reqwest::Response, GatewayError> {
        let response = request
            .query(&self.auth())
            .send()
            .await
            .map_err(|source| GatewayError::Transport {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::Status {
                url: url.to_string(),
                status,
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl CatalogGateway for WooGateway {
    async fn fetch_page(&self, per_page: u32, page: u32) -> Result<ProductPage, GatewayError> {
        let url = self.url("products");
        let request = self.client.get(&url).query(&[
            ("per_page", per_page.to_string()),
            ("page", page.to_string()),
        ]);
        let response = self.send(request, &url).await?;

        let total_pages = response
            .headers()
            .get("x-wp-totalpages")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u32>().ok());

        let products: Vec<RemoteProduct> =
            response
                .json()
                .await
                .map_err(|source| GatewayError::Decode { url, source })?;

        Ok(ProductPage {
            products,
            total_pages,
        })
    }

    async fn create_batch(&self, products: &[NormalizedProduct]) -> Result<(), GatewayError> {
        let url = self.url("products/batch");
        let request = self.client.post(&url).json(&json!({ "create": products }));
        self.send(request, &url).await?;
        Ok(())
    }

    async fn update_batch(&self, updates: &[ProductUpdate]) -> Result<(), GatewayError> {
        let url = self.url("products/batch");
        let request = self.client.put(&url).json(&json!({ "update": updates }));
        self.send(request, &url).await?;
        Ok(())
    }

    async fn search_categories(&self, name: &str) -> Result<Vec<RemoteCategory>, GatewayError> {
        let url = self.url("products/categories");
        let request = self.client.get(&url).query(&[("search", name)]);
        let response = self.send(request, &url).await?;
        response
            .json()
            .await
            .map_err(|source| GatewayError::Decode { url, source })
    }

    async fn create_category(&self, name: &str) -> Result<RemoteCategory, GatewayError> {
        let url = self.url("products/categories");
        let request = self.client.post(&url).json(&json!({ "name": name }));
        let response = self.send(request, &url).await?;
        response
            .json()
            .await
            .map_err(|source| GatewayError::Decode { url, source })
    }
}
