//! Catalog access.
//!
//! The engine only sees the catalog through [`CatalogGateway`]: "give me every
//! record whose stored spatial key contains this pattern". Backends are free
//! to answer that with a full scan or an index, as long as matching is by
//! substring anywhere in the stored key, not by prefix.

mod loader;
mod memory;

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use crate::config::CatalogConfig;
use crate::elasticsearch::{verify_index, EsCatalogGateway, EsClient};
use crate::models::CatalogRecord;

pub use loader::load_records;
pub use memory::MemoryCatalog;

/// Read-only catalog query interface.
#[async_trait]
pub trait CatalogGateway: Send + Sync {
    /// Every record whose stored key contains `pattern` as a contiguous
    /// substring, in backend order.
    ///
    /// Failures are reported as [`crate::NearbyError::CatalogUnavailable`];
    /// any retry policy belongs to the implementation.
    async fn find_by_spatial_key_pattern(
        &self,
        pattern: &str,
    ) -> crate::error::Result<Vec<CatalogRecord>>;
}

/// Build the gateway described by the configuration.
pub async fn connect(config: &CatalogConfig) -> Result<Arc<dyn CatalogGateway>> {
    match config {
        CatalogConfig::Csv { path } => {
            let catalog = MemoryCatalog::from_csv(path)
                .with_context(|| format!("Failed to load catalog from {}", path.display()))?;
            info!("Loaded {} catalog records from {}", catalog.len(), path.display());
            Ok(Arc::new(catalog))
        }
        CatalogConfig::Elasticsearch {
            es_url,
            index,
            page_size,
        } => {
            let client = EsClient::connect(es_url, index).await?;
            verify_index(&client).await?;
            let count = client.record_count().await?;
            info!("Serving {} catalog records from index '{}'", count, index);
            Ok(Arc::new(EsCatalogGateway::new(client, *page_size)))
        }
    }
}
