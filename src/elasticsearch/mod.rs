//! Elasticsearch-backed catalog: client, index schema, bulk ingestion and
//! the pattern-query gateway.

mod bulk;
mod client;
mod gateway;
mod schema;

pub use bulk::{BulkIndexer, BulkSummary, RejectedRecord};
pub use client::EsClient;
pub use gateway::EsCatalogGateway;
pub use schema::{ensure_index, verify_index};
