//! Batched `_bulk` indexing of catalog records, keyed by record id.

use anyhow::{Context, Result};
use elasticsearch::http::request::JsonBody;
use elasticsearch::BulkParts;
use tracing::{debug, warn};

use super::EsClient;
use crate::models::CatalogRecord;

/// A record Elasticsearch refused to index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedRecord {
    pub id: String,
    pub reason: String,
}

/// Totals reported once ingestion is done.
#[derive(Debug, Default)]
pub struct BulkSummary {
    pub indexed: usize,
    pub rejected: Vec<RejectedRecord>,
}

pub struct BulkIndexer {
    client: EsClient,
    batch_size: usize,
    pending: Vec<CatalogRecord>,
    summary: BulkSummary,
}

impl BulkIndexer {
    pub fn new(client: EsClient, batch_size: usize) -> Self {
        let batch_size = batch_size.max(1);
        Self {
            client,
            batch_size,
            pending: Vec::with_capacity(batch_size),
            summary: BulkSummary::default(),
        }
    }

    pub async fn add(&mut self, record: CatalogRecord) -> Result<()> {
        self.pending.push(record);
        if self.pending.len() >= self.batch_size {
            self.send_batch().await?;
        }
        Ok(())
    }

    /// Send what is left and report the totals.
    pub async fn finish(mut self) -> Result<BulkSummary> {
        self.send_batch().await?;
        Ok(self.summary)
    }

    async fn send_batch(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let batch = std::mem::replace(&mut self.pending, Vec::with_capacity(self.batch_size));
        debug!("Sending {} records to '{}'", batch.len(), self.client.index());

        let response = self
            .client
            .es()
            .bulk(BulkParts::Index(self.client.index()))
            .body(bulk_body(&batch)?)
            .send()
            .await
            .context("Bulk request failed")?;
        if !response.status_code().is_success() {
            anyhow::bail!("Bulk request returned {}", response.status_code());
        }
        let body = response.json::<serde_json::Value>().await?;

        let rejected = rejected_records(&body);
        for record in &rejected {
            warn!("Record {} rejected: {}", record.id, record.reason);
        }
        self.summary.indexed += batch.len() - rejected.len();
        self.summary.rejected.extend(rejected);
        Ok(())
    }
}

/// Action line + document line per record.
fn bulk_body(batch: &[CatalogRecord]) -> Result<Vec<JsonBody<serde_json::Value>>> {
    let mut body: Vec<JsonBody<serde_json::Value>> = Vec::with_capacity(batch.len() * 2);
    for record in batch {
        body.push(serde_json::json!({ "index": { "_id": record.id.to_string() } }).into());
        body.push(serde_json::to_value(record)?.into());
    }
    Ok(body)
}

/// Items of a `_bulk` response that carry an error.
fn rejected_records(body: &serde_json::Value) -> Vec<RejectedRecord> {
    if !body["errors"].as_bool().unwrap_or(false) {
        return Vec::new();
    }
    body["items"]
        .as_array()
        .map(|items| {
            items
                .iter()
                .map(|item| &item["index"])
                .filter(|result| result["error"].is_object())
                .map(|result| RejectedRecord {
                    id: result["_id"].as_str().unwrap_or("?").to_string(),
                    reason: result["error"]["reason"]
                        .as_str()
                        .unwrap_or("unknown error")
                        .to_string(),
                })
                .collect()
        })
        .unwrap_or_default()
}
