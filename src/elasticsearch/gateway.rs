//! Catalog gateway answering pattern queries with an Elasticsearch
//! `wildcard` query on the `geohash` keyword field.
//!
//! Results are read in pages sorted by `id` and resumed with `search_after`,
//! so a cell with more matches than one page holds is still returned whole.

use async_trait::async_trait;
use serde_json::json;
use std::future::Future;
use tracing::{debug, warn};

use super::EsClient;
use crate::catalog::CatalogGateway;
use crate::error::{NearbyError, Result};
use crate::models::CatalogRecord;

pub struct EsCatalogGateway {
    client: EsClient,
    page_size: usize,
}

impl EsCatalogGateway {
    pub fn new(client: EsClient, page_size: usize) -> Self {
        Self {
            client,
            page_size: page_size.max(1),
        }
    }

    async fn search_page(&self, pattern: &str, after: Option<i64>) -> Result<Vec<CatalogRecord>> {
        let response = self
            .client
            .es()
            .search(elasticsearch::SearchParts::Index(&[self.client.index()]))
            .body(pattern_query(pattern, self.page_size, after))
            .send()
            .await
            .map_err(|e| NearbyError::CatalogUnavailable(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!("Catalog search for {:?} failed: {} {}", pattern, status, error_text);
            return Err(NearbyError::CatalogUnavailable(format!(
                "search returned {}",
                status
            )));
        }

        let body = response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| NearbyError::CatalogUnavailable(e.to_string()))?;
        parse_hits(&body)
    }
}

/// Query body matching `pattern` anywhere in the stored key, in id order,
/// starting after record `after`.
fn pattern_query(pattern: &str, page_size: usize, after: Option<i64>) -> serde_json::Value {
    let mut body = json!({
        "query": {
            "wildcard": {
                "geohash": {
                    "value": format!("*{}*", escape_wildcard(pattern))
                }
            }
        },
        "sort": [{ "id": "asc" }],
        "size": page_size
    });
    if let Some(id) = after {
        body["search_after"] = json!([id]);
    }
    body
}

/// Escape wildcard metacharacters so the pattern is matched literally.
fn escape_wildcard(pattern: &str) -> String {
    let mut escaped = String::with_capacity(pattern.len());
    for c in pattern.chars() {
        if matches!(c, '*' | '?' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn parse_hits(body: &serde_json::Value) -> Result<Vec<CatalogRecord>> {
    let hits = body["hits"]["hits"].as_array().ok_or_else(|| {
        NearbyError::CatalogUnavailable("search response has no hits array".to_string())
    })?;

    hits.iter()
        .map(|hit| {
            serde_json::from_value::<CatalogRecord>(hit["_source"].clone()).map_err(|e| {
                NearbyError::CatalogUnavailable(format!("malformed catalog document: {}", e))
            })
        })
        .collect()
}

/// Fetch pages until one comes back short. `fetch` receives the id of the
/// last record seen.
async fn collect_pages<F, Fut>(page_size: usize, mut fetch: F) -> Result<Vec<CatalogRecord>>
where
    F: FnMut(Option<i64>) -> Fut,
    Fut: Future<Output = Result<Vec<CatalogRecord>>>,
{
    let mut records = Vec::new();
    let mut after = None;
    loop {
        let page = fetch(after).await?;
        let full = page.len() >= page_size;
        after = page.last().map(|r| r.id);
        records.extend(page);
        if !full {
            return Ok(records);
        }
    }
}

#[async_trait]
impl CatalogGateway for EsCatalogGateway {
    async fn find_by_spatial_key_pattern(&self, pattern: &str) -> Result<Vec<CatalogRecord>> {
        let records = collect_pages(self.page_size, |after| self.search_page(pattern, after)).await?;
        debug!("Pattern {:?} matched {} records", pattern, records.len());
        Ok(records)
    }
}
