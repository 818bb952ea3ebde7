//! Catalog index mapping.
//!
//! Pattern queries are `wildcard` queries on `geohash`, which only behave as
//! plain substring matches when the field is an unanalyzed `keyword`. Both the
//! ingest pipeline and the gateway therefore refuse an index mapped any other
//! way.

use anyhow::{Context, Result};
use elasticsearch::indices::{
    IndicesCreateParts, IndicesDeleteParts, IndicesExistsParts, IndicesGetMappingParts,
};
use tracing::info;

use super::EsClient;

const CATALOG_MAPPING: &str = include_str!("../../schema/catalog_mapping.json");

/// Create the catalog index if it is missing (or always, with `recreate`),
/// then check the mapping it ends up with.
pub async fn ensure_index(client: &EsClient, recreate: bool) -> Result<()> {
    let index = client.index();
    let exists = client
        .es()
        .indices()
        .exists(IndicesExistsParts::Index(&[index]))
        .send()
        .await?
        .status_code()
        .is_success();

    if exists && recreate {
        info!("Dropping index '{}'", index);
        client
            .es()
            .indices()
            .delete(IndicesDeleteParts::Index(&[index]))
            .send()
            .await
            .context("Failed to delete existing index")?;
    }

    if !exists || recreate {
        let mapping: serde_json::Value =
            serde_json::from_str(CATALOG_MAPPING).context("Failed to parse catalog_mapping.json")?;
        info!("Creating index '{}'", index);
        let response = client
            .es()
            .indices()
            .create(IndicesCreateParts::Index(index))
            .body(mapping)
            .send()
            .await
            .context("Failed to create index")?;
        if !response.status_code().is_success() {
            anyhow::bail!("Failed to create index '{}': {}", index, response.text().await?);
        }
    }

    verify_index(client).await
}

/// Fail unless the index exists and maps `geohash` as a keyword.
pub async fn verify_index(client: &EsClient) -> Result<()> {
    let response = client
        .es()
        .indices()
        .get_mapping(IndicesGetMappingParts::Index(&[client.index()]))
        .send()
        .await?;
    if !response.status_code().is_success() {
        anyhow::bail!(
            "Catalog index '{}' is not available ({})",
            client.index(),
            response.status_code()
        );
    }
    let body = response.json::<serde_json::Value>().await?;
    check_mapping(client.index(), &body)
}

fn check_mapping(index: &str, body: &serde_json::Value) -> Result<()> {
    // Keyed by the concrete index name, which differs from `index` behind an alias.
    let mappings = body
        .get(index)
        .or_else(|| body.as_object().and_then(|o| o.values().next()))
        .map(|entry| &entry["mappings"])
        .with_context(|| format!("No mapping returned for '{}'", index))?;

    match mappings["properties"]["geohash"]["type"].as_str() {
        Some("keyword") => Ok(()),
        Some(other) => anyhow::bail!(
            "Index '{}' maps geohash as {}, substring queries need keyword",
            index,
            other
        ),
        None => anyhow::bail!("Index '{}' has no geohash field", index),
    }
}
