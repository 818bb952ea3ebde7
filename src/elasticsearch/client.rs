//! Connection to the catalog index.

use anyhow::{Context, Result};
use elasticsearch::cluster::ClusterHealthParts;
use elasticsearch::http::transport::{SingleNodeConnectionPool, TransportBuilder};
use elasticsearch::indices::IndicesRefreshParts;
use elasticsearch::{CountParts, Elasticsearch};
use tracing::{info, warn};
use url::Url;

/// Elasticsearch handle scoped to one catalog index.
#[derive(Clone)]
pub struct EsClient {
    es: Elasticsearch,
    index: String,
}

impl EsClient {
    /// Build a client for `index` and refuse to continue if the cluster
    /// reports `red`.
    pub async fn connect(es_url: &str, index: &str) -> Result<Self> {
        let url =
            Url::parse(es_url).with_context(|| format!("Invalid Elasticsearch URL {}", es_url))?;
        let transport = TransportBuilder::new(SingleNodeConnectionPool::new(url))
            .disable_proxy()
            .build()?;
        let client = Self {
            es: Elasticsearch::new(transport),
            index: index.to_string(),
        };

        let health = client
            .es
            .cluster()
            .health(ClusterHealthParts::None)
            .send()
            .await
            .with_context(|| format!("Elasticsearch at {} is unreachable", es_url))?
            .json::<serde_json::Value>()
            .await?;
        check_health(&health)?;

        info!("Connected to Elasticsearch at {} (index '{}')", es_url, index);
        Ok(client)
    }

    pub(crate) fn es(&self) -> &Elasticsearch {
        &self.es
    }

    pub fn index(&self) -> &str {
        &self.index
    }

    /// Number of records currently searchable in the index.
    pub async fn record_count(&self) -> Result<u64> {
        let body = self
            .es
            .count(CountParts::Index(&[&self.index]))
            .send()
            .await?
            .json::<serde_json::Value>()
            .await?;
        body["count"]
            .as_u64()
            .with_context(|| format!("Count on '{}' returned no count: {}", self.index, body))
    }

    /// Make freshly indexed records visible to pattern queries.
    pub async fn refresh(&self) -> Result<()> {
        let response = self
            .es
            .indices()
            .refresh(IndicesRefreshParts::Index(&[&self.index]))
            .send()
            .await?;
        if !response.status_code().is_success() {
            anyhow::bail!("Refreshing '{}' returned {}", self.index, response.status_code());
        }
        Ok(())
    }
}

/// Accept `green` and `yellow` (single-node clusters never get replicas).
fn check_health(health: &serde_json::Value) -> Result<()> {
    match health["status"].as_str() {
        Some("green") => Ok(()),
        Some("yellow") => {
            warn!("Elasticsearch cluster status is yellow");
            Ok(())
        }
        Some(status) => anyhow::bail!("Elasticsearch cluster status is {}", status),
        None => anyhow::bail!("Unexpected cluster health response: {}", health),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_check_health() {
        assert!(check_health(&json!({ "cluster_name": "c", "status": "green" })).is_ok());
        assert!(check_health(&json!({ "status": "yellow" })).is_ok());
        assert!(check_health(&json!({ "status": "red" })).is_err());
        assert!(check_health(&json!({ "error": "security_exception" })).is_err());
    }
}
