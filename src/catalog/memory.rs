//! In-memory catalog answering pattern queries with a full scan.

use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;

use super::{load_records, CatalogGateway};
use crate::geohash::DEFAULT_PRECISION;
use crate::models::CatalogRecord;

/// Catalog held in memory, scanned in insertion order.
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    records: Vec<CatalogRecord>,
}

impl MemoryCatalog {
    pub fn new(records: Vec<CatalogRecord>) -> Self {
        Self { records }
    }

    /// Load a catalog file, computing stored keys for rows that lack one.
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::new(load_records(path.as_ref(), DEFAULT_PRECISION)?))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl CatalogGateway for MemoryCatalog {
    async fn find_by_spatial_key_pattern(
        &self,
        pattern: &str,
    ) -> crate::error::Result<Vec<CatalogRecord>> {
        Ok(self
            .records
            .iter()
            .filter(|r| r.geohash.contains(pattern))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::record::test_record;

    #[tokio::test]
    async fn test_matches_substring_anywhere() {
        let catalog = MemoryCatalog::new(vec![
            test_record(1, "w21z6h8v5"),
            test_record(2, "xw21z6hzz"),
            test_record(3, "w21z6j000"),
        ]);

        let hits = catalog.find_by_spatial_key_pattern("w21z6h").await.unwrap();
        let ids: Vec<i64> = hits.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_no_match() {
        let catalog = MemoryCatalog::new(vec![test_record(1, "w21z6h8v5")]);
        let hits = catalog.find_by_spatial_key_pattern("gcpvj0").await.unwrap();
        assert!(hits.is_empty());
    }
}
