//! Proximity lookup over a 3x3 block of geohash cells.
//!
//! A coordinate is encoded, truncated to [`LOOKUP_PRECISION`] and expanded to
//! its eight neighbors plus itself. Each of the nine cells is sent to the
//! catalog as a substring pattern and the answers are concatenated in cell
//! order. Records matched by more than one cell are kept once per match.

use futures::future::try_join_all;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

use crate::catalog::CatalogGateway;
use crate::error::{NearbyError, Result};
use crate::geohash::{self, SpatialKey, DEFAULT_PRECISION, LOOKUP_PRECISION};
use crate::models::{CatalogRecord, Coordinate};

/// Number of cells queried per lookup.
pub const CELL_COUNT: usize = 9;

pub struct ProximityLookup {
    gateway: Arc<dyn CatalogGateway>,
}

impl ProximityLookup {
    pub fn new(gateway: Arc<dyn CatalogGateway>) -> Self {
        Self { gateway }
    }

    /// The cells covering the neighborhood of `key`: the eight neighbors in
    /// canonical order, then `key` itself.
    pub fn cells(key: &SpatialKey) -> [SpatialKey; CELL_COUNT] {
        let [n, ne, e, se, s, sw, w, nw] = key.neighbors();
        [n, ne, e, se, s, sw, w, nw, key.clone()]
    }

    /// Records catalogued near `coordinate`.
    pub async fn query(&self, coordinate: Coordinate) -> Result<Vec<CatalogRecord>> {
        let key = geohash::encode(coordinate, DEFAULT_PRECISION)?;
        debug!("Lookup at {} encoded as {}", coordinate, key);
        self.query_key(&key).await
    }

    /// Records near the cell of `key`, which must be at least
    /// [`LOOKUP_PRECISION`] symbols long.
    pub async fn query_key(&self, key: &SpatialKey) -> Result<Vec<CatalogRecord>> {
        let start = Instant::now();
        let key = key.truncate(LOOKUP_PRECISION)?;
        let cells = Self::cells(&key);

        // Completion order is irrelevant: try_join_all yields results in
        // cell order and fails as soon as any cell fails.
        let per_cell = try_join_all(cells.iter().map(|cell| self.query_cell(cell))).await?;

        let mut records = Vec::with_capacity(per_cell.iter().map(Vec::len).sum());
        for (cell, hits) in cells.iter().zip(per_cell) {
            debug!("Cell {} matched {} records", cell, hits.len());
            records.extend(hits);
        }

        debug!(
            "Lookup around {} returned {} records in {}ms",
            key,
            records.len(),
            start.elapsed().as_millis()
        );
        Ok(records)
    }

    async fn query_cell(&self, cell: &SpatialKey) -> Result<Vec<CatalogRecord>> {
        self.gateway
            .find_by_spatial_key_pattern(cell.as_str())
            .await
            .map_err(|e| match e {
                NearbyError::CatalogUnavailable(_) => e,
                other => NearbyError::CatalogUnavailable(other.to_string()),
            })
    }
}
