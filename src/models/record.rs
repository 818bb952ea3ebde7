//! Catalog record structure shared by the CSV loader, the Elasticsearch
//! document and the lookup engine.

use serde::{Deserialize, Serialize};

use super::Coordinate;
use crate::error::Result;
use crate::geohash::{self, SpatialKey};

/// One point of interest in the catalog.
///
/// Records are read-only reference data from the engine's point of view. The
/// stored `geohash` is computed once at ingestion and never recomputed by a
/// lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogRecord {
    /// Unique, stable identifier
    pub id: i64,

    /// Category label shown as the entry title (e.g. a dish or cuisine).
    /// Older catalog exports name this column `food`.
    #[serde(alias = "food")]
    pub category: String,

    #[serde(default)]
    pub image: String,

    /// External link (review, post, menu)
    pub link: String,

    /// Raw address as catalogued
    #[serde(default)]
    pub address: String,

    #[serde(default)]
    pub postal_code: String,

    #[serde(default)]
    pub google_maps_link: String,

    /// Stored latitude, kept as text
    pub latitude: String,

    /// Stored longitude, kept as text
    pub longitude: String,

    /// Normalized address used when rendering results
    #[serde(default)]
    pub formatted_address: String,

    /// Spatial key computed at ingestion time
    #[serde(default)]
    pub geohash: String,
}

impl CatalogRecord {
    /// Parse the stored latitude/longitude text into a validated coordinate.
    pub fn coordinate(&self) -> Result<Coordinate> {
        let lat = parse_degrees(&self.latitude, "latitude")?;
        let lon = parse_degrees(&self.longitude, "longitude")?;
        Coordinate::new(lat, lon)
    }

    /// Fill in the stored spatial key if the source row did not carry one.
    ///
    /// Returns `true` when a key was computed.
    pub fn ensure_geohash(&mut self, precision: usize) -> Result<bool> {
        if !self.geohash.trim().is_empty() {
            return Ok(false);
        }
        let key: SpatialKey = geohash::encode(self.coordinate()?, precision)?;
        self.geohash = key.into_string();
        Ok(true)
    }
}

fn parse_degrees(value: &str, field: &str) -> Result<f64> {
    value.trim().parse::<f64>().map_err(|_| {
        crate::error::NearbyError::InvalidArgument(format!("{} {:?} is not a number", field, value))
    })
}

#[cfg(test)]
pub(crate) fn test_record(id: i64, geohash: &str) -> CatalogRecord {
    CatalogRecord {
        id,
        category: format!("Place {}", id),
        image: String::new(),
        link: format!("https://example.com/{}", id),
        address: String::new(),
        postal_code: String::new(),
        google_maps_link: String::new(),
        latitude: "1.3".to_string(),
        longitude: "103.8".to_string(),
        formatted_address: format!("{} Example Road", id),
        geohash: geohash.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NearbyError;

    #[test]
    fn test_ensure_geohash_computes_missing_key() {
        let mut record = test_record(1, "");
        assert!(record.ensure_geohash(9).unwrap());
        assert_eq!(record.geohash.len(), 9);
        assert!(record.geohash.starts_with("w21z"));
    }

    #[test]
    fn test_ensure_geohash_keeps_stored_key() {
        let mut record = test_record(1, "w21z7x");
        assert!(!record.ensure_geohash(9).unwrap());
        assert_eq!(record.geohash, "w21z7x");
    }

    #[test]
    fn test_bad_coordinate_text() {
        let mut record = test_record(1, "");
        record.latitude = "north".to_string();
        assert!(matches!(
            record.ensure_geohash(9),
            Err(NearbyError::InvalidArgument(_))
        ));
    }
}
