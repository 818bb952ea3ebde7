//! Entry points used by the HTTP and chat shells.

use std::sync::Arc;
use tracing::{debug, info};

use crate::catalog::CatalogGateway;
use crate::error::Result;
use crate::format::{MessageFormatter, RenderedMessage};
use crate::geocoding::{normalize_address_query, GeocodeCandidate, Geocoder};
use crate::lookup::ProximityLookup;
use crate::models::Coordinate;

/// Result of a lookup that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupOutcome {
    /// Nearby records, ready to send chunk by chunk
    Found(RenderedMessage),
    /// The neighborhood holds no catalogued records
    NoResults,
    /// The geocoder answered but had no candidate for the address text
    NoAddressMatch,
}

/// Outcome of an address lookup together with the candidate it used.
#[derive(Debug, Clone, PartialEq)]
pub struct AddressLookup {
    pub outcome: LookupOutcome,
    /// First geocoder candidate; `None` only for [`LookupOutcome::NoAddressMatch`]
    pub resolved: Option<GeocodeCandidate>,
}

pub struct NearbyService {
    lookup: ProximityLookup,
    geocoder: Arc<dyn Geocoder>,
    formatter: MessageFormatter,
    postal_code_prefix: String,
}

impl NearbyService {
    pub fn new(
        gateway: Arc<dyn CatalogGateway>,
        geocoder: Arc<dyn Geocoder>,
        formatter: MessageFormatter,
    ) -> Self {
        Self {
            lookup: ProximityLookup::new(gateway),
            geocoder,
            formatter,
            postal_code_prefix: "Singapore".to_string(),
        }
    }

    /// Prefix used to expand bare postal codes, see
    /// [`normalize_address_query`].
    pub fn with_postal_code_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.postal_code_prefix = prefix.into();
        self
    }

    pub async fn lookup_by_coordinate(&self, coordinate: Coordinate) -> Result<LookupOutcome> {
        let records = self.lookup.query(coordinate).await?;
        info!("Found {} records near {}", records.len(), coordinate);

        Ok(match self.formatter.to_message(&records) {
            Some(message) => LookupOutcome::Found(message),
            None => LookupOutcome::NoResults,
        })
    }

    pub async fn lookup_by_address_text(&self, text: &str) -> Result<AddressLookup> {
        let query = normalize_address_query(text, &self.postal_code_prefix);
        let candidates = self.geocoder.search(&query).await?;

        let Some(first) = candidates.into_iter().next() else {
            debug!("No geocoding candidates for {:?}", query);
            return Ok(AddressLookup {
                outcome: LookupOutcome::NoAddressMatch,
                resolved: None,
            });
        };

        info!(
            "Resolved {:?} to {} ({}, {})",
            query, first.formatted_address, first.latitude, first.longitude
        );
        let coordinate = Coordinate::new(first.latitude, first.longitude)?;
        let outcome = self.lookup_by_coordinate(coordinate).await?;

        Ok(AddressLookup {
            outcome,
            resolved: Some(first),
        })
    }
}
