//! Address-to-coordinate resolution.

mod onemap;

use async_trait::async_trait;
use regex::Regex;
use std::sync::LazyLock;

use crate::error::Result;

pub use onemap::OneMapGeocoder;

static POSTAL_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{6}$").expect("postal code regex is valid"));

/// One resolved address.
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodeCandidate {
    pub label: String,
    pub latitude: f64,
    pub longitude: f64,
    pub formatted_address: String,
}

/// Resolves free text into candidate coordinates, best match first.
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// An empty list is a successful "no match"; transport or decoding
    /// problems are [`crate::NearbyError::GeocodingFailure`].
    async fn search(&self, text: &str) -> Result<Vec<GeocodeCandidate>>;
}

/// Rewrite a bare six-digit postal code as `"{prefix} {code}"`; any other
/// text is only trimmed.
pub fn normalize_address_query(text: &str, postal_code_prefix: &str) -> String {
    let text = text.trim();
    if POSTAL_CODE.is_match(text) && !postal_code_prefix.is_empty() {
        format!("{} {}", postal_code_prefix, text)
    } else {
        text.to_string()
    }
}
