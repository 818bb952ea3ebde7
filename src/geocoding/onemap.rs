//! OneMap (Singapore) search API client.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use super::{GeocodeCandidate, Geocoder};
use crate::error::{NearbyError, Result};

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
struct SearchResult {
    #[serde(rename = "SEARCHVAL")]
    search_val: String,
    latitude: String,
    longitude: String,
    #[serde(default)]
    address: String,
}

impl SearchResult {
    fn into_candidate(self) -> Option<GeocodeCandidate> {
        let latitude = self.latitude.trim().parse::<f64>().ok()?;
        let longitude = self.longitude.trim().parse::<f64>().ok()?;
        Some(GeocodeCandidate {
            label: self.search_val,
            latitude,
            longitude,
            formatted_address: self.address,
        })
    }
}

pub struct OneMapGeocoder {
    client: Client,
    base_url: Url,
}

impl OneMapGeocoder {
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("nearby/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: Url::parse(base_url)?,
        })
    }

    fn search_url(&self, text: &str) -> Url {
        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .append_pair("searchVal", text)
            .append_pair("returnGeom", "Y")
            .append_pair("getAddrDetails", "Y")
            .append_pair("pageNum", "1");
        url
    }
}

/// Candidates in OneMap order. Only the first result is ever used, so an
/// unparseable first result is a failure; later ones are skipped.
fn parse_candidates(response: SearchResponse) -> Result<Vec<GeocodeCandidate>> {
    let mut candidates = Vec::with_capacity(response.results.len());
    for (i, result) in response.results.into_iter().enumerate() {
        let label = result.search_val.clone();
        match result.into_candidate() {
            Some(candidate) => candidates.push(candidate),
            None if i == 0 => {
                return Err(NearbyError::GeocodingFailure(format!(
                    "best OneMap match {:?} has unparseable coordinates",
                    label
                )))
            }
            None => warn!("Skipping OneMap result {:?} with unparseable coordinates", label),
        }
    }
    Ok(candidates)
}

#[async_trait]
impl Geocoder for OneMapGeocoder {
    async fn search(&self, text: &str) -> Result<Vec<GeocodeCandidate>> {
        let response = self
            .client
            .get(self.search_url(text))
            .send()
            .await
            .map_err(|e| NearbyError::GeocodingFailure(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            warn!("OneMap search for {:?} failed with status {}", text, status);
            return Err(NearbyError::GeocodingFailure(format!(
                "OneMap returned {}",
                status
            )));
        }

        let data: SearchResponse = response
            .json()
            .await
            .map_err(|e| NearbyError::GeocodingFailure(format!("bad OneMap response: {}", e)))?;

        let candidates = parse_candidates(data)?;
        debug!("OneMap resolved {:?} to {} candidates", text, candidates.len());
        Ok(candidates)
    }
}
