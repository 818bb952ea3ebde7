//! Nearby - geohash proximity lookups for a "what is near me?" chat bot
//!
//! This library provides the lookup engine and the shared collaborators used
//! by the server, bot and ingest binaries.

pub mod catalog;
pub mod config;
pub mod elasticsearch;
pub mod error;
pub mod format;
pub mod geocoding;
pub mod geohash;
pub mod lookup;
pub mod models;
pub mod service;
pub mod telegram;

pub use catalog::CatalogGateway;
pub use error::{NearbyError, Result};
pub use format::{MessageFormatter, RenderedMessage};
pub use geohash::SpatialKey;
pub use lookup::ProximityLookup;
pub use models::{CatalogRecord, Coordinate};
pub use service::{AddressLookup, LookupOutcome, NearbyService};
