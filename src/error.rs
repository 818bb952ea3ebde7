//! Error types for proximity lookups.

use thiserror::Error;

/// Errors surfaced by the lookup engine.
///
/// "No address match" is deliberately absent: an address that resolves to
/// zero candidates is a normal outcome, see [`crate::service::LookupOutcome`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NearbyError {
    /// Malformed coordinate, spatial key or precision.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A catalog cell query failed; the whole lookup is abandoned.
    #[error("Catalog unavailable: {0}")]
    CatalogUnavailable(String),

    /// The address-resolution collaborator errored.
    #[error("Geocoding failure: {0}")]
    GeocodingFailure(String),
}

/// Result type for lookup operations.
pub type Result<T> = std::result::Result<T, NearbyError>;
