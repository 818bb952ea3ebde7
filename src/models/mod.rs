//! Core data models for the lookup engine.

pub mod coordinate;
pub mod record;

pub use coordinate::Coordinate;
pub use record::CatalogRecord;
