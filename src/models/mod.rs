//! Data models for the TripScout pipeline
//!
//! This module contains the records each stage produces:
//! - Location: a named place with resolved coordinates
//! - Forecast: one forecast interval for a location
//! - Summary: aggregated weather statistics and the ranking score
//! - Lodging: discovered lodging candidates and their merged view

pub mod forecast;
pub mod location;
pub mod lodging;
pub mod summary;

// Re-export all public types for convenient access
pub use forecast::ForecastPoint;
pub use location::Location;
pub use lodging::{LodgingCandidate, RankedLodging, Rating};
pub use summary::LocationSummary;
