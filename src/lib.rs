//! `TripScout` - weather-ranked city and lodging scouting
//!
//! This library geocodes a list of cities, ranks them by a composite score
//! over their multi-day forecast, then discovers and geocodes lodging in the
//! best-ranked cities, writing every intermediate result as a table.

pub mod config;
pub mod error;
pub mod fetch;
pub mod geocoding;
pub mod html;
pub mod lodging;
pub mod logging;
pub mod models;
pub mod output;
pub mod pipeline;
pub mod scoring;
pub mod weather;

// Re-export core types for public API
pub use config::TripScoutConfig;
pub use error::{FetchError, RecordError, TripScoutError};
pub use fetch::{FetchRequest, Fetcher, HttpFetcher, Throttle};
pub use geocoding::{Geocoder, GeocodingProvider};
pub use lodging::{LodgingDiscoverer, extract_listings};
pub use models::{ForecastPoint, Location, LocationSummary, LodgingCandidate, RankedLodging, Rating};
pub use output::{CsvSink, MemorySink, OutputSink};
pub use pipeline::{Pipeline, PipelineReport};
pub use weather::WeatherCollector;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, TripScoutError>;
