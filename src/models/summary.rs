//! Aggregated weather statistics per location

use super::Location;
use serde::Serialize;

/// Weather statistics of one location and the score derived from them
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct LocationSummary {
    pub location: Location,
    /// Mean temperature in Celsius
    pub temp_mean: f64,
    /// Mean cloud cover percentage
    pub clouds_mean: f64,
    /// Mean wind speed in m/s
    pub wind_mean: f64,
    /// Total precipitation in mm
    pub rain_sum: f64,
}

impl LocationSummary {
    #[must_use]
    pub fn new(
        location: Location,
        temp_mean: f64,
        clouds_mean: f64,
        wind_mean: f64,
        rain_sum: f64,
    ) -> Self {
        Self {
            location,
            temp_mean,
            clouds_mean,
            wind_mean,
            rain_sum,
        }
    }

    /// Composite weather score, higher is better. Always derived from the
    /// current statistics.
    #[must_use]
    pub fn score(&self) -> f64 {
        crate::scoring::score(self.temp_mean, self.clouds_mean, self.wind_mean, self.rain_sum)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.location.name
    }
}
