//! Forecast interval model

use super::Location;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Weather values for one forecast interval of a location
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ForecastPoint {
    /// Location this interval was forecast for
    pub location: Location,
    /// Calendar date (UTC) of the interval start
    pub date: NaiveDate,
    /// Temperature in Celsius
    pub temperature: f64,
    /// Cloud cover percentage (0-100)
    pub cloud_cover_pct: f64,
    /// Wind speed in m/s
    pub wind_speed: f64,
    /// Precipitation over the interval in mm, 0 when the provider omits it
    pub precipitation_mm: f64,
}
