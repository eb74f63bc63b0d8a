//! Lodging candidate models

use serde::{Serialize, Serializer};
use std::fmt;

/// Rating scraped for a lodging listing
#[derive(Debug, Clone, PartialEq)]
pub enum Rating {
    /// Numeric score, e.g. "8,5" or "9.1"
    Score(f64),
    /// Non-numeric rating text, kept verbatim
    Text(String),
    /// No rating entry at this listing's index
    Unknown,
}

impl Rating {
    /// Interpret scraped rating text; decimal commas are accepted
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let text = raw.trim();
        if text.is_empty() || text == "?" {
            return Rating::Unknown;
        }

        match text.replace(',', ".").parse::<f64>() {
            Ok(value) if value.is_finite() => Rating::Score(value),
            _ => Rating::Text(text.to_string()),
        }
    }

    #[must_use]
    pub fn as_score(&self) -> Option<f64> {
        match self {
            Rating::Score(value) => Some(*value),
            _ => None,
        }
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rating::Score(value) => write!(f, "{value}"),
            Rating::Text(text) => f.write_str(text),
            Rating::Unknown => f.write_str("?"),
        }
    }
}

impl Serialize for Rating {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Rating::Score(value) => serializer.serialize_f64(*value),
            Rating::Text(text) => serializer.serialize_str(text),
            Rating::Unknown => serializer.serialize_str("?"),
        }
    }
}

/// A lodging option discovered at a ranked location
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LodgingCandidate {
    /// Name of the ranked location the listing was found for
    pub location_name: String,
    /// Listing title
    pub label: String,
    pub rating: Rating,
    latitude: Option<f64>,
    longitude: Option<f64>,
}

impl LodgingCandidate {
    /// A freshly discovered, not yet geocoded candidate
    #[must_use]
    pub fn new(location_name: impl Into<String>, label: impl Into<String>, rating: Rating) -> Self {
        Self {
            location_name: location_name.into(),
            label: label.into(),
            rating,
            latitude: None,
            longitude: None,
        }
    }

    /// Fill the coordinates from a geocoding outcome. `None` keeps them null.
    #[must_use]
    pub fn located(mut self, coordinates: Option<(f64, f64)>) -> Self {
        if let Some((latitude, longitude)) = coordinates {
            self.latitude = Some(latitude);
            self.longitude = Some(longitude);
        }
        self
    }

    #[must_use]
    pub fn latitude(&self) -> Option<f64> {
        self.latitude
    }

    #[must_use]
    pub fn longitude(&self) -> Option<f64> {
        self.longitude
    }

    #[must_use]
    pub fn is_located(&self) -> bool {
        self.latitude.is_some() && self.longitude.is_some()
    }
}

/// A lodging candidate joined with its location's weather statistics.
/// Statistics are `None` when the location has no summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedLodging {
    pub city: String,
    pub hotel: String,
    pub rating: Rating,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub weather_score: Option<f64>,
    pub temp_mean: Option<f64>,
    pub rain_sum: Option<f64>,
}
