//! Location model for geographic coordinates

use serde::{Deserialize, Serialize};

/// A named place with resolved coordinates
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Location {
    /// Name as given in the run configuration (city) or listing (lodging)
    pub name: String,
    /// Latitude in decimal degrees
    pub latitude: f64,
    /// Longitude in decimal degrees
    pub longitude: f64,
}

impl Location {
    /// Create a new location
    #[must_use]
    pub fn new(name: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            name: name.into(),
            latitude,
            longitude,
        }
    }

    /// Whether both coordinates are finite and inside the WGS84 ranges
    #[must_use]
    pub fn has_valid_coordinates(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }

    /// Format location as coordinates string
    #[must_use]
    pub fn format_coordinates(&self) -> String {
        format!("{:.4}, {:.4}", self.latitude, self.longitude)
    }

    /// Grouping key: name plus the exact coordinate bits
    #[must_use]
    pub fn key(&self) -> (&str, u64, u64) {
        (
            self.name.as_str(),
            self.latitude.to_bits(),
            self.longitude.to_bits(),
        )
    }
}
