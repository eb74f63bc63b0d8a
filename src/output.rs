//! Output tables
//!
//! Each pipeline stage hands its result to an [`OutputSink`] as a named table
//! of flat rows. [`CsvSink`] writes `<root>/csv/<name>.csv`; [`MemorySink`]
//! keeps the rows as JSON values, for tests and library callers.

use crate::error::TripScoutError;
use crate::models::{ForecastPoint, Location, LocationSummary, LodgingCandidate, RankedLodging, Rating};
use crate::scoring::MapPoint;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// A serializable row with a fixed column layout
pub trait Table: Serialize {
    /// Header row, in field order
    const COLUMNS: &'static [&'static str];
}

/// Destination for named tables
pub trait OutputSink {
    fn write_table<R: Table>(&mut self, name: &str, rows: &[R]) -> crate::Result<()>;
}

/// Writes every table as a CSV file with a header row
#[derive(Debug, Clone)]
pub struct CsvSink {
    directory: PathBuf,
}

impl CsvSink {
    /// Sink writing under `<root>/csv`, created if missing
    pub fn new(root: impl AsRef<Path>) -> crate::Result<Self> {
        let directory = root.as_ref().join("csv");
        fs::create_dir_all(&directory)?;
        Ok(Self { directory })
    }

    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    #[must_use]
    pub fn table_path(&self, name: &str) -> PathBuf {
        self.directory.join(format!("{name}.csv"))
    }
}

impl OutputSink for CsvSink {
    fn write_table<R: Table>(&mut self, name: &str, rows: &[R]) -> crate::Result<()> {
        let path = self.table_path(name);
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(&path)
            .map_err(|e| TripScoutError::output(name, e))?;

        writer
            .write_record(R::COLUMNS)
            .map_err(|e| TripScoutError::output(name, e))?;
        for row in rows {
            writer
                .serialize(row)
                .map_err(|e| TripScoutError::output(name, e))?;
        }
        writer
            .flush()
            .map_err(|e| TripScoutError::output(name, e.into()))?;

        info!("Wrote {} rows to {}", rows.len(), path.display());
        Ok(())
    }
}

/// Keeps tables in memory as JSON rows
#[derive(Debug, Default)]
pub struct MemorySink {
    tables: BTreeMap<String, Vec<serde_json::Value>>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn table(&self, name: &str) -> Option<&[serde_json::Value]> {
        self.tables.get(name).map(Vec::as_slice)
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }
}

impl OutputSink for MemorySink {
    fn write_table<R: Table>(&mut self, name: &str, rows: &[R]) -> crate::Result<()> {
        let values = rows
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| TripScoutError::general(format!("Failed to encode table '{name}': {e}")))?;
        debug!("Stored {} rows in table {}", values.len(), name);
        self.tables.insert(name.to_string(), values);
        Ok(())
    }
}

/// `cities_geoloc`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CityRow {
    pub city: String,
    pub lat: f64,
    pub lon: f64,
}

impl From<&Location> for CityRow {
    fn from(location: &Location) -> Self {
        Self {
            city: location.name.clone(),
            lat: location.latitude,
            lon: location.longitude,
        }
    }
}

impl Table for CityRow {
    const COLUMNS: &'static [&'static str] = &["city", "lat", "lon"];
}

/// `weather_raw`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherRow {
    pub city: String,
    pub lat: f64,
    pub lon: f64,
    pub date: NaiveDate,
    pub temp: f64,
    pub clouds: f64,
    pub wind: f64,
    pub rain: f64,
}

impl From<&ForecastPoint> for WeatherRow {
    fn from(point: &ForecastPoint) -> Self {
        Self {
            city: point.location.name.clone(),
            lat: point.location.latitude,
            lon: point.location.longitude,
            date: point.date,
            temp: point.temperature,
            clouds: point.cloud_cover_pct,
            wind: point.wind_speed,
            rain: point.precipitation_mm,
        }
    }
}

impl Table for WeatherRow {
    const COLUMNS: &'static [&'static str] =
        &["city", "lat", "lon", "date", "temp", "clouds", "wind", "rain"];
}

/// `top_cities`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    pub city: String,
    pub lat: f64,
    pub lon: f64,
    pub temp_mean: f64,
    pub clouds_mean: f64,
    pub wind_mean: f64,
    pub rain_sum: f64,
    pub weather_score: f64,
}

impl From<&LocationSummary> for SummaryRow {
    fn from(summary: &LocationSummary) -> Self {
        Self {
            city: summary.location.name.clone(),
            lat: summary.location.latitude,
            lon: summary.location.longitude,
            temp_mean: summary.temp_mean,
            clouds_mean: summary.clouds_mean,
            wind_mean: summary.wind_mean,
            rain_sum: summary.rain_sum,
            weather_score: summary.score(),
        }
    }
}

impl Table for SummaryRow {
    const COLUMNS: &'static [&'static str] = &[
        "city",
        "lat",
        "lon",
        "temp_mean",
        "clouds_mean",
        "wind_mean",
        "rain_sum",
        "weather_score",
    ];
}

/// `hotels`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListingRow {
    pub city: String,
    pub hotel: String,
    pub rating: Rating,
}

impl From<&LodgingCandidate> for ListingRow {
    fn from(candidate: &LodgingCandidate) -> Self {
        Self {
            city: candidate.location_name.clone(),
            hotel: candidate.label.clone(),
            rating: candidate.rating.clone(),
        }
    }
}

impl Table for ListingRow {
    const COLUMNS: &'static [&'static str] = &["city", "hotel", "rating"];
}

/// `hotels_with_coords`; coordinates are empty when geocoding failed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocatedListingRow {
    pub city: String,
    pub hotel: String,
    pub rating: Rating,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

impl From<&LodgingCandidate> for LocatedListingRow {
    fn from(candidate: &LodgingCandidate) -> Self {
        Self {
            city: candidate.location_name.clone(),
            hotel: candidate.label.clone(),
            rating: candidate.rating.clone(),
            lat: candidate.latitude(),
            lon: candidate.longitude(),
        }
    }
}

impl Table for LocatedListingRow {
    const COLUMNS: &'static [&'static str] = &["city", "hotel", "rating", "lat", "lon"];
}

/// `hotels_ranked`
impl Table for RankedLodging {
    const COLUMNS: &'static [&'static str] = &[
        "city",
        "hotel",
        "rating",
        "lat",
        "lon",
        "weather_score",
        "temp_mean",
        "rain_sum",
    ];
}

/// `map_weather`, `map_hotels`
impl Table for MapPoint {
    const COLUMNS: &'static [&'static str] = &["name", "lat", "lon", "score", "size"];
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn candidate() -> LodgingCandidate {
        LodgingCandidate::new("Nice", "Hotel Negresco", Rating::Score(8.7))
    }

    #[test]
    fn test_csv_sink_writes_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = CsvSink::new(dir.path()).unwrap();

        let rows = vec![
            CityRow::from(&Location::new("Paris", 48.8566, 2.3522)),
            CityRow::from(&Location::new("Nice", 43.7, 7.27)),
        ];
        sink.write_table("cities_geoloc", &rows).unwrap();

        let path = dir.path().join("csv").join("cities_geoloc.csv");
        assert_eq!(sink.table_path("cities_geoloc"), path);
        assert!(sink.directory().is_dir());
        let written = fs::read_to_string(path).unwrap();
        assert_eq!(written, "city,lat,lon\nParis,48.8566,2.3522\nNice,43.7,7.27\n");
    }

    #[test]
    fn test_csv_sink_writes_header_for_empty_table() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = CsvSink::new(dir.path()).unwrap();
        sink.write_table::<SummaryRow>("top_cities", &[]).unwrap();

        let written = fs::read_to_string(dir.path().join("csv/top_cities.csv")).unwrap();
        assert_eq!(
            written,
            "city,lat,lon,temp_mean,clouds_mean,wind_mean,rain_sum,weather_score\n"
        );
    }

    #[test]
    fn test_csv_unlocated_listing_has_empty_coordinates() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = CsvSink::new(dir.path()).unwrap();

        let unrated = LodgingCandidate::new("Nice", "Hotel Ibis", Rating::Unknown);
        let rows = vec![
            LocatedListingRow::from(&candidate().located(Some((43.69, 7.26)))),
            LocatedListingRow::from(&unrated),
        ];
        sink.write_table("hotels_with_coords", &rows).unwrap();

        let written = fs::read_to_string(sink.table_path("hotels_with_coords")).unwrap();
        let lines: Vec<&str> = written.lines().collect();
        assert_eq!(lines[0], "city,hotel,rating,lat,lon");
        assert_eq!(lines[1], "Nice,Hotel Negresco,8.7,43.69,7.26");
        assert_eq!(lines[2], "Nice,Hotel Ibis,?,,");
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_csv_flush_failure_names_the_table() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = CsvSink::new(dir.path()).unwrap();
        // rows stay buffered until flush, which then hits ENOSPC
        std::os::unix::fs::symlink("/dev/full", sink.table_path("hotels")).unwrap();

        let rows = vec![ListingRow::from(&candidate())];
        let err = sink.write_table("hotels", &rows).unwrap_err();

        assert!(matches!(&err, TripScoutError::Output { table, .. } if table == "hotels"));
        assert!(err.user_message().contains("'hotels'"));
    }

    #[test]
    fn test_memory_sink_keeps_json_rows() {
        let mut sink = MemorySink::new();
        sink.write_table("hotels", &[ListingRow::from(&candidate())]).unwrap();
        sink.write_table::<ListingRow>("empty", &[]).unwrap();

        assert_eq!(
            sink.table("hotels").unwrap(),
            &[json!({"city": "Nice", "hotel": "Hotel Negresco", "rating": 8.7})]
        );
        assert_eq!(sink.table("empty").unwrap().len(), 0);
        assert!(sink.table("missing").is_none());
        assert_eq!(sink.table_names().collect::<Vec<_>>(), vec!["empty", "hotels"]);
    }

    #[test]
    fn test_columns_match_serialized_fields() {
        let point = ForecastPoint {
            location: Location::new("Lille", 50.63, 3.06),
            date: NaiveDate::from_ymd_opt(2024, 6, 17).unwrap(),
            temperature: 14.0,
            cloud_cover_pct: 90.0,
            wind_speed: 7.0,
            precipitation_mm: 3.0,
        };
        let value = serde_json::to_value(WeatherRow::from(&point)).unwrap();
        let mut keys: Vec<&str> = value.as_object().unwrap().keys().map(String::as_str).collect();
        let mut expected = WeatherRow::COLUMNS.to_vec();
        expected.sort_unstable();
        keys.sort_unstable();
        assert_eq!(keys, expected);
        assert_eq!(value["date"], json!("2024-06-17"));
    }
}
