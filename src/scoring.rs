//! Weather aggregation and ranking
//!
//! Forecast points are grouped per location, reduced to mean temperature,
//! mean cloud cover, mean wind speed and total precipitation, and scored:
//!
//! `score = temp_mean - 0.2 * clouds_mean - 0.3 * wind_mean - 0.5 * rain_sum`

use crate::models::{ForecastPoint, LocationSummary, RankedLodging};
use serde::Serialize;
use std::collections::HashMap;

const CLOUD_WEIGHT: f64 = 0.2;
const WIND_WEIGHT: f64 = 0.3;
const RAIN_WEIGHT: f64 = 0.5;

/// Smallest marker drawn on a map, so poor scores stay visible
pub const MIN_MARKER_SIZE: f64 = 0.1;

/// Composite weather score, higher is better
#[must_use]
pub fn score(temp_mean: f64, clouds_mean: f64, wind_mean: f64, rain_sum: f64) -> f64 {
    temp_mean - CLOUD_WEIGHT * clouds_mean - WIND_WEIGHT * wind_mean - RAIN_WEIGHT * rain_sum
}

#[derive(Default)]
struct Accumulator {
    count: usize,
    temperature: f64,
    clouds: f64,
    wind: f64,
    rain: f64,
}

/// One summary per distinct location (name and coordinates), in order of
/// first appearance
#[must_use]
pub fn summarize(points: &[ForecastPoint]) -> Vec<LocationSummary> {
    let mut order: Vec<&ForecastPoint> = Vec::new();
    let mut groups: HashMap<(&str, u64, u64), Accumulator> = HashMap::new();

    for point in points {
        let acc = groups.entry(point.location.key()).or_insert_with(|| {
            order.push(point);
            Accumulator::default()
        });
        acc.count += 1;
        acc.temperature += point.temperature;
        acc.clouds += point.cloud_cover_pct;
        acc.wind += point.wind_speed;
        acc.rain += point.precipitation_mm;
    }

    order
        .into_iter()
        .filter_map(|first| {
            let acc = groups.get(&first.location.key())?;
            let n = acc.count as f64;
            Some(LocationSummary::new(
                first.location.clone(),
                acc.temperature / n,
                acc.clouds / n,
                acc.wind / n,
                acc.rain,
            ))
        })
        .collect()
}

/// The `n` best summaries by descending score. Ties keep their input order.
#[must_use]
pub fn rank(mut summaries: Vec<LocationSummary>, n: usize) -> Vec<LocationSummary> {
    summaries.sort_by(|a, b| b.score().total_cmp(&a.score()));
    summaries.truncate(n);
    summaries
}

/// Marker size for a score: the score itself, clamped to [`MIN_MARKER_SIZE`]
#[must_use]
pub fn marker_size(score: f64) -> f64 {
    score.max(MIN_MARKER_SIZE)
}

/// Row handed to the map collaborator
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapPoint {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    pub score: f64,
    pub size: f64,
}

#[must_use]
pub fn map_points(summaries: &[LocationSummary]) -> Vec<MapPoint> {
    summaries
        .iter()
        .map(|summary| MapPoint {
            name: summary.location.name.clone(),
            lat: summary.location.latitude,
            lon: summary.location.longitude,
            score: summary.score(),
            size: marker_size(summary.score()),
        })
        .collect()
}

/// Map rows for located lodging, scored by their location's weather.
/// Lodging without coordinates or without a weather score is left off.
#[must_use]
pub fn lodging_map_points(lodgings: &[RankedLodging]) -> Vec<MapPoint> {
    lodgings
        .iter()
        .filter_map(|lodging| {
            let score = lodging.weather_score?;
            Some(MapPoint {
                name: lodging.hotel.clone(),
                lat: lodging.lat?,
                lon: lodging.lon?,
                score,
                size: marker_size(score),
            })
        })
        .collect()
}
