//! Multi-stage enrichment pipeline
//!
//! Stages run strictly one after the other and each one is fully
//! materialised before the next starts. Per-record failures are logged and
//! either drop the record or leave it unenriched; only output and
//! configuration errors end a run.

use crate::config::{RunConfig, TripScoutConfig};
use crate::error::TripScoutError;
use crate::fetch::{Fetcher, Throttle, log_skipped};
use crate::geocoding::{Geocoder, GeocodingProvider, city_query, lodging_query};
use crate::lodging::LodgingDiscoverer;
use crate::models::{ForecastPoint, Location, LocationSummary, LodgingCandidate, RankedLodging};
use crate::output::{CityRow, ListingRow, LocatedListingRow, OutputSink, SummaryRow, WeatherRow};
use crate::scoring;
use crate::weather::WeatherCollector;
use std::collections::{HashMap, HashSet};
use tracing::{info, instrument, warn};

/// Records produced by one stage, with the number of records it could not
/// enrich
#[derive(Debug, Clone, PartialEq)]
pub struct StageOutput<T> {
    pub records: Vec<T>,
    pub skipped: usize,
}

/// Skipped record counts per stage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SkipCounts {
    /// Cities dropped because geocoding failed
    pub cities: usize,
    /// Cities whose forecast could not be collected
    pub forecasts: usize,
    /// Ranked cities whose lodging search failed
    pub lodging_searches: usize,
    /// Lodging candidates kept without coordinates
    pub lodging_geocoding: usize,
}

/// Everything a run produced
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub cities: Vec<Location>,
    pub forecasts: Vec<ForecastPoint>,
    pub top_locations: Vec<LocationSummary>,
    pub lodgings: Vec<LodgingCandidate>,
    pub ranked_lodgings: Vec<RankedLodging>,
    pub skipped: SkipCounts,
}

/// Pipeline driver over one [`Fetcher`]
pub struct Pipeline<F: Fetcher> {
    fetcher: F,
    run: RunConfig,
    city_geocoder: Geocoder,
    lodging_geocoder: Geocoder,
    weather: WeatherCollector,
    lodging: LodgingDiscoverer,
    city_geocoding_pause: Throttle,
    forecast_pause: Throttle,
    lodging_search_pause: Throttle,
    lodging_geocoding_pause: Throttle,
}

impl<F: Fetcher> Pipeline<F> {
    /// Wire every stage from the configuration
    pub fn new(fetcher: F, config: TripScoutConfig) -> crate::Result<Self> {
        let TripScoutConfig {
            run,
            providers,
            pacing,
            ..
        } = config;

        let api_key = providers
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| TripScoutError::config("API key is required for geocoding and forecasts"))?;

        let city_geocoder = Geocoder::new(
            GeocodingProvider::OpenWeather {
                url: providers.geocoding_url.clone(),
                api_key: api_key.clone(),
            },
            providers.geocoding_timeout(),
        );
        let lodging_geocoder = Geocoder::new(
            GeocodingProvider::Nominatim {
                url: providers.lodging_geocoding_url.clone(),
                user_agent: providers.lodging_geocoding_user_agent.clone(),
            },
            providers.geocoding_timeout(),
        );
        let weather = WeatherCollector::new(
            providers.forecast_url.clone(),
            api_key,
            providers.forecast_lang.clone(),
            providers.forecast_timeout(),
        );
        let lodging = LodgingDiscoverer::new(
            providers.lodging_search_url.clone(),
            providers.lodging_search_lang.clone(),
            providers.lodging_search_user_agent.clone(),
            providers.lodging_search_accept_language.clone(),
            run.country_name.clone(),
            providers.lodging_search_timeout(),
        );

        Ok(Self {
            fetcher,
            run,
            city_geocoder,
            lodging_geocoder,
            weather,
            lodging,
            city_geocoding_pause: Throttle::from_millis(pacing.city_geocoding_ms),
            forecast_pause: Throttle::from_millis(pacing.forecast_ms),
            lodging_search_pause: Throttle::from_millis(pacing.lodging_search_ms),
            lodging_geocoding_pause: Throttle::from_millis(pacing.lodging_geocoding_ms),
        })
    }

    /// Run every stage in order, writing each stage's table to `sink`
    #[instrument(name = "pipeline", skip_all)]
    pub async fn run<S: OutputSink>(&self, sink: &mut S) -> crate::Result<PipelineReport> {
        let cities = self.geocode_cities().await;
        sink.write_table("cities_geoloc", &rows::<_, CityRow>(&cities.records))?;

        let forecasts = self.collect_weather(&cities.records).await;
        sink.write_table("weather_raw", &rows::<_, WeatherRow>(&forecasts.records))?;

        let top_locations = self.rank_locations(&forecasts.records);
        sink.write_table("top_cities", &rows::<_, SummaryRow>(&top_locations))?;
        sink.write_table("map_weather", &scoring::map_points(&top_locations))?;

        let discovered = self.discover_lodging(&top_locations).await;
        sink.write_table("hotels", &rows::<_, ListingRow>(&discovered.records))?;

        let located = self.geocode_lodging(discovered.records).await;
        sink.write_table(
            "hotels_with_coords",
            &rows::<_, LocatedListingRow>(&located.records),
        )?;

        let ranked_lodgings = merge_with_summaries(&located.records, &top_locations);
        sink.write_table("hotels_ranked", &ranked_lodgings)?;
        sink.write_table("map_hotels", &scoring::lodging_map_points(&ranked_lodgings))?;

        let skipped = SkipCounts {
            cities: cities.skipped,
            forecasts: forecasts.skipped,
            lodging_searches: discovered.skipped,
            lodging_geocoding: located.skipped,
        };
        info!(
            "Pipeline finished: {} cities, {} ranked, {} lodgings ({:?} skipped)",
            cities.records.len(),
            top_locations.len(),
            ranked_lodgings.len(),
            skipped
        );

        Ok(PipelineReport {
            cities: cities.records,
            forecasts: forecasts.records,
            top_locations,
            lodgings: located.records,
            ranked_lodgings,
            skipped,
        })
    }

    /// Geocode the configured cities; failures are dropped. Repeated city
    /// names are geocoded once.
    pub async fn geocode_cities(&self) -> StageOutput<Location> {
        info!("Geocoding {} cities", self.run.cities.len());

        let mut seen = HashSet::new();
        let mut records = Vec::new();
        let mut skipped = 0;

        for city in &self.run.cities {
            if !seen.insert(city.as_str()) {
                warn!("city geocoding: '{}' is listed more than once, ignoring repeat", city);
                continue;
            }

            let query = city_query(city, &self.run.country_code);
            let result = self.city_geocoder.resolve(&self.fetcher, city, &query).await;
            self.city_geocoding_pause.pause().await;

            match result {
                Ok(location) => records.push(location),
                Err(e) => {
                    log_skipped("city geocoding", city, &e);
                    skipped += 1;
                }
            }
        }

        info!("Geocoded {} cities, {} skipped", records.len(), skipped);
        StageOutput { records, skipped }
    }

    /// Forecast points of every location, in location order
    pub async fn collect_weather(&self, locations: &[Location]) -> StageOutput<ForecastPoint> {
        info!("Collecting forecasts for {} locations", locations.len());

        let mut records = Vec::new();
        let mut skipped = 0;

        for location in locations {
            let result = self.weather.collect(&self.fetcher, location).await;
            self.forecast_pause.pause().await;

            match result {
                Ok(points) => records.extend(points),
                Err(e) => {
                    log_skipped("forecast", &location.name, &e);
                    skipped += 1;
                }
            }
        }

        info!("Collected {} forecast points, {} locations skipped", records.len(), skipped);
        StageOutput { records, skipped }
    }

    /// The configured number of best-scoring locations
    #[must_use]
    pub fn rank_locations(&self, points: &[ForecastPoint]) -> Vec<LocationSummary> {
        let summaries = scoring::summarize(points);
        let total = summaries.len();
        let top = scoring::rank(summaries, self.run.top_n);

        info!("Ranked {} locations, keeping top {}", total, top.len());
        for (position, summary) in top.iter().enumerate() {
            info!("#{} {} (score {:.2})", position + 1, summary.name(), summary.score());
        }
        top
    }

    /// Lodging candidates for every ranked location; a failed search only
    /// loses that location's candidates
    pub async fn discover_lodging(&self, ranked: &[LocationSummary]) -> StageOutput<LodgingCandidate> {
        info!("Searching lodging in {} locations", ranked.len());

        let mut records = Vec::new();
        let mut skipped = 0;

        for summary in ranked {
            let result = self
                .lodging
                .discover(&self.fetcher, summary.name(), self.run.max_lodgings_per_city)
                .await;
            self.lodging_search_pause.pause().await;

            match result {
                Ok(candidates) => records.extend(candidates),
                Err(e) => {
                    log_skipped("lodging search", summary.name(), &e);
                    skipped += 1;
                }
            }
        }

        info!("Found {} lodging candidates, {} searches failed", records.len(), skipped);
        StageOutput { records, skipped }
    }

    /// Fill candidate coordinates. Every candidate is kept; `skipped` counts
    /// the ones left without coordinates.
    pub async fn geocode_lodging(
        &self,
        candidates: Vec<LodgingCandidate>,
    ) -> StageOutput<LodgingCandidate> {
        info!("Geocoding {} lodging candidates", candidates.len());

        let mut records = Vec::with_capacity(candidates.len());
        let mut skipped = 0;

        for candidate in candidates {
            let query = lodging_query(&candidate.label, &candidate.location_name, &self.run.country_name);
            let result = self
                .lodging_geocoder
                .resolve(&self.fetcher, &candidate.label, &query)
                .await;
            self.lodging_geocoding_pause.pause().await;

            let coordinates = match result {
                Ok(location) => Some((location.latitude, location.longitude)),
                Err(e) => {
                    log_skipped("lodging geocoding", &query, &e);
                    skipped += 1;
                    None
                }
            };
            records.push(candidate.located(coordinates));
        }

        info!(
            "Located {} of {} lodging candidates",
            records.len() - skipped,
            records.len()
        );
        StageOutput { records, skipped }
    }
}

/// Left-join candidates with summaries on location name. Candidates whose
/// location has no summary keep empty weather fields.
#[must_use]
pub fn merge_with_summaries(
    candidates: &[LodgingCandidate],
    summaries: &[LocationSummary],
) -> Vec<RankedLodging> {
    let mut by_name: HashMap<&str, &LocationSummary> = HashMap::new();
    for summary in summaries {
        by_name.entry(summary.name()).or_insert(summary);
    }

    candidates
        .iter()
        .map(|candidate| {
            let summary = by_name.get(candidate.location_name.as_str());
            RankedLodging {
                city: candidate.location_name.clone(),
                hotel: candidate.label.clone(),
                rating: candidate.rating.clone(),
                lat: candidate.latitude(),
                lon: candidate.longitude(),
                weather_score: summary.map(|s| s.score()),
                temp_mean: summary.map(|s| s.temp_mean),
                rain_sum: summary.map(|s| s.rain_sum),
            }
        })
        .collect()
}

fn rows<'a, T: 'a, R: From<&'a T>>(records: &'a [T]) -> Vec<R> {
    records.iter().map(R::from).collect()
}
