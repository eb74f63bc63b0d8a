#![allow(dead_code)]

use serde_json::json;
use std::cell::RefCell;
use std::time::Duration;
use tripscout::config::{PacingConfig, TripScoutConfig};
use tripscout::{FetchError, FetchRequest, Fetcher};

pub const GEO_URL: &str = "https://weather.test/geo/1.0/direct";
pub const FORECAST_URL: &str = "https://weather.test/data/2.5/forecast";
pub const SEARCH_URL: &str = "https://lodging.test/searchresults.html";
pub const NOMINATIM_URL: &str = "https://nominatim.test/search";

/// A city known to the fake providers
#[derive(Debug, Clone)]
pub struct CityFixture {
    pub name: &'static str,
    pub lat: f64,
    pub lon: f64,
    /// Temperature of every forecast interval
    pub temp: f64,
    /// Rain of every forecast interval
    pub rain: f64,
    pub hotels: Vec<(&'static str, Option<&'static str>)>,
}

impl CityFixture {
    pub fn new(name: &'static str, lat: f64, lon: f64, temp: f64) -> Self {
        Self {
            name,
            lat,
            lon,
            temp,
            rain: 0.0,
            hotels: Vec::new(),
        }
    }

    pub fn with_hotels(mut self, hotels: &[(&'static str, Option<&'static str>)]) -> Self {
        self.hotels = hotels.to_vec();
        self
    }
}

/// In-process stand-in for the four providers. Every request is recorded.
#[derive(Default)]
pub struct FakeProviders {
    pub cities: Vec<CityFixture>,
    pub failing_geocoding: Vec<&'static str>,
    pub failing_forecast: Vec<&'static str>,
    pub failing_search: Vec<&'static str>,
    pub unlocatable_hotels: Vec<&'static str>,
    calls: RefCell<Vec<FetchRequest>>,
}

impl FakeProviders {
    pub fn new(cities: Vec<CityFixture>) -> Self {
        Self {
            cities,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<FetchRequest> {
        self.calls.borrow().clone()
    }

    pub fn calls_to(&self, url: &str) -> usize {
        self.calls.borrow().iter().filter(|r| r.url == url).count()
    }

    fn city(&self, name: &str) -> Option<&CityFixture> {
        self.cities.iter().find(|c| c.name == name)
    }

    fn respond(&self, request: &FetchRequest) -> Result<String, FetchError> {
        let param = |name: &str| request.param_value(name).unwrap_or_default().to_string();

        match request.url.as_str() {
            GEO_URL => {
                let query = param("q");
                let name = query.split(',').next().unwrap_or_default();
                match self.city(name) {
                    Some(city) if !listed(&self.failing_geocoding, name) => Ok(json!([
                        {"name": city.name, "lat": city.lat, "lon": city.lon, "country": "FR"}
                    ])
                    .to_string()),
                    _ => Ok("[]".to_string()),
                }
            }
            FORECAST_URL => {
                let lat = param("lat");
                let city = self
                    .cities
                    .iter()
                    .find(|c| c.lat.to_string() == lat)
                    .ok_or_else(|| status(request, 404))?;
                if listed(&self.failing_forecast, city.name) {
                    return Err(status(request, 500));
                }
                Ok(forecast_body(city.temp, city.rain))
            }
            SEARCH_URL => {
                let query = param("ss");
                let name = query.split(", ").next().unwrap_or_default();
                if listed(&self.failing_search, name) {
                    return Err(FetchError::Timeout {
                        url: request.url.clone(),
                        timeout: request.timeout,
                    });
                }
                let hotels = self.city(name).map(|c| c.hotels.clone()).unwrap_or_default();
                Ok(search_page(&hotels))
            }
            NOMINATIM_URL => {
                let query = param("q");
                let mut parts = query.split(", ");
                let label = parts.next().unwrap_or_default();
                let city = parts.next().and_then(|name| self.city(name));
                match city {
                    Some(city) if !listed(&self.unlocatable_hotels, label) => Ok(json!([
                        {"lat": format!("{:.4}", city.lat + 0.01), "lon": format!("{:.4}", city.lon + 0.01), "display_name": label}
                    ])
                    .to_string()),
                    _ => Ok("[]".to_string()),
                }
            }
            _ => Err(FetchError::Transport {
                url: request.url.clone(),
                message: "unknown host".to_string(),
            }),
        }
    }
}

impl Fetcher for FakeProviders {
    async fn fetch(&self, request: &FetchRequest) -> Result<String, FetchError> {
        self.calls.borrow_mut().push(request.clone());
        self.respond(request)
    }
}

fn listed(names: &[&str], name: &str) -> bool {
    names.iter().any(|n| *n == name)
}

fn status(request: &FetchRequest, status: u16) -> FetchError {
    FetchError::Status {
        url: request.url.clone(),
        status,
    }
}

/// Three intervals over two days with fixed clouds (20 %) and wind (3 m/s)
pub fn forecast_body(temp: f64, rain: f64) -> String {
    let interval = |dt: i64| {
        json!({
            "dt": dt,
            "main": {"temp": temp},
            "clouds": {"all": 20},
            "wind": {"speed": 3.0},
            "rain": {"3h": rain}
        })
    };
    json!({"cod": "200", "list": [interval(1718625600), interval(1718636400), interval(1718712000)]})
        .to_string()
}

/// Score produced by [`forecast_body`]
pub fn expected_score(temp: f64, rain: f64) -> f64 {
    temp - 0.2 * 20.0 - 0.3 * 3.0 - 0.5 * (3.0 * rain)
}

pub fn search_page(hotels: &[(&str, Option<&str>)]) -> String {
    let cards: String = hotels
        .iter()
        .map(|(title, rating)| {
            let review = rating
                .map(|r| format!(r#"<div data-testid="review-score"><div aria-label="Note {r}">{r}</div></div>"#))
                .unwrap_or_default();
            format!(
                r#"<div data-testid="property-card"><h3><a href="/h"><div data-testid="title">{title}</div></a></h3>{review}</div>"#
            )
        })
        .collect();
    format!("<!DOCTYPE html><html><head><script>window.x = '<div>';</script></head><body>{cards}</body></html>")
}

/// Configuration pointing at the fake providers with pacing disabled
pub fn test_config(cities: &[&str]) -> TripScoutConfig {
    let mut config = TripScoutConfig::default();
    config.run.cities = cities.iter().map(|c| (*c).to_string()).collect();
    config.providers.api_key = Some("test_key_123".to_string());
    config.providers.geocoding_url = GEO_URL.to_string();
    config.providers.forecast_url = FORECAST_URL.to_string();
    config.providers.lodging_search_url = SEARCH_URL.to_string();
    config.providers.lodging_geocoding_url = NOMINATIM_URL.to_string();
    config.pacing = PacingConfig::none();
    config
}

pub fn millis(ms: u64) -> Duration {
    Duration::from_millis(ms)
}
