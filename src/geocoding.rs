//! Geocoding
//!
//! Resolves a free-form place query into a [`Location`]. Cities go to the
//! OpenWeatherMap direct geocoding endpoint, lodging labels go to Nominatim;
//! both share the same contract: first hit wins, an empty result set is
//! [`RecordError::EmptyResult`], a malformed body is [`RecordError::Parse`].

use crate::error::RecordError;
use crate::fetch::{FetchRequest, Fetcher, fetch_json};
use crate::models::Location;
use serde::{Deserialize, Deserializer};
use std::time::Duration;
use tracing::{debug, instrument};

/// Which geocoding endpoint to query and how
#[derive(Debug, Clone)]
pub enum GeocodingProvider {
    /// OpenWeatherMap `geo/1.0/direct`
    OpenWeather { url: String, api_key: String },
    /// OpenStreetMap Nominatim `search`
    Nominatim { url: String, user_agent: String },
}

/// Service resolving place queries through one provider
#[derive(Debug, Clone)]
pub struct Geocoder {
    provider: GeocodingProvider,
    timeout: Duration,
}

/// Query shape for cities: `"<city>,<country-code>"`
#[must_use]
pub fn city_query(city: &str, country_code: &str) -> String {
    format!("{city},{country_code}")
}

/// Query shape for lodging: `"<label>, <city>, <country>"`
#[must_use]
pub fn lodging_query(label: &str, city: &str, country: &str) -> String {
    format!("{label}, {city}, {country}")
}

impl Geocoder {
    #[must_use]
    pub fn new(provider: GeocodingProvider, timeout: Duration) -> Self {
        Self { provider, timeout }
    }

    /// Build the provider request for `query`
    #[must_use]
    pub fn request(&self, query: &str) -> FetchRequest {
        match &self.provider {
            GeocodingProvider::OpenWeather { url, api_key } => {
                FetchRequest::get(url.clone(), self.timeout)
                    .param("q", query)
                    .param("limit", 1)
                    .param("appid", api_key)
            }
            GeocodingProvider::Nominatim { url, user_agent } => {
                FetchRequest::get(url.clone(), self.timeout)
                    .param("q", query)
                    .param("format", "json")
                    .param("limit", 1)
                    .header("User-Agent", user_agent.clone())
            }
        }
    }

    /// Resolve `query` and name the resulting location `name`
    #[instrument(name = "geocode", level = "debug", skip(self, fetcher))]
    pub async fn resolve<F: Fetcher>(
        &self,
        fetcher: &F,
        name: &str,
        query: &str,
    ) -> Result<Location, RecordError> {
        let context = format!("geocoding '{query}'");
        let hits: Vec<GeocodingHit> = fetch_json(fetcher, &self.request(query), &context).await?;

        let Some(first) = hits.into_iter().next() else {
            return Err(RecordError::empty(query));
        };

        let location = Location::new(name, first.lat, first.lon);
        if !location.has_valid_coordinates() {
            return Err(RecordError::parse(
                context,
                format!("coordinates out of range: {}", location.format_coordinates()),
            ));
        }

        debug!("Resolved '{}' to ({})", query, location.format_coordinates());
        Ok(location)
    }
}

/// One entry of a geocoding result array; only coordinates are used
#[derive(Debug, Deserialize)]
struct GeocodingHit {
    #[serde(deserialize_with = "number_or_numeric_string")]
    lat: f64,
    #[serde(deserialize_with = "number_or_numeric_string")]
    lon: f64,
}

/// OpenWeatherMap sends numbers, Nominatim sends strings
fn number_or_numeric_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Coordinate {
        Number(f64),
        Text(String),
    }

    match Coordinate::deserialize(deserializer)? {
        Coordinate::Number(value) => Ok(value),
        Coordinate::Text(text) => text
            .trim()
            .parse::<f64>()
            .map_err(|_| serde::de::Error::custom(format!("invalid coordinate: {text}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use std::cell::RefCell;

    struct CannedFetcher {
        body: Result<&'static str, ()>,
        seen: RefCell<Vec<FetchRequest>>,
    }

    impl CannedFetcher {
        fn ok(body: &'static str) -> Self {
            Self {
                body: Ok(body),
                seen: RefCell::new(Vec::new()),
            }
        }

        fn failing() -> Self {
            Self {
                body: Err(()),
                seen: RefCell::new(Vec::new()),
            }
        }
    }

    impl Fetcher for CannedFetcher {
        async fn fetch(&self, request: &FetchRequest) -> Result<String, FetchError> {
            self.seen.borrow_mut().push(request.clone());
            match self.body {
                Ok(body) => Ok(body.to_string()),
                Err(()) => Err(FetchError::Timeout {
                    url: request.url.clone(),
                    timeout: request.timeout,
                }),
            }
        }
    }

    fn city_geocoder() -> Geocoder {
        Geocoder::new(
            GeocodingProvider::OpenWeather {
                url: "https://geo.test/direct".to_string(),
                api_key: "key_12345678".to_string(),
            },
            Duration::from_secs(15),
        )
    }

    fn lodging_geocoder() -> Geocoder {
        Geocoder::new(
            GeocodingProvider::Nominatim {
                url: "https://nominatim.test/search".to_string(),
                user_agent: "TripScout-test".to_string(),
            },
            Duration::from_secs(15),
        )
    }

    #[test]
    fn test_query_shapes() {
        assert_eq!(city_query("Paris", "FR"), "Paris,FR");
        assert_eq!(
            lodging_query("Hôtel du Louvre", "Paris", "France"),
            "Hôtel du Louvre, Paris, France"
        );
    }

    #[test]
    fn test_openweather_request() {
        let request = city_geocoder().request("Paris,FR");
        assert_eq!(request.url, "https://geo.test/direct");
        assert_eq!(request.param_value("q"), Some("Paris,FR"));
        assert_eq!(request.param_value("limit"), Some("1"));
        assert_eq!(request.param_value("appid"), Some("key_12345678"));
        assert!(request.headers.is_empty());
    }

    #[test]
    fn test_nominatim_request() {
        let request = lodging_geocoder().request("Hotel A, Nice, France");
        assert_eq!(request.param_value("format"), Some("json"));
        assert_eq!(request.param_value("limit"), Some("1"));
        assert_eq!(request.param_value("appid"), None);
        assert_eq!(
            request.headers,
            vec![("User-Agent".to_string(), "TripScout-test".to_string())]
        );
    }

    #[tokio::test]
    async fn test_resolve_takes_first_hit_and_keeps_input_name() {
        let fetcher = CannedFetcher::ok(
            r#"[{"name":"Paris","lat":48.8588897,"lon":2.3200410,"country":"FR"},
                {"name":"Paris","lat":33.66,"lon":-95.55,"country":"US"}]"#,
        );
        let location = city_geocoder()
            .resolve(&fetcher, "Paris", "Paris,FR")
            .await
            .unwrap();

        assert_eq!(location.name, "Paris");
        assert_eq!(location.latitude, 48.8588897);
        assert_eq!(location.longitude, 2.3200410);
        assert_eq!(fetcher.seen.borrow().len(), 1);
    }

    #[tokio::test]
    async fn test_resolve_accepts_string_coordinates() {
        let fetcher = CannedFetcher::ok(r#"[{"lat":"43.6950","lon":"7.2650","display_name":"Hotel A"}]"#);
        let location = lodging_geocoder()
            .resolve(&fetcher, "Hotel A", "Hotel A, Nice, France")
            .await
            .unwrap();
        assert_eq!(location.latitude, 43.695);
        assert_eq!(location.longitude, 7.265);
    }

    #[tokio::test]
    async fn test_resolve_empty_result() {
        let fetcher = CannedFetcher::ok("[]");
        let result = city_geocoder().resolve(&fetcher, "Lyon", "Lyon,FR").await;
        assert!(matches!(result, Err(RecordError::EmptyResult { ref query }) if query == "Lyon,FR"));
    }

    #[tokio::test]
    async fn test_resolve_malformed_body_is_parse_error() {
        let fetcher = CannedFetcher::ok(r#"{"cod":401,"message":"Invalid API key"}"#);
        let result = city_geocoder().resolve(&fetcher, "Lyon", "Lyon,FR").await;
        assert!(matches!(result, Err(RecordError::Parse { .. })));

        let fetcher = CannedFetcher::ok(r#"[{"lat":"north","lon":"2.3"}]"#);
        let result = lodging_geocoder().resolve(&fetcher, "Hotel", "Hotel, Paris, France").await;
        assert!(matches!(result, Err(RecordError::Parse { .. })));
    }

    #[tokio::test]
    async fn test_resolve_rejects_out_of_range_coordinates() {
        let fetcher = CannedFetcher::ok(r#"[{"lat":123.0,"lon":2.3}]"#);
        let result = city_geocoder().resolve(&fetcher, "Paris", "Paris,FR").await;
        assert!(matches!(result, Err(RecordError::Parse { .. })));
    }

    #[tokio::test]
    async fn test_resolve_fetch_failure() {
        let fetcher = CannedFetcher::failing();
        let result = city_geocoder().resolve(&fetcher, "Paris", "Paris,FR").await;
        assert!(matches!(result, Err(RecordError::Fetch(FetchError::Timeout { .. }))));
    }
}
