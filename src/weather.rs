//! Forecast collection from the OpenWeatherMap 5 day / 3 hour endpoint

use crate::error::RecordError;
use crate::fetch::{FetchRequest, Fetcher, fetch_json};
use crate::models::{ForecastPoint, Location};
use std::time::Duration;
use tracing::{debug, instrument};

/// Collects the multi-day forecast of a location, one point per interval
#[derive(Debug, Clone)]
pub struct WeatherCollector {
    url: String,
    api_key: String,
    lang: String,
    timeout: Duration,
}

impl WeatherCollector {
    #[must_use]
    pub fn new(url: String, api_key: String, lang: String, timeout: Duration) -> Self {
        Self {
            url,
            api_key,
            lang,
            timeout,
        }
    }

    #[must_use]
    pub fn request(&self, location: &Location) -> FetchRequest {
        FetchRequest::get(self.url.clone(), self.timeout)
            .param("lat", location.latitude)
            .param("lon", location.longitude)
            .param("units", "metric")
            .param("lang", &self.lang)
            .param("appid", &self.api_key)
    }

    #[instrument(name = "forecast", level = "debug", skip(self, fetcher, location), fields(city = %location.name))]
    pub async fn collect<F: Fetcher>(
        &self,
        fetcher: &F,
        location: &Location,
    ) -> Result<Vec<ForecastPoint>, RecordError> {
        let context = format!("forecast for {}", location.name);
        let response: openweathermap::ForecastResponse =
            fetch_json(fetcher, &self.request(location), &context).await?;

        let points = response
            .into_points(location)
            .map_err(|message| RecordError::parse(context, message))?;

        debug!("{} forecast intervals for {}", points.len(), location.name);
        Ok(points)
    }
}

/// `OpenWeatherMap` 5 day / 3 hour forecast response structures
mod openweathermap {
    use super::{ForecastPoint, Location};
    use chrono::DateTime;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    pub struct ForecastResponse {
        pub list: Vec<Interval>,
    }

    #[derive(Debug, Deserialize)]
    pub struct Interval {
        /// Interval start, Unix seconds
        pub dt: i64,
        pub main: Main,
        pub clouds: Clouds,
        pub wind: Wind,
        pub rain: Option<Rain>,
    }

    #[derive(Debug, Deserialize)]
    pub struct Main {
        pub temp: f64,
    }

    #[derive(Debug, Deserialize)]
    pub struct Clouds {
        pub all: f64,
    }

    #[derive(Debug, Deserialize)]
    pub struct Wind {
        pub speed: f64,
    }

    #[derive(Debug, Deserialize)]
    pub struct Rain {
        #[serde(rename = "3h")]
        pub three_hours: Option<f64>,
    }

    impl ForecastResponse {
        /// Flatten into one point per interval, in provider order
        pub fn into_points(self, location: &Location) -> Result<Vec<ForecastPoint>, String> {
            self.list
                .into_iter()
                .map(|interval| {
                    let date = DateTime::from_timestamp(interval.dt, 0)
                        .ok_or_else(|| format!("timestamp out of range: {}", interval.dt))?
                        .date_naive();

                    Ok(ForecastPoint {
                        location: location.clone(),
                        date,
                        temperature: interval.main.temp,
                        cloud_cover_pct: interval.clouds.all,
                        wind_speed: interval.wind.speed,
                        precipitation_mm: interval
                            .rain
                            .and_then(|rain| rain.three_hours)
                            .unwrap_or(0.0),
                    })
                })
                .collect()
        }
    }
}
