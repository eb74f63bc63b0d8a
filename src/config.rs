//! Configuration management for `TripScout`
//!
//! Handles loading configuration from files, environment variables,
//! and provides validation for all configuration settings.

use crate::TripScoutError;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure for the `TripScout` application
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TripScoutConfig {
    /// What to scout and where to write it
    #[serde(default)]
    pub run: RunConfig,
    /// Provider endpoints and credentials
    #[serde(default)]
    pub providers: ProvidersConfig,
    /// Pause after each provider call, per stage
    #[serde(default)]
    pub pacing: PacingConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Run settings: city list, country and output location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Cities to geocode and rank
    #[serde(default = "default_cities")]
    pub cities: Vec<String>,
    /// ISO 3166-1 alpha-2 code appended to city geocoding queries
    #[serde(default = "default_country_code")]
    pub country_code: String,
    /// Country name appended to lodging searches and lodging geocoding
    #[serde(default = "default_country_name")]
    pub country_name: String,
    /// Number of best-scoring cities kept for lodging discovery
    #[serde(default = "default_top_n")]
    pub top_n: usize,
    /// Maximum lodging candidates per ranked city
    #[serde(default = "default_max_lodgings")]
    pub max_lodgings_per_city: usize,
    /// Directory receiving the output tables
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
}

/// Provider endpoints, credentials and timeouts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvidersConfig {
    /// OpenWeatherMap API key (city geocoding and forecast)
    pub api_key: Option<String>,
    #[serde(default = "default_geocoding_url")]
    pub geocoding_url: String,
    #[serde(default = "default_forecast_url")]
    pub forecast_url: String,
    /// Language of forecast descriptions
    #[serde(default = "default_lang")]
    pub forecast_lang: String,
    #[serde(default = "default_lodging_search_url")]
    pub lodging_search_url: String,
    #[serde(default = "default_lang")]
    pub lodging_search_lang: String,
    /// Browser-like user agent sent to the lodging search page
    #[serde(default = "default_browser_user_agent")]
    pub lodging_search_user_agent: String,
    #[serde(default = "default_accept_language")]
    pub lodging_search_accept_language: String,
    #[serde(default = "default_lodging_geocoding_url")]
    pub lodging_geocoding_url: String,
    /// Nominatim requires an identifying user agent
    #[serde(default = "default_lodging_geocoding_user_agent")]
    pub lodging_geocoding_user_agent: String,
    /// Timeout for both geocoding providers, in seconds
    #[serde(default = "default_geocoding_timeout")]
    pub geocoding_timeout_seconds: u32,
    #[serde(default = "default_long_timeout")]
    pub forecast_timeout_seconds: u32,
    #[serde(default = "default_long_timeout")]
    pub lodging_search_timeout_seconds: u32,
}

/// Minimum pause after every call of a stage, in milliseconds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PacingConfig {
    #[serde(default = "default_city_geocoding_pause")]
    pub city_geocoding_ms: u64,
    #[serde(default = "default_forecast_pause")]
    pub forecast_ms: u64,
    #[serde(default = "default_lodging_search_pause")]
    pub lodging_search_ms: u64,
    #[serde(default = "default_lodging_geocoding_pause")]
    pub lodging_geocoding_ms: u64,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (pretty or json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

const DEFAULT_CITIES: [&str; 35] = [
    "Paris",
    "Marseille",
    "Lyon",
    "Toulouse",
    "Nice",
    "Nantes",
    "Strasbourg",
    "Montpellier",
    "Bordeaux",
    "Lille",
    "Rennes",
    "Reims",
    "Saint-Étienne",
    "Toulon",
    "Grenoble",
    "Dijon",
    "Angers",
    "Nîmes",
    "Villeurbanne",
    "Clermont-Ferrand",
    "Le Havre",
    "Aix-en-Provence",
    "Brest",
    "Limoges",
    "Tours",
    "Amiens",
    "Metz",
    "Perpignan",
    "Besançon",
    "Orléans",
    "Rouen",
    "Mulhouse",
    "Caen",
    "Nancy",
    "Argenteuil",
];

// Default value functions
fn default_cities() -> Vec<String> {
    DEFAULT_CITIES.iter().map(|c| (*c).to_string()).collect()
}

fn default_country_code() -> String {
    "FR".to_string()
}

fn default_country_name() -> String {
    "France".to_string()
}

fn default_top_n() -> usize {
    5
}

fn default_max_lodgings() -> usize {
    5
}

fn default_output_dir() -> String {
    "outputs".to_string()
}

fn default_geocoding_url() -> String {
    "https://api.openweathermap.org/geo/1.0/direct".to_string()
}

fn default_forecast_url() -> String {
    "https://api.openweathermap.org/data/2.5/forecast".to_string()
}

fn default_lang() -> String {
    "fr".to_string()
}

fn default_lodging_search_url() -> String {
    "https://www.booking.com/searchresults.html".to_string()
}

fn default_browser_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120 Safari/537.36".to_string()
}

fn default_accept_language() -> String {
    "fr-FR,fr;q=0.9".to_string()
}

fn default_lodging_geocoding_url() -> String {
    "https://nominatim.openstreetmap.org/search".to_string()
}

fn default_lodging_geocoding_user_agent() -> String {
    format!("TripScout/{}", crate::VERSION)
}

fn default_geocoding_timeout() -> u32 {
    15
}

fn default_long_timeout() -> u32 {
    30
}

fn default_city_geocoding_pause() -> u64 {
    250
}

fn default_forecast_pause() -> u64 {
    400
}

fn default_lodging_search_pause() -> u64 {
    1200
}

fn default_lodging_geocoding_pause() -> u64 {
    1000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            cities: default_cities(),
            country_code: default_country_code(),
            country_name: default_country_name(),
            top_n: default_top_n(),
            max_lodgings_per_city: default_max_lodgings(),
            output_dir: default_output_dir(),
        }
    }
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            geocoding_url: default_geocoding_url(),
            forecast_url: default_forecast_url(),
            forecast_lang: default_lang(),
            lodging_search_url: default_lodging_search_url(),
            lodging_search_lang: default_lang(),
            lodging_search_user_agent: default_browser_user_agent(),
            lodging_search_accept_language: default_accept_language(),
            lodging_geocoding_url: default_lodging_geocoding_url(),
            lodging_geocoding_user_agent: default_lodging_geocoding_user_agent(),
            geocoding_timeout_seconds: default_geocoding_timeout(),
            forecast_timeout_seconds: default_long_timeout(),
            lodging_search_timeout_seconds: default_long_timeout(),
        }
    }
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            city_geocoding_ms: default_city_geocoding_pause(),
            forecast_ms: default_forecast_pause(),
            lodging_search_ms: default_lodging_search_pause(),
            lodging_geocoding_ms: default_lodging_geocoding_pause(),
        }
    }
}

impl PacingConfig {
    /// No pauses at all; for tests and replayed providers
    #[must_use]
    pub fn none() -> Self {
        Self {
            city_geocoding_ms: 0,
            forecast_ms: 0,
            lodging_search_ms: 0,
            lodging_geocoding_ms: 0,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl ProvidersConfig {
    #[must_use]
    pub fn geocoding_timeout(&self) -> Duration {
        Duration::from_secs(self.geocoding_timeout_seconds.into())
    }

    #[must_use]
    pub fn forecast_timeout(&self) -> Duration {
        Duration::from_secs(self.forecast_timeout_seconds.into())
    }

    #[must_use]
    pub fn lodging_search_timeout(&self) -> Duration {
        Duration::from_secs(self.lodging_search_timeout_seconds.into())
    }
}

impl TripScoutConfig {
    /// Load configuration from file and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path(None)
    }

    /// Load configuration from specified path
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

        // Load from file if path is provided or use default location
        let config_file = config_path.unwrap_or_else(|| {
            Self::get_config_path()
                .filter(|path| path.exists())
                .unwrap_or_else(|| PathBuf::from("config.toml"))
        });

        if config_file.exists() {
            builder = builder.add_source(
                File::from(config_file.clone())
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // TRIPSCOUT_PROVIDERS__API_KEY, TRIPSCOUT_RUN__CITIES="Paris,Lyon", ...
        builder = builder.add_source(
            Environment::with_prefix("TRIPSCOUT")
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("run.cities")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let mut config: TripScoutConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        config.apply_defaults();
        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("tripscout").join("config.toml"))
    }

    /// Apply default values to missing configuration fields
    pub fn apply_defaults(&mut self) {
        if self.run.country_code.is_empty() {
            self.run.country_code = default_country_code();
        }
        if self.run.country_name.is_empty() {
            self.run.country_name = default_country_name();
        }
        if self.run.top_n == 0 {
            self.run.top_n = default_top_n();
        }
        if self.run.max_lodgings_per_city == 0 {
            self.run.max_lodgings_per_city = default_max_lodgings();
        }
        if self.run.output_dir.is_empty() {
            self.run.output_dir = default_output_dir();
        }
        if self.providers.geocoding_url.is_empty() {
            self.providers.geocoding_url = default_geocoding_url();
        }
        if self.providers.forecast_url.is_empty() {
            self.providers.forecast_url = default_forecast_url();
        }
        if self.providers.lodging_search_url.is_empty() {
            self.providers.lodging_search_url = default_lodging_search_url();
        }
        if self.providers.lodging_geocoding_url.is_empty() {
            self.providers.lodging_geocoding_url = default_lodging_geocoding_url();
        }
        if self.providers.geocoding_timeout_seconds == 0 {
            self.providers.geocoding_timeout_seconds = default_geocoding_timeout();
        }
        if self.providers.forecast_timeout_seconds == 0 {
            self.providers.forecast_timeout_seconds = default_long_timeout();
        }
        if self.providers.lodging_search_timeout_seconds == 0 {
            self.providers.lodging_search_timeout_seconds = default_long_timeout();
        }
        if self.logging.level.is_empty() {
            self.logging.level = default_log_level();
        }
        if self.logging.format.is_empty() {
            self.logging.format = default_log_format();
        }
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_api_keys()?;
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        Ok(())
    }

    /// Validate API keys and credentials
    pub fn validate_api_keys(&self) -> Result<()> {
        let Some(api_key) = &self.providers.api_key else {
            return Err(TripScoutError::config(
                "An OpenWeatherMap API key is required. Set providers.api_key or TRIPSCOUT_PROVIDERS__API_KEY",
            )
            .into());
        };

        if api_key.trim().is_empty() {
            return Err(TripScoutError::config("API key cannot be empty").into());
        }

        if api_key.len() < 8 {
            return Err(TripScoutError::config(
                "API key appears to be invalid (too short). Please check your API key.",
            )
            .into());
        }

        if api_key.len() > 100 {
            return Err(TripScoutError::config(
                "API key appears to be invalid (too long). Please check your API key.",
            )
            .into());
        }

        Ok(())
    }

    /// Validate numeric configuration ranges
    fn validate_numeric_ranges(&self) -> Result<()> {
        let timeouts = [
            self.providers.geocoding_timeout_seconds,
            self.providers.forecast_timeout_seconds,
            self.providers.lodging_search_timeout_seconds,
        ];
        if timeouts.iter().any(|t| *t > 300) {
            return Err(TripScoutError::config("Provider timeouts cannot exceed 300 seconds").into());
        }

        let pauses = [
            self.pacing.city_geocoding_ms,
            self.pacing.forecast_ms,
            self.pacing.lodging_search_ms,
            self.pacing.lodging_geocoding_ms,
        ];
        if pauses.iter().any(|p| *p > 60_000) {
            return Err(TripScoutError::config("Pacing intervals cannot exceed 60000 ms").into());
        }

        if !(1..=50).contains(&self.run.top_n) {
            return Err(TripScoutError::config("top_n must be between 1 and 50").into());
        }

        if !(1..=50).contains(&self.run.max_lodgings_per_city) {
            return Err(
                TripScoutError::config("max_lodgings_per_city must be between 1 and 50").into(),
            );
        }

        Ok(())
    }

    /// Validate string configuration values
    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(TripScoutError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(TripScoutError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        let urls = [
            ("geocoding_url", &self.providers.geocoding_url),
            ("forecast_url", &self.providers.forecast_url),
            ("lodging_search_url", &self.providers.lodging_search_url),
            ("lodging_geocoding_url", &self.providers.lodging_geocoding_url),
        ];
        for (name, url) in urls {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(TripScoutError::config(format!(
                    "providers.{name} must be a valid HTTP or HTTPS URL"
                ))
                .into());
            }
        }

        if self.run.cities.iter().any(|c| c.trim().is_empty()) {
            return Err(TripScoutError::config("City names cannot be empty").into());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn valid_config() -> TripScoutConfig {
        let mut config = TripScoutConfig::default();
        config.providers.api_key = Some("valid_api_key_123".to_string());
        config
    }

    #[test]
    fn test_default_config() {
        let config = TripScoutConfig::default();
        assert_eq!(config.run.cities.len(), 35);
        assert_eq!(config.run.cities[0], "Paris");
        assert_eq!(config.run.country_code, "FR");
        assert_eq!(config.run.top_n, 5);
        assert_eq!(config.run.max_lodgings_per_city, 5);
        assert_eq!(config.pacing.city_geocoding_ms, 250);
        assert_eq!(config.pacing.forecast_ms, 400);
        assert_eq!(config.pacing.lodging_search_ms, 1200);
        assert_eq!(config.pacing.lodging_geocoding_ms, 1000);
        assert_eq!(config.providers.geocoding_timeout(), Duration::from_secs(15));
        assert_eq!(config.providers.forecast_timeout(), Duration::from_secs(30));
        assert_eq!(config.logging.level, "info");
        assert!(config.providers.api_key.is_none());
    }

    #[test]
    fn test_config_validation_missing_api_key() {
        let config = TripScoutConfig::default();
        let result = config.validate_api_keys();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("API key is required"));
    }

    #[test]
    fn test_config_validation_valid_api_key() {
        let config = valid_config();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_short_api_key() {
        let mut config = valid_config();
        config.providers.api_key = Some("abc".to_string());
        assert!(config.validate_api_keys().is_err());
    }

    #[test]
    fn test_config_validation_invalid_log_level() {
        let mut config = valid_config();
        config.logging.level = "invalid".to_string();
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Invalid log level"));
    }

    #[test]
    fn test_config_validation_numeric_ranges() {
        let mut config = valid_config();
        config.providers.forecast_timeout_seconds = 500;
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("timeouts cannot exceed"));

        let mut config = valid_config();
        config.run.top_n = 80;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_rejects_blank_city() {
        let mut config = valid_config();
        config.run.cities = vec!["Paris".to_string(), "  ".to_string()];
        let result = config.validate();
        assert!(result.unwrap_err().to_string().contains("City names"));
    }

    #[test]
    fn test_config_validation_rejects_non_http_url() {
        let mut config = valid_config();
        config.providers.forecast_url = "ftp://example.com".to_string();
        let result = config.validate();
        assert!(result.unwrap_err().to_string().contains("forecast_url"));
    }

    #[test]
    fn test_apply_defaults_repairs_zero_values() {
        let mut config = valid_config();
        config.run.top_n = 0;
        config.providers.geocoding_timeout_seconds = 0;
        config.logging.format = String::new();
        config.apply_defaults();
        assert_eq!(config.run.top_n, 5);
        assert_eq!(config.providers.geocoding_timeout_seconds, 15);
        assert_eq!(config.logging.format, "pretty");
    }

    #[test]
    fn test_load_from_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[run]
cities = ["Paris", "Lyon"]
top_n = 1

[providers]
api_key = "file_api_key_123"

[pacing]
forecast_ms = 0
"#
        )
        .unwrap();

        let config = TripScoutConfig::load_from_path(Some(file.path().to_path_buf())).unwrap();
        assert_eq!(config.run.cities, vec!["Paris", "Lyon"]);
        assert_eq!(config.run.top_n, 1);
        assert_eq!(config.run.country_name, "France");
        assert_eq!(config.pacing.forecast_ms, 0);
        assert_eq!(config.pacing.lodging_search_ms, 1200);
        assert_eq!(config.providers.api_key.as_deref(), Some("file_api_key_123"));
    }

    #[test]
    fn test_config_path_generation() {
        if let Some(path) = TripScoutConfig::get_config_path() {
            assert!(path.to_string_lossy().contains("tripscout"));
            assert!(path.to_string_lossy().contains("config.toml"));
        }
    }
}
