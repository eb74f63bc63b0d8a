//! Error types for `TripScout`
//!
//! Two layers live here: the per-record taxonomy ([`FetchError`],
//! [`RecordError`]) returned by every operation that touches a provider, and
//! the application-level [`TripScoutError`] for failures that end a run.

use std::time::Duration;
use thiserror::Error;

/// A single outbound call that did not produce a body
#[derive(Error, Debug)]
pub enum FetchError {
    /// The provider did not answer within the request timeout
    #[error("request to {url} timed out after {timeout:?}")]
    Timeout { url: String, timeout: Duration },

    /// The provider answered with a non-success status
    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: u16 },

    /// Connection, TLS, body decoding or URL errors
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },
}

impl FetchError {
    /// URL of the failed request
    #[must_use]
    pub fn url(&self) -> &str {
        match self {
            FetchError::Timeout { url, .. }
            | FetchError::Status { url, .. }
            | FetchError::Transport { url, .. } => url,
        }
    }
}

/// Failure of one per-record operation (geocoding a name, collecting one
/// forecast, searching lodging for one city)
#[derive(Error, Debug)]
pub enum RecordError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    /// The provider answered but had no matching entity
    #[error("no result for '{query}'")]
    EmptyResult { query: String },

    /// The body did not match the expected structure
    #[error("unexpected response for '{context}': {message}")]
    Parse { context: String, message: String },
}

impl RecordError {
    pub fn empty<S: Into<String>>(query: S) -> Self {
        Self::EmptyResult {
            query: query.into(),
        }
    }

    pub fn parse<C: Into<String>, M: Into<String>>(context: C, message: M) -> Self {
        Self::Parse {
            context: context.into(),
            message: message.into(),
        }
    }
}

/// Main error type for the `TripScout` application
#[derive(Error, Debug)]
pub enum TripScoutError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Writing a named output table failed
    #[error("Failed to write table '{table}': {source}")]
    Output {
        table: String,
        #[source]
        source: csv::Error,
    },

    /// I/O operation errors
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// General application errors
    #[error("Application error: {message}")]
    General { message: String },
}

impl TripScoutError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new output error for `table`
    pub fn output<S: Into<String>>(table: S, source: csv::Error) -> Self {
        Self::Output {
            table: table.into(),
            source,
        }
    }

    /// Create a new general error
    pub fn general<S: Into<String>>(message: S) -> Self {
        Self::General {
            message: message.into(),
        }
    }

    /// Get a user-friendly error message
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            TripScoutError::Config { message } => {
                format!("Configuration error: {message}. Please check your config file and API key.")
            }
            TripScoutError::Output { table, .. } => {
                format!("Could not write the '{table}' table. Please check the output directory.")
            }
            TripScoutError::Io { .. } => {
                "File operation failed. Please check file permissions.".to_string()
            }
            TripScoutError::General { message } => message.clone(),
        }
    }
}
