//! Error types for the Shukan translation backend.
//!
//! Uses `thiserror` for structured error definitions, one enum per layer.
//! The pipeline folds the lower layers into [`PipelineError`], which is the
//! taxonomy the HTTP boundary maps onto status codes.

use thiserror::Error;

/// Error type for page fetching.
#[derive(Error, Debug)]
pub enum FetchError {
    /// HTTP request failed at the transport level
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Server answered with a non-2xx status
    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    /// URL parsing or validation failed
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// All retry attempts exhausted
    #[error("Fetching {url} failed after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        url: String,
        attempts: u32,
        last_error: String,
    },
}

/// Error type for source-site adapters.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// The page doesn't contain what was asked for
    #[error("Not found: {0}")]
    NotFound(String),

    /// The URL doesn't have the shape this site uses
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

/// Error type for translation providers.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// HTTP request to API failed
    #[error("API request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// API returned an error response
    #[error("API error: {0}")]
    ApiError(String),

    /// Model output didn't match the expected schema
    #[error("Malformed model output: {0}")]
    MalformedOutput(String),

    /// Translation was refused by the model
    #[error("Translation refused: {0}")]
    Refused(String),

    /// Invalid API configuration
    #[error("Invalid API configuration: {0}")]
    InvalidConfig(String),
}

/// Error type for the entity store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// SQLite reported an error
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Database directory couldn't be created
    #[error("Failed to create database directory: {0}")]
    Io(#[from] std::io::Error),

    /// Genre column couldn't be encoded or decoded
    #[error("Failed to encode genres: {0}")]
    Encoding(#[from] serde_json::Error),

    /// Update or delete matched no row
    #[error("{0} not found")]
    NotFound(String),

    /// Insert collided with an existing row
    #[error("{0} already exists")]
    Conflict(String),

    /// The connection mutex was poisoned by a panicking writer
    #[error("Database connection poisoned")]
    Poisoned,
}

/// Error type for configuration operations.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse config file
    #[error("Failed to parse config: {0}")]
    ParseError(String),

    /// Missing required configuration value
    #[error("Missing required config value: {0}")]
    MissingValue(String),

    /// Invalid configuration value
    #[error("Invalid config value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Config directory not found
    #[error("Could not determine config directory")]
    NoConfigDir,
}

/// Errors surfaced by the translation pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A required request field was missing or empty
    #[error("{0}")]
    Validation(String),

    /// Another run holds the lock for this key
    #[error("another request is in progress")]
    LockBusy,

    /// Novel, chapter or next-chapter link is absent
    #[error("{0}")]
    NotFound(String),

    /// Page fetch failed after the fetcher's own retries
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Unknown source tag or unrecognised URL shape
    #[error("{0}")]
    Adapter(String),

    /// The model output was rejected
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// A primary store write or read failed
    #[error(transparent)]
    Persistence(#[from] StoreError),
}

/// Result type alias using anyhow for application-level error handling.
pub type Result<T> = anyhow::Result<T>;

impl From<SourceError> for PipelineError {
    fn from(err: SourceError) -> Self {
        match err {
            SourceError::NotFound(what) => PipelineError::NotFound(format!("{} not found", what)),
            SourceError::InvalidUrl(_) => PipelineError::Adapter(err.to_string()),
        }
    }
}
