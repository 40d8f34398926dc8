use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when talking to the shows API
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP request failed for {url}: {source}")]
    RequestFailed {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP error {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Failed to decode response from {url}: {source}")]
    DecodeFailed {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Empty response from {url}")]
    EmptyResponse { url: String },

    #[error("Failed to encode request body: {0}")]
    EncodeFailed(#[from] serde_json::Error),

    #[error("Invalid API base URL: {0}")]
    InvalidBaseUrl(#[from] url::ParseError),
}

/// Errors that can occur in the local media cache
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Invalid media URL {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Media URL {url} has no file name component")]
    MissingFileName { url: String },

    #[error("Failed to create cache directory {path}: {source}")]
    CreateDirectoryFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read cache directory {path}: {source}")]
    ReadDirectoryFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to check cache file {path}: {source}")]
    LookupFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Download of {url} is already in progress")]
    DownloadInProgress { url: String },

    #[error("HTTP request failed for {url}: {source}")]
    HttpFailed {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP error {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Stream error while downloading {url}: {source}")]
    StreamFailed {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to create file {path}: {source}")]
    FileCreateFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write to file {path}: {source}")]
    FileWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to move {from} into place at {to}: {source}")]
    FinalizeFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors reported by a media engine
#[derive(Error, Debug)]
pub enum PlaybackError {
    #[error("Media engine failed to play {target}: {reason}")]
    PlayFailed { target: String, reason: String },

    #[error("Media engine failed to stop: {0}")]
    StopFailed(String),

    #[error("Local stream I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that can occur when loading configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    ParseFailed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Could not determine a cache directory for this platform")]
    CacheDirectoryNotFound,

    #[error("Page size must be greater than zero")]
    InvalidPageSize,
}

/// Top-level errors for view-model commands
#[derive(Error, Debug)]
pub enum ViewModelError {
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Playback error: {0}")]
    Playback(#[from] PlaybackError),

    #[error("Show {0} has no guests")]
    NoGuests(u32),
}
