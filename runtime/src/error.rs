//! Error taxonomy for the acquisition pipeline.
//!
//! Only [`AcquireError`] and [`ConfigError`] ever reach a caller. Upstream
//! and harvest failures are recovered inside the orchestrator.

use thiserror::Error;

/// Structured-search transport, status, or decode failure.
#[derive(Error, Debug)]
pub enum UpstreamError {
    #[error("search API request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("search API returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("search API response could not be decoded: {0}")]
    Decode(String),
}

/// Browser-tier failure during launch, navigation, or extraction.
#[derive(Error, Debug)]
pub enum HarvestError {
    #[error("browser launch failed: {0:#}")]
    Launch(anyhow::Error),

    #[error("navigation failed: {0:#}")]
    Navigation(anyhow::Error),

    #[error("extraction failed: {0:#}")]
    Extraction(anyhow::Error),
}

/// Result store write or read failure.
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("result store lock poisoned")]
    Poisoned,

    #[error("store task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("stored timestamp {value:?} is not RFC 3339: {source}")]
    Timestamp {
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("failed to prepare store location: {0}")]
    Io(#[from] std::io::Error),
}

/// Startup configuration failure. The process must not accept traffic.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),

    #[error("invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },

    #[error("harvest profile {path}: {message}")]
    Profile { path: String, message: String },
}

/// Failure surfaced by an acquisition call.
#[derive(Error, Debug)]
pub enum AcquireError {
    #[error("keyword must not be empty")]
    InvalidKeyword,

    #[error("failed to persist results: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("acquisition cancelled before completion")]
    Cancelled,
}

impl AcquireError {
    /// Stable machine-readable code used by the REST surface.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidKeyword => "E_INVALID_KEYWORD",
            Self::Persistence(_) => "E_PERSISTENCE",
            Self::Cancelled => "E_CANCELLED",
        }
    }
}
