//! Error types for CineStream Core

use serde::Serialize;
use thiserror::Error;

/// Result type alias for playback and catalog operations
pub type Result<T> = std::result::Result<T, Error>;

/// Player and catalog error types
#[derive(Error, Debug)]
pub enum Error {
    // Catalog errors
    #[error("Content not found: {id}")]
    NotFound { id: u64 },

    #[error("Failed to fetch content: {0}")]
    FetchFailed(String),

    // Playback errors
    #[error("Playback request rejected: {0}")]
    PlaybackRejected(String),

    #[error("Stream cannot be played on this surface: {url}")]
    StreamUnsupported { url: String },

    #[error("Failed to load manifest {url}: {reason}")]
    ManifestLoadFailed { url: String, reason: String },

    #[error("Failed to parse manifest: {0}")]
    ManifestParse(String),

    #[error("Adaptive engine error: {0}")]
    Engine(String),

    #[error("Player is not mounted")]
    NotMounted,

    // Quality errors
    #[error("Quality {0} is not offered by the current stream")]
    UnknownQuality(String),

    #[error("Invalid quality label: {0}")]
    InvalidQuality(String),

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // Network errors
    #[cfg(feature = "hls")]
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// What the surrounding UI should offer the viewer after an error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Recovery {
    /// Offer a way back to the home screen
    GoHome,
    /// Offer a retry action
    Retry,
    /// Show a degraded-playback notice
    DegradedNotice,
    /// Nothing to show; state simply does not change
    Silent,
}

impl Error {
    /// Create a manifest load error
    pub fn manifest_load(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::ManifestLoadFailed {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Returns true if retrying the same operation may succeed
    pub fn is_recoverable(&self) -> bool {
        match self {
            Error::FetchFailed(_) | Error::ManifestLoadFailed { .. } => true,
            #[cfg(feature = "hls")]
            Error::Network(_) => true,
            _ => false,
        }
    }

    /// Returns the recovery affordance for this error
    pub fn recovery(&self) -> Recovery {
        match self {
            Error::NotFound { .. } => Recovery::GoHome,
            Error::StreamUnsupported { .. } => Recovery::DegradedNotice,
            Error::PlaybackRejected(_) | Error::UnknownQuality(_) => Recovery::Silent,
            _ if self.is_recoverable() => Recovery::Retry,
            _ => Recovery::Silent,
        }
    }

    /// Returns the error code for logs and host bindings
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::NotFound { .. } => "NOT_FOUND",
            Error::FetchFailed(_) => "FETCH_FAILED",
            Error::PlaybackRejected(_) => "PLAYBACK_REJECTED",
            Error::StreamUnsupported { .. } => "STREAM_UNSUPPORTED",
            Error::ManifestLoadFailed { .. } => "MANIFEST_LOAD",
            Error::ManifestParse(_) => "MANIFEST_PARSE",
            Error::Engine(_) => "ENGINE",
            Error::NotMounted => "NOT_MOUNTED",
            Error::UnknownQuality(_) => "UNKNOWN_QUALITY",
            Error::InvalidQuality(_) => "INVALID_QUALITY",
            Error::InvalidConfig(_) => "INVALID_CONFIG",
            #[cfg(feature = "hls")]
            Error::Network(_) => "NETWORK",
            Error::Io(_) => "IO",
            Error::Json(_) => "JSON",
        }
    }
}
