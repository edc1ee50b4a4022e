//! Player and catalog configuration

use crate::{Error, QualityPolicy, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// MIME type of HLS playlists
pub const HLS_MIME_TYPE: &str = "application/vnd.apple.mpegurl";

/// Options handed to every adaptive engine instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Verbose engine logging
    pub debug: bool,
    /// Offload demuxing to a worker where the engine supports it
    pub enable_worker: bool,
    /// Prefer low-latency playlist handling
    pub low_latency_mode: bool,
    /// Seconds of already-played media to keep buffered
    pub back_buffer_length: f64,
    /// Maximum bitrate for automatic selection (0 = unlimited)
    pub max_bitrate: u64,
    /// Manifest request timeout in milliseconds
    pub request_timeout_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            debug: false,
            enable_worker: true,
            low_latency_mode: true,
            back_buffer_length: 90.0,
            max_bitrate: 0,
            request_timeout_ms: 10_000,
        }
    }
}

/// Playback controller configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Adaptive engine options
    pub engine: EngineConfig,
    /// Which renditions are offered for selection
    pub quality_policy: QualityPolicy,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            quality_policy: QualityPolicy::Recognized,
        }
    }
}

impl PlayerConfig {
    /// Config tuned for live events
    pub fn low_latency() -> Self {
        Self {
            engine: EngineConfig {
                low_latency_mode: true,
                back_buffer_length: 30.0,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Config tuned for on-demand titles
    pub fn vod() -> Self {
        Self {
            engine: EngineConfig {
                low_latency_mode: false,
                back_buffer_length: 90.0,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.engine.back_buffer_length.is_finite() || self.engine.back_buffer_length < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "back_buffer_length must be a non-negative number, got {}",
                self.engine.back_buffer_length
            )));
        }
        if self.engine.request_timeout_ms == 0 {
            return Err(Error::InvalidConfig("request_timeout_ms must be positive".into()));
        }
        Ok(())
    }
}

/// Mock catalog configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Artificial latency added to every catalog call
    pub latency_ms: u64,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self { latency_ms: 500 }
    }
}

/// Top-level application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub player: PlayerConfig,
    pub catalog: CatalogConfig,
}

impl AppConfig {
    /// Parse configuration from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: AppConfig = serde_json::from_str(json)?;
        config.player.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }
}
