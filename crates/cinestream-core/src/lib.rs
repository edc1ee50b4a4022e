//! CineStream Core - Playback Library for CineStream
//!
//! This crate provides the core functionality behind the CineStream player:
//! - Playback controller binding a stream URL to a media surface
//! - Adaptive engine seam with a native HLS engine
//! - Quality ladder derivation and rendition switching
//! - Headless media surface with a manual clock
//! - Mock content catalog
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      CineStream Core                            │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐          │
//! │  │   Manifest   │  │   Adaptive   │  │   Quality    │          │
//! │  │    Parser    │  │    Engine    │  │    Ladder    │          │
//! │  └──────┬───────┘  └──────┬───────┘  └──────┬───────┘          │
//! │         │                 │                 │                   │
//! │         └─────────────────┼─────────────────┘                   │
//! │                           │                                     │
//! │                    ┌──────┴──────┐                              │
//! │                    │  Playback   │                              │
//! │                    │ Controller  │                              │
//! │                    └──────┬──────┘                              │
//! │                           │                                     │
//! │  ┌──────────────┐  ┌──────┴──────┐  ┌──────────────┐           │
//! │  │   Content    │  │    Media    │  │   Playback   │           │
//! │  │   Catalog    │  │   Surface   │  │   Observer   │           │
//! │  └──────────────┘  └─────────────┘  └──────────────┘           │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod config;
pub mod content;
pub mod quality;
pub mod engine;
pub mod surface;
pub mod player;
pub mod manifest;
#[cfg(feature = "catalog")]
pub mod catalog;
#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use error::{Error, Recovery, Result};
pub use config::{AppConfig, CatalogConfig, EngineConfig, PlayerConfig, HLS_MIME_TYPE};
pub use content::{ContentId, ContentRecord, ContentType};
pub use quality::{quality_ladder, Quality, QualityPolicy, Rendition};
pub use engine::{AdaptiveEngine, EngineEvent, EngineFactory, LevelSelection};
#[cfg(feature = "hls")]
pub use engine::{HlsEngine, HlsEngineFactory};
pub use surface::{HeadlessSurface, MediaEvent, MediaEventKind, MediaInfo, MediaSurface};
pub use player::{BindingMode, PlaybackController, PlaybackObserver, PlaybackState, SessionId};
pub use manifest::{detect_stream_kind, StreamKind};
#[cfg(feature = "catalog")]
pub use catalog::{group_by_type, ContentCatalog, HomeSection, MockCatalog};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the player library with default configuration
pub fn init() {
    tracing::info!(version = VERSION, "CineStream Core initialized");
}
