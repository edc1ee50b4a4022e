//! Adaptive bitrate engine seam
//!
//! The controller never talks to a concrete streaming library. It drives an
//! [`AdaptiveEngine`] created by an [`EngineFactory`], and the engine reports
//! back through buffered [`EngineEvent`]s drained on the host's event loop.

#[cfg(feature = "hls")]
mod hls;

#[cfg(feature = "hls")]
pub use hls::{HlsEngine, HlsEngineFactory};

use crate::{EngineConfig, Rendition, Result};
use std::fmt;

/// Rendition selection understood by an engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LevelSelection {
    /// Engine-driven automatic switching
    Auto,
    /// Pin a rendition by its index in the manifest's level list
    Index(usize),
}

impl LevelSelection {
    /// Convert from the `-1 = auto` convention used by browser engines
    pub fn from_raw(raw: i32) -> Self {
        usize::try_from(raw)
            .map(LevelSelection::Index)
            .unwrap_or(LevelSelection::Auto)
    }

    pub fn to_raw(self) -> i32 {
        match self {
            LevelSelection::Auto => -1,
            LevelSelection::Index(i) => i32::try_from(i).unwrap_or(i32::MAX),
        }
    }
}

impl fmt::Display for LevelSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LevelSelection::Auto => write!(f, "auto"),
            LevelSelection::Index(i) => write!(f, "level {}", i),
        }
    }
}

/// Notifications raised by an engine
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// The manifest was fetched and parsed
    ManifestParsed { levels: Vec<Rendition> },
    /// A rendition became active
    LevelSwitched {
        /// Index of the rendition now playing
        level: usize,
        /// Whether the engine is choosing renditions on its own
        auto: bool,
    },
    /// The engine hit an error
    Error {
        /// Fatal errors leave the engine unable to continue
        fatal: bool,
        details: String,
    },
}

/// An adaptive streaming engine bound to one media surface
pub trait AdaptiveEngine<S> {
    /// Begin loading a manifest
    fn load_source(&mut self, url: &str) -> Result<()>;

    /// Bind the engine's output to a surface
    fn attach_media(&mut self, surface: &mut S) -> Result<()>;

    /// Unbind from the surface
    fn detach_media(&mut self);

    /// Release every resource held by the engine
    fn destroy(&mut self);

    /// Current rendition selection
    fn current_level(&self) -> LevelSelection;

    /// Switch renditions
    fn set_current_level(&mut self, level: LevelSelection);

    /// Next buffered event, if any
    fn poll_event(&mut self, surface: &mut S) -> Option<EngineEvent>;
}

/// Builds engines for a controller
pub trait EngineFactory<S> {
    /// Whether adaptive playback is available in this runtime
    fn is_supported(&self) -> bool;

    /// Construct a fresh engine
    fn create(&mut self, config: &EngineConfig) -> Result<Box<dyn AdaptiveEngine<S>>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_level_conversion() {
        assert_eq!(LevelSelection::from_raw(-1), LevelSelection::Auto);
        assert_eq!(LevelSelection::from_raw(2), LevelSelection::Index(2));
        assert_eq!(LevelSelection::Auto.to_raw(), -1);
        assert_eq!(LevelSelection::Index(3).to_raw(), 3);
    }
}
