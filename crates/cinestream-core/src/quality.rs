//! Quality labels and the selectable quality ladder
//!
//! A stream's renditions are reduced to `"{height}p"` labels. The ladder
//! published to the UI always leads with [`Quality::Auto`], followed by the
//! distinct heights from best to worst.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Heights that carry a friendly display name
pub const RECOGNIZED_HEIGHTS: [u32; 4] = [1080, 720, 480, 360];

/// A selectable playback quality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Quality {
    /// Let the engine choose
    #[default]
    Auto,
    /// A rendition identified by its vertical resolution
    Height(u32),
}

impl Quality {
    /// Returns true for labels with a friendly display name
    pub fn is_recognized(&self) -> bool {
        match self {
            Quality::Auto => true,
            Quality::Height(h) => RECOGNIZED_HEIGHTS.contains(h),
        }
    }

    /// Human-readable name; unrecognized labels are shown verbatim
    pub fn display_name(&self) -> String {
        match self {
            Quality::Auto => "Auto".to_string(),
            Quality::Height(1080) => "Full HD".to_string(),
            Quality::Height(720) => "HD".to_string(),
            Quality::Height(480) => "SD".to_string(),
            Quality::Height(360) => "Low".to_string(),
            Quality::Height(_) => self.to_string(),
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Quality::Auto => write!(f, "auto"),
            Quality::Height(h) => write!(f, "{}p", h),
        }
    }
}

impl FromStr for Quality {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("auto") {
            return Ok(Quality::Auto);
        }

        s.strip_suffix('p')
            .or_else(|| s.strip_suffix('P'))
            .and_then(|digits| digits.parse::<u32>().ok())
            .filter(|h| *h > 0)
            .map(Quality::Height)
            .ok_or_else(|| Error::InvalidQuality(s.to_string()))
    }
}

impl TryFrom<String> for Quality {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Quality> for String {
    fn from(quality: Quality) -> Self {
        quality.to_string()
    }
}

/// Which renditions make it into the selectable ladder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityPolicy {
    /// Only 1080p, 720p, 480p and 360p are offered
    #[default]
    Recognized,
    /// Every distinct known height is offered under its verbatim label
    Verbatim,
}

impl QualityPolicy {
    /// Whether a rendition quality belongs in the ladder
    pub fn admits(&self, quality: Quality) -> bool {
        match (self, quality) {
            (_, Quality::Auto) => false,
            (_, Quality::Height(0)) => false,
            (QualityPolicy::Recognized, q) => q.is_recognized(),
            (QualityPolicy::Verbatim, _) => true,
        }
    }
}

/// One encoded variant of a stream as reported by an adaptive engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rendition {
    /// Vertical resolution, 0 when the manifest does not say
    pub height: u32,
    /// Horizontal resolution, if known
    pub width: Option<u32>,
    /// Peak bitrate in bits per second
    pub bitrate: u64,
    /// Variant playlist address, if the engine exposes it
    pub uri: Option<String>,
}

impl Rendition {
    pub fn new(height: u32, bitrate: u64) -> Self {
        Self {
            height,
            width: None,
            bitrate,
            uri: None,
        }
    }

    /// Label of this rendition
    pub fn quality(&self) -> Quality {
        Quality::Height(self.height)
    }
}

/// Derive the selectable ladder for a set of renditions
pub fn quality_ladder(renditions: &[Rendition], policy: QualityPolicy) -> Vec<Quality> {
    let mut heights: Vec<u32> = renditions
        .iter()
        .map(|r| r.height)
        .filter(|h| policy.admits(Quality::Height(*h)))
        .collect();

    heights.sort_unstable_by(|a, b| b.cmp(a));
    heights.dedup();

    std::iter::once(Quality::Auto)
        .chain(heights.into_iter().map(Quality::Height))
        .collect()
}

/// Index of the first rendition carrying the given height
pub fn rendition_index(renditions: &[Rendition], height: u32) -> Option<usize> {
    renditions.iter().position(|r| r.height == height)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn renditions(heights: &[u32]) -> Vec<Rendition> {
        heights
            .iter()
            .map(|h| Rendition::new(*h, *h as u64 * 2_500))
            .collect()
    }

    #[test]
    fn test_parse_labels() {
        assert_eq!("auto".parse::<Quality>().unwrap(), Quality::Auto);
        assert_eq!("AUTO".parse::<Quality>().unwrap(), Quality::Auto);
        assert_eq!("720p".parse::<Quality>().unwrap(), Quality::Height(720));
        assert!("720".parse::<Quality>().is_err());
        assert!("0p".parse::<Quality>().is_err());
        assert!("hd".parse::<Quality>().is_err());
    }

    #[test]
    fn test_display_names() {
        assert_eq!(Quality::Auto.display_name(), "Auto");
        assert_eq!(Quality::Height(1080).display_name(), "Full HD");
        assert_eq!(Quality::Height(360).display_name(), "Low");
        assert_eq!(Quality::Height(2160).display_name(), "2160p");
    }

    #[test]
    fn test_ladder_drops_unrecognized() {
        let ladder = quality_ladder(&renditions(&[360, 480, 720, 1080, 2160]), QualityPolicy::Recognized);
        assert_eq!(
            ladder,
            vec![
                Quality::Auto,
                Quality::Height(1080),
                Quality::Height(720),
                Quality::Height(480),
                Quality::Height(360),
            ]
        );
    }

    #[test]
    fn test_ladder_verbatim_keeps_everything() {
        let ladder = quality_ladder(&renditions(&[240, 720, 2160]), QualityPolicy::Verbatim);
        assert_eq!(
            ladder,
            vec![Quality::Auto, Quality::Height(2160), Quality::Height(720), Quality::Height(240)]
        );
    }

    #[test]
    fn test_ladder_dedupes_and_skips_unknown_height() {
        let ladder = quality_ladder(&renditions(&[720, 720, 0, 480]), QualityPolicy::Verbatim);
        assert_eq!(ladder, vec![Quality::Auto, Quality::Height(720), Quality::Height(480)]);
    }

    #[test]
    fn test_empty_ladder_still_has_auto() {
        assert_eq!(quality_ladder(&[], QualityPolicy::Recognized), vec![Quality::Auto]);
    }

    #[test]
    fn test_rendition_index_picks_first_match() {
        let levels = renditions(&[480, 720, 720]);
        assert_eq!(rendition_index(&levels, 720), Some(1));
        assert_eq!(rendition_index(&levels, 1080), None);
    }

    #[test]
    fn test_serde_as_label() {
        let json = serde_json::to_string(&vec![Quality::Auto, Quality::Height(480)]).unwrap();
        assert_eq!(json, r#"["auto","480p"]"#);
        let back: Vec<Quality> = serde_json::from_str(&json).unwrap();
        assert_eq!(back[1], Quality::Height(480));
    }
}
