//! Stream address inspection and HLS playlist parsing

#[cfg(feature = "hls")]
mod hls;

#[cfg(feature = "hls")]
pub use hls::{media_timing, parse_media_timing, parse_playlist, ParsedPlaylist};

use crate::config::HLS_MIME_TYPE;

/// Stream container types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Hls,
    Dash,
    Progressive,
}

impl StreamKind {
    /// MIME type a media surface is probed with for this kind
    pub fn mime_type(&self) -> &'static str {
        match self {
            StreamKind::Hls => HLS_MIME_TYPE,
            StreamKind::Dash => "application/dash+xml",
            StreamKind::Progressive => "video/mp4",
        }
    }
}

/// Detect stream kind from URL or playlist content
pub fn detect_stream_kind(url: &str, content: Option<&str>) -> StreamKind {
    // Check URL extension first, ignoring query and fragment
    let path = url
        .split(['?', '#'])
        .next()
        .unwrap_or(url)
        .to_lowercase();
    if path.ends_with(".m3u8") || path.ends_with(".m3u") {
        return StreamKind::Hls;
    }
    if path.ends_with(".mpd") {
        return StreamKind::Dash;
    }
    if path.ends_with(".mp4") || path.ends_with(".webm") || path.ends_with(".mov") {
        return StreamKind::Progressive;
    }

    if let Some(content) = content {
        if content.trim_start().starts_with("#EXTM3U") {
            return StreamKind::Hls;
        }
        if content.contains("<MPD") || content.contains("urn:mpeg:dash") {
            return StreamKind::Dash;
        }
    }

    // Default to HLS
    StreamKind::Hls
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_hls() {
        assert_eq!(
            detect_stream_kind("https://example.com/master.m3u8?token=abc", None),
            StreamKind::Hls
        );
        assert_eq!(detect_stream_kind("https://example.com/x", Some("#EXTM3U\n")), StreamKind::Hls);
    }

    #[test]
    fn test_detect_dash_and_progressive() {
        assert_eq!(detect_stream_kind("https://example.com/manifest.mpd", None), StreamKind::Dash);
        assert_eq!(detect_stream_kind("https://example.com/clip.MP4", None), StreamKind::Progressive);
        assert_eq!(StreamKind::Progressive.mime_type(), "video/mp4");
    }
}
