//! HLS playlist parsing
//!
//! Handles both entry points a stream URL can resolve to:
//! - Master playlists (one rendition per variant stream)
//! - Media playlists (a single rendition of unknown height)

use crate::{error::Error, Rendition, Result};
use m3u8_rs::{MasterPlaylist, MediaPlaylist, Playlist};
use tracing::{debug, instrument};
use url::Url;

/// What a playlist tells us about a stream
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedPlaylist {
    /// Renditions in manifest order; indices are engine level indices
    pub renditions: Vec<Rendition>,
    /// Total duration in seconds, known once a media playlist is complete
    pub duration: Option<f64>,
    /// Media playlist without an end marker
    pub is_live: bool,
    /// Whether this was a master playlist
    pub is_master: bool,
}

/// Parse an HLS playlist fetched from `base_url`
#[instrument(skip(content), fields(url = %base_url))]
pub fn parse_playlist(content: &str, base_url: &Url) -> Result<ParsedPlaylist> {
    let playlist = m3u8_rs::parse_playlist_res(content.as_bytes())
        .map_err(|e| Error::ManifestParse(format!("Failed to parse HLS playlist: {:?}", e)))?;

    match playlist {
        Playlist::MasterPlaylist(master) => parse_master(&master, base_url),
        Playlist::MediaPlaylist(media) => Ok(parse_media(&media, base_url)),
    }
}

fn parse_master(master: &MasterPlaylist, base_url: &Url) -> Result<ParsedPlaylist> {
    let mut renditions = Vec::with_capacity(master.variants.len());

    for variant in master.variants.iter().filter(|v| !v.is_i_frame) {
        let uri = resolve_uri(base_url, &variant.uri)?;
        let (width, height) = match variant.resolution {
            Some(r) => (Some(r.width as u32), r.height as u32),
            None => (None, 0),
        };

        renditions.push(Rendition {
            height,
            width,
            bitrate: variant.bandwidth,
            uri: Some(uri.to_string()),
        });
    }

    if renditions.is_empty() {
        return Err(Error::ManifestParse("Master playlist has no variant streams".into()));
    }

    debug!(variants = renditions.len(), "Parsed master playlist");
    Ok(ParsedPlaylist {
        renditions,
        duration: None,
        is_live: false,
        is_master: true,
    })
}

fn parse_media(media: &MediaPlaylist, base_url: &Url) -> ParsedPlaylist {
    let (duration, is_live) = media_timing(media);
    debug!(segments = media.segments.len(), is_live, "Parsed media playlist");

    ParsedPlaylist {
        renditions: vec![Rendition {
            height: 0,
            width: None,
            bitrate: 0,
            uri: Some(base_url.to_string()),
        }],
        duration,
        is_live,
        is_master: false,
    }
}

/// Duration of a complete media playlist and whether it is live
pub fn media_timing(media: &MediaPlaylist) -> (Option<f64>, bool) {
    if media.end_list {
        let total: f64 = media.segments.iter().map(|s| s.duration as f64).sum();
        (Some(total), false)
    } else {
        (None, true)
    }
}

/// Parse a variant's media playlist for its timing only
pub fn parse_media_timing(content: &str) -> Result<(Option<f64>, bool)> {
    let media = m3u8_rs::parse_media_playlist_res(content.as_bytes())
        .map_err(|e| Error::ManifestParse(format!("Failed to parse HLS media: {:?}", e)))?;
    Ok(media_timing(&media))
}

/// Resolve relative URI against base URL
fn resolve_uri(base: &Url, relative: &str) -> Result<Url> {
    base.join(relative)
        .map_err(|e| Error::ManifestParse(format!("Invalid URI '{}': {}", relative, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MASTER: &str = "#EXTM3U
#EXT-X-VERSION:3
#EXT-X-STREAM-INF:BANDWIDTH=800000,RESOLUTION=640x360
360p/index.m3u8
#EXT-X-STREAM-INF:BANDWIDTH=2800000,RESOLUTION=1280x720
720p/index.m3u8
#EXT-X-STREAM-INF:BANDWIDTH=5000000,RESOLUTION=1920x1080
https://other.example.com/1080p/index.m3u8
";

    const MEDIA_VOD: &str = "#EXTM3U
#EXT-X-VERSION:3
#EXT-X-TARGETDURATION:10
#EXTINF:10.0,
seg0.ts
#EXTINF:10.0,
seg1.ts
#EXTINF:4.5,
seg2.ts
#EXT-X-ENDLIST
";

    fn base() -> Url {
        Url::parse("https://cdn.example.com/show/master.m3u8").unwrap()
    }

    #[test]
    fn test_master_playlist_renditions() {
        let parsed = parse_playlist(MASTER, &base()).unwrap();
        assert!(parsed.is_master);

        let heights: Vec<u32> = parsed.renditions.iter().map(|r| r.height).collect();
        assert_eq!(heights, vec![360, 720, 1080]);
        assert_eq!(parsed.renditions[1].bitrate, 2_800_000);
        assert_eq!(parsed.renditions[1].width, Some(1280));
        assert_eq!(
            parsed.renditions[0].uri.as_deref(),
            Some("https://cdn.example.com/show/360p/index.m3u8")
        );
        assert_eq!(
            parsed.renditions[2].uri.as_deref(),
            Some("https://other.example.com/1080p/index.m3u8")
        );
    }

    #[test]
    fn test_media_playlist_entry_point() {
        let parsed = parse_playlist(MEDIA_VOD, &base()).unwrap();
        assert!(!parsed.is_master);
        assert!(!parsed.is_live);
        assert_eq!(parsed.renditions.len(), 1);
        assert_eq!(parsed.renditions[0].height, 0);
        assert_eq!(parsed.duration, Some(24.5));
    }

    #[test]
    fn test_live_media_playlist() {
        let live = MEDIA_VOD.replace("#EXT-X-ENDLIST\n", "");
        let (duration, is_live) = parse_media_timing(&live).unwrap();
        assert_eq!(duration, None);
        assert!(is_live);
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert!(matches!(
            parse_playlist("<html>not a playlist</html>", &base()),
            Err(Error::ManifestParse(_))
        ));
    }
}
