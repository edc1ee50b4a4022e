//! Native HLS engine
//!
//! Fetches and parses playlists on the tokio runtime and reports back through
//! the controller's event loop. It does not decode media: stream timing is
//! handed to the surface as [`MediaInfo`] instead.

use super::{AdaptiveEngine, EngineEvent, EngineFactory, LevelSelection};
use crate::{
    error::Error,
    manifest::{parse_media_timing, parse_playlist, ParsedPlaylist},
    surface::{MediaInfo, MediaSurface},
    EngineConfig, Rendition, Result,
};
use reqwest::Client;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Builds [`HlsEngine`]s on the current tokio runtime
#[derive(Debug, Default)]
pub struct HlsEngineFactory {
    client: Option<Client>,
}

impl HlsEngineFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Share one HTTP client between every engine
    pub fn with_client(client: Client) -> Self {
        Self { client: Some(client) }
    }
}

impl<S: MediaSurface> EngineFactory<S> for HlsEngineFactory {
    fn is_supported(&self) -> bool {
        Handle::try_current().is_ok()
    }

    fn create(&mut self, config: &EngineConfig) -> Result<Box<dyn AdaptiveEngine<S>>> {
        let engine = match &self.client {
            Some(client) => HlsEngine::with_client(config.clone(), client.clone())?,
            None => HlsEngine::new(config.clone())?,
        };
        Ok(Box::new(engine))
    }
}

type LoadResult = std::result::Result<ParsedPlaylist, String>;

/// Playlist-driven engine for HLS streams
pub struct HlsEngine {
    config: EngineConfig,
    client: Client,
    runtime: Handle,
    task: Option<JoinHandle<()>>,
    loaded: Option<UnboundedReceiver<LoadResult>>,
    pending: VecDeque<EngineEvent>,
    levels: Vec<Rendition>,
    level: LevelSelection,
    media_info: Option<MediaInfo>,
    attached: bool,
    destroyed: bool,
}

impl HlsEngine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()?;
        Self::with_client(config, client)
    }

    pub fn with_client(config: EngineConfig, client: Client) -> Result<Self> {
        let runtime = Handle::try_current()
            .map_err(|e| Error::Engine(format!("HLS engine needs a tokio runtime: {}", e)))?;

        Ok(Self {
            config,
            client,
            runtime,
            task: None,
            loaded: None,
            pending: VecDeque::new(),
            levels: Vec::new(),
            level: LevelSelection::Auto,
            media_info: None,
            attached: false,
            destroyed: false,
        })
    }

    /// Renditions from the parsed manifest
    pub fn levels(&self) -> &[Rendition] {
        &self.levels
    }

    fn auto_level(&self) -> usize {
        select_auto_level(&self.levels, self.config.max_bitrate)
    }

    fn abort_load(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.loaded = None;
    }

    fn on_loaded<S: MediaSurface>(&mut self, playlist: ParsedPlaylist, surface: &mut S) -> EngineEvent {
        let info = MediaInfo {
            duration: playlist.duration,
            is_live: playlist.is_live,
        };
        if self.attached {
            surface.load_media_info(&info);
        }
        self.media_info = Some(info);
        self.levels = playlist.renditions;

        let level = match self.level {
            LevelSelection::Index(i) if i < self.levels.len() => {
                EngineEvent::LevelSwitched { level: i, auto: false }
            }
            _ => EngineEvent::LevelSwitched {
                level: self.auto_level(),
                auto: true,
            },
        };
        self.pending.push_back(level);

        EngineEvent::ManifestParsed {
            levels: self.levels.clone(),
        }
    }
}

impl<S: MediaSurface> AdaptiveEngine<S> for HlsEngine {
    #[instrument(skip(self))]
    fn load_source(&mut self, url: &str) -> Result<()> {
        if self.destroyed {
            return Err(Error::Engine("engine has been destroyed".into()));
        }
        let url = Url::parse(url).map_err(|e| Error::Engine(format!("Invalid stream URL '{}': {}", url, e)))?;

        self.abort_load();
        self.levels.clear();
        self.media_info = None;

        let (tx, rx) = mpsc::unbounded_channel();
        let client = self.client.clone();

        self.task = Some(self.runtime.spawn(async move {
            let result = fetch_stream(&client, &url).await.map_err(|e| e.to_string());
            debug!(url = %url, ok = result.is_ok(), "Manifest load finished");
            let _ = tx.send(result);
        }));
        self.loaded = Some(rx);
        Ok(())
    }

    fn attach_media(&mut self, surface: &mut S) -> Result<()> {
        if self.destroyed {
            return Err(Error::Engine("engine has been destroyed".into()));
        }
        self.attached = true;
        if let Some(info) = &self.media_info {
            surface.load_media_info(info);
        }
        Ok(())
    }

    fn detach_media(&mut self) {
        self.attached = false;
    }

    fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.abort_load();
        self.pending.clear();
        self.attached = false;
        self.destroyed = true;
        debug!("HLS engine destroyed");
    }

    fn current_level(&self) -> LevelSelection {
        self.level
    }

    fn set_current_level(&mut self, level: LevelSelection) {
        if let LevelSelection::Index(index) = level {
            if index >= self.levels.len() {
                self.pending.push_back(EngineEvent::Error {
                    fatal: false,
                    details: format!("level {} is out of range", index),
                });
                return;
            }
        }

        self.level = level;
        if self.levels.is_empty() {
            return;
        }

        let event = match level {
            LevelSelection::Index(index) => EngineEvent::LevelSwitched { level: index, auto: false },
            LevelSelection::Auto => EngineEvent::LevelSwitched {
                level: self.auto_level(),
                auto: true,
            },
        };
        self.pending.push_back(event);
    }

    fn poll_event(&mut self, surface: &mut S) -> Option<EngineEvent> {
        if let Some(event) = self.pending.pop_front() {
            return Some(event);
        }

        let received = self.loaded.as_mut()?.try_recv();
        match received {
            Ok(Ok(playlist)) => {
                self.loaded = None;
                self.task = None;
                Some(self.on_loaded(playlist, surface))
            }
            Ok(Err(details)) => {
                self.loaded = None;
                self.task = None;
                warn!(details = %details, "Manifest load failed");
                Some(EngineEvent::Error { fatal: true, details })
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                self.loaded = None;
                Some(EngineEvent::Error {
                    fatal: true,
                    details: "manifest loader stopped".into(),
                })
            }
        }
    }
}

impl Drop for HlsEngine {
    fn drop(&mut self) {
        self.abort_load();
    }
}

/// Index of the rendition automatic selection starts on.
///
/// The highest bitrate within `max_bitrate` (0 = unlimited), or the lowest
/// bitrate when every rendition exceeds the cap.
pub fn select_auto_level(levels: &[Rendition], max_bitrate: u64) -> usize {
    let within_cap = levels
        .iter()
        .enumerate()
        .filter(|(_, r)| max_bitrate == 0 || r.bitrate <= max_bitrate)
        .max_by_key(|(_, r)| r.bitrate)
        .map(|(i, _)| i);

    within_cap
        .or_else(|| {
            levels
                .iter()
                .enumerate()
                .min_by_key(|(_, r)| r.bitrate)
                .map(|(i, _)| i)
        })
        .unwrap_or(0)
}

async fn fetch_text(client: &Client, url: &Url) -> Result<String> {
    let response = client.get(url.as_str()).send().await?.error_for_status()?;
    Ok(response.text().await?)
}

/// Fetch a stream's entry playlist, and its first variant for timing
#[instrument(skip(client), fields(url = %url))]
async fn fetch_stream(client: &Client, url: &Url) -> Result<ParsedPlaylist> {
    let content = fetch_text(client, url).await?;
    let mut playlist = parse_playlist(&content, url)?;

    if playlist.is_master {
        let variant = playlist
            .renditions
            .first()
            .and_then(|r| r.uri.as_deref())
            .and_then(|uri| Url::parse(uri).ok());

        if let Some(variant) = variant {
            match fetch_text(client, &variant).await.and_then(|c| parse_media_timing(&c)) {
                Ok((duration, is_live)) => {
                    playlist.duration = duration;
                    playlist.is_live = is_live;
                }
                Err(e) => warn!(variant = %variant, error = %e, "Variant playlist unavailable"),
            }
        }
    }

    info!(
        renditions = playlist.renditions.len(),
        duration = ?playlist.duration,
        is_live = playlist.is_live,
        "Stream manifest loaded"
    );
    Ok(playlist)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::HeadlessSurface;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    const MASTER: &str = "#EXTM3U
#EXT-X-STREAM-INF:BANDWIDTH=800000,RESOLUTION=640x360
low/index.m3u8
#EXT-X-STREAM-INF:BANDWIDTH=2800000,RESOLUTION=1280x720
mid/index.m3u8
#EXT-X-STREAM-INF:BANDWIDTH=5000000,RESOLUTION=1920x1080
high/index.m3u8
";

    const MEDIA: &str = "#EXTM3U
#EXT-X-TARGETDURATION:6
#EXTINF:6.0,
seg0.ts
#EXTINF:6.0,
seg1.ts
#EXT-X-ENDLIST
";

    /// Serve the master playlist at `/master.m3u8` and a media playlist elsewhere
    async fn serve_playlists() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                tokio::spawn(async move {
                    let mut buf = vec![0u8; 4096];
                    let n = socket.read(&mut buf).await.unwrap_or(0);
                    let request = String::from_utf8_lossy(&buf[..n]);
                    let (status, body) = if request.starts_with("GET /master.m3u8") {
                        ("200 OK", MASTER)
                    } else if request.starts_with("GET /missing.m3u8") {
                        ("404 Not Found", "")
                    } else {
                        ("200 OK", MEDIA)
                    };
                    let response = format!(
                        "HTTP/1.1 {}\r\nContent-Type: application/vnd.apple.mpegurl\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        status,
                        body.len(),
                        body
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                });
            }
        });

        format!("http://{}", addr)
    }

    async fn next_event(engine: &mut HlsEngine, surface: &mut HeadlessSurface) -> EngineEvent {
        for _ in 0..200 {
            if let Some(event) = AdaptiveEngine::<HeadlessSurface>::poll_event(engine, surface) {
                return event;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("engine produced no event");
    }

    fn local_engine() -> HlsEngine {
        let client = Client::builder().no_proxy().build().unwrap();
        HlsEngine::with_client(EngineConfig::default(), client).unwrap()
    }

    fn rendition(bitrate: u64) -> Rendition {
        Rendition::new(0, bitrate)
    }

    #[test]
    fn test_select_auto_level() {
        let levels = vec![rendition(800), rendition(2_800), rendition(5_000)];
        assert_eq!(select_auto_level(&levels, 0), 2);
        assert_eq!(select_auto_level(&levels, 3_000), 1);
        assert_eq!(select_auto_level(&levels, 100), 0);
        assert_eq!(select_auto_level(&[], 0), 0);
    }

    #[test]
    fn test_factory_needs_runtime() {
        let factory = HlsEngineFactory::new();
        assert!(!EngineFactory::<HeadlessSurface>::is_supported(&factory));
    }

    #[tokio::test]
    async fn test_loads_master_playlist() {
        let base = serve_playlists().await;
        let mut surface = HeadlessSurface::new();
        let mut engine = local_engine();

        AdaptiveEngine::<HeadlessSurface>::load_source(&mut engine, &format!("{}/master.m3u8", base)).unwrap();
        engine.attach_media(&mut surface).unwrap();

        match next_event(&mut engine, &mut surface).await {
            EngineEvent::ManifestParsed { levels } => {
                let heights: Vec<u32> = levels.iter().map(|r| r.height).collect();
                assert_eq!(heights, vec![360, 720, 1080]);
            }
            other => panic!("unexpected event {:?}", other),
        }
        assert_eq!(
            next_event(&mut engine, &mut surface).await,
            EngineEvent::LevelSwitched { level: 2, auto: true }
        );
        assert_eq!(surface.duration(), Some(12.0));

        AdaptiveEngine::<HeadlessSurface>::set_current_level(&mut engine, LevelSelection::Index(0));
        assert_eq!(
            next_event(&mut engine, &mut surface).await,
            EngineEvent::LevelSwitched { level: 0, auto: false }
        );
        AdaptiveEngine::<HeadlessSurface>::destroy(&mut engine);
    }

    #[tokio::test]
    async fn test_http_failure_is_fatal() {
        let base = serve_playlists().await;
        let mut surface = HeadlessSurface::new();
        let mut engine = local_engine();

        AdaptiveEngine::<HeadlessSurface>::load_source(&mut engine, &format!("{}/missing.m3u8", base)).unwrap();
        assert!(matches!(
            next_event(&mut engine, &mut surface).await,
            EngineEvent::Error { fatal: true, .. }
        ));
    }

    #[tokio::test]
    async fn test_invalid_url_and_destroyed_engine() {
        let mut engine = HlsEngine::new(EngineConfig::default()).unwrap();
        assert!(AdaptiveEngine::<HeadlessSurface>::load_source(&mut engine, "not a url").is_err());

        AdaptiveEngine::<HeadlessSurface>::destroy(&mut engine);
        AdaptiveEngine::<HeadlessSurface>::destroy(&mut engine);
        assert!(AdaptiveEngine::<HeadlessSurface>::load_source(&mut engine, "https://example.com/a.m3u8").is_err());
    }
}
