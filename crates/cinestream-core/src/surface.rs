//! Media surface seam and the headless surface used off-browser
//!
//! A media surface is the renderable target an engine attaches to. Hosts
//! implement [`MediaSurface`] over whatever they render with; the
//! [`HeadlessSurface`] simulates one with a manual clock.

use crate::{Error, Result};
use std::collections::{HashMap, VecDeque};
use tracing::debug;

/// Handle for a registered listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub u64);

/// Vendor flavours of the document-level fullscreen notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FullscreenVariant {
    Standard,
    Webkit,
    Moz,
    Ms,
}

impl FullscreenVariant {
    pub const ALL: [FullscreenVariant; 4] = [
        FullscreenVariant::Standard,
        FullscreenVariant::Webkit,
        FullscreenVariant::Moz,
        FullscreenVariant::Ms,
    ];

    /// DOM event name
    pub fn event_name(&self) -> &'static str {
        match self {
            FullscreenVariant::Standard => "fullscreenchange",
            FullscreenVariant::Webkit => "webkitfullscreenchange",
            FullscreenVariant::Moz => "mozfullscreenchange",
            FullscreenVariant::Ms => "MSFullscreenChange",
        }
    }

    /// Document property holding the fullscreen element
    pub fn element_property(&self) -> &'static str {
        match self {
            FullscreenVariant::Standard => "fullscreenElement",
            FullscreenVariant::Webkit => "webkitFullscreenElement",
            FullscreenVariant::Moz => "mozFullScreenElement",
            FullscreenVariant::Ms => "msFullscreenElement",
        }
    }
}

/// Kinds of notifications a controller subscribes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaEventKind {
    TimeUpdate,
    DurationChange,
    Play,
    Pause,
    VolumeChange,
    /// Observed on the document rather than the surface itself
    Fullscreen(FullscreenVariant),
}

impl MediaEventKind {
    /// Every kind a controller registers at mount
    pub fn all() -> Vec<MediaEventKind> {
        let mut kinds = vec![
            MediaEventKind::TimeUpdate,
            MediaEventKind::DurationChange,
            MediaEventKind::Play,
            MediaEventKind::Pause,
            MediaEventKind::VolumeChange,
        ];
        kinds.extend(FullscreenVariant::ALL.iter().copied().map(MediaEventKind::Fullscreen));
        kinds
    }

    /// DOM event name
    pub fn event_name(&self) -> &'static str {
        match self {
            MediaEventKind::TimeUpdate => "timeupdate",
            MediaEventKind::DurationChange => "durationchange",
            MediaEventKind::Play => "play",
            MediaEventKind::Pause => "pause",
            MediaEventKind::VolumeChange => "volumechange",
            MediaEventKind::Fullscreen(variant) => variant.event_name(),
        }
    }
}

/// Notifications raised by a surface. Values are read back from the surface.
#[derive(Debug, Clone, PartialEq)]
pub enum MediaEvent {
    TimeUpdate,
    DurationChange,
    Play,
    Pause,
    VolumeChange,
    FullscreenChange,
    /// An asynchronous refusal of a play request
    PlayRejected { reason: String },
}

impl MediaEvent {
    /// Whether a listener of `kind` receives this event
    pub fn is_observed_by(&self, kind: MediaEventKind) -> bool {
        matches!(
            (self, kind),
            (MediaEvent::TimeUpdate, MediaEventKind::TimeUpdate)
                | (MediaEvent::DurationChange, MediaEventKind::DurationChange)
                | (MediaEvent::Play, MediaEventKind::Play)
                | (MediaEvent::Pause, MediaEventKind::Pause)
                | (MediaEvent::VolumeChange, MediaEventKind::VolumeChange)
                | (MediaEvent::FullscreenChange, MediaEventKind::Fullscreen(_))
        )
    }
}

/// Stream metadata supplied by engines that decode out-of-band
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MediaInfo {
    /// Total duration in seconds, `None` for live streams
    pub duration: Option<f64>,
    pub is_live: bool,
}

/// A renderable media target
pub trait MediaSurface {
    /// Whether the surface can play the MIME type without an engine
    fn can_play_type(&self, mime_type: &str) -> bool;

    /// Assign a stream address directly
    fn set_source(&mut self, url: &str);

    /// Drop a directly assigned stream
    fn clear_source(&mut self);

    /// Request playback. Refusals may also arrive later as [`MediaEvent::PlayRejected`].
    fn play(&mut self) -> Result<()>;

    fn pause(&mut self);

    fn is_muted(&self) -> bool;

    fn set_muted(&mut self, muted: bool);

    /// Playback position in seconds
    fn current_time(&self) -> f64;

    /// Total duration in seconds, once known
    fn duration(&self) -> Option<f64>;

    fn seek(&mut self, position: f64);

    /// Whether the document currently shows an element fullscreen
    fn is_fullscreen(&self) -> bool;

    fn request_fullscreen(&mut self) -> Result<()>;

    fn exit_fullscreen(&mut self) -> Result<()>;

    fn add_listener(&mut self, kind: MediaEventKind) -> ListenerId;

    fn remove_listener(&mut self, id: ListenerId);

    /// Number of listeners currently registered
    fn listener_count(&self) -> usize;

    /// Next buffered event, if any
    fn poll_event(&mut self) -> Option<MediaEvent>;

    /// Receive metadata from an engine that does not feed the surface itself
    fn load_media_info(&mut self, _info: &MediaInfo) {}
}

/// Simulated surface with a manual clock
#[derive(Debug)]
pub struct HeadlessSurface {
    source: Option<String>,
    native_types: Vec<String>,
    autoplay_allowed: bool,
    playing: bool,
    muted: bool,
    position: f64,
    duration: Option<f64>,
    fullscreen: bool,
    listeners: HashMap<ListenerId, MediaEventKind>,
    next_listener: u64,
    events: VecDeque<MediaEvent>,
}

impl HeadlessSurface {
    pub fn new() -> Self {
        Self {
            source: None,
            native_types: Vec::new(),
            autoplay_allowed: true,
            playing: false,
            muted: false,
            position: 0.0,
            duration: None,
            fullscreen: false,
            listeners: HashMap::new(),
            next_listener: 0,
            events: VecDeque::new(),
        }
    }

    /// Declare a MIME type the surface plays natively
    pub fn with_native_type(mut self, mime_type: impl Into<String>) -> Self {
        self.native_types.push(mime_type.into());
        self
    }

    /// Whether play requests are honoured
    pub fn with_autoplay(mut self, allowed: bool) -> Self {
        self.autoplay_allowed = allowed;
        self
    }

    pub fn set_autoplay_allowed(&mut self, allowed: bool) {
        self.autoplay_allowed = allowed;
    }

    /// Directly assigned stream, if any
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Advance the clock by `seconds` of wall time
    pub fn advance(&mut self, seconds: f64) {
        if !self.playing || seconds <= 0.0 {
            return;
        }

        let next = self.position + seconds;
        match self.duration {
            Some(duration) if next >= duration => {
                self.position = duration;
                self.emit(MediaEvent::TimeUpdate);
                self.playing = false;
                self.emit(MediaEvent::Pause);
            }
            _ => {
                self.position = next;
                self.emit(MediaEvent::TimeUpdate);
            }
        }
    }

    fn reset_media(&mut self) {
        let was_playing = self.playing;
        self.position = 0.0;
        self.duration = None;
        self.playing = false;
        if was_playing {
            self.emit(MediaEvent::Pause);
        }
    }

    fn emit(&mut self, event: MediaEvent) {
        let observed = matches!(event, MediaEvent::PlayRejected { .. })
            || self.listeners.values().any(|kind| event.is_observed_by(*kind));
        if observed {
            self.events.push_back(event);
        }
    }
}

impl Default for HeadlessSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaSurface for HeadlessSurface {
    fn can_play_type(&self, mime_type: &str) -> bool {
        self.native_types.iter().any(|t| t.eq_ignore_ascii_case(mime_type))
    }

    fn set_source(&mut self, url: &str) {
        self.reset_media();
        self.source = Some(url.to_string());
    }

    fn clear_source(&mut self) {
        self.reset_media();
        self.source = None;
    }

    fn play(&mut self) -> Result<()> {
        if !self.autoplay_allowed {
            return Err(Error::PlaybackRejected(
                "play() is not allowed without a user gesture".into(),
            ));
        }
        if !self.playing {
            self.playing = true;
            self.emit(MediaEvent::Play);
        }
        Ok(())
    }

    fn pause(&mut self) {
        if self.playing {
            self.playing = false;
            self.emit(MediaEvent::Pause);
        }
    }

    fn is_muted(&self) -> bool {
        self.muted
    }

    fn set_muted(&mut self, muted: bool) {
        if self.muted != muted {
            self.muted = muted;
            self.emit(MediaEvent::VolumeChange);
        }
    }

    fn current_time(&self) -> f64 {
        self.position
    }

    fn duration(&self) -> Option<f64> {
        self.duration
    }

    fn seek(&mut self, position: f64) {
        let upper = self.duration.unwrap_or(f64::MAX);
        self.position = position.clamp(0.0, upper);
        self.emit(MediaEvent::TimeUpdate);
    }

    fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }

    fn request_fullscreen(&mut self) -> Result<()> {
        if !self.fullscreen {
            self.fullscreen = true;
            self.emit(MediaEvent::FullscreenChange);
        }
        Ok(())
    }

    fn exit_fullscreen(&mut self) -> Result<()> {
        if self.fullscreen {
            self.fullscreen = false;
            self.emit(MediaEvent::FullscreenChange);
        }
        Ok(())
    }

    fn add_listener(&mut self, kind: MediaEventKind) -> ListenerId {
        self.next_listener += 1;
        let id = ListenerId(self.next_listener);
        self.listeners.insert(id, kind);
        debug!(listener = id.0, event = kind.event_name(), "Listener added");
        id
    }

    fn remove_listener(&mut self, id: ListenerId) {
        if let Some(kind) = self.listeners.remove(&id) {
            debug!(listener = id.0, event = kind.event_name(), "Listener removed");
        }
    }

    fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    fn poll_event(&mut self) -> Option<MediaEvent> {
        self.events.pop_front()
    }

    fn load_media_info(&mut self, info: &MediaInfo) {
        self.duration = info.duration.filter(|d| d.is_finite() && *d > 0.0);
        self.emit(MediaEvent::DurationChange);
    }
}
