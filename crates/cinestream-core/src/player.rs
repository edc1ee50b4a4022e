//! Playback Controller - binds a stream to a media surface
//!
//! Coordinates:
//! - Engine lifecycle (one engine per bound URL, released on rebind/unmount)
//! - Native fallback when no adaptive engine is available
//! - Quality ladder publication and rendition switching
//! - Republishing surface events to the host
//! - Applying host playback intents

use crate::{
    engine::{AdaptiveEngine, EngineEvent, EngineFactory, LevelSelection},
    manifest::{detect_stream_kind, StreamKind},
    quality::{quality_ladder, rendition_index},
    surface::{ListenerId, MediaEvent, MediaEventKind, MediaSurface},
    Error, PlayerConfig, Quality, Rendition, Result,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// Unique identifier of a mounted player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How the current URL reached the surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BindingMode {
    /// Through an adaptive engine, with quality switching
    Adaptive,
    /// Assigned directly to the surface, no quality switching
    Native,
    /// Neither path is available; nothing plays
    Inert,
}

/// Published playback session state
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackState {
    pub position: f64,
    pub duration: Option<f64>,
    pub playing: bool,
    pub muted: bool,
    pub fullscreen: bool,
    pub available_qualities: Vec<Quality>,
    pub active_quality: Quality,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            position: 0.0,
            duration: None,
            playing: false,
            muted: false,
            fullscreen: false,
            available_qualities: vec![Quality::Auto],
            active_quality: Quality::Auto,
        }
    }
}

/// Callbacks notified when published state changes. Absent callbacks are skipped.
#[derive(Default)]
pub struct PlaybackObserver {
    on_time_update: Option<Box<dyn FnMut(f64)>>,
    on_duration_change: Option<Box<dyn FnMut(f64)>>,
    on_play_state: Option<Box<dyn FnMut(bool)>>,
    on_mute: Option<Box<dyn FnMut(bool)>>,
    on_fullscreen_change: Option<Box<dyn FnMut(bool)>>,
    on_quality_levels: Option<Box<dyn FnMut(&[Quality])>>,
    on_active_quality: Option<Box<dyn FnMut(Quality)>>,
    on_error: Option<Box<dyn FnMut(&Error)>>,
}

impl PlaybackObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_time_update(mut self, f: impl FnMut(f64) + 'static) -> Self {
        self.on_time_update = Some(Box::new(f));
        self
    }

    pub fn on_duration_change(mut self, f: impl FnMut(f64) + 'static) -> Self {
        self.on_duration_change = Some(Box::new(f));
        self
    }

    pub fn on_play_state(mut self, f: impl FnMut(bool) + 'static) -> Self {
        self.on_play_state = Some(Box::new(f));
        self
    }

    pub fn on_mute(mut self, f: impl FnMut(bool) + 'static) -> Self {
        self.on_mute = Some(Box::new(f));
        self
    }

    pub fn on_fullscreen_change(mut self, f: impl FnMut(bool) + 'static) -> Self {
        self.on_fullscreen_change = Some(Box::new(f));
        self
    }

    pub fn on_quality_levels(mut self, f: impl FnMut(&[Quality]) + 'static) -> Self {
        self.on_quality_levels = Some(Box::new(f));
        self
    }

    pub fn on_active_quality(mut self, f: impl FnMut(Quality) + 'static) -> Self {
        self.on_active_quality = Some(Box::new(f));
        self
    }

    pub fn on_error(mut self, f: impl FnMut(&Error) + 'static) -> Self {
        self.on_error = Some(Box::new(f));
        self
    }
}

/// Externally owned playback intents
#[derive(Debug, Clone, Copy, PartialEq, Default)]
struct Intents {
    playing: bool,
    muted: bool,
    desired_quality: Quality,
}

/// The URL currently bound to the surface
struct Binding<S> {
    url: String,
    mode: BindingMode,
    engine: Option<Box<dyn AdaptiveEngine<S>>>,
    levels: Vec<Rendition>,
}

/// Owns a media surface and mediates between it, an adaptive engine and the host
pub struct PlaybackController<S: MediaSurface + 'static> {
    id: SessionId,
    config: PlayerConfig,
    surface: S,
    factory: Box<dyn EngineFactory<S>>,
    observer: PlaybackObserver,
    state: PlaybackState,
    intents: Intents,
    listeners: Vec<ListenerId>,
    binding: Option<Binding<S>>,
    mounted: bool,
}

impl<S: MediaSurface + 'static> PlaybackController<S> {
    /// Create an unmounted controller owning `surface`
    pub fn new(surface: S, factory: impl EngineFactory<S> + 'static, config: PlayerConfig) -> Self {
        Self {
            id: SessionId::new(),
            config,
            surface,
            factory: Box::new(factory),
            observer: PlaybackObserver::default(),
            state: PlaybackState::default(),
            intents: Intents::default(),
            listeners: Vec::new(),
            binding: None,
            mounted: false,
        }
    }

    /// Replace the observer
    pub fn with_observer(mut self, observer: PlaybackObserver) -> Self {
        self.observer = observer;
        self
    }

    pub fn set_observer(&mut self, observer: PlaybackObserver) {
        self.observer = observer;
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Mutable access for hosts that drive the surface (e.g. a simulated clock)
    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn url(&self) -> Option<&str> {
        self.binding.as_ref().map(|b| b.url.as_str())
    }

    pub fn binding_mode(&self) -> Option<BindingMode> {
        self.binding.as_ref().map(|b| b.mode)
    }

    pub fn desired_quality(&self) -> Quality {
        self.intents.desired_quality
    }

    /// Renditions reported by the current engine
    pub fn renditions(&self) -> &[Rendition] {
        self.binding.as_ref().map(|b| b.levels.as_slice()).unwrap_or(&[])
    }

    /// Register listeners, bind `url` and apply the current intents.
    ///
    /// Binding failures are published to the error callback and returned;
    /// the controller stays mounted so a later [`set_url`](Self::set_url) can recover.
    #[instrument(skip(self), fields(session = %self.id))]
    pub fn mount(&mut self, url: &str) -> Result<BindingMode> {
        if self.mounted {
            return self.set_url(url);
        }

        self.acquire_listeners();
        self.mounted = true;
        info!(url = %url, "Player mounted");

        let mode = self.bind(url);
        self.surface.set_muted(self.intents.muted);
        if self.intents.playing {
            let _ = self.apply_playing();
        }
        mode
    }

    /// Rebind to a different URL, releasing the previous engine first
    #[instrument(skip(self), fields(session = %self.id))]
    pub fn set_url(&mut self, url: &str) -> Result<BindingMode> {
        if !self.mounted {
            return Err(Error::NotMounted);
        }
        if let Some(binding) = &self.binding {
            if binding.url == url {
                return Ok(binding.mode);
            }
        }

        self.release_binding();
        self.settle_surface();
        let mode = self.bind(url);
        if self.intents.playing {
            let _ = self.apply_playing();
        }
        mode
    }

    /// Release the engine and every listener registered at mount
    #[instrument(skip(self), fields(session = %self.id))]
    pub fn unmount(&mut self) {
        if !self.mounted {
            return;
        }

        self.release_binding();
        self.settle_surface();
        self.release_listeners();
        self.mounted = false;
        info!("Player unmounted");
    }

    /// Apply the `playing` intent.
    ///
    /// A refused play request is logged, published to the error callback and
    /// returned; the published `playing` flag stays false. On an inert binding
    /// the intent is kept for the next URL and `StreamUnsupported` is returned.
    pub fn set_playing(&mut self, playing: bool) -> Result<()> {
        self.intents.playing = playing;
        if !self.mounted {
            return Ok(());
        }
        self.apply_playing()
    }

    /// Apply the `muted` intent
    pub fn set_muted(&mut self, muted: bool) {
        self.intents.muted = muted;
        if self.mounted {
            self.surface.set_muted(muted);
        }
    }

    /// Apply the desired quality intent.
    ///
    /// Returns whether a rendition switch was issued. Requests for the level the
    /// engine is already on, requests before the manifest is parsed, and requests
    /// in native mode issue nothing; a pending request is applied once the
    /// manifest arrives.
    pub fn set_desired_quality(&mut self, quality: Quality) -> Result<bool> {
        self.intents.desired_quality = quality;
        if !self.mounted {
            return Ok(false);
        }
        self.apply_desired_quality()
    }

    /// Seek, clamped to the known duration
    pub fn seek(&mut self, position: f64) -> Result<()> {
        if !self.mounted {
            return Err(Error::NotMounted);
        }

        let target = clamp_position(position, self.state.duration.or(self.surface.duration()));
        debug!(from = self.state.position, to = target, "Seeking");
        self.surface.seek(target);
        Ok(())
    }

    /// Enter or leave fullscreen on the owned surface
    pub fn set_fullscreen(&mut self, fullscreen: bool) -> Result<()> {
        if !self.mounted {
            return Err(Error::NotMounted);
        }

        let result = if fullscreen {
            self.surface.request_fullscreen()
        } else {
            self.surface.exit_fullscreen()
        };
        if let Err(e) = &result {
            warn!(error = %e, fullscreen, "Fullscreen request failed");
            self.report(e);
        }
        result
    }

    /// Drain and handle every buffered surface and engine event, in order.
    ///
    /// Returns the number of events handled.
    pub fn pump(&mut self) -> usize {
        let mut handled = 0;

        loop {
            let before = handled;

            while let Some(event) = self.surface.poll_event() {
                self.handle_media_event(event);
                handled += 1;
            }

            while let Some(event) = self.next_engine_event() {
                self.handle_engine_event(event);
                handled += 1;
            }

            if handled == before {
                return handled;
            }
        }
    }

    fn next_engine_event(&mut self) -> Option<EngineEvent> {
        let engine = self.binding.as_mut()?.engine.as_mut()?;
        engine.poll_event(&mut self.surface)
    }

    /// Republish one surface event
    pub fn handle_media_event(&mut self, event: MediaEvent) {
        match event {
            MediaEvent::TimeUpdate => {
                let position = clamp_position(self.surface.current_time(), self.state.duration);
                self.publish_position(position);
            }
            MediaEvent::DurationChange => {
                let duration = self.surface.duration().filter(|d| d.is_finite() && *d >= 0.0);
                if duration != self.state.duration {
                    self.state.duration = duration;
                    if let (Some(d), Some(f)) = (duration, self.observer.on_duration_change.as_mut()) {
                        f(d);
                    }
                    let position = clamp_position(self.state.position, duration);
                    self.publish_position(position);
                }
            }
            MediaEvent::Play => self.publish_playing(true),
            MediaEvent::Pause => self.publish_playing(false),
            MediaEvent::VolumeChange => {
                let muted = self.surface.is_muted();
                self.intents.muted = muted;
                if muted != self.state.muted {
                    self.state.muted = muted;
                    if let Some(f) = self.observer.on_mute.as_mut() {
                        f(muted);
                    }
                }
            }
            MediaEvent::FullscreenChange => {
                let fullscreen = self.surface.is_fullscreen();
                if fullscreen != self.state.fullscreen {
                    self.state.fullscreen = fullscreen;
                    if let Some(f) = self.observer.on_fullscreen_change.as_mut() {
                        f(fullscreen);
                    }
                }
            }
            MediaEvent::PlayRejected { reason } => {
                warn!(reason = %reason, "Play request rejected");
                self.report(&Error::PlaybackRejected(reason));
            }
        }
    }

    /// Handle one engine notification
    pub fn handle_engine_event(&mut self, event: EngineEvent) {
        let Some(binding) = self.binding.as_mut() else {
            debug!(?event, "Engine event without a binding dropped");
            return;
        };

        match event {
            EngineEvent::ManifestParsed { levels } => {
                let ladder = quality_ladder(&levels, self.config.quality_policy);
                info!(
                    renditions = levels.len(),
                    qualities = ?ladder.iter().map(Quality::to_string).collect::<Vec<_>>(),
                    "Manifest parsed"
                );
                binding.levels = levels;
                self.publish_qualities(ladder);

                if self.intents.desired_quality != Quality::Auto {
                    if let Err(e) = self.apply_desired_quality() {
                        warn!(error = %e, "Pending quality could not be applied");
                        self.report(&e);
                    }
                }
            }
            EngineEvent::LevelSwitched { level, auto } => {
                let quality = if auto {
                    Some(Quality::Auto)
                } else {
                    binding.levels.get(level).map(Rendition::quality)
                };

                match quality {
                    Some(quality) => {
                        debug!(level, auto, quality = %quality, "Level switched");
                        self.publish_active_quality(quality);
                    }
                    None => warn!(level, "Switched to a level missing from the manifest"),
                }
            }
            EngineEvent::Error { fatal, details } => {
                if !fatal {
                    warn!(details = %details, "Engine reported a recoverable error");
                    return;
                }

                let err = if binding.levels.is_empty() {
                    Error::manifest_load(binding.url.clone(), details)
                } else {
                    Error::Engine(details)
                };
                error!(error = %err, "Engine reported a fatal error");
                self.report(&err);
            }
        }
    }

    fn bind(&mut self, url: &str) -> Result<BindingMode> {
        self.reset_stream_state();
        let kind = detect_stream_kind(url, None);

        if kind == StreamKind::Hls && self.factory.is_supported() {
            return match self.create_engine(url) {
                Ok(engine) => {
                    info!(url = %url, "Bound through adaptive engine");
                    self.binding = Some(Binding {
                        url: url.to_string(),
                        mode: BindingMode::Adaptive,
                        engine: Some(engine),
                        levels: Vec::new(),
                    });
                    Ok(BindingMode::Adaptive)
                }
                Err(e) => {
                    let err = Error::manifest_load(url, e.to_string());
                    error!(error = %err, "Adaptive engine could not load the stream");
                    self.binding = Some(Binding {
                        url: url.to_string(),
                        mode: BindingMode::Inert,
                        engine: None,
                        levels: Vec::new(),
                    });
                    self.report(&err);
                    Err(err)
                }
            };
        }

        if self.surface.can_play_type(kind.mime_type()) {
            info!(url = %url, "Adaptive engine unavailable, using native playback");
            self.surface.set_source(url);
            self.binding = Some(Binding {
                url: url.to_string(),
                mode: BindingMode::Native,
                engine: None,
                levels: Vec::new(),
            });
            return Ok(BindingMode::Native);
        }

        let err = Error::StreamUnsupported { url: url.to_string() };
        warn!(url = %url, "No playback path for stream");
        self.binding = Some(Binding {
            url: url.to_string(),
            mode: BindingMode::Inert,
            engine: None,
            levels: Vec::new(),
        });
        self.report(&err);
        Err(err)
    }

    fn create_engine(&mut self, url: &str) -> Result<Box<dyn AdaptiveEngine<S>>> {
        let mut engine = self.factory.create(&self.config.engine)?;

        let loaded = engine
            .load_source(url)
            .and_then(|_| engine.attach_media(&mut self.surface));

        match loaded {
            Ok(()) => Ok(engine),
            Err(e) => {
                engine.destroy();
                Err(e)
            }
        }
    }

    fn release_binding(&mut self) {
        let Some(binding) = self.binding.take() else {
            return;
        };

        match binding.mode {
            BindingMode::Adaptive => {
                if let Some(mut engine) = binding.engine {
                    engine.detach_media();
                    engine.destroy();
                }
                self.surface.clear_source();
            }
            BindingMode::Native => self.surface.clear_source(),
            BindingMode::Inert => {}
        }
        debug!(url = %binding.url, mode = ?binding.mode, "Binding released");
    }

    /// Republish what releasing a binding did to the surface. The host's
    /// `playing` intent outlives the binding.
    fn settle_surface(&mut self) {
        let playing = self.intents.playing;
        while let Some(event) = self.surface.poll_event() {
            self.handle_media_event(event);
        }
        self.intents.playing = playing;
    }

    fn acquire_listeners(&mut self) {
        for kind in MediaEventKind::all() {
            let id = self.surface.add_listener(kind);
            self.listeners.push(id);
        }
    }

    fn release_listeners(&mut self) {
        for id in self.listeners.drain(..) {
            self.surface.remove_listener(id);
        }
    }

    fn apply_playing(&mut self) -> Result<()> {
        if !self.intents.playing {
            self.surface.pause();
            return Ok(());
        }
        if let Some(binding) = self.binding.as_ref().filter(|b| b.mode == BindingMode::Inert) {
            debug!(url = %binding.url, "Play intent held, no playback path");
            return Err(Error::StreamUnsupported { url: binding.url.clone() });
        }

        match self.surface.play() {
            Ok(()) => Ok(()),
            Err(e) => {
                warn!(error = %e, "Play request rejected");
                self.report(&e);
                Err(e)
            }
        }
    }

    fn apply_desired_quality(&mut self) -> Result<bool> {
        let quality = self.intents.desired_quality;
        let Some(binding) = self.binding.as_mut() else {
            return Ok(false);
        };
        let Some(engine) = binding.engine.as_mut() else {
            debug!(quality = %quality, mode = ?binding.mode, "Quality switching unavailable");
            return Ok(false);
        };
        if binding.levels.is_empty() {
            debug!(quality = %quality, "Quality request pending until manifest is parsed");
            return Ok(false);
        }

        let target = match quality {
            Quality::Auto => LevelSelection::Auto,
            Quality::Height(height) => rendition_index(&binding.levels, height)
                .map(LevelSelection::Index)
                .ok_or_else(|| Error::UnknownQuality(quality.to_string()))?,
        };

        if engine.current_level() == target {
            return Ok(false);
        }

        info!(quality = %quality, target = %target, "Switching rendition");
        engine.set_current_level(target);
        Ok(true)
    }

    fn reset_stream_state(&mut self) {
        self.state.duration = None;
        self.publish_position(0.0);
        self.publish_qualities(vec![Quality::Auto]);
        self.publish_active_quality(Quality::Auto);
    }

    fn publish_position(&mut self, position: f64) {
        if position != self.state.position {
            self.state.position = position;
            if let Some(f) = self.observer.on_time_update.as_mut() {
                f(position);
            }
        }
    }

    fn publish_playing(&mut self, playing: bool) {
        self.intents.playing = playing;
        if playing != self.state.playing {
            self.state.playing = playing;
            if let Some(f) = self.observer.on_play_state.as_mut() {
                f(playing);
            }
        }
    }

    fn publish_qualities(&mut self, qualities: Vec<Quality>) {
        if qualities != self.state.available_qualities {
            self.state.available_qualities = qualities;
            if let Some(f) = self.observer.on_quality_levels.as_mut() {
                f(&self.state.available_qualities);
            }
        }
    }

    fn publish_active_quality(&mut self, quality: Quality) {
        if quality != self.state.active_quality {
            self.state.active_quality = quality;
            if let Some(f) = self.observer.on_active_quality.as_mut() {
                f(quality);
            }
        }
    }

    fn report(&mut self, err: &Error) {
        if let Some(f) = self.observer.on_error.as_mut() {
            f(err);
        }
    }
}

impl<S: MediaSurface + 'static> Drop for PlaybackController<S> {
    fn drop(&mut self) {
        self.unmount();
    }
}

fn clamp_position(position: f64, duration: Option<f64>) -> f64 {
    if !position.is_finite() {
        return 0.0;
    }
    match duration {
        Some(d) => position.clamp(0.0, d.max(0.0)),
        None => position.max(0.0),
    }
}
