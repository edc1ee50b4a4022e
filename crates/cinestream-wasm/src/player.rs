//! JavaScript-facing playback controller

use crate::hls::HlsJsFactory;
use crate::surface::{Notify, VideoSurface};
use cinestream_core::{Error, PlaybackController, PlaybackObserver, PlayerConfig, Quality, Recovery};
use js_sys::{Function, Reflect};
use serde::Serialize;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::{Rc, Weak};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

/// A published state change waiting to be delivered to JavaScript
enum Notification {
    TimeUpdate(f64),
    DurationChange(f64),
    PlayState(bool),
    Mute(bool),
    Fullscreen(bool),
    QualityLevels(Vec<String>),
    ActiveQuality(String),
    Error(ErrorPayload),
}

#[derive(Serialize)]
struct ErrorPayload {
    code: &'static str,
    message: String,
    recovery: Recovery,
}

type Outbox = Rc<RefCell<VecDeque<Notification>>>;

/// Host callbacks read from the object passed to the constructor
#[derive(Default)]
struct Callbacks {
    on_time_update: Option<Function>,
    on_duration_change: Option<Function>,
    on_play_state: Option<Function>,
    on_mute: Option<Function>,
    on_fullscreen_change: Option<Function>,
    on_quality_levels: Option<Function>,
    on_active_quality: Option<Function>,
    on_error: Option<Function>,
}

impl Callbacks {
    fn from_js(callbacks: &JsValue) -> Self {
        if !callbacks.is_object() {
            return Self::default();
        }
        let get = |key: &str| {
            Reflect::get(callbacks, &JsValue::from_str(key))
                .ok()
                .and_then(|f| f.dyn_into::<Function>().ok())
        };

        Self {
            on_time_update: get("onTimeUpdate"),
            on_duration_change: get("onDurationChange"),
            on_play_state: get("onPlayStateChange"),
            on_mute: get("onMuteChange"),
            on_fullscreen_change: get("onFullscreenChange"),
            on_quality_levels: get("onQualityLevels"),
            on_active_quality: get("onActiveQuality"),
            on_error: get("onError"),
        }
    }

    fn deliver(&self, notification: Notification) {
        let (callback, value) = match notification {
            Notification::TimeUpdate(t) => (&self.on_time_update, JsValue::from_f64(t)),
            Notification::DurationChange(d) => (&self.on_duration_change, JsValue::from_f64(d)),
            Notification::PlayState(p) => (&self.on_play_state, JsValue::from_bool(p)),
            Notification::Mute(m) => (&self.on_mute, JsValue::from_bool(m)),
            Notification::Fullscreen(f) => (&self.on_fullscreen_change, JsValue::from_bool(f)),
            Notification::QualityLevels(levels) => (
                &self.on_quality_levels,
                serde_wasm_bindgen::to_value(&levels).unwrap_or(JsValue::NULL),
            ),
            Notification::ActiveQuality(q) => (&self.on_active_quality, JsValue::from_str(&q)),
            Notification::Error(payload) => (
                &self.on_error,
                serde_wasm_bindgen::to_value(&payload).unwrap_or(JsValue::NULL),
            ),
        };

        if let Some(callback) = callback {
            if let Err(e) = callback.call1(&JsValue::NULL, &value) {
                web_sys::console::error_2(&"[CineStream] callback threw".into(), &e);
            }
        }
    }
}

fn queueing_observer(outbox: &Outbox) -> PlaybackObserver {
    let push = |outbox: &Outbox| {
        let outbox = outbox.clone();
        move |n: Notification| outbox.borrow_mut().push_back(n)
    };

    let time = push(outbox);
    let duration = push(outbox);
    let play = push(outbox);
    let mute = push(outbox);
    let fullscreen = push(outbox);
    let levels = push(outbox);
    let active = push(outbox);
    let error = push(outbox);

    PlaybackObserver::new()
        .on_time_update(move |t| time(Notification::TimeUpdate(t)))
        .on_duration_change(move |d| duration(Notification::DurationChange(d)))
        .on_play_state(move |p| play(Notification::PlayState(p)))
        .on_mute(move |m| mute(Notification::Mute(m)))
        .on_fullscreen_change(move |f| fullscreen(Notification::Fullscreen(f)))
        .on_quality_levels(move |q| levels(Notification::QualityLevels(q.iter().map(Quality::to_string).collect())))
        .on_active_quality(move |q| active(Notification::ActiveQuality(q.to_string())))
        .on_error(move |e| {
            web_sys::console::warn_1(&format!("[CineStream] {}", e).into());
            error(Notification::Error(ErrorPayload {
                code: e.error_code(),
                message: e.to_string(),
                recovery: e.recovery(),
            }))
        })
}

struct PlayerInner {
    controller: RefCell<PlaybackController<VideoSurface>>,
    outbox: Outbox,
    callbacks: Callbacks,
}

impl PlayerInner {
    fn pump(&self) {
        if let Ok(mut controller) = self.controller.try_borrow_mut() {
            controller.pump();
        }
        self.flush();
    }

    /// Deliver queued notifications with no borrow held, so callbacks may call back in
    fn flush(&self) {
        let pending: Vec<Notification> = self.outbox.borrow_mut().drain(..).collect();
        for notification in pending {
            self.callbacks.deliver(notification);
        }
    }

    fn with_controller<T>(&self, f: impl FnOnce(&mut PlaybackController<VideoSurface>) -> T) -> Result<T, JsValue> {
        let result = {
            let mut controller = self
                .controller
                .try_borrow_mut()
                .map_err(|_| JsValue::from_str("CineStreamPlayer is busy"))?;
            f(&mut controller)
        };
        self.flush();
        Ok(result)
    }
}

/// Coalesces wake-ups from JS events into one pump per microtask
struct PumpScheduler {
    target: RefCell<Weak<PlayerInner>>,
    scheduled: Cell<bool>,
}

impl PumpScheduler {
    fn new() -> Rc<Self> {
        Rc::new(Self {
            target: RefCell::new(Weak::new()),
            scheduled: Cell::new(false),
        })
    }

    fn schedule(self: &Rc<Self>) {
        if self.scheduled.replace(true) {
            return;
        }
        let this = self.clone();
        wasm_bindgen_futures::spawn_local(async move {
            this.scheduled.set(false);
            let target = this.target.borrow().upgrade();
            if let Some(inner) = target {
                inner.pump();
            }
        });
    }
}

fn to_js(err: Error) -> JsValue {
    js_sys::Error::new(&err.to_string()).into()
}

/// Adaptive HLS player bound to a `<video>` element
#[wasm_bindgen]
pub struct CineStreamPlayer {
    inner: Rc<PlayerInner>,
}

#[wasm_bindgen]
impl CineStreamPlayer {
    /// Create a player owning `video`.
    ///
    /// `callbacks` may provide `onTimeUpdate`, `onDurationChange`,
    /// `onPlayStateChange`, `onMuteChange`, `onFullscreenChange`,
    /// `onQualityLevels`, `onActiveQuality` and `onError`. `config` is an
    /// optional player configuration object.
    #[wasm_bindgen(constructor)]
    pub fn new(
        video: web_sys::HtmlVideoElement,
        callbacks: JsValue,
        config: JsValue,
    ) -> Result<CineStreamPlayer, JsValue> {
        let config: PlayerConfig = if config.is_undefined() || config.is_null() {
            PlayerConfig::default()
        } else {
            serde_wasm_bindgen::from_value(config)?
        };
        config.validate().map_err(to_js)?;

        let document = web_sys::window()
            .and_then(|w| w.document())
            .ok_or_else(|| JsValue::from_str("CineStreamPlayer needs a document"))?;

        let scheduler = PumpScheduler::new();
        let notify: Notify = {
            let scheduler = scheduler.clone();
            Rc::new(move || scheduler.schedule())
        };

        let outbox: Outbox = Rc::new(RefCell::new(VecDeque::new()));
        let controller = PlaybackController::new(
            VideoSurface::new(video, document, notify.clone()),
            HlsJsFactory::new(notify),
            config,
        )
        .with_observer(queueing_observer(&outbox));

        let inner = Rc::new(PlayerInner {
            controller: RefCell::new(controller),
            outbox,
            callbacks: Callbacks::from_js(&callbacks),
        });
        *scheduler.target.borrow_mut() = Rc::downgrade(&inner);

        Ok(CineStreamPlayer { inner })
    }

    /// Bind a stream, replacing the current one. Failures are also sent to `onError`.
    #[wasm_bindgen(js_name = setUrl)]
    pub fn set_url(&self, url: &str) -> Result<(), JsValue> {
        self.inner
            .with_controller(|c| c.mount(url))?
            .map(|_| ())
            .map_err(to_js)
    }

    /// Play or pause. A refused play is reported through `onError` only.
    #[wasm_bindgen(js_name = setPlaying)]
    pub fn set_playing(&self, playing: bool) -> Result<(), JsValue> {
        let _ = self.inner.with_controller(|c| c.set_playing(playing))?;
        Ok(())
    }

    #[wasm_bindgen(js_name = setMuted)]
    pub fn set_muted(&self, muted: bool) -> Result<(), JsValue> {
        self.inner.with_controller(|c| c.set_muted(muted))
    }

    /// Request a quality label such as `"auto"` or `"720p"`.
    ///
    /// Returns whether a rendition switch was issued.
    #[wasm_bindgen(js_name = setQuality)]
    pub fn set_quality(&self, label: &str) -> Result<bool, JsValue> {
        let quality: Quality = label.parse().map_err(to_js)?;
        self.inner
            .with_controller(|c| c.set_desired_quality(quality))?
            .map_err(to_js)
    }

    pub fn seek(&self, position: f64) -> Result<(), JsValue> {
        self.inner.with_controller(|c| c.seek(position))?.map_err(to_js)
    }

    #[wasm_bindgen(js_name = setFullscreen)]
    pub fn set_fullscreen(&self, fullscreen: bool) -> Result<(), JsValue> {
        self.inner
            .with_controller(|c| c.set_fullscreen(fullscreen))?
            .map_err(to_js)
    }

    /// Snapshot of the published state
    pub fn state(&self) -> Result<JsValue, JsValue> {
        let controller = self
            .inner
            .controller
            .try_borrow()
            .map_err(|_| JsValue::from_str("CineStreamPlayer is busy"))?;
        Ok(serde_wasm_bindgen::to_value(controller.state())?)
    }

    /// Release the engine and every listener
    pub fn destroy(&self) -> Result<(), JsValue> {
        self.inner.with_controller(|c| c.unmount())
    }
}

/// Display name of a quality label, e.g. `"720p"` → `"HD"`. Unknown labels come back unchanged.
#[wasm_bindgen(js_name = qualityDisplayName)]
pub fn quality_display_name(label: &str) -> String {
    label
        .parse::<Quality>()
        .map(|q| q.display_name())
        .unwrap_or_else(|_| label.to_string())
}
