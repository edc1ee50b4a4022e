//! `<video>` element as a media surface

use cinestream_core::{
    surface::{FullscreenVariant, ListenerId},
    Error, MediaEvent, MediaEventKind, MediaSurface, Result,
};
use js_sys::Reflect;
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{Document, Event, EventTarget, HtmlMediaElement, HtmlVideoElement};

/// Wakes the player after an event was queued
pub(crate) type Notify = Rc<dyn Fn()>;

struct Listener {
    target: EventTarget,
    event: &'static str,
    closure: Closure<dyn FnMut(Event)>,
}

/// Media surface backed by a video element
pub struct VideoSurface {
    video: HtmlVideoElement,
    document: Document,
    events: Rc<RefCell<VecDeque<MediaEvent>>>,
    listeners: HashMap<ListenerId, Listener>,
    next_listener: u64,
    notify: Notify,
}

impl VideoSurface {
    pub fn new(video: HtmlVideoElement, document: Document, notify: Notify) -> Self {
        Self {
            video,
            document,
            events: Rc::new(RefCell::new(VecDeque::new())),
            listeners: HashMap::new(),
            next_listener: 0,
            notify,
        }
    }

    /// Element an engine attaches to
    pub fn media_element(&self) -> &HtmlMediaElement {
        &self.video
    }

    fn queue(&self) -> impl Fn(MediaEvent) + 'static {
        let events = self.events.clone();
        let notify = self.notify.clone();
        move |event| {
            events.borrow_mut().push_back(event);
            notify();
        }
    }
}

fn media_event(kind: MediaEventKind) -> MediaEvent {
    match kind {
        MediaEventKind::TimeUpdate => MediaEvent::TimeUpdate,
        MediaEventKind::DurationChange => MediaEvent::DurationChange,
        MediaEventKind::Play => MediaEvent::Play,
        MediaEventKind::Pause => MediaEvent::Pause,
        MediaEventKind::VolumeChange => MediaEvent::VolumeChange,
        MediaEventKind::Fullscreen(_) => MediaEvent::FullscreenChange,
    }
}

fn describe(value: &JsValue) -> String {
    value
        .dyn_ref::<js_sys::Error>()
        .map(|e| String::from(e.message()))
        .or_else(|| value.as_string())
        .unwrap_or_else(|| format!("{:?}", value))
}

impl MediaSurface for VideoSurface {
    fn can_play_type(&self, mime_type: &str) -> bool {
        !self.video.can_play_type(mime_type).is_empty()
    }

    fn set_source(&mut self, url: &str) {
        self.video.set_src(url);
    }

    fn clear_source(&mut self) {
        let _ = self.video.remove_attribute("src");
        self.video.load();
    }

    fn play(&mut self) -> Result<()> {
        let promise = self
            .video
            .play()
            .map_err(|e| Error::PlaybackRejected(describe(&e)))?;

        // Autoplay policies reject the promise rather than throwing
        let queue = self.queue();
        wasm_bindgen_futures::spawn_local(async move {
            if let Err(e) = JsFuture::from(promise).await {
                queue(MediaEvent::PlayRejected { reason: describe(&e) });
            }
        });
        Ok(())
    }

    fn pause(&mut self) {
        let _ = self.video.pause();
    }

    fn is_muted(&self) -> bool {
        self.video.muted()
    }

    fn set_muted(&mut self, muted: bool) {
        self.video.set_muted(muted);
    }

    fn current_time(&self) -> f64 {
        self.video.current_time()
    }

    fn duration(&self) -> Option<f64> {
        Some(self.video.duration()).filter(|d| d.is_finite())
    }

    fn seek(&mut self, position: f64) {
        self.video.set_current_time(position);
    }

    fn is_fullscreen(&self) -> bool {
        FullscreenVariant::ALL.iter().any(|variant| {
            Reflect::get(&self.document, &JsValue::from_str(variant.element_property()))
                .map(|element| !element.is_null() && !element.is_undefined())
                .unwrap_or(false)
        })
    }

    fn request_fullscreen(&mut self) -> Result<()> {
        self.video
            .request_fullscreen()
            .map_err(|e| Error::Engine(format!("Fullscreen request failed: {}", describe(&e))))
    }

    fn exit_fullscreen(&mut self) -> Result<()> {
        if self.is_fullscreen() {
            self.document.exit_fullscreen();
        }
        Ok(())
    }

    fn add_listener(&mut self, kind: MediaEventKind) -> ListenerId {
        self.next_listener += 1;
        let id = ListenerId(self.next_listener);

        let target: EventTarget = match kind {
            MediaEventKind::Fullscreen(_) => self.document.clone().into(),
            _ => self.video.clone().into(),
        };
        let queue = self.queue();
        let event = media_event(kind);
        let closure = Closure::wrap(Box::new(move |_: Event| queue(event.clone())) as Box<dyn FnMut(Event)>);

        if let Err(e) = target.add_event_listener_with_callback(kind.event_name(), closure.as_ref().unchecked_ref()) {
            web_sys::console::warn_2(&"[CineStream] addEventListener failed".into(), &e);
        }

        self.listeners.insert(
            id,
            Listener {
                target,
                event: kind.event_name(),
                closure,
            },
        );
        id
    }

    fn remove_listener(&mut self, id: ListenerId) {
        if let Some(listener) = self.listeners.remove(&id) {
            let _ = listener
                .target
                .remove_event_listener_with_callback(listener.event, listener.closure.as_ref().unchecked_ref());
        }
    }

    fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    fn poll_event(&mut self) -> Option<MediaEvent> {
        self.events.borrow_mut().pop_front()
    }
}

impl Drop for VideoSurface {
    fn drop(&mut self) {
        let ids: Vec<ListenerId> = self.listeners.keys().copied().collect();
        for id in ids {
            self.remove_listener(id);
        }
    }
}
