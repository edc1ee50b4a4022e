//! hls.js bindings as an adaptive engine

use crate::surface::{Notify, VideoSurface};
use cinestream_core::{
    AdaptiveEngine, EngineConfig, EngineEvent, EngineFactory, Error, LevelSelection, Rendition, Result,
};
use js_sys::{Array, Function, Reflect};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::HtmlMediaElement;

#[wasm_bindgen]
extern "C" {
    /// The global `Hls` class from hls.js
    #[derive(Clone)]
    pub type Hls;

    #[wasm_bindgen(static_method_of = Hls, js_name = isSupported, catch)]
    fn is_supported() -> std::result::Result<bool, JsValue>;

    #[wasm_bindgen(constructor, catch)]
    fn new(config: &JsValue) -> std::result::Result<Hls, JsValue>;

    #[wasm_bindgen(method, catch, js_name = loadSource)]
    fn load_source(this: &Hls, url: &str) -> std::result::Result<(), JsValue>;

    #[wasm_bindgen(method, catch, js_name = attachMedia)]
    fn attach_media(this: &Hls, media: &HtmlMediaElement) -> std::result::Result<(), JsValue>;

    #[wasm_bindgen(method, js_name = detachMedia)]
    fn detach_media(this: &Hls);

    #[wasm_bindgen(method)]
    fn destroy(this: &Hls);

    #[wasm_bindgen(method)]
    fn on(this: &Hls, event: &str, handler: &Function);

    #[wasm_bindgen(method)]
    fn off(this: &Hls, event: &str, handler: &Function);

    #[wasm_bindgen(method, getter, js_name = currentLevel)]
    fn current_level(this: &Hls) -> i32;

    #[wasm_bindgen(method, setter, js_name = currentLevel)]
    fn set_current_level(this: &Hls, level: i32);

    #[wasm_bindgen(method, getter, js_name = autoLevelEnabled)]
    fn auto_level_enabled(this: &Hls) -> bool;
}

const MANIFEST_PARSED: &str = "hlsManifestParsed";
const LEVEL_SWITCHED: &str = "hlsLevelSwitched";
const ERROR: &str = "hlsError";

type Handler = Closure<dyn FnMut(JsValue, JsValue)>;

fn field(object: &JsValue, key: &str) -> JsValue {
    Reflect::get(object, &JsValue::from_str(key)).unwrap_or(JsValue::UNDEFINED)
}

fn number(object: &JsValue, key: &str) -> Option<f64> {
    field(object, key).as_f64().filter(|n| n.is_finite() && *n >= 0.0)
}

fn rendition(level: &JsValue) -> Rendition {
    Rendition {
        height: number(level, "height").unwrap_or(0.0) as u32,
        width: number(level, "width").map(|w| w as u32),
        bitrate: number(level, "bitrate").unwrap_or(0.0) as u64,
        uri: field(level, "uri").as_string(),
    }
}

fn js_error(context: &str, e: JsValue) -> Error {
    Error::Engine(format!("{}: {:?}", context, e))
}

/// Adaptive engine driving an hls.js instance
pub struct HlsJsEngine {
    hls: Hls,
    events: Rc<RefCell<VecDeque<EngineEvent>>>,
    handlers: Vec<(&'static str, Handler)>,
    destroyed: bool,
}

impl HlsJsEngine {
    fn new(config: &EngineConfig, notify: Notify) -> Result<Self> {
        let options = serde_wasm_bindgen::to_value(config)
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;
        let hls = Hls::new(&options).map_err(|e| js_error("Hls constructor failed", e))?;

        let mut engine = Self {
            hls,
            events: Rc::new(RefCell::new(VecDeque::new())),
            handlers: Vec::new(),
            destroyed: false,
        };

        engine.subscribe(MANIFEST_PARSED, notify.clone(), |_, data| {
            let levels = field(&data, "levels")
                .dyn_into::<Array>()
                .map(|levels| levels.iter().map(|level| rendition(&level)).collect::<Vec<_>>())
                .unwrap_or_default();
            Some(EngineEvent::ManifestParsed { levels })
        });

        engine.subscribe(LEVEL_SWITCHED, notify.clone(), |hls, data| {
            let level = number(&data, "level")? as usize;
            Some(EngineEvent::LevelSwitched {
                level,
                auto: hls.auto_level_enabled(),
            })
        });

        engine.subscribe(ERROR, notify, |_, data| {
            Some(EngineEvent::Error {
                fatal: field(&data, "fatal").as_bool().unwrap_or(false),
                details: field(&data, "details")
                    .as_string()
                    .unwrap_or_else(|| "unknown hls.js error".to_string()),
            })
        });

        Ok(engine)
    }

    fn subscribe(
        &mut self,
        event: &'static str,
        notify: Notify,
        translate: impl Fn(&Hls, JsValue) -> Option<EngineEvent> + 'static,
    ) {
        let hls = self.hls.clone();
        let events = self.events.clone();
        let handler: Handler = Closure::wrap(Box::new(move |_name: JsValue, data: JsValue| {
            if let Some(event) = translate(&hls, data) {
                events.borrow_mut().push_back(event);
                notify();
            }
        }) as Box<dyn FnMut(JsValue, JsValue)>);

        self.hls.on(event, handler.as_ref().unchecked_ref());
        self.handlers.push((event, handler));
    }
}

impl AdaptiveEngine<VideoSurface> for HlsJsEngine {
    fn load_source(&mut self, url: &str) -> Result<()> {
        self.hls
            .load_source(url)
            .map_err(|e| js_error("loadSource failed", e))
    }

    fn attach_media(&mut self, surface: &mut VideoSurface) -> Result<()> {
        self.hls
            .attach_media(surface.media_element())
            .map_err(|e| js_error("attachMedia failed", e))
    }

    fn detach_media(&mut self) {
        if !self.destroyed {
            self.hls.detach_media();
        }
    }

    fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        for (event, handler) in self.handlers.drain(..) {
            self.hls.off(event, handler.as_ref().unchecked_ref());
        }
        self.hls.destroy();
        self.events.borrow_mut().clear();
        self.destroyed = true;
    }

    fn current_level(&self) -> LevelSelection {
        if self.hls.auto_level_enabled() {
            LevelSelection::Auto
        } else {
            LevelSelection::from_raw(self.hls.current_level())
        }
    }

    fn set_current_level(&mut self, level: LevelSelection) {
        self.hls.set_current_level(level.to_raw());
    }

    fn poll_event(&mut self, _surface: &mut VideoSurface) -> Option<EngineEvent> {
        self.events.borrow_mut().pop_front()
    }
}

impl Drop for HlsJsEngine {
    fn drop(&mut self) {
        AdaptiveEngine::<VideoSurface>::destroy(self);
    }
}

/// Creates hls.js engines when the page has hls.js and Media Source Extensions
pub struct HlsJsFactory {
    notify: Notify,
}

impl HlsJsFactory {
    pub fn new(notify: Notify) -> Self {
        Self { notify }
    }
}

impl EngineFactory<VideoSurface> for HlsJsFactory {
    fn is_supported(&self) -> bool {
        Hls::is_supported().unwrap_or(false)
    }

    fn create(&mut self, config: &EngineConfig) -> Result<Box<dyn AdaptiveEngine<VideoSurface>>> {
        Ok(Box::new(HlsJsEngine::new(config, self.notify.clone())?))
    }
}
