//! CineStream WASM - Browser bindings for the playback controller
//!
//! Wraps a `<video>` element as a media surface and hls.js as the adaptive
//! engine, then exposes the controller to JavaScript:
//!
//! ```javascript
//! import init, { CineStreamPlayer, qualityDisplayName } from '@cinestream/wasm';
//!
//! await init();
//! const player = new CineStreamPlayer(video, {
//!   onTimeUpdate: (t) => setPosition(t),
//!   onQualityLevels: (levels) => setLevels(levels),
//!   onError: ({ code, message, recovery }) => showError(code, message),
//! });
//! player.setUrl('https://test-streams.mux.dev/x36xhzz/x36xhzz.m3u8');
//! player.setPlaying(true);
//! ```
//!
//! hls.js must be loaded on the page as the global `Hls`. Without it the
//! player falls back to native HLS where the browser supports it.

use wasm_bindgen::prelude::*;

mod hls;
mod player;
mod surface;

pub use player::{quality_display_name, CineStreamPlayer};

/// Initialize the WASM module
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
    web_sys::console::log_1(&"[CineStream WASM] Initialized".into());
}

/// Library version
#[wasm_bindgen]
pub fn version() -> String {
    cinestream_core::VERSION.to_string()
}
