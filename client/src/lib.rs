//! Browser glue for the collaborative drawing board.
//!
//! This crate wires the canvas engine to the outside world: the websocket
//! relay, the per-room on-device cache, and the durable stroke store. The
//! page supplies two stacked canvas elements (`#board` for committed
//! strokes, `#board-preview` for in-progress shapes) and an optional
//! `#status` element that mirrors the connection state machine. Toolbar,
//! dashboard, and the video-call surface live outside and drive the
//! exported controls below.

mod app;
mod cache;
mod store;
mod ws;

use wasm_bindgen::prelude::*;

/// Entry point called from the page with the room id and an optional
/// bearer token. An absent token acquires a guest grant first.
#[wasm_bindgen]
pub async fn boot(room_id: String, token: Option<String>) -> Result<(), JsValue> {
    console_error_panic_hook::set_once();
    let _ = console_log::init_with_level(log::Level::Info);

    app::boot(room_id, token).await
}

/// Switch the active tool: `pencil`, `rectangle`, `circle`, `arrow`,
/// `diamond`, `text`, or `eraser`. Returns false before `boot` completes
/// or for an unknown name.
#[wasm_bindgen]
pub fn select_tool(name: &str) -> bool {
    app::select_tool(name)
}

/// Set the stroke color (any CSS color string).
#[wasm_bindgen]
pub fn select_color(color: &str) -> bool {
    app::select_color(color)
}

/// Set the stroke width in pixels.
#[wasm_bindgen]
pub fn select_width(width: f64) -> bool {
    app::select_width(width)
}

/// Set the text committed by the next text-tool click.
#[wasm_bindgen]
pub fn set_pending_text(text: &str) -> bool {
    app::set_pending_text(text)
}
