//! Per-room on-device stroke cache.
//!
//! Strokes are mirrored into `localStorage` under `strokes:<roomId>` so a
//! reload keeps the canvas before the durable store answers, and so guests
//! (who have no durable store at all) keep a working session. The cache is
//! cleared once durable strokes have been fetched for an authenticated
//! session. Every operation is best-effort: storage failures log and the
//! in-memory canvas stays authoritative.

use protocol::Stroke;
use web_sys::Storage;

const KEY_PREFIX: &str = "strokes:";

fn key(room_id: &str) -> String {
    format!("{KEY_PREFIX}{room_id}")
}

fn storage() -> Option<Storage> {
    web_sys::window()?.local_storage().ok().flatten()
}

/// Load the cached stroke list for a room, oldest first.
#[must_use]
pub fn load(room_id: &str) -> Vec<Stroke> {
    let Some(storage) = storage() else {
        return Vec::new();
    };
    let Ok(Some(raw)) = storage.get_item(&key(room_id)) else {
        return Vec::new();
    };
    match serde_json::from_str(&raw) {
        Ok(strokes) => strokes,
        Err(error) => {
            log::warn!("discarding unreadable stroke cache for {room_id}: {error}");
            Vec::new()
        }
    }
}

fn write(room_id: &str, strokes: &[Stroke]) {
    let Some(storage) = storage() else {
        return;
    };
    match serde_json::to_string(strokes) {
        Ok(raw) => {
            if storage.set_item(&key(room_id), &raw).is_err() {
                log::warn!("stroke cache write failed for {room_id}");
            }
        }
        Err(error) => log::warn!("stroke cache encode failed for {room_id}: {error}"),
    }
}

/// Append one stroke to the room's cache.
pub fn push(room_id: &str, stroke: &Stroke) {
    let mut strokes = load(room_id);
    strokes.push(stroke.clone());
    write(room_id, &strokes);
}

/// Remove one stroke from the room's cache by id.
pub fn remove(room_id: &str, stroke_id: &str) {
    let mut strokes = load(room_id);
    strokes.retain(|stroke| stroke.id != stroke_id);
    write(room_id, &strokes);
}

/// Drop the room's cache entirely.
pub fn clear(room_id: &str) {
    if let Some(storage) = storage() {
        let _ = storage.remove_item(&key(room_id));
    }
}
