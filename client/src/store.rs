//! Durable-store and guest-token collaborators.
//!
//! The durable stroke store and the anonymous-token issuer live in the
//! external web application; this module is their REST client. Durable
//! writes are debounced per stroke: each commit arms its own timer, so
//! rapid strokes coalesce away from the pointer-up path while staying
//! idempotent appends. A failed write is logged and the stroke lives on in
//! the local cache and on every peer's canvas — best-effort persistence,
//! not a durability guarantee.

use gloo_net::http::Request;
use gloo_timers::callback::Timeout;
use protocol::Stroke;
use serde::{Deserialize, Serialize};
use wasm_bindgen_futures::spawn_local;

/// Delay before a committed stroke is written to the durable store.
pub const DURABLE_WRITE_DEBOUNCE_MS: u32 = 750;

#[derive(Debug, Serialize)]
struct SaveStrokeBody<'a> {
    #[serde(rename = "roomId")]
    room_id: &'a str,
    stroke: &'a Stroke,
}

#[derive(Debug, Serialize)]
struct DeleteStrokeBody<'a> {
    #[serde(rename = "roomId")]
    room_id: &'a str,
    #[serde(rename = "strokeId")]
    stroke_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct StrokesResponse {
    strokes: Vec<Stroke>,
}

/// Guest credential issued by the relay.
#[derive(Debug, Clone, Deserialize)]
pub struct GuestGrant {
    pub token: String,
    #[serde(rename = "guestId")]
    pub guest_id: String,
}

/// Fetch the room's durable strokes, ordered by creation time ascending.
///
/// # Errors
///
/// Returns the transport or decode error from the store.
pub async fn fetch_strokes(room_id: &str) -> Result<Vec<Stroke>, gloo_net::Error> {
    let response = Request::get(&format!("/api/strokes/{room_id}")).send().await?;
    let body: StrokesResponse = response.json().await?;
    Ok(body.strokes)
}

/// Arm the debounced durable write for one committed stroke.
pub fn schedule_save(room_id: String, stroke: Stroke) {
    Timeout::new(DURABLE_WRITE_DEBOUNCE_MS, move || {
        spawn_local(async move {
            if let Err(error) = save_stroke(&room_id, &stroke).await {
                log::warn!("durable stroke write failed: {error}");
            }
        });
    })
    .forget();
}

async fn save_stroke(room_id: &str, stroke: &Stroke) -> Result<(), gloo_net::Error> {
    Request::post("/api/strokes")
        .json(&SaveStrokeBody { room_id, stroke })?
        .send()
        .await?;
    Ok(())
}

/// Request durable deletion of an erased stroke.
pub fn request_delete(room_id: String, stroke_id: String) {
    spawn_local(async move {
        let result = async {
            Request::post("/api/strokes/delete")
                .json(&DeleteStrokeBody { room_id: &room_id, stroke_id: &stroke_id })?
                .send()
                .await?;
            Ok::<(), gloo_net::Error>(())
        }
        .await;
        if let Err(error) = result {
            log::warn!("durable stroke delete failed: {error}");
        }
    });
}

/// Acquire a guest credential from the relay.
///
/// # Errors
///
/// Returns the transport or decode error from the issuer.
pub async fn fetch_guest_token() -> Result<GuestGrant, gloo_net::Error> {
    let response = Request::post("/api/guest-token").send().await?;
    response.json().await
}
