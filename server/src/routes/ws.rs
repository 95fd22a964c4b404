//! WebSocket relay — connection lifecycle and message dispatch.
//!
//! DESIGN
//! ======
//! Authentication resolves inside the upgraded socket so refusals can close
//! with a proper status code. After admission the handler enters a
//! `select!` loop:
//! - Inbound client frames → decode, stamp the authenticated sender, and
//!   dispatch by envelope kind.
//! - Envelopes forwarded by room peers (or the cross-process bridge) →
//!   serialized out to this member.
//!
//! The dispatch layer owns all outbound concerns — replay recording, local
//! broadcast, and best-effort cross-process publish. One malformed frame is
//! dropped with a log line; the connection stays up.
//!
//! LIFECYCLE
//! =========
//! 1. Upgrade → verify token (fail closed) / mint guest identity
//! 2. Ownership lookup → refuse anonymous joins to project rooms (1008)
//! 3. Join → `connection_ready`, replay buffer, live video announcement
//! 4. Relay loop until either side closes
//! 5. Leave room + unregister; last member discards the room

use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade, close_code};
use axum::extract::{Query, State};
use axum::response::Response;
use protocol::{Body, Envelope, ReadyInfo};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::services::auth::{self, Identity};
use crate::services::{registry, room};
use crate::state::{AppState, MEMBER_CHANNEL_CAPACITY};

#[derive(Debug, Deserialize)]
pub struct WsParams {
    #[serde(rename = "roomId")]
    pub room_id: String,
    pub token: Option<String>,
}

// =============================================================================
// UPGRADE
// =============================================================================

pub async fn handle_ws(
    State(state): State<AppState>,
    Query(params): Query<WsParams>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| run_ws(socket, state, params))
}

// =============================================================================
// CONNECTION
// =============================================================================

async fn run_ws(mut socket: WebSocket, state: AppState, params: WsParams) {
    let room_id = params.room_id;
    let identity = auth::resolve_identity(&state.signer, params.token.as_deref(), auth::now_ms());
    let connection_id = Uuid::new_v4();
    let (tx, mut rx) = mpsc::channel::<Envelope>(MEMBER_CHANNEL_CAPACITY);

    let outcome = match room::join(&state, &room_id, connection_id, &identity, tx).await {
        Ok(outcome) => outcome,
        Err(room::JoinError::Unauthorized(_)) => {
            warn!(%room_id, %connection_id, "anonymous join to project room refused");
            close_with(&mut socket, close_code::POLICY, "unauthorized").await;
            return;
        }
        Err(error) => {
            warn!(%room_id, %connection_id, error = %error, "ownership lookup failed; closing");
            close_with(&mut socket, close_code::ERROR, "ownership lookup failed").await;
            return;
        }
    };

    info!(
        %room_id,
        %connection_id,
        user_id = %identity.user_id,
        is_owner = outcome.is_owner,
        is_guest = outcome.is_guest,
        "member connected"
    );

    // The first frame a member ever sees: its connection id and role flags.
    let ready = Envelope::new(
        &room_id,
        &identity.user_id,
        auth::now_ms(),
        Body::ConnectionReady(ReadyInfo {
            connection_id: connection_id.to_string(),
            is_owner: outcome.is_owner,
            is_guest: outcome.is_guest,
            is_authenticated: identity.is_authenticated(),
        }),
    )
    .with_user_name(identity.user_name.clone());

    // Ready frame, buffered drawing events in commit order, then the video
    // announcement if a session is already running.
    let mut greeting = vec![ready];
    greeting.extend(outcome.replay);
    if outcome.video_enabled {
        greeting.push(Envelope::new(&room_id, &identity.user_id, auth::now_ms(), Body::VideoSession));
    }
    for envelope in &greeting {
        if send_envelope(&mut socket, envelope).await.is_err() {
            cleanup(&state, &room_id, connection_id).await;
            return;
        }
    }

    // Lazy cross-process subscription on first local membership.
    if let Some(fanout) = &state.fanout {
        if let Err(error) = fanout.ensure_subscribed(&room_id).await {
            warn!(%room_id, error = %error, "cross-process subscribe failed; continuing single-process");
        }
    }

    loop {
        tokio::select! {
            inbound = socket.recv() => {
                let Some(Ok(message)) = inbound else { break };
                match message {
                    Message::Text(text) => {
                        handle_inbound(&state, &room_id, connection_id, &identity, outcome.is_owner, text.as_str()).await;
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
            forwarded = rx.recv() => {
                let Some(envelope) = forwarded else { break };
                if send_envelope(&mut socket, &envelope).await.is_err() {
                    break;
                }
            }
        }
    }

    cleanup(&state, &room_id, connection_id).await;
    info!(%room_id, %connection_id, "member disconnected");
}

// =============================================================================
// DISPATCH
// =============================================================================

/// Decode one inbound frame and dispatch it by kind.
async fn handle_inbound(
    state: &AppState,
    room_id: &str,
    connection_id: Uuid,
    identity: &Identity,
    is_owner: bool,
    text: &str,
) {
    let mut envelope = match Envelope::decode(text) {
        Ok(envelope) => envelope,
        Err(error) => {
            warn!(%room_id, %connection_id, error = %error, "malformed message dropped");
            return;
        }
    };

    // Stamp routing metadata with the authenticated identity; the payload
    // stays opaque.
    envelope.user_id = identity.user_id.clone();
    envelope.user_name = Some(identity.user_name.clone());
    envelope.room_id = room_id.to_string();

    match &envelope.body {
        Body::Draw(_) => {
            room::record_if_drawing(state, room_id, &envelope).await;
            relay(state, room_id, &envelope, Some(connection_id)).await;
        }
        Body::Signal(_) if is_owner => {
            // Owner-originated signaling starts the room's video session
            // instead of being forwarded; the payload itself is dropped.
            room::mark_video_enabled(state, room_id).await;
            let announce = Envelope::new(room_id, &identity.user_id, auth::now_ms(), Body::VideoSession)
                .with_user_name(identity.user_name.clone());
            relay(state, room_id, &announce, None).await;
        }
        _ => relay(state, room_id, &envelope, Some(connection_id)).await,
    }
}

/// Local broadcast plus best-effort cross-process publish. A backbone
/// failure never reaches the caller; local delivery already happened.
async fn relay(state: &AppState, room_id: &str, envelope: &Envelope, exclude: Option<Uuid>) {
    room::publish(state, room_id, envelope, exclude).await;
    if let Some(fanout) = &state.fanout {
        if let Err(error) = fanout.publish_cross_process(room_id, envelope).await {
            warn!(%room_id, error = %error, "cross-process publish failed; delivered locally only");
        }
    }
}

// =============================================================================
// HELPERS
// =============================================================================

async fn send_envelope(socket: &mut WebSocket, envelope: &Envelope) -> Result<(), ()> {
    let text = match envelope.encode() {
        Ok(text) => text,
        Err(error) => {
            warn!(error = %error, "failed to encode outbound envelope");
            return Err(());
        }
    };
    socket.send(Message::Text(text.into())).await.map_err(|_| ())
}

async fn close_with(socket: &mut WebSocket, code: u16, reason: &'static str) {
    let frame = CloseFrame { code, reason: reason.into() };
    let _ = socket.send(Message::Close(Some(frame))).await;
}

async fn cleanup(state: &AppState, room_id: &str, connection_id: Uuid) {
    room::leave(state, room_id, connection_id).await;
    registry::unregister(state, connection_id).await;
}

#[cfg(test)]
#[path = "ws_test.rs"]
mod tests;
