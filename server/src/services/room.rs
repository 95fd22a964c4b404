//! Room manager — membership, replay buffering, and local fanout.
//!
//! DESIGN
//! ======
//! A room exists in memory if and only if its member set is non-empty; the
//! last leave discards membership, replay buffer, and video flag as one
//! unit. Joins consult the project-ownership collaborator before touching
//! any room state, so a directory failure closes the socket without
//! leaving partial state behind.
//!
//! ERROR HANDLING
//! ==============
//! Delivery is best-effort per member: a full or closed channel means the
//! member's task is gone, and the member is silently dropped from the room
//! rather than failing the broadcast. Cross-connection ordering is not
//! guaranteed; per-connection ordering follows from the socket's in-order
//! stream and the non-reordering delivery path.

use protocol::{Body, Envelope};
use tracing::{info, warn};
use uuid::Uuid;

use crate::services::auth::Identity;
use crate::services::directory::DirectoryError;
use crate::services::registry;
use crate::state::{AppState, ConnectionEntry, RoomState};

/// Replay buffer cap per room; oldest drawing events are dropped first.
pub const REPLAY_BUFFER_CAP: usize = 512;

#[derive(Debug, thiserror::Error)]
pub enum JoinError {
    /// The room has a backing project and the connection presented no
    /// verifiable credential.
    #[error("unauthorized access to project room {0}")]
    Unauthorized(String),
    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

/// What a new member needs to know right after admission.
pub struct JoinOutcome {
    pub is_owner: bool,
    pub is_guest: bool,
    /// Buffered drawing events in commit order, for immediate replay.
    pub replay: Vec<Envelope>,
    /// True if the room's video session is already running.
    pub video_enabled: bool,
}

// =============================================================================
// JOIN / LEAVE
// =============================================================================

/// Admit a connection to a room.
///
/// Looks up the backing project owner, enforces the anonymous-access rule,
/// registers the connection, and inserts it into the room's member set.
/// The room is created on first join.
///
/// # Errors
///
/// [`JoinError::Unauthorized`] when the room has a backing project and the
/// identity is unverified; [`JoinError::Directory`] when the ownership
/// lookup fails.
pub async fn join(
    state: &AppState,
    room_id: &str,
    connection_id: Uuid,
    identity: &Identity,
    tx: tokio::sync::mpsc::Sender<Envelope>,
) -> Result<JoinOutcome, JoinError> {
    // Bounded external call, before any state is touched.
    let owner_id = state.directory.project_owner(room_id).await?;

    if owner_id.is_some() && !identity.verified {
        return Err(JoinError::Unauthorized(room_id.to_string()));
    }

    let is_owner = owner_id.as_deref() == Some(identity.user_id.as_str());
    let is_guest = identity.is_guest();

    registry::register(
        state,
        connection_id,
        ConnectionEntry {
            user_id: identity.user_id.clone(),
            user_name: identity.user_name.clone(),
            is_owner,
            is_guest,
            tx,
        },
    )
    .await;

    let mut rooms = state.rooms.write().await;
    let room = rooms
        .entry(room_id.to_string())
        .or_insert_with(|| RoomState::new(owner_id));
    room.members.insert(connection_id);
    info!(%room_id, %connection_id, members = room.members.len(), "member joined room");

    Ok(JoinOutcome {
        is_owner,
        is_guest,
        replay: room.replay.iter().cloned().collect(),
        video_enabled: room.video_enabled,
    })
}

/// Remove a member from a room. When this empties the room, every piece of
/// room state is discarded together.
pub async fn leave(state: &AppState, room_id: &str, connection_id: Uuid) {
    let mut rooms = state.rooms.write().await;
    let Some(room) = rooms.get_mut(room_id) else {
        return;
    };

    room.members.remove(&connection_id);
    info!(%room_id, %connection_id, remaining = room.members.len(), "member left room");

    if room.members.is_empty() {
        rooms.remove(room_id);
        info!(%room_id, "room discarded");
    }
}

// =============================================================================
// FANOUT
// =============================================================================

/// Deliver an envelope to every current member except `exclude`.
///
/// Members whose channel is closed or full are dropped from the room
/// silently; other deliveries proceed. Delivery uses `try_send` so a slow
/// member never blocks the rest.
pub async fn publish(state: &AppState, room_id: &str, envelope: &Envelope, exclude: Option<Uuid>) {
    let mut stale = Vec::new();
    {
        let rooms = state.rooms.read().await;
        let Some(room) = rooms.get(room_id) else {
            return;
        };
        let connections = state.connections.read().await;
        for member in &room.members {
            if exclude == Some(*member) {
                continue;
            }
            match connections.get(member) {
                Some(entry) => {
                    if entry.tx.try_send(envelope.clone()).is_err() {
                        stale.push(*member);
                    }
                }
                None => stale.push(*member),
            }
        }
    }

    if !stale.is_empty() {
        let mut rooms = state.rooms.write().await;
        if let Some(room) = rooms.get_mut(room_id) {
            for member in &stale {
                room.members.remove(member);
            }
            warn!(%room_id, dropped = stale.len(), "dropped unreachable members");
            if room.members.is_empty() {
                rooms.remove(room_id);
                info!(%room_id, "room discarded");
            }
        }
    }
}

// =============================================================================
// REPLAY BUFFER / VIDEO FLAG
// =============================================================================

/// Buffer a drawing event for replay to late joiners. Drawing events with
/// no points carry no renderable geometry: they still propagate to current
/// members, but are not buffered.
pub async fn record_if_drawing(state: &AppState, room_id: &str, envelope: &Envelope) {
    let Body::Draw(stroke) = &envelope.body else {
        return;
    };
    if stroke.points.is_empty() {
        warn!(%room_id, stroke_id = %stroke.id, "drawing event with no points not buffered");
        return;
    }

    let mut rooms = state.rooms.write().await;
    let Some(room) = rooms.get_mut(room_id) else {
        return;
    };
    if room.replay.len() == REPLAY_BUFFER_CAP {
        room.replay.pop_front();
    }
    room.replay.push_back(envelope.clone());
}

/// Mark the room's video session as running.
pub async fn mark_video_enabled(state: &AppState, room_id: &str) {
    let mut rooms = state.rooms.write().await;
    if let Some(room) = rooms.get_mut(room_id) {
        if !room.video_enabled {
            room.video_enabled = true;
            info!(%room_id, "video session enabled");
        }
    }
}

#[cfg(test)]
#[path = "room_test.rs"]
mod tests;
