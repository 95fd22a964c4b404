//! Connection registry — live sockets and their resolved identity.
//!
//! DESIGN
//! ======
//! The registry is the sole owner of [`ConnectionEntry`] values; the room
//! service references connections by id only and resolves senders through
//! the registry at delivery time. Entries are created once authentication
//! has resolved and removed when the socket closes. No method here blocks
//! on network I/O.

use tracing::info;
use uuid::Uuid;

use crate::state::{AppState, ConnectionEntry};

/// Add a connection to the live set.
pub async fn register(state: &AppState, connection_id: Uuid, entry: ConnectionEntry) {
    let mut connections = state.connections.write().await;
    connections.insert(connection_id, entry);
    info!(%connection_id, live = connections.len(), "connection registered");
}

/// Remove a connection from the live set. Idempotent.
pub async fn unregister(state: &AppState, connection_id: Uuid) -> Option<ConnectionEntry> {
    let mut connections = state.connections.write().await;
    let entry = connections.remove(&connection_id);
    if entry.is_some() {
        info!(%connection_id, live = connections.len(), "connection unregistered");
    }
    entry
}

#[cfg(test)]
#[path = "registry_test.rs"]
mod tests;
