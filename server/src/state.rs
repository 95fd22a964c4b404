//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor. It
//! owns the two registries at the heart of the relay — live connections and
//! live rooms — plus handles to the external collaborators (project
//! directory, token signer, optional cross-process fanout). All mutable
//! maps sit behind `Arc<RwLock<..>>` and are only touched through the
//! service modules, never ad hoc from handlers.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use protocol::Envelope;
use tokio::sync::{RwLock, mpsc};
use uuid::Uuid;

use crate::services::auth::TokenSigner;
use crate::services::directory::ProjectDirectory;
use crate::services::fanout::FanoutBridge;

/// Capacity of each member's outbound envelope channel. A member that falls
/// this far behind is treated as dead and dropped from its room.
pub const MEMBER_CHANNEL_CAPACITY: usize = 256;

// =============================================================================
// CONNECTION
// =============================================================================

/// One live socket, created after authentication resolves and destroyed on
/// socket close. Rooms reference connections only by id.
pub struct ConnectionEntry {
    pub user_id: String,
    pub user_name: String,
    /// True iff `user_id` equals the room's project-owner id.
    pub is_owner: bool,
    /// True iff the identity was generated rather than supplied by a
    /// verified token.
    pub is_guest: bool,
    /// Sender for the connection task's outbound envelope stream.
    pub tx: mpsc::Sender<Envelope>,
}

// =============================================================================
// ROOM
// =============================================================================

/// Per-room ephemeral state. Exists in memory if and only if the member set
/// is non-empty; discarded as one unit when the last member leaves.
pub struct RoomState {
    pub members: HashSet<Uuid>,
    /// Owning user id of the backing project; `None` for ad-hoc rooms.
    pub owner_id: Option<String>,
    /// Recent drawing events, replayed to late joiners in commit order.
    pub replay: VecDeque<Envelope>,
    /// Set once the owner has started a video session.
    pub video_enabled: bool,
}

impl RoomState {
    #[must_use]
    pub fn new(owner_id: Option<String>) -> Self {
        Self {
            members: HashSet::new(),
            owner_id,
            replay: VecDeque::new(),
            video_enabled: false,
        }
    }
}

// =============================================================================
// APP STATE
// =============================================================================

/// Shared application state. Clone is required by Axum — all inner fields
/// are Arc-wrapped.
#[derive(Clone)]
pub struct AppState {
    pub connections: Arc<RwLock<HashMap<Uuid, ConnectionEntry>>>,
    pub rooms: Arc<RwLock<HashMap<String, RoomState>>>,
    pub directory: Arc<dyn ProjectDirectory>,
    pub signer: Arc<TokenSigner>,
    /// Cross-process fanout backbone. `None` runs the relay single-process;
    /// local delivery never depends on it.
    pub fanout: Option<Arc<dyn FanoutBridge>>,
}

impl AppState {
    #[must_use]
    pub fn new(directory: Arc<dyn ProjectDirectory>, signer: Arc<TokenSigner>) -> Self {
        Self {
            connections: Arc::new(RwLock::new(HashMap::new())),
            rooms: Arc::new(RwLock::new(HashMap::new())),
            directory,
            signer,
            fanout: None,
        }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================
