//! Domain services used by the websocket route.
//!
//! ARCHITECTURE
//! ============
//! Service modules own the relay's business logic — identity, the
//! connection registry, room membership/fanout, and the external
//! collaborators — so the route layer stays focused on protocol
//! translation and socket lifecycle.

pub mod auth;
pub mod directory;
pub mod fanout;
pub mod registry;
pub mod room;
