//! Cross-process fanout bridge.
//!
//! DESIGN
//! ======
//! Rooms can span server processes. Every process publishes each relayed
//! envelope to a shared pub/sub channel named after the room, and runs one
//! subscriber task that feeds received envelopes back into the local room
//! manager's `publish` with no exclusion — the originating connection is
//! never a member of another process. Subscription happens lazily on a
//! room's first local membership and is never torn down: staying
//! subscribed to an empty room's channel is inert.
//!
//! ERROR HANDLING
//! ==============
//! The bridge is best-effort. Publish and subscribe failures are logged by
//! callers and local delivery proceeds; the relay degrades to
//! single-process fanout until the backbone recovers.

use std::collections::HashSet;

use async_trait::async_trait;
use futures::StreamExt;
use protocol::Envelope;
use tokio::sync::{Mutex, mpsc};
use tracing::{info, warn};

use crate::services::room;
use crate::state::AppState;

const CHANNEL_PREFIX: &str = "room:";

/// Shared channel name for a room.
#[must_use]
pub fn channel_for_room(room_id: &str) -> String {
    format!("{CHANNEL_PREFIX}{room_id}")
}

/// Room id carried by a channel name, if it is one of ours.
#[must_use]
pub fn room_from_channel(channel: &str) -> Option<&str> {
    channel.strip_prefix(CHANNEL_PREFIX)
}

#[derive(Debug, thiserror::Error)]
pub enum FanoutError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
    #[error(transparent)]
    Codec(#[from] protocol::CodecError),
    #[error("fanout subscriber task is gone")]
    SubscriberGone,
}

/// Publish/subscribe backbone between server processes.
#[async_trait]
pub trait FanoutBridge: Send + Sync {
    /// Send an envelope to every other process hosting members of the room.
    async fn publish_cross_process(&self, room_id: &str, envelope: &Envelope) -> Result<(), FanoutError>;

    /// Subscribe this process to the room's channel. Idempotent; the first
    /// call per room performs the subscription.
    async fn ensure_subscribed(&self, room_id: &str) -> Result<(), FanoutError>;
}

// =============================================================================
// REDIS BRIDGE
// =============================================================================

/// Redis-backed bridge: a connection manager for publishes and one
/// subscriber task owning the pub/sub connection.
pub struct RedisFanout {
    publisher: redis::aio::ConnectionManager,
    subscribe_tx: mpsc::UnboundedSender<String>,
    subscribed: Mutex<HashSet<String>>,
}

impl RedisFanout {
    /// Connect to redis and spawn the subscriber task. The task delivers
    /// cross-process envelopes through the given state's room manager.
    ///
    /// # Errors
    ///
    /// Returns the underlying redis error when the initial connections
    /// cannot be established.
    pub async fn connect(url: &str, state: AppState) -> Result<Self, FanoutError> {
        let client = redis::Client::open(url)?;
        let publisher = client.get_connection_manager().await?;
        let pubsub = client.get_async_pubsub().await?;

        let (subscribe_tx, subscribe_rx) = mpsc::unbounded_channel();
        tokio::spawn(run_subscriber(pubsub, subscribe_rx, state));

        Ok(Self {
            publisher,
            subscribe_tx,
            subscribed: Mutex::new(HashSet::new()),
        })
    }
}

#[async_trait]
impl FanoutBridge for RedisFanout {
    async fn publish_cross_process(&self, room_id: &str, envelope: &Envelope) -> Result<(), FanoutError> {
        let payload = envelope.encode()?;
        let mut conn = self.publisher.clone();
        let _receivers: i64 = redis::AsyncCommands::publish(&mut conn, channel_for_room(room_id), payload).await?;
        Ok(())
    }

    async fn ensure_subscribed(&self, room_id: &str) -> Result<(), FanoutError> {
        let channel = channel_for_room(room_id);
        {
            let mut subscribed = self.subscribed.lock().await;
            if !subscribed.insert(channel.clone()) {
                return Ok(());
            }
        }
        self.subscribe_tx.send(channel).map_err(|_| FanoutError::SubscriberGone)
    }
}

/// Subscriber task: applies subscription requests and feeds received
/// messages into the local room manager.
async fn run_subscriber(
    pubsub: redis::aio::PubSub,
    mut requests: mpsc::UnboundedReceiver<String>,
    state: AppState,
) {
    let (mut sink, mut stream) = pubsub.split();
    info!("cross-process subscriber running");

    loop {
        tokio::select! {
            request = requests.recv() => match request {
                Some(channel) => {
                    if let Err(error) = sink.subscribe(&channel).await {
                        warn!(%channel, error = %error, "cross-process subscribe failed");
                    }
                }
                None => break,
            },
            message = stream.next() => match message {
                Some(message) => deliver(&state, &message).await,
                None => {
                    warn!("cross-process fanout stream ended");
                    break;
                }
            },
        }
    }
}

/// Decode one cross-process message and hand it to the local room manager.
async fn deliver(state: &AppState, message: &redis::Msg) {
    let channel = message.get_channel_name();
    let Some(room_id) = room_from_channel(channel) else {
        warn!(%channel, "ignoring message on unexpected channel");
        return;
    };
    let payload: String = match message.get_payload() {
        Ok(payload) => payload,
        Err(error) => {
            warn!(%channel, error = %error, "unreadable cross-process payload dropped");
            return;
        }
    };
    match Envelope::decode(&payload) {
        Ok(envelope) => room::publish(state, room_id, &envelope, None).await,
        Err(error) => warn!(%room_id, error = %error, "undecodable cross-process envelope dropped"),
    }
}

#[cfg(test)]
#[path = "fanout_test.rs"]
mod tests;
