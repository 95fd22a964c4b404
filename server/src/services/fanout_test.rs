use super::*;
use crate::state::test_helpers::{StaticDirectory, seed_member, test_app_state};
use protocol::{Body, Point, Stroke, ToolKind};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::time::{Duration, timeout};

#[test]
fn channel_naming_round_trips() {
    let channel = channel_for_room("room-42");
    assert_eq!(channel, "room:room-42");
    assert_eq!(room_from_channel(&channel), Some("room-42"));
    assert_eq!(room_from_channel("presence:room-42"), None);
}

// =============================================================================
// IN-MEMORY BROKER
// =============================================================================

/// In-memory pub/sub standing in for redis across two test processes.
struct MemoryBroker {
    topics: Mutex<HashMap<String, Vec<mpsc::UnboundedSender<(String, String)>>>>,
}

impl MemoryBroker {
    fn new() -> Arc<Self> {
        Arc::new(Self { topics: Mutex::new(HashMap::new()) })
    }
}

/// One process's view of the broker, shaped like [`RedisFanout`]: a
/// delivery task feeds received envelopes into the local room manager.
struct MemoryBridge {
    broker: Arc<MemoryBroker>,
    inbox: mpsc::UnboundedSender<(String, String)>,
    subscribed: Mutex<HashSet<String>>,
}

impl MemoryBridge {
    fn install(broker: Arc<MemoryBroker>, state: AppState) -> Arc<Self> {
        let (inbox, mut deliveries) = mpsc::unbounded_channel::<(String, String)>();
        tokio::spawn(async move {
            while let Some((channel, payload)) = deliveries.recv().await {
                let Some(room_id) = room_from_channel(&channel) else {
                    continue;
                };
                if let Ok(envelope) = Envelope::decode(&payload) {
                    room::publish(&state, room_id, &envelope, None).await;
                }
            }
        });
        Arc::new(Self { broker, inbox, subscribed: Mutex::new(HashSet::new()) })
    }
}

#[async_trait]
impl FanoutBridge for MemoryBridge {
    async fn publish_cross_process(&self, room_id: &str, envelope: &Envelope) -> Result<(), FanoutError> {
        let payload = envelope.encode()?;
        let channel = channel_for_room(room_id);
        let topics = self.broker.topics.lock().await;
        if let Some(subscribers) = topics.get(&channel) {
            for subscriber in subscribers {
                // The backbone delivers to every subscriber, the publishing
                // process included.
                let _ = subscriber.send((channel.clone(), payload.clone()));
            }
        }
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
        self.broker
            .topics
            .lock()
            .await
            .entry(channel)
            .or_default()
            .push(self.inbox.clone());
        Ok(())
    }
}

#[tokio::test]
async fn stroke_reaches_a_member_on_another_process_within_one_hop() {
    let broker = MemoryBroker::new();
    let state_a = test_app_state(StaticDirectory::empty());
    let state_b = test_app_state(StaticDirectory::empty());
    let bridge_a = MemoryBridge::install(broker.clone(), state_a.clone());
    let bridge_b = MemoryBridge::install(broker, state_b.clone());

    // M1 connected to process A, M2 to process B, same room.
    let (m1, _rx1) = seed_member(&state_a, "room-1", "u-1").await;
    let (_m2, mut rx2) = seed_member(&state_b, "room-1", "u-2").await;
    bridge_a.ensure_subscribed("room-1").await.expect("subscribe a");
    bridge_b.ensure_subscribed("room-1").await.expect("subscribe b");

    let stroke = Stroke {
        id: "s-1".into(),
        tool: ToolKind::Pencil,
        points: vec![Point::new(0.0, 0.0), Point::new(5.0, 5.0), Point::new(10.0, 10.0)],
        color: "#23ab2b".into(),
        width: 2.0,
        text: None,
        user_id: "u-1".into(),
    };
    let envelope = Envelope::new("room-1", "u-1", 0, Body::Draw(stroke.clone()));

    // Process A relays locally and publishes to the backbone.
    room::publish(&state_a, "room-1", &envelope, Some(m1)).await;
    bridge_a
        .publish_cross_process("room-1", &envelope)
        .await
        .expect("cross-process publish");

    let received = timeout(Duration::from_millis(500), rx2.recv())
        .await
        .expect("delivery timed out")
        .expect("channel closed");
    let Body::Draw(received_stroke) = received.body else {
        panic!("expected a draw envelope, got {}", received.body.kind_name());
    };
    assert_eq!(received_stroke, stroke);
}

#[tokio::test]
async fn subscription_is_performed_once_per_room() {
    let broker = MemoryBroker::new();
    let state = test_app_state(StaticDirectory::empty());
    let bridge = MemoryBridge::install(broker.clone(), state);

    bridge.ensure_subscribed("room-1").await.expect("first");
    bridge.ensure_subscribed("room-1").await.expect("second");

    let topics = broker.topics.lock().await;
    assert_eq!(topics.get("room:room-1").map(Vec::len), Some(1));
}
