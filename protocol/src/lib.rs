//! Shared wire model for the realtime drawing relay.
//!
//! This crate owns the types that cross the websocket boundary and is the
//! single vocabulary shared by `server`, `canvas`, and `client`: the stroke
//! model (what a drawing primitive is) and the message envelope (how one is
//! routed). The wire format is JSON text frames; every inbound message is
//! decoded through [`Envelope::decode`] so payload shapes are validated
//! before anything dispatches on them.

use serde::{Deserialize, Serialize};

/// Prefix marking a generated, non-durable participant identity.
pub const GUEST_ID_PREFIX: &str = "guest-";

/// Whether a user id denotes a guest (generated) identity.
#[must_use]
pub fn is_guest_id(user_id: &str) -> bool {
    user_id.starts_with(GUEST_ID_PREFIX)
}

/// Error returned by [`Envelope::decode`] and [`Envelope::encode`].
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The text was not a well-formed envelope: bad JSON, an unknown kind,
    /// or a payload whose shape does not match its kind.
    #[error("malformed envelope: {0}")]
    Json(#[from] serde_json::Error),
}

// =============================================================================
// STROKE MODEL
// =============================================================================

/// A 2D point in canvas coordinates (CSS pixels).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// The tool that produced a stroke.
///
/// `Eraser` is a pseudo-tool: it never yields a persisted stroke, it only
/// selects strokes for removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolKind {
    Pencil,
    Rectangle,
    Circle,
    Arrow,
    Diamond,
    Text,
    Eraser,
}

impl ToolKind {
    /// Minimum point count for a stroke of this kind to carry renderable
    /// geometry: a freehand path needs one point, every bounded shape needs
    /// its two extent points.
    #[must_use]
    pub fn min_points(self) -> usize {
        match self {
            Self::Pencil => 1,
            _ => 2,
        }
    }
}

/// One immutable drawing primitive.
///
/// Strokes are never mutated after commit; erasing removes a stroke from a
/// collection rather than changing it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    /// Client-generated, globally unique id.
    pub id: String,
    pub tool: ToolKind,
    /// Full path for pencil strokes; the two extent points for shape kinds.
    pub points: Vec<Point>,
    /// CSS color string.
    pub color: String,
    /// Line width in CSS pixels.
    pub width: f64,
    /// Text payload, present only for the text kind.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Authoring user id.
    pub user_id: String,
}

impl Stroke {
    /// Whether this stroke satisfies its kind's point-count invariant and
    /// can actually be rendered.
    #[must_use]
    pub fn has_renderable_geometry(&self) -> bool {
        self.points.len() >= self.tool.min_points()
    }
}

// =============================================================================
// MESSAGE ENVELOPE
// =============================================================================

/// Auth summary delivered in the first frame to a new member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadyInfo {
    /// Connection id assigned by the relay, unique per process.
    pub connection_id: String,
    /// True iff the member's user id matches the room's project owner.
    pub is_owner: bool,
    /// True iff the member's identity is a generated guest id.
    pub is_guest: bool,
    /// True iff the member presented a verifiable non-guest credential.
    pub is_authenticated: bool,
}

/// WebRTC signaling payload. Opaque to the relay: only `from` is meaningful
/// server-side, `signaling_data` carries session descriptions or ICE
/// candidates verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalPayload {
    pub from: String,
    pub signaling_data: serde_json::Value,
}

/// Envelope body, discriminated by `kind` on the wire. Each kind carries a
/// concrete payload type; receivers dispatch on the kind alone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "snake_case")]
pub enum Body {
    /// Relay → member, always the first frame after admission.
    ConnectionReady(ReadyInfo),
    /// A committed stroke.
    Draw(Stroke),
    /// A stroke removal, payload is the stroke id.
    Erase { stroke_id: String },
    /// WebRTC session-description / candidate exchange.
    Signal(SignalPayload),
    /// Announcement that the room's video session is live. No payload.
    VideoSession,
}

impl Body {
    /// Short label for logging.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::ConnectionReady(_) => "connection_ready",
            Self::Draw(_) => "draw",
            Self::Erase { .. } => "erase",
            Self::Signal(_) => "signal",
            Self::VideoSession => "video_session",
        }
    }
}

/// The wire unit: routing metadata plus a kind-discriminated payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Sender user id. The relay stamps this with the authenticated
    /// identity before fanout.
    pub user_id: String,
    /// Sender display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    /// Target room id.
    pub room_id: String,
    /// Milliseconds since the Unix epoch.
    pub ts: i64,
    #[serde(flatten)]
    pub body: Body,
}

impl Envelope {
    #[must_use]
    pub fn new(room_id: impl Into<String>, user_id: impl Into<String>, ts: i64, body: Body) -> Self {
        Self {
            user_id: user_id.into(),
            user_name: None,
            room_id: room_id.into(),
            ts,
            body,
        }
    }

    #[must_use]
    pub fn with_user_name(mut self, user_name: impl Into<String>) -> Self {
        self.user_name = Some(user_name.into());
        self
    }

    /// Decode one wire frame. Fails on undecodable JSON, an unrecognized
    /// kind, or a payload that does not match its kind.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Json`] describing the first mismatch.
    pub fn decode(text: &str) -> Result<Self, CodecError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Encode for the wire.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Json`] if serialization fails; this does not
    /// happen for envelopes built from well-formed payloads.
    pub fn encode(&self) -> Result<String, CodecError> {
        Ok(serde_json::to_string(self)?)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn pencil_stroke() -> Stroke {
        Stroke {
            id: "s-1".into(),
            tool: ToolKind::Pencil,
            points: vec![Point::new(0.0, 0.0), Point::new(5.0, 5.0), Point::new(10.0, 10.0)],
            color: "#23ab2b".into(),
            width: 2.0,
            text: None,
            user_id: "u-1".into(),
        }
    }

    #[test]
    fn draw_envelope_round_trip() {
        let original = Envelope::new("room-1", "u-1", 1_700_000_000_000, Body::Draw(pencil_stroke()))
            .with_user_name("Ada");

        let text = original.encode().expect("encode");
        let restored = Envelope::decode(&text).expect("decode");

        assert_eq!(restored, original);
        assert_eq!(restored.body.kind_name(), "draw");
    }

    #[test]
    fn kind_tag_is_snake_case_on_the_wire() {
        let env = Envelope::new("r", "u", 0, Body::VideoSession);
        let text = env.encode().expect("encode");
        let value: serde_json::Value = serde_json::from_str(&text).expect("json");
        assert_eq!(value.get("kind").and_then(|v| v.as_str()), Some("video_session"));
        assert!(value.get("payload").is_none(), "announcement carries no payload");
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let text = r#"{"user_id":"u","room_id":"r","ts":0,"kind":"cursor_move","payload":{}}"#;
        assert!(Envelope::decode(text).is_err());
    }

    #[test]
    fn mismatched_payload_is_rejected() {
        // A draw frame whose payload is not a stroke must not decode.
        let text = r#"{"user_id":"u","room_id":"r","ts":0,"kind":"draw","payload":{"from":"x"}}"#;
        assert!(Envelope::decode(text).is_err());
    }

    #[test]
    fn signal_payload_stays_opaque() {
        let body = Body::Signal(SignalPayload {
            from: "u-2".into(),
            signaling_data: serde_json::json!({"type": "offer", "sdp": "v=0"}),
        });
        let env = Envelope::new("r", "u-2", 42, body);
        let restored = Envelope::decode(&env.encode().expect("encode")).expect("decode");
        let Body::Signal(signal) = restored.body else {
            panic!("expected signal body");
        };
        assert_eq!(signal.signaling_data["sdp"], "v=0");
    }

    #[test]
    fn point_count_invariants() {
        let mut stroke = pencil_stroke();
        assert!(stroke.has_renderable_geometry());

        stroke.points.clear();
        assert!(!stroke.has_renderable_geometry());

        stroke.tool = ToolKind::Rectangle;
        stroke.points = vec![Point::new(0.0, 0.0)];
        assert!(!stroke.has_renderable_geometry(), "shapes need both extent points");

        stroke.points.push(Point::new(4.0, 4.0));
        assert!(stroke.has_renderable_geometry());
    }

    #[test]
    fn stroke_list_round_trip_preserves_order() {
        // The on-device cache stores rooms as JSON stroke lists; loading one
        // back must reproduce the same strokes in the same order.
        let strokes: Vec<Stroke> = (0..3)
            .map(|i| {
                let mut stroke = pencil_stroke();
                stroke.id = format!("s-{i}");
                stroke.points = vec![Point::new(f64::from(i), 0.0)];
                stroke
            })
            .collect();

        let encoded = serde_json::to_string(&strokes).expect("encode");
        let decoded: Vec<Stroke> = serde_json::from_str(&encoded).expect("decode");
        assert_eq!(decoded, strokes);
    }

    #[test]
    fn guest_ids_are_prefix_marked() {
        assert!(is_guest_id("guest-123"));
        assert!(!is_guest_id("6f9619ff-8b86-d011-b42d-00cf4fc964ff"));
    }
}
