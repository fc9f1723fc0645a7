//! The live event taxonomy.
//!
//! Live events are ephemeral, timestamped messages broadcast within a
//! room: never persisted, delivered at most once per subscriber per
//! publish, with no ordering guarantee across publishers. Canvas events
//! are re-ordered at the consumer by timestamp (see
//! `tavle_realtime::canvas`).
//!
//! The union is closed on purpose — every consumer switches exhaustively
//! on the tag, so an open/extensible schema would only hide missing
//! match arms.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Client visibility state carried by presence beacons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresenceState {
    /// The page is visible and active.
    Open,
    /// The page is backgrounded.
    Hidden,
    /// The page is being torn down.
    Closed,
}

impl PresenceState {
    /// Converts to string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Hidden => "hidden",
            Self::Closed => "closed",
        }
    }
}

/// A single live event flowing through a room.
///
/// Task payloads are opaque to the core: generators produce them and the
/// render layer consumes them; this subsystem only relays.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LiveEvent {
    /// The student's current task changed.
    Task {
        /// Opaque task payload from the generator.
        task: serde_json::Value,
        /// When the event was emitted.
        timestamp: DateTime<Utc>,
    },
    /// A discrete student action (answer submitted, task skipped).
    Action {
        /// Action name.
        name: String,
        /// Optional action payload.
        payload: Option<serde_json::Value>,
        /// When the event was emitted.
        timestamp: DateTime<Utc>,
    },
    /// The student's current input field contents (keystroke mirror).
    Input {
        /// Current input value.
        value: String,
        /// When the event was emitted.
        timestamp: DateTime<Utc>,
    },
    /// A whiteboard stroke.
    CanvasStroke {
        /// Opaque stroke payload (points, color, width).
        stroke: serde_json::Value,
        /// When the event was emitted.
        timestamp: DateTime<Utc>,
    },
    /// The whiteboard was cleared.
    CanvasClear {
        /// When the event was emitted.
        timestamp: DateTime<Utc>,
    },
    /// Full whiteboard state, sent so late joiners can catch up.
    CanvasSnapshot {
        /// All strokes currently on the board.
        strokes: Vec<serde_json::Value>,
        /// When the event was emitted.
        timestamp: DateTime<Utc>,
    },
    /// The participant was removed by the teacher.
    Kick {
        /// User-visible reason.
        reason: String,
        /// When the event was emitted.
        timestamp: DateTime<Utc>,
    },
    /// A graded result for a completed task.
    Result {
        /// Whether the answer was correct.
        correct: bool,
        /// The submitted answer, if any.
        answer: Option<String>,
        /// When the event was emitted.
        timestamp: DateTime<Utc>,
    },
    /// A presence beacon.
    Presence {
        /// Client visibility state.
        state: PresenceState,
        /// When the event was emitted.
        timestamp: DateTime<Utc>,
    },
}

impl LiveEvent {
    /// The timestamp attached to this event.
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::Task { timestamp, .. }
            | Self::Action { timestamp, .. }
            | Self::Input { timestamp, .. }
            | Self::CanvasStroke { timestamp, .. }
            | Self::CanvasClear { timestamp }
            | Self::CanvasSnapshot { timestamp, .. }
            | Self::Kick { timestamp, .. }
            | Self::Result { timestamp, .. }
            | Self::Presence { timestamp, .. } => *timestamp,
        }
    }

    /// Whether this event mutates whiteboard state and therefore takes
    /// part in consumer-side timestamp ordering.
    pub fn is_canvas(&self) -> bool {
        matches!(
            self,
            Self::CanvasStroke { .. } | Self::CanvasClear { .. } | Self::CanvasSnapshot { .. }
        )
    }

    /// The tag name, as it appears on the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Task { .. } => "task",
            Self::Action { .. } => "action",
            Self::Input { .. } => "input",
            Self::CanvasStroke { .. } => "canvas_stroke",
            Self::CanvasClear { .. } => "canvas_clear",
            Self::CanvasSnapshot { .. } => "canvas_snapshot",
            Self::Kick { .. } => "kick",
            Self::Result { .. } => "result",
            Self::Presence { .. } => "presence",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_tag() {
        let event = LiveEvent::CanvasClear {
            timestamp: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json.get("type").unwrap(), "canvas_clear");
    }

    #[test]
    fn test_canvas_classification() {
        let now = Utc::now();
        assert!(LiveEvent::CanvasClear { timestamp: now }.is_canvas());
        assert!(!LiveEvent::Kick {
            reason: "removed".into(),
            timestamp: now,
        }
        .is_canvas());
    }

    #[test]
    fn test_presence_roundtrip() {
        let event = LiveEvent::Presence {
            state: PresenceState::Hidden,
            timestamp: Utc::now(),
        };
        let json = serde_json::to_string(&event).unwrap();
        let back: LiveEvent = serde_json::from_str(&json).unwrap();
        match back {
            LiveEvent::Presence { state, .. } => assert_eq!(state, PresenceState::Hidden),
            other => panic!("unexpected variant: {other:?}"),
        }
    }
}
