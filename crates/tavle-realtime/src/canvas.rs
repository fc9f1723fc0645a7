//! Consumer-side whiteboard state with timestamp ordering.
//!
//! Network delivery order is not trusted for canvas events: a stale
//! stroke arriving late must not corrupt the board. The projection
//! compares attached timestamps, not arrival order, and drops anything
//! older than the last applied canvas event.

use chrono::{DateTime, Utc};

use tavle_core::events::live::LiveEvent;

/// Materialized whiteboard state for one room, as an observer renders it.
#[derive(Debug, Clone, Default)]
pub struct CanvasProjection {
    strokes: Vec<serde_json::Value>,
    last_applied: Option<DateTime<Utc>>,
}

impl CanvasProjection {
    /// Create an empty projection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a live event. Non-canvas events and stale canvas events
    /// (timestamp older than the last applied one) are ignored; returns
    /// whether the board changed.
    pub fn apply(&mut self, event: &LiveEvent) -> bool {
        if !event.is_canvas() {
            return false;
        }

        let timestamp = event.timestamp();
        if let Some(last) = self.last_applied {
            if timestamp < last {
                return false;
            }
        }

        match event {
            LiveEvent::CanvasStroke { stroke, .. } => {
                self.strokes.push(stroke.clone());
            }
            LiveEvent::CanvasClear { .. } => {
                self.strokes.clear();
            }
            LiveEvent::CanvasSnapshot { strokes, .. } => {
                self.strokes = strokes.clone();
            }
            _ => unreachable!("is_canvas() covers exactly these variants"),
        }

        self.last_applied = Some(timestamp);
        true
    }

    /// The strokes currently on the board.
    pub fn strokes(&self) -> &[serde_json::Value] {
        &self.strokes
    }

    /// Timestamp of the last applied canvas event.
    pub fn last_applied(&self) -> Option<DateTime<Utc>> {
        self.last_applied
    }

    /// Snapshot the board into an event for late joiners.
    pub fn snapshot(&self, timestamp: DateTime<Utc>) -> LiveEvent {
        LiveEvent::CanvasSnapshot {
            strokes: self.strokes.clone(),
            timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    fn stroke_at(offset_secs: i64, label: &str) -> LiveEvent {
        LiveEvent::CanvasStroke {
            stroke: json!({ "points": label }),
            timestamp: Utc::now() + Duration::seconds(offset_secs),
        }
    }

    #[test]
    fn test_in_order_strokes_accumulate() {
        let mut canvas = CanvasProjection::new();
        assert!(canvas.apply(&stroke_at(1, "a")));
        assert!(canvas.apply(&stroke_at(2, "b")));
        assert_eq!(canvas.strokes().len(), 2);
    }

    #[test]
    fn test_stale_event_dropped() {
        let mut canvas = CanvasProjection::new();
        let late = stroke_at(5, "late");
        let stale = stroke_at(3, "stale");
        assert!(canvas.apply(&late));
        assert!(!canvas.apply(&stale));
        assert_eq!(canvas.strokes().len(), 1);
    }

    #[test]
    fn test_stale_clear_does_not_wipe_board() {
        let mut canvas = CanvasProjection::new();
        let clear = LiveEvent::CanvasClear {
            timestamp: Utc::now(),
        };
        assert!(canvas.apply(&stroke_at(10, "kept")));
        assert!(!canvas.apply(&clear));
        assert_eq!(canvas.strokes().len(), 1);
    }

    #[test]
    fn test_snapshot_replaces_state() {
        let mut canvas = CanvasProjection::new();
        canvas.apply(&stroke_at(1, "old"));
        let snapshot = LiveEvent::CanvasSnapshot {
            strokes: vec![json!({ "points": "x" }), json!({ "points": "y" })],
            timestamp: Utc::now() + Duration::seconds(2),
        };
        assert!(canvas.apply(&snapshot));
        assert_eq!(canvas.strokes().len(), 2);
    }

    #[test]
    fn test_non_canvas_events_ignored() {
        let mut canvas = CanvasProjection::new();
        let input = LiveEvent::Input {
            value: "42".into(),
            timestamp: Utc::now() + Duration::seconds(30),
        };
        assert!(!canvas.apply(&input));
        // And it must not advance the ordering watermark either.
        assert!(canvas.last_applied().is_none());
    }
}
