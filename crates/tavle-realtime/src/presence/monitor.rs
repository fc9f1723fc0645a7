//! Presence monitor — tracks the last beacon per room.
//!
//! The student page beacons `open | hidden | closed` on visibility
//! changes, on an interval while visible, and on teardown. A room with
//! no beacon inside the timeout window is reported closed even though
//! no `closed` beacon ever arrived — that is the only signal available
//! after a crash or network loss.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use tavle_core::events::live::PresenceState;
use tavle_core::types::room::RoomId;

/// What the teacher view shows for a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomPresence {
    /// Recent `open` beacon.
    Open,
    /// Recent `hidden` beacon (page backgrounded).
    Hidden,
    /// Explicit `closed` beacon, or no beacon within the timeout.
    Closed,
}

#[derive(Debug, Clone, Copy)]
struct BeaconRecord {
    state: PresenceState,
    seen_at: DateTime<Utc>,
}

/// Tracks the latest presence beacon for every observed room.
#[derive(Debug)]
pub struct PresenceMonitor {
    rooms: DashMap<String, BeaconRecord>,
    timeout: Duration,
}

impl PresenceMonitor {
    /// Create a monitor with the given silence timeout.
    pub fn new(timeout_seconds: i64) -> Self {
        Self {
            rooms: DashMap::new(),
            timeout: Duration::seconds(timeout_seconds),
        }
    }

    /// Record a beacon for a room.
    pub fn record(&self, room: &RoomId, state: PresenceState, seen_at: DateTime<Utc>) {
        self.rooms
            .insert(room.as_str().to_string(), BeaconRecord { state, seen_at });
    }

    /// Current presence for a room as of `now`.
    pub fn status(&self, room: &RoomId, now: DateTime<Utc>) -> RoomPresence {
        match self.rooms.get(room.as_str()) {
            None => RoomPresence::Closed,
            Some(record) => Self::classify(*record, now, self.timeout),
        }
    }

    /// All observed rooms with their presence, for the teacher's list.
    pub fn snapshot(&self, now: DateTime<Utc>) -> Vec<(RoomId, RoomPresence, DateTime<Utc>)> {
        self.rooms
            .iter()
            .filter_map(|entry| {
                let room = RoomId::parse(entry.key())?;
                Some((
                    room,
                    Self::classify(*entry.value(), now, self.timeout),
                    entry.value().seen_at,
                ))
            })
            .collect()
    }

    /// Drop a room's record (eviction, session teardown).
    pub fn forget(&self, room: &RoomId) {
        self.rooms.remove(room.as_str());
    }

    /// Remove records that have been closed for several timeout windows,
    /// bounding monitor memory. Returns the number removed.
    pub fn reconcile(&self, now: DateTime<Utc>) -> usize {
        let horizon = self.timeout * 10;
        let stale: Vec<String> = self
            .rooms
            .iter()
            .filter(|entry| now - entry.value().seen_at > horizon)
            .map(|entry| entry.key().clone())
            .collect();

        let count = stale.len();
        for key in stale {
            self.rooms.remove(&key);
        }
        count
    }

    /// Number of rooms currently tracked.
    pub fn tracked_rooms(&self) -> usize {
        self.rooms.len()
    }

    fn classify(record: BeaconRecord, now: DateTime<Utc>, timeout: Duration) -> RoomPresence {
        if now - record.seen_at > timeout {
            return RoomPresence::Closed;
        }
        match record.state {
            PresenceState::Open => RoomPresence::Open,
            PresenceState::Hidden => RoomPresence::Hidden,
            PresenceState::Closed => RoomPresence::Closed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room() -> RoomId {
        RoomId::new("AB3F9Q", "Lærke")
    }

    #[test]
    fn test_recent_open_beacon() {
        let monitor = PresenceMonitor::new(20);
        let now = Utc::now();
        monitor.record(&room(), PresenceState::Open, now);
        assert_eq!(monitor.status(&room(), now), RoomPresence::Open);
    }

    #[test]
    fn test_silence_reports_closed() {
        let monitor = PresenceMonitor::new(20);
        let now = Utc::now();
        monitor.record(&room(), PresenceState::Open, now - Duration::seconds(21));
        assert_eq!(monitor.status(&room(), now), RoomPresence::Closed);
    }

    #[test]
    fn test_explicit_closed_beacon() {
        let monitor = PresenceMonitor::new(20);
        let now = Utc::now();
        monitor.record(&room(), PresenceState::Closed, now);
        assert_eq!(monitor.status(&room(), now), RoomPresence::Closed);
    }

    #[test]
    fn test_unknown_room_is_closed() {
        let monitor = PresenceMonitor::new(20);
        assert_eq!(monitor.status(&room(), Utc::now()), RoomPresence::Closed);
    }

    #[test]
    fn test_reconcile_drops_long_silent_rooms() {
        let monitor = PresenceMonitor::new(20);
        let now = Utc::now();
        monitor.record(&room(), PresenceState::Open, now - Duration::seconds(500));
        assert_eq!(monitor.reconcile(now), 1);
        assert_eq!(monitor.tracked_rooms(), 0);
    }
}
