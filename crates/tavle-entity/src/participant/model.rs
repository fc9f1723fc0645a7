//! Participant entity model.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use tavle_core::types::id::SessionId;

/// A student's membership record within a session, keyed by alias.
///
/// Created and refreshed through an idempotent upsert on
/// `(session_id, alias)`; deleted by teacher eviction or session
/// deletion (cascade).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Participant {
    /// The session this participant belongs to.
    pub session_id: SessionId,
    /// Alias, unique per session, normalized (trimmed, ":" stripped).
    pub alias: String,
    /// Opaque per-client token; lets the same device reclaim its alias
    /// silently while blocking other devices within the liveness window.
    pub client_token: String,
    /// When the participant first joined.
    pub joined_at: DateTime<Utc>,
    /// Last heartbeat or join touch.
    pub last_seen: DateTime<Utc>,
}

impl Participant {
    /// Whether this row's `last_seen` is outside the freshness window,
    /// making the alias reclaimable by any device.
    pub fn is_stale(&self, now: DateTime<Utc>, freshness: Duration) -> bool {
        now - self.last_seen > freshness
    }

    /// Whether a presented token belongs to this participant's device.
    pub fn token_matches(&self, token: &str) -> bool {
        self.client_token == token
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn participant(seen_ago: Duration) -> Participant {
        let now = Utc::now();
        Participant {
            session_id: SessionId::new(),
            alias: "Lærke".to_string(),
            client_token: "tok-1".to_string(),
            joined_at: now - seen_ago,
            last_seen: now - seen_ago,
        }
    }

    #[test]
    fn test_staleness_window() {
        let window = Duration::seconds(120);
        assert!(participant(Duration::seconds(121)).is_stale(Utc::now(), window));
        assert!(!participant(Duration::seconds(30)).is_stale(Utc::now(), window));
    }

    #[test]
    fn test_token_match() {
        let p = participant(Duration::zero());
        assert!(p.token_matches("tok-1"));
        assert!(!p.token_matches("tok-2"));
    }
}
