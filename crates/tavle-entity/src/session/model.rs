//! Session entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use tavle_core::traits::directory::SessionSummary;
use tavle_core::types::id::SessionId;

/// A time-boxed classroom instance identified by a short code.
///
/// Sessions are created by teacher action and deleted by the expiry
/// sweep or explicit closure. A session is valid iff `now < expires_at`;
/// an expired-but-present row must be treated as absent by every reader.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Session {
    /// Unique session identifier.
    pub id: SessionId,
    /// Canonical uppercase join code, unique among valid sessions.
    pub code: String,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
    /// When the session expires.
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Check whether the session is past its expiry instant.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Summary view handed across the directory seam.
    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            id: self.id,
            code: self.code.clone(),
            created_at: self.created_at,
            expires_at: self.expires_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn session(expires_in: Duration) -> Session {
        let now = Utc::now();
        Session {
            id: SessionId::new(),
            code: "AB3F9Q".to_string(),
            created_at: now,
            expires_at: now + expires_in,
        }
    }

    #[test]
    fn test_expiry_boundary_is_inclusive() {
        let s = session(Duration::zero());
        // now == expires_at counts as expired
        assert!(s.is_expired(s.expires_at));
    }

    #[test]
    fn test_live_session_not_expired() {
        let s = session(Duration::minutes(90));
        assert!(!s.is_expired(Utc::now()));
    }
}
