//! The session directory seam.
//!
//! The lifecycle controller consumes session/participant state through
//! this trait so it can run against the in-process service, the HTTP
//! client, or an in-memory double in tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::result::AppResult;
use crate::types::id::SessionId;
use crate::types::room::RoomId;

/// A freshly created session, as handed to the teacher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedSession {
    /// The canonical session code students type in.
    pub code: String,
    /// When the session expires.
    pub expires_at: DateTime<Utc>,
}

/// A valid (non-expired) session as seen by a prospective participant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    /// Session identifier.
    pub id: SessionId,
    /// Canonical session code.
    pub code: String,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
    /// When the session expires.
    pub expires_at: DateTime<Utc>,
}

/// Confirmation of a successful join.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinGrant {
    /// Session identifier.
    pub session_id: SessionId,
    /// Canonical session code.
    pub code: String,
    /// Normalized alias the participant is registered under.
    pub alias: String,
    /// The room the participant's live events flow through.
    pub room: RoomId,
    /// When the session expires.
    pub expires_at: DateTime<Utc>,
}

/// Outcome of a heartbeat touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TouchOutcome {
    /// The participant row exists and `last_seen` was refreshed.
    Alive,
    /// The row is gone (teacher eviction or session deletion); the
    /// caller must force a local leave.
    Removed,
}

/// Store operations for sessions and participants.
///
/// Every method is fallible with the unified error taxonomy: `NotFound`,
/// `Expired`, `AliasTaken` are terminal; `Unreachable` is transient and
/// surfaced once to the UI, except for heartbeats which simply retry on
/// their next tick.
#[async_trait]
pub trait SessionDirectory: Send + Sync + 'static {
    /// Create a new session with a collision-free code.
    async fn create_session(&self) -> AppResult<CreatedSession>;

    /// Look up a session by code (case-insensitive). Returns `None` for
    /// absent **and** for expired-but-present sessions.
    async fn lookup_session(&self, code: &str) -> AppResult<Option<SessionSummary>>;

    /// Join a session: validate, check alias availability under the
    /// freshness rules, and upsert the participant row.
    async fn join(&self, code: &str, alias: &str, client_token: &str) -> AppResult<JoinGrant>;

    /// Heartbeat touch for a joined participant.
    async fn touch(&self, code: &str, alias: &str) -> AppResult<TouchOutcome>;

    /// Teacher-initiated eviction: delete the participant row and
    /// best-effort publish a kick to the room.
    async fn evict(&self, code: &str, alias: &str, reason: &str) -> AppResult<()>;
}
