//! Controller states and output snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tavle_core::types::id::SessionId;
use tavle_core::types::room::RoomId;

/// Lifecycle phase of one controller instance.
///
/// `Leaving`, `Evicted`, and `Expired` are transient edges on the way
/// back to `Unidentified`; at most one of `Joining`/`Joined`/`Evicted`/
/// `Expired` ever holds, enforced by routing every change through the
/// single transition writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// No local identity loaded yet (pre-hydration).
    Unidentified,
    /// Identity resolved (local storage or URL code), membership not
    /// yet confirmed server-side.
    Identified,
    /// Join request in flight.
    Joining,
    /// Server accepted the upsert; room active, watchers armed.
    Joined,
    /// User-initiated teardown in progress.
    Leaving,
    /// Teacher removed this participant.
    Evicted,
    /// The session passed its expiry instant or disappeared.
    Expired,
}

/// Why the controller left a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LeaveReason {
    /// The user left on purpose.
    Left,
    /// Teacher-forced removal, with the user-visible message.
    Evicted {
        /// Reason shown to the student.
        message: String,
    },
    /// Session expiry or disappearance.
    Expired {
        /// Reason shown to the student.
        message: String,
    },
}

impl LeaveReason {
    /// Whether this reason should fire the invalid-session callback.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Left)
    }
}

/// A consistent view of the controller's output fields.
///
/// `room` is present exactly when `joined` is true.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerSnapshot {
    /// Current phase.
    pub phase: Phase,
    /// Session code, if identified.
    pub session_code: Option<String>,
    /// Alias, if identified.
    pub alias: Option<String>,
    /// Server-side session id, once joined.
    pub session_id: Option<SessionId>,
    /// Session expiry, once joined.
    pub expires_at: Option<DateTime<Utc>>,
    /// Active room identifier; `None` whenever not joined.
    pub room: Option<RoomId>,
    /// Whether the controller is in the `Joined` phase.
    pub joined: bool,
    /// The reason for the most recent leave, if any.
    pub last_leave: Option<LeaveReason>,
}
