//! Session and participant policy configuration.
//!
//! The freshness window and expiry horizon are tuning choices copied
//! from the production deployment, not correctness requirements, so
//! they are exposed as configuration rather than constants.

use serde::{Deserialize, Serialize};

/// Session lifecycle and alias policy configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Length of generated session codes.
    #[serde(default = "default_code_length")]
    pub code_length: usize,
    /// Maximum attempts to generate a collision-free code.
    #[serde(default = "default_code_attempts")]
    pub code_attempts: usize,
    /// Minutes from creation until a session expires.
    #[serde(default = "default_expiry_minutes")]
    pub expiry_minutes: i64,
    /// Seconds within which a participant's `last_seen` counts as live
    /// for alias-collision purposes.
    #[serde(default = "default_freshness_seconds")]
    pub alias_freshness_seconds: i64,
    /// Client heartbeat interval in seconds.
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_seconds: u64,
    /// Client session re-validation (poll watchdog) interval in seconds.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_seconds: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            code_length: default_code_length(),
            code_attempts: default_code_attempts(),
            expiry_minutes: default_expiry_minutes(),
            alias_freshness_seconds: default_freshness_seconds(),
            heartbeat_interval_seconds: default_heartbeat_interval(),
            poll_interval_seconds: default_poll_interval(),
        }
    }
}

fn default_code_length() -> usize {
    6
}

fn default_code_attempts() -> usize {
    5
}

fn default_expiry_minutes() -> i64 {
    90
}

fn default_freshness_seconds() -> i64 {
    120
}

fn default_heartbeat_interval() -> u64 {
    30
}

fn default_poll_interval() -> u64 {
    15
}
