//! Realtime event bus configuration.

use serde::{Deserialize, Serialize};

/// Event bus and presence configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// Per-subscriber buffer size for room channels.
    #[serde(default = "default_channel_buffer")]
    pub channel_buffer_size: usize,
    /// SSE keep-alive frame interval in seconds.
    #[serde(default = "default_keep_alive")]
    pub keep_alive_seconds: u64,
    /// Seconds without a presence beacon before a room is reported
    /// closed. Covers ungraceful termination where no `closed` beacon
    /// ever arrives.
    #[serde(default = "default_presence_timeout")]
    pub presence_timeout_seconds: i64,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            channel_buffer_size: default_channel_buffer(),
            keep_alive_seconds: default_keep_alive(),
            presence_timeout_seconds: default_presence_timeout(),
        }
    }
}

fn default_channel_buffer() -> usize {
    256
}

fn default_keep_alive() -> u64 {
    15
}

fn default_presence_timeout() -> i64 {
    20
}
