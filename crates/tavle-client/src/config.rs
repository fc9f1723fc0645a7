//! Controller tuning.

use std::time::Duration;

use tavle_core::config::SessionConfig;

/// Intervals driving the controller's watcher tasks. These are policy
/// tunables, not correctness requirements.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// How often the heartbeat touches the participant row.
    pub heartbeat_interval: Duration,
    /// How often the poll watchdog re-validates the session row.
    pub poll_interval: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: Duration::from_secs(30),
            poll_interval: Duration::from_secs(15),
        }
    }
}

impl ControllerConfig {
    /// Derive controller intervals from the shared session policy.
    pub fn from_session(config: &SessionConfig) -> Self {
        Self {
            heartbeat_interval: Duration::from_secs(config.heartbeat_interval_seconds),
            poll_interval: Duration::from_secs(config.poll_interval_seconds),
        }
    }
}
