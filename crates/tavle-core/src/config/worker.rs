//! Background worker configuration.

use serde::{Deserialize, Serialize};

/// Scheduled maintenance configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Whether scheduled maintenance runs in this process.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Cron schedule for the expired-session sweep.
    #[serde(default = "default_sweep_schedule")]
    pub sweep_schedule: String,
    /// Cron schedule for presence reconciliation.
    #[serde(default = "default_presence_schedule")]
    pub presence_schedule: String,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sweep_schedule: default_sweep_schedule(),
            presence_schedule: default_presence_schedule(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_sweep_schedule() -> String {
    // Every 5 minutes
    "0 */5 * * * *".to_string()
}

fn default_presence_schedule() -> String {
    // Every 10 seconds, well under the presence timeout window
    "*/10 * * * * *".to_string()
}
