//! Session sweep and presence reconciliation handlers.

use std::sync::Arc;

use chrono::Utc;
use tracing;

use tavle_core::error::AppError;
use tavle_realtime::presence::PresenceMonitor;
use tavle_service::SessionService;

/// Handles scheduled maintenance tasks.
#[derive(Clone)]
pub struct MaintenanceJobHandler {
    /// Session service for the expiry sweep.
    sessions: Arc<SessionService>,
    /// Presence monitor for reconciliation.
    presence: Arc<PresenceMonitor>,
}

impl std::fmt::Debug for MaintenanceJobHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MaintenanceJobHandler").finish()
    }
}

impl MaintenanceJobHandler {
    /// Create a new maintenance handler.
    pub fn new(sessions: Arc<SessionService>, presence: Arc<PresenceMonitor>) -> Self {
        Self { sessions, presence }
    }

    /// Delete expired sessions (participants cascade). Idempotent; a
    /// concurrent run simply finds nothing left to delete.
    pub async fn sweep_sessions(&self) -> Result<u64, AppError> {
        tracing::debug!("Running expired-session sweep");
        let removed = self.sessions.sweep_expired().await?;
        if removed > 0 {
            tracing::info!(removed, "Expired-session sweep complete");
        }
        Ok(removed)
    }

    /// Drop long-silent rooms from the presence monitor.
    pub async fn reconcile_presence(&self) -> u64 {
        let removed = self.presence.reconcile(Utc::now()) as u64;
        if removed > 0 {
            tracing::debug!(removed, "Presence reconciliation dropped silent rooms");
        }
        removed
    }
}
