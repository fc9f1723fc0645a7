//! Cron scheduler for periodic maintenance tasks.

use std::sync::Arc;

use tokio_cron_scheduler::{Job as CronJob, JobScheduler};
use tracing;

use tavle_core::config::WorkerConfig;
use tavle_core::error::AppError;

use crate::jobs::MaintenanceJobHandler;

/// Cron-based scheduler for periodic background tasks.
pub struct CronScheduler {
    /// The underlying job scheduler.
    scheduler: JobScheduler,
    /// Maintenance handler invoked by the scheduled tasks.
    handler: Arc<MaintenanceJobHandler>,
    /// Worker configuration.
    config: WorkerConfig,
}

impl std::fmt::Debug for CronScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CronScheduler").finish()
    }
}

impl CronScheduler {
    /// Create a new cron scheduler.
    pub async fn new(
        handler: Arc<MaintenanceJobHandler>,
        config: WorkerConfig,
    ) -> Result<Self, AppError> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| AppError::internal(format!("Failed to create scheduler: {}", e)))?;

        Ok(Self {
            scheduler,
            handler,
            config,
        })
    }

    /// Register all default scheduled tasks.
    pub async fn register_default_tasks(&self) -> Result<(), AppError> {
        self.register_session_sweep().await?;
        self.register_presence_reconciliation().await?;

        tracing::info!("All scheduled tasks registered");
        Ok(())
    }

    /// Start the scheduler.
    pub async fn start(&self) -> Result<(), AppError> {
        self.scheduler
            .start()
            .await
            .map_err(|e| AppError::internal(format!("Failed to start scheduler: {}", e)))?;

        tracing::info!("Cron scheduler started");
        Ok(())
    }

    /// Shutdown the scheduler.
    pub async fn shutdown(&mut self) -> Result<(), AppError> {
        self.scheduler
            .shutdown()
            .await
            .map_err(|e| AppError::internal(format!("Failed to shutdown scheduler: {}", e)))?;

        tracing::info!("Cron scheduler shut down");
        Ok(())
    }

    /// Expired-session sweep on the configured cadence.
    async fn register_session_sweep(&self) -> Result<(), AppError> {
        let handler = Arc::clone(&self.handler);
        let job = CronJob::new_async(self.config.sweep_schedule.as_str(), move |_uuid, _lock| {
            let handler = Arc::clone(&handler);
            Box::pin(async move {
                if let Err(e) = handler.sweep_sessions().await {
                    tracing::error!("Session sweep failed: {}", e);
                }
            })
        })
        .map_err(|e| AppError::internal(format!("Failed to create session_sweep schedule: {}", e)))?;

        self.scheduler
            .add(job)
            .await
            .map_err(|e| AppError::internal(format!("Failed to add session_sweep schedule: {}", e)))?;

        tracing::info!(schedule = %self.config.sweep_schedule, "Registered: session_sweep");
        Ok(())
    }

    /// Presence reconciliation on the configured cadence.
    async fn register_presence_reconciliation(&self) -> Result<(), AppError> {
        let handler = Arc::clone(&self.handler);
        let job = CronJob::new_async(
            self.config.presence_schedule.as_str(),
            move |_uuid, _lock| {
                let handler = Arc::clone(&handler);
                Box::pin(async move {
                    handler.reconcile_presence().await;
                })
            },
        )
        .map_err(|e| {
            AppError::internal(format!(
                "Failed to create presence_reconciliation schedule: {}",
                e
            ))
        })?;

        self.scheduler.add(job).await.map_err(|e| {
            AppError::internal(format!(
                "Failed to add presence_reconciliation schedule: {}",
                e
            ))
        })?;

        tracing::info!(schedule = %self.config.presence_schedule, "Registered: presence_reconciliation");
        Ok(())
    }
}
