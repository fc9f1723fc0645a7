//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section. Policy constants (freshness window, heartbeat interval,
//! expiry horizon) live here as tunables rather than hard-coded values.

pub mod database;
pub mod logging;
pub mod realtime;
pub mod server;
pub mod session;
pub mod worker;

use serde::{Deserialize, Serialize};

pub use self::database::DatabaseConfig;
pub use self::logging::LoggingConfig;
pub use self::realtime::RealtimeConfig;
pub use self::server::ServerConfig;
pub use self::session::SessionConfig;
pub use self::worker::WorkerConfig;

use crate::error::AppError;

/// Root application configuration.
///
/// Top-level deserialization target for the merged TOML configuration
/// (default.toml + optional environment overlay + `TAVLE__*` env vars).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP server settings.
    pub server: ServerConfig,
    /// Database connection settings.
    pub database: DatabaseConfig,
    /// Session and participant policy.
    #[serde(default)]
    pub session: SessionConfig,
    /// Realtime event bus settings.
    #[serde(default)]
    pub realtime: RealtimeConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Background worker settings.
    #[serde(default)]
    pub worker: WorkerConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file, an optional overlay file,
    /// and `TAVLE__SECTION__KEY` environment variables (highest
    /// precedence).
    pub fn load(path: &str, overlay: Option<&str>) -> Result<Self, AppError> {
        let mut builder =
            config::Config::builder().add_source(config::File::with_name(path).required(true));

        if let Some(overlay) = overlay {
            builder = builder.add_source(config::File::with_name(overlay).required(false));
        }

        let settings = builder
            .add_source(config::Environment::with_prefix("TAVLE").separator("__"))
            .build()
            .map_err(|e| AppError::with_source(crate::error::ErrorKind::Configuration, "Failed to read configuration", e))?;

        settings.try_deserialize().map_err(|e| {
            AppError::with_source(
                crate::error::ErrorKind::Configuration,
                "Failed to deserialize configuration",
                e,
            )
        })
    }
}
