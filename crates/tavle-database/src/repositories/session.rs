//! Session repository implementation.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use tavle_core::error::{AppError, ErrorKind};
use tavle_core::result::AppResult;
use tavle_core::types::id::SessionId;
use tavle_entity::session::Session;

/// Repository for session CRUD and query operations.
#[derive(Debug, Clone)]
pub struct SessionRepository {
    pool: PgPool,
}

impl SessionRepository {
    /// Create a new session repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new session row.
    ///
    /// Fails with a unique-violation on code collision; the service
    /// retries with a freshly generated code.
    pub async fn create(&self, code: &str, expires_at: DateTime<Utc>) -> AppResult<Session> {
        sqlx::query_as::<_, Session>(
            "INSERT INTO sessions (code, expires_at) VALUES ($1, $2) RETURNING *",
        )
        .bind(code)
        .bind(expires_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to create session", e))?
        .ok_or_else(|| AppError::database("Session insert returned no row"))
    }

    /// Whether a session row with this code exists (expired or not).
    pub async fn code_exists(&self, code: &str) -> AppResult<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sessions WHERE code = $1")
            .bind(code)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to check session code", e)
            })?;
        Ok(count > 0)
    }

    /// Find a session by canonical code, expired rows included.
    ///
    /// The service layer distinguishes absent from expired; readers that
    /// only want valid sessions must check `expires_at` themselves.
    pub async fn find_by_code(&self, code: &str) -> AppResult<Option<Session>> {
        sqlx::query_as::<_, Session>("SELECT * FROM sessions WHERE code = $1")
            .bind(code)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find session", e))
    }

    /// Find a session by ID.
    pub async fn find_by_id(&self, id: SessionId) -> AppResult<Option<Session>> {
        sqlx::query_as::<_, Session>("SELECT * FROM sessions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find session", e))
    }

    /// Delete a session by code (explicit teacher closure). Participants
    /// cascade. Returns `true` if a row was deleted.
    pub async fn delete_by_code(&self, code: &str) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM sessions WHERE code = $1")
            .bind(code)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to delete session", e)
            })?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete all sessions past their expiry instant. Idempotent and
    /// safe to run concurrently with lookups: a session mid-deletion is
    /// indistinguishable from one already swept. Returns the number of
    /// rows removed.
    pub async fn delete_expired(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to sweep expired sessions", e)
            })?;
        Ok(result.rows_affected())
    }
}
