//! Participant repository implementation.

use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;

use tavle_core::error::{AppError, ErrorKind};
use tavle_core::result::AppResult;
use tavle_core::types::id::SessionId;
use tavle_entity::participant::Participant;

/// Repository for participant rows, keyed by `(session_id, alias)`.
#[derive(Debug, Clone)]
pub struct ParticipantRepository {
    pool: PgPool,
}

impl ParticipantRepository {
    /// Create a new participant repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a participant by session and alias.
    pub async fn find(&self, session_id: SessionId, alias: &str) -> AppResult<Option<Participant>> {
        sqlx::query_as::<_, Participant>(
            "SELECT * FROM participants WHERE session_id = $1 AND alias = $2",
        )
        .bind(session_id)
        .bind(alias)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find participant", e))
    }

    /// Conditional upsert implementing the alias-collision rule in one
    /// race-safe statement.
    ///
    /// Inserts the row, or on conflict overwrites `client_token` and
    /// `last_seen` only when the existing holder is stale (outside the
    /// freshness window) or presents the same token. Returns `None` when
    /// the alias is held by a live participant on a different device —
    /// the caller maps that to `AliasTaken`.
    pub async fn upsert_guarded(
        &self,
        session_id: SessionId,
        alias: &str,
        client_token: &str,
        now: DateTime<Utc>,
        freshness: Duration,
    ) -> AppResult<Option<Participant>> {
        let stale_before = now - freshness;

        sqlx::query_as::<_, Participant>(
            "INSERT INTO participants (session_id, alias, client_token, joined_at, last_seen) \
             VALUES ($1, $2, $3, $4, $4) \
             ON CONFLICT (session_id, alias) DO UPDATE \
             SET client_token = EXCLUDED.client_token, last_seen = EXCLUDED.last_seen \
             WHERE participants.last_seen < $5 OR participants.client_token = EXCLUDED.client_token \
             RETURNING *",
        )
        .bind(session_id)
        .bind(alias)
        .bind(client_token)
        .bind(now)
        .bind(stale_before)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to upsert participant", e))
    }

    /// Refresh `last_seen` for a heartbeat. Returns `false` when the row
    /// no longer exists (teacher eviction or session deletion).
    pub async fn touch(
        &self,
        session_id: SessionId,
        alias: &str,
        now: DateTime<Utc>,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE participants SET last_seen = $3 WHERE session_id = $1 AND alias = $2",
        )
        .bind(session_id)
        .bind(alias)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to touch participant", e))?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete a participant row. Returns `true` if a row was deleted.
    pub async fn delete(&self, session_id: SessionId, alias: &str) -> AppResult<bool> {
        let result =
            sqlx::query("DELETE FROM participants WHERE session_id = $1 AND alias = $2")
                .bind(session_id)
                .bind(alias)
                .execute(&self.pool)
                .await
                .map_err(|e| {
                    AppError::with_source(ErrorKind::Database, "Failed to delete participant", e)
                })?;
        Ok(result.rows_affected() > 0)
    }

    /// List all participants of a session, most recently seen first.
    pub async fn list_by_session(&self, session_id: SessionId) -> AppResult<Vec<Participant>> {
        sqlx::query_as::<_, Participant>(
            "SELECT * FROM participants WHERE session_id = $1 ORDER BY last_seen DESC",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to list participants", e)
        })
    }
}
