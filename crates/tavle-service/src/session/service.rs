//! Session directory service implementation.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tracing::{info, warn};

use tavle_core::config::SessionConfig;
use tavle_core::error::AppError;
use tavle_core::result::AppResult;
use tavle_core::traits::directory::{
    CreatedSession, JoinGrant, SessionDirectory, SessionSummary, TouchOutcome,
};
use tavle_core::types::room::{RoomId, canonicalize_code, normalize_alias};
use tavle_database::repositories::participant::ParticipantRepository;
use tavle_database::repositories::session::SessionRepository;
use tavle_entity::participant::Participant;
use tavle_entity::session::Session;
use tavle_realtime::hub::LiveHub;

use super::code::generate_code;

/// Session directory backed by PostgreSQL and the realtime hub.
#[derive(Clone)]
pub struct SessionService {
    /// Session rows.
    sessions: Arc<SessionRepository>,
    /// Participant rows.
    participants: Arc<ParticipantRepository>,
    /// Realtime hub for kick delivery.
    hub: LiveHub,
    /// Session policy.
    config: SessionConfig,
}

impl std::fmt::Debug for SessionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionService")
            .field("config", &self.config)
            .finish()
    }
}

impl SessionService {
    /// Creates a new session service.
    pub fn new(
        sessions: Arc<SessionRepository>,
        participants: Arc<ParticipantRepository>,
        hub: LiveHub,
        config: SessionConfig,
    ) -> Self {
        Self {
            sessions,
            participants,
            hub,
            config,
        }
    }

    /// Find a session by caller-supplied code, expired rows included.
    /// Callers that must distinguish absent from expired use this.
    async fn find_session(&self, code: &str) -> AppResult<Option<Session>> {
        let code = canonicalize_code(code);
        if code.is_empty() {
            return Err(AppError::validation("Session code must not be empty"));
        }
        self.sessions.find_by_code(&code).await
    }

    /// Describe a session, distinguishing absent from expired so the
    /// HTTP surface can return distinct statuses.
    pub async fn describe_session(&self, code: &str) -> AppResult<SessionSummary> {
        let session = self
            .find_session(code)
            .await?
            .ok_or_else(|| AppError::not_found("Session does not exist"))?;
        if session.is_expired(Utc::now()) {
            return Err(AppError::expired("Session has expired"));
        }
        Ok(session.summary())
    }

    /// List a session's participants with their room ids (teacher view).
    pub async fn roster(&self, code: &str) -> AppResult<Vec<(RoomId, Participant)>> {
        let session = match self.find_session(code).await? {
            Some(s) if !s.is_expired(Utc::now()) => s,
            _ => return Err(AppError::not_found("Session does not exist")),
        };

        let participants = self.participants.list_by_session(session.id).await?;
        Ok(participants
            .into_iter()
            .map(|p| (RoomId::new(&session.code, &p.alias), p))
            .collect())
    }

    /// Close a session explicitly (teacher action). Participants cascade.
    pub async fn close_session(&self, code: &str) -> AppResult<bool> {
        let code = canonicalize_code(code);
        let deleted = self.sessions.delete_by_code(&code).await?;
        if deleted {
            info!(code = %code, "Session closed");
        }
        Ok(deleted)
    }

    /// Delete all expired sessions. Invoked by the scheduled sweep;
    /// idempotent and safe alongside live lookups.
    pub async fn sweep_expired(&self) -> AppResult<u64> {
        let removed = self.sessions.delete_expired(Utc::now()).await?;
        if removed > 0 {
            info!(removed, "Swept expired sessions");
        }
        Ok(removed)
    }

    /// The realtime hub this service publishes through.
    pub fn hub(&self) -> &LiveHub {
        &self.hub
    }
}

#[async_trait]
impl SessionDirectory for SessionService {
    async fn create_session(&self) -> AppResult<CreatedSession> {
        let expires_at = Utc::now() + Duration::minutes(self.config.expiry_minutes);

        // Bounded retry on code collision. The code space is large
        // enough that more than one retry is already unusual.
        for attempt in 1..=self.config.code_attempts {
            let code = generate_code(self.config.code_length);
            if self.sessions.code_exists(&code).await? {
                warn!(attempt, "Session code collision, regenerating");
                continue;
            }

            let session = self.sessions.create(&code, expires_at).await?;
            info!(code = %session.code, expires_at = %session.expires_at, "Session created");
            return Ok(CreatedSession {
                code: session.code,
                expires_at: session.expires_at,
            });
        }

        Err(AppError::internal(
            "Could not allocate a unique session code",
        ))
    }

    async fn lookup_session(&self, code: &str) -> AppResult<Option<SessionSummary>> {
        let session = self.find_session(code).await?;
        // An expired-but-present row is absent to every caller.
        Ok(session
            .filter(|s| !s.is_expired(Utc::now()))
            .map(|s| s.summary()))
    }

    async fn join(&self, code: &str, alias: &str, client_token: &str) -> AppResult<JoinGrant> {
        let alias = normalize_alias(alias);
        if alias.is_empty() {
            return Err(AppError::validation("Alias must not be empty"));
        }

        let now = Utc::now();
        let session = self
            .find_session(code)
            .await?
            .ok_or_else(|| AppError::not_found("Session does not exist"))?;

        if session.is_expired(now) {
            return Err(AppError::expired("Session has expired"));
        }

        let freshness = Duration::seconds(self.config.alias_freshness_seconds);
        let participant = self
            .participants
            .upsert_guarded(session.id, &alias, client_token, now, freshness)
            .await?
            .ok_or_else(|| AppError::alias_taken("Alias is already in use"))?;

        let room = RoomId::new(&session.code, &participant.alias);
        info!(room = %room, "Participant joined");

        Ok(JoinGrant {
            session_id: session.id,
            code: session.code,
            alias: participant.alias,
            room,
            expires_at: session.expires_at,
        })
    }

    async fn touch(&self, code: &str, alias: &str) -> AppResult<TouchOutcome> {
        let alias = normalize_alias(alias);
        let session = match self.find_session(code).await? {
            Some(s) => s,
            // Session swept or closed: the participant is gone with it.
            None => return Ok(TouchOutcome::Removed),
        };

        let touched = self
            .participants
            .touch(session.id, &alias, Utc::now())
            .await?;

        if touched {
            Ok(TouchOutcome::Alive)
        } else {
            Ok(TouchOutcome::Removed)
        }
    }

    async fn evict(&self, code: &str, alias: &str, reason: &str) -> AppResult<()> {
        let alias = normalize_alias(alias);
        let session = self
            .find_session(code)
            .await?
            .ok_or_else(|| AppError::not_found("Session does not exist"))?;

        let deleted = self.participants.delete(session.id, &alias).await?;
        if !deleted {
            return Err(AppError::not_found("Participant not found"));
        }

        // Push path: immediate best-effort kick. The heartbeat path
        // catches a missed delivery.
        let room = RoomId::new(&session.code, &alias);
        let delivered = self.hub.kick(&room, reason).await;
        info!(room = %room, delivered, "Participant evicted");

        Ok(())
    }
}
