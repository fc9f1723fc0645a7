//! HTTP implementation of the session directory, speaking to the Tavle
//! server's `/api/sessions` surface.
//!
//! Transport failures map to `Unreachable`; the server's error statuses
//! map back onto the join taxonomy (404 not-found, 410 expired,
//! 409 alias-taken, 400 validation).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use tavle_core::error::{AppError, ErrorKind};
use tavle_core::result::AppResult;
use tavle_core::traits::directory::{
    CreatedSession, JoinGrant, SessionDirectory, SessionSummary, TouchOutcome,
};

/// Error body returned by the Tavle API.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[allow(dead_code)]
    error: String,
    message: String,
}

#[derive(Debug, Serialize)]
struct JoinBody<'a> {
    session_code: &'a str,
    alias: &'a str,
    client_token: &'a str,
}

#[derive(Debug, Serialize)]
struct ParticipantBody<'a> {
    session_code: &'a str,
    alias: &'a str,
}

#[derive(Debug, Serialize)]
struct EvictBody<'a> {
    session_code: &'a str,
    alias: &'a str,
    reason: &'a str,
}

/// Session directory over HTTP.
#[derive(Debug, Clone)]
pub struct HttpDirectory {
    client: reqwest::Client,
    base_url: String,
}

impl HttpDirectory {
    /// Create a directory client against the given base URL
    /// (e.g. `http://localhost:8080`).
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Map a non-success response to the error taxonomy, pulling the
    /// server's message through when the body parses.
    async fn error_from(response: reqwest::Response) -> AppError {
        let status = response.status();
        let kind = match status.as_u16() {
            404 => ErrorKind::NotFound,
            410 => ErrorKind::Expired,
            409 => ErrorKind::AliasTaken,
            400 => ErrorKind::Validation,
            500..=599 => ErrorKind::Unreachable,
            _ => ErrorKind::Internal,
        };

        let message = match response.json::<ApiErrorBody>().await {
            Ok(body) => body.message,
            Err(_) => format!("Session service returned {status}"),
        };

        AppError::new(kind, message)
    }

    fn transport_error(e: reqwest::Error) -> AppError {
        debug!(error = %e, "Session service unreachable");
        AppError::with_source(ErrorKind::Unreachable, "Cannot reach session service", e)
    }
}

#[async_trait]
impl SessionDirectory for HttpDirectory {
    async fn create_session(&self) -> AppResult<CreatedSession> {
        let response = self
            .client
            .post(self.url("/api/sessions"))
            .send()
            .await
            .map_err(Self::transport_error)?;

        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }
        response.json().await.map_err(Self::transport_error)
    }

    async fn lookup_session(&self, code: &str) -> AppResult<Option<SessionSummary>> {
        let response = self
            .client
            .get(self.url(&format!("/api/sessions/{code}")))
            .send()
            .await
            .map_err(Self::transport_error)?;

        match response.status().as_u16() {
            200 => Ok(Some(response.json().await.map_err(Self::transport_error)?)),
            // Absent and expired are both "absent" to lookup callers.
            404 | 410 => Ok(None),
            _ => Err(Self::error_from(response).await),
        }
    }

    async fn join(&self, code: &str, alias: &str, client_token: &str) -> AppResult<JoinGrant> {
        let response = self
            .client
            .post(self.url("/api/sessions/join"))
            .json(&JoinBody {
                session_code: code,
                alias,
                client_token,
            })
            .send()
            .await
            .map_err(Self::transport_error)?;

        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }
        response.json().await.map_err(Self::transport_error)
    }

    async fn touch(&self, code: &str, alias: &str) -> AppResult<TouchOutcome> {
        let response = self
            .client
            .post(self.url("/api/sessions/heartbeat"))
            .json(&ParticipantBody {
                session_code: code,
                alias,
            })
            .send()
            .await
            .map_err(Self::transport_error)?;

        match response.status().as_u16() {
            200 => Ok(TouchOutcome::Alive),
            // The one confirmed "you are gone" signal.
            404 => Ok(TouchOutcome::Removed),
            _ => Err(Self::error_from(response).await),
        }
    }

    async fn evict(&self, code: &str, alias: &str, reason: &str) -> AppResult<()> {
        let response = self
            .client
            .post(self.url("/api/sessions/evict"))
            .json(&EvictBody {
                session_code: code,
                alias,
                reason,
            })
            .send()
            .await
            .map_err(Self::transport_error)?;

        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }
        Ok(())
    }
}
