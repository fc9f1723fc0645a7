//! Session lifecycle handlers: create, lookup, join, heartbeat, evict,
//! close.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;

use tavle_core::error::AppError;
use tavle_core::traits::directory::{
    CreatedSession, JoinGrant, SessionDirectory, SessionSummary, TouchOutcome,
};

use crate::dto::request::{EvictRequest, HeartbeatRequest, JoinRequest};
use crate::dto::response::HeartbeatResponse;
use crate::state::AppState;

/// POST /api/sessions — teacher creates a session.
pub async fn create(State(state): State<AppState>) -> Result<Json<CreatedSession>, AppError> {
    let created = state.sessions.create_session().await?;
    Ok(Json(created))
}

/// GET /api/sessions/{code} — lookup with distinct 404/410.
pub async fn lookup(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<SessionSummary>, AppError> {
    let summary = state.sessions.describe_session(&code).await?;
    Ok(Json(summary))
}

/// POST /api/sessions/join
pub async fn join(
    State(state): State<AppState>,
    Json(body): Json<JoinRequest>,
) -> Result<Json<JoinGrant>, AppError> {
    let grant = state
        .sessions
        .join(&body.session_code, &body.alias, &body.client_token)
        .await?;
    Ok(Json(grant))
}

/// POST /api/sessions/heartbeat — 404 is the confirmed "you are gone"
/// signal the client heartbeat acts on.
pub async fn heartbeat(
    State(state): State<AppState>,
    Json(body): Json<HeartbeatRequest>,
) -> Result<Json<HeartbeatResponse>, AppError> {
    match state.sessions.touch(&body.session_code, &body.alias).await? {
        TouchOutcome::Alive => Ok(Json(HeartbeatResponse {
            status: "alive".to_string(),
        })),
        TouchOutcome::Removed => Err(AppError::not_found("Participant no longer in session")),
    }
}

/// POST /api/sessions/evict — teacher removes a participant.
pub async fn evict(
    State(state): State<AppState>,
    Json(body): Json<EvictRequest>,
) -> Result<StatusCode, AppError> {
    let reason = body.reason.as_deref().unwrap_or("Removed by teacher");
    state
        .sessions
        .evict(&body.session_code, &body.alias, reason)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/sessions/{code} — teacher closes a session early.
pub async fn close(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<StatusCode, AppError> {
    if state.sessions.close_session(&code).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found("Session does not exist"))
    }
}
