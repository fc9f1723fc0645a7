//! Teacher room list.

use axum::Json;
use axum::extract::{Query, State};
use chrono::Utc;

use tavle_core::error::AppError;

use crate::dto::request::RoomsQuery;
use crate::dto::response::RoomSummary;
use crate::state::AppState;

/// GET /api/rooms?code= — the teacher's live view of a session's rooms.
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<RoomsQuery>,
) -> Result<Json<Vec<RoomSummary>>, AppError> {
    let roster = state.sessions.roster(&query.code).await?;
    let now = Utc::now();

    let rooms = roster
        .into_iter()
        .map(|(room, participant)| RoomSummary {
            presence: state.hub.presence().status(&room, now),
            room: room.to_string(),
            alias: participant.alias,
            joined_at: participant.joined_at,
            last_seen: participant.last_seen,
        })
        .collect();

    Ok(Json(rooms))
}
