//! Event publish endpoint and the SSE stream.

use std::convert::Infallible;
use std::time::Duration;

use axum::Json;
use axum::extract::{Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tracing::debug;

use tavle_core::error::AppError;
use tavle_core::types::room::RoomId;

use crate::dto::request::{PublishRequest, StreamQuery};
use crate::dto::response::PublishResponse;
use crate::state::AppState;

/// POST /api/events — write side of the server-push transport.
///
/// Fire-and-forget: a publish with zero subscribers, or one whose
/// deliveries all fail, is still `ok`. Events are live-presence
/// signals, not durable records.
pub async fn publish(
    State(state): State<AppState>,
    Json(body): Json<PublishRequest>,
) -> Result<Json<PublishResponse>, AppError> {
    let room = RoomId::parse(&body.room)
        .ok_or_else(|| AppError::validation("Malformed room identifier"))?;

    let delivered = state.hub.publish(&room, body.event).await;
    Ok(Json(PublishResponse {
        ok: true,
        delivered,
    }))
}

/// GET /api/events/stream?room= — unbounded SSE stream of live events
/// plus periodic keep-alive frames.
///
/// Closing the connection drops the stream, which drops the
/// subscription guard and removes the subscriber from the registry.
pub async fn stream(
    State(state): State<AppState>,
    Query(query): Query<StreamQuery>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let room = RoomId::parse(&query.room)
        .ok_or_else(|| AppError::validation("Malformed room identifier"))?;

    let subscription = state.hub.subscribe(&room).await;
    let (room, receiver, guard) = subscription.into_parts();
    debug!(room = %room, "SSE stream opened");

    // The guard travels in the stream state so subscriber cleanup runs
    // exactly when the response stream is dropped.
    let stream = futures::stream::unfold((receiver, guard), |(mut receiver, guard)| async move {
        let event = receiver.recv().await?;
        let frame = Event::default().json_data(&event).ok()?;
        Some((Ok::<_, Infallible>(frame), (receiver, guard)))
    });

    let keep_alive = KeepAlive::new()
        .interval(Duration::from_secs(
            state.config.realtime.keep_alive_seconds,
        ))
        .text("keep-alive");

    Ok(Sse::new(stream).keep_alive(keep_alive))
}
