//! Room HTTP Handlers

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use serde_json::Value;

use super::types::{CreateRoomRequest, Room, RoomSummary};
use crate::api::AppState;
use crate::error::ApiError;

/// Response body for room listings.
#[derive(Debug, Serialize)]
pub struct RoomsResponse {
    /// All live rooms.
    pub rooms: Vec<RoomSummary>,
}

/// Response body wrapping a single room.
#[derive(Debug, Serialize)]
pub struct RoomResponse {
    /// The room.
    pub room: Room,
}

/// List all rooms.
///
/// `GET /api/rooms`
pub async fn list_rooms(State(state): State<AppState>) -> Json<RoomsResponse> {
    let mut rooms = Vec::new();
    for room in state.rooms.list().await {
        rooms.push(RoomSummary {
            id: room.id.clone(),
            title: room.title.clone(),
            participant_count: state.participants.count(&room.id),
        });
    }
    rooms.sort_by(|a, b| a.id.cmp(&b.id));

    Json(RoomsResponse { rooms })
}

/// Create a room.
///
/// `POST /api/rooms`
///
/// An explicit id that already exists is rejected with a conflict.
pub async fn create_room(
    State(state): State<AppState>,
    Json(req): Json<CreateRoomRequest>,
) -> Result<(StatusCode, Json<RoomResponse>), ApiError> {
    let title = req
        .title
        .ok_or_else(|| ApiError::Validation("Missing title".to_owned()))?;

    let room = state.rooms.create(req.id, title, req.host_id).await?;
    Ok((
        StatusCode::CREATED,
        Json(RoomResponse {
            room: (*room).clone(),
        }),
    ))
}

/// Get a room by id.
///
/// `GET /api/rooms/{room_id}`
pub async fn get_room(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> Result<Json<RoomResponse>, ApiError> {
    let room = state.rooms.get(&room_id).await.ok_or(ApiError::RoomNotFound)?;
    Ok(Json(RoomResponse {
        room: (*room).clone(),
    }))
}

/// Remove a room, tearing down its router, transports, and producers.
///
/// `DELETE /api/rooms/{room_id}`
pub async fn remove_room(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state
        .rooms
        .remove(&room_id)
        .await
        .ok_or(ApiError::RoomNotFound)?;

    // Media and roster teardown follow the directory removal so a
    // concurrent transport request cannot re-enter a half-removed room.
    state.media.remove_router(&room_id).await;
    state.participants.remove_room(&room_id);

    Ok(Json(serde_json::json!({})))
}
