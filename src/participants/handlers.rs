//! Participant HTTP Handlers

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use serde_json::Value;

use super::types::{validate_display_name, validate_participant_id, JoinRoomRequest, Participant};
use crate::api::AppState;
use crate::error::ApiError;

/// Response body for roster listings.
#[derive(Debug, Serialize)]
pub struct ParticipantsResponse {
    /// Roster size.
    pub count: usize,
    /// Current participants.
    pub participants: Vec<Participant>,
}

/// Response body wrapping a single participant.
#[derive(Debug, Serialize)]
pub struct ParticipantResponse {
    /// The participant.
    pub participant: Participant,
}

/// List a room's participants.
///
/// `GET /api/rooms/{room_id}/participants`
pub async fn list_participants(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> Result<Json<ParticipantsResponse>, ApiError> {
    if state.rooms.get(&room_id).await.is_none() {
        return Err(ApiError::RoomNotFound);
    }

    let participants = state.participants.list(&room_id);
    Ok(Json(ParticipantsResponse {
        count: participants.len(),
        participants,
    }))
}

/// Join a room.
///
/// `POST /api/rooms/{room_id}/participants`
///
/// Membership precedes any transport negotiation.
pub async fn join_room(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Json(req): Json<JoinRoomRequest>,
) -> Result<(StatusCode, Json<ParticipantResponse>), ApiError> {
    if state.rooms.get(&room_id).await.is_none() {
        return Err(ApiError::RoomNotFound);
    }

    if let Some(id) = &req.participant_id {
        validate_participant_id(id).map_err(|e| ApiError::Validation(e.to_owned()))?;
    }
    if let Some(name) = &req.display_name {
        validate_display_name(name).map_err(|e| ApiError::Validation(e.to_owned()))?;
    }

    let participant = state
        .participants
        .join(&room_id, req.participant_id, req.display_name);
    Ok((StatusCode::CREATED, Json(ParticipantResponse { participant })))
}

/// Refresh a participant's heartbeat.
///
/// `PUT /api/rooms/{room_id}/participants/{participant_id}/heartbeat`
pub async fn heartbeat(
    State(state): State<AppState>,
    Path((room_id, participant_id)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    if state.rooms.get(&room_id).await.is_none() {
        return Err(ApiError::RoomNotFound);
    }

    state.participants.heartbeat(&room_id, &participant_id)?;
    Ok(Json(serde_json::json!({})))
}

/// Leave a room, tearing down the participant's transports.
///
/// `DELETE /api/rooms/{room_id}/participants/{participant_id}`
pub async fn leave_room(
    State(state): State<AppState>,
    Path((room_id, participant_id)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    if state.rooms.get(&room_id).await.is_none() {
        return Err(ApiError::RoomNotFound);
    }

    state
        .participants
        .leave(&room_id, &participant_id)
        .ok_or(ApiError::ParticipantNotFound)?;
    state.media.close_owned(&room_id, &participant_id).await;

    Ok(Json(serde_json::json!({})))
}
