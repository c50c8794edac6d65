//! Service Errors
//!
//! Central error taxonomy for all room, participant, and media operations,
//! mapped onto HTTP responses with a uniform `{ok: false, error}` body.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

/// Errors that can occur during room and media operations.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed or missing required fields.
    #[error("{0}")]
    Validation(String),

    /// Room not found.
    #[error("Room not found")]
    RoomNotFound,

    /// Transport not found.
    #[error("Transport not found")]
    TransportNotFound,

    /// Producer not found.
    #[error("Producer not found")]
    ProducerNotFound,

    /// Participant not found.
    #[error("Participant not found")]
    ParticipantNotFound,

    /// Operation invalid given the current resource state.
    #[error("{0}")]
    InvalidState(String),

    /// Resource id collision.
    #[error("{0}")]
    Conflict(String),

    /// Underlying media engine allocation/negotiation failure.
    #[error("Media engine error: {0}")]
    Engine(String),

    /// Media engine call exceeded its time bound.
    #[error("Media engine timed out")]
    EngineTimeout,

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::Validation(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            Self::RoomNotFound
            | Self::TransportNotFound
            | Self::ProducerNotFound
            | Self::ParticipantNotFound => (StatusCode::NOT_FOUND, self.to_string()),
            Self::InvalidState(_) | Self::Conflict(_) => (StatusCode::CONFLICT, self.to_string()),
            Self::Engine(detail) => {
                tracing::error!(detail = %detail, "Media engine failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Media engine error".to_string(),
                )
            }
            Self::EngineTimeout => (StatusCode::GATEWAY_TIMEOUT, self.to_string()),
            Self::Internal(detail) => {
                tracing::error!(detail = %detail, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(serde_json::json!({
            "ok": false,
            "error": message,
        }));

        (status, body).into_response()
    }
}

impl From<webrtc::Error> for ApiError {
    fn from(err: webrtc::Error) -> Self {
        Self::Engine(err.to_string())
    }
}

impl From<tokio::time::error::Elapsed> for ApiError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        Self::EngineTimeout
    }
}
