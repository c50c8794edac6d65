//! Media Negotiation HTTP Handlers
//!
//! Transport creation/connection, producing, and producer discovery.
//! Negotiation payloads pass through as opaque blobs, validated only for
//! the presence and shape of their required top-level fields.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;
use webrtc::dtls_transport::dtls_parameters::DTLSParameters;
use webrtc::ice_transport::ice_candidate::RTCIceCandidate;
use webrtc::ice_transport::ice_parameters::RTCIceParameters;

use super::codecs::RouterRtpCapabilities;
use super::producer::{MediaKind, ProducerInfo};
use crate::api::AppState;
use crate::error::ApiError;

/// Request body for transport creation.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTransportRequest {
    /// Room the transport belongs to.
    pub room_id: Option<String>,
    /// Participant requesting the transport; ties the transport's lifetime
    /// to the participant's presence when supplied.
    pub participant_id: Option<String>,
}

/// Everything a client needs to connect: local ICE/DTLS parameters plus
/// the router capabilities.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTransportResponse {
    /// Transport ID.
    pub id: Uuid,
    /// Local ICE parameters.
    pub ice_parameters: RTCIceParameters,
    /// Local ICE candidates.
    pub ice_candidates: Vec<RTCIceCandidate>,
    /// Local DTLS parameters.
    pub dtls_parameters: DTLSParameters,
    /// Codec capabilities of the room's router.
    pub router_rtp_capabilities: RouterRtpCapabilities,
}

/// Request body for transport connection.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectTransportRequest {
    pub room_id: Option<String>,
    pub transport_id: Option<String>,
    /// Remote DTLS parameters, opaque beyond structural checks.
    pub dtls_parameters: Option<Value>,
}

/// Request body for transport close.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloseTransportRequest {
    pub room_id: Option<String>,
    pub transport_id: Option<String>,
}

/// Request body for producing media.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProduceRequest {
    pub room_id: Option<String>,
    pub transport_id: Option<String>,
    /// "audio" or "video".
    pub kind: Option<String>,
    /// Opaque RTP parameters.
    pub rtp_parameters: Option<Value>,
    /// Opaque application metadata.
    pub app_data: Option<Value>,
}

/// Response body for a successful produce.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProduceResponse {
    /// ID of the created producer.
    pub producer_id: Uuid,
}

/// Request body for producer close.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloseProducerRequest {
    pub room_id: Option<String>,
    pub producer_id: Option<String>,
}

/// Response body for producer listings.
#[derive(Debug, Serialize)]
pub struct ProducersResponse {
    /// Active producers in the room.
    pub producers: Vec<ProducerInfo>,
}

/// Create a WebRTC transport.
///
/// `POST /api/media/transport`
pub async fn create_transport(
    State(state): State<AppState>,
    Json(req): Json<CreateTransportRequest>,
) -> Result<(StatusCode, Json<CreateTransportResponse>), ApiError> {
    let room_id = require(req.room_id, "roomId")?;
    if state.rooms.get(&room_id).await.is_none() {
        return Err(ApiError::RoomNotFound);
    }

    let session = state
        .media
        .create_transport(&room_id, req.participant_id)
        .await?;
    let capabilities = state
        .media
        .router(&room_id)
        .map(|r| r.rtp_capabilities.clone())
        .ok_or(ApiError::RoomNotFound)?;

    Ok((
        StatusCode::CREATED,
        Json(CreateTransportResponse {
            id: session.id,
            ice_parameters: session.ice_parameters.clone(),
            ice_candidates: session.ice_candidates.clone(),
            dtls_parameters: session.dtls_parameters.clone(),
            router_rtp_capabilities: capabilities,
        }),
    ))
}

/// Connect a transport with the client's DTLS parameters.
///
/// `POST /api/media/transport/connect`
pub async fn connect_transport(
    State(state): State<AppState>,
    Json(req): Json<ConnectTransportRequest>,
) -> Result<Json<Value>, ApiError> {
    let room_id = require(req.room_id, "roomId")?;
    let transport_id = require(req.transport_id, "transportId")?;
    let remote = req
        .dtls_parameters
        .ok_or_else(|| ApiError::Validation("Missing dtlsParameters".to_owned()))?;
    validate_dtls_parameters(&remote)?;

    let transport_id = parse_transport_id(&transport_id)?;
    state
        .media
        .connect_transport(&room_id, transport_id, remote)
        .await?;

    Ok(Json(serde_json::json!({})))
}

/// Close a transport and all its producers.
///
/// `POST /api/media/transport/close`
pub async fn close_transport(
    State(state): State<AppState>,
    Json(req): Json<CloseTransportRequest>,
) -> Result<Json<Value>, ApiError> {
    let room_id = require(req.room_id, "roomId")?;
    let transport_id = require(req.transport_id, "transportId")?;

    let transport_id = parse_transport_id(&transport_id)?;
    state.media.close_transport(&room_id, transport_id).await?;

    Ok(Json(serde_json::json!({})))
}

/// Produce media on a connected transport.
///
/// `POST /api/media/produce`
pub async fn produce(
    State(state): State<AppState>,
    Json(req): Json<ProduceRequest>,
) -> Result<Json<ProduceResponse>, ApiError> {
    let room_id = require(req.room_id, "roomId")?;
    let transport_id = require(req.transport_id, "transportId")?;
    let kind = require(req.kind, "kind")?;
    let rtp_parameters = req
        .rtp_parameters
        .ok_or_else(|| ApiError::Validation("Missing rtpParameters".to_owned()))?;

    let kind =
        MediaKind::parse(&kind).ok_or_else(|| ApiError::Validation("Invalid kind".to_owned()))?;
    validate_rtp_parameters(&rtp_parameters)?;
    let app_data = match req.app_data {
        None => Value::Object(serde_json::Map::new()),
        Some(value) if value.is_object() => value,
        Some(_) => return Err(ApiError::Validation("Invalid appData".to_owned())),
    };

    let transport_id = parse_transport_id(&transport_id)?;
    let producer_id = state
        .media
        .produce(&room_id, transport_id, kind, rtp_parameters, app_data)
        .await?;

    Ok(Json(ProduceResponse { producer_id }))
}

/// Close a single producer.
///
/// `POST /api/media/producer/close`
pub async fn close_producer(
    State(state): State<AppState>,
    Json(req): Json<CloseProducerRequest>,
) -> Result<Json<Value>, ApiError> {
    let room_id = require(req.room_id, "roomId")?;
    let producer_id = require(req.producer_id, "producerId")?;

    let producer_id =
        Uuid::parse_str(&producer_id).map_err(|_| ApiError::ProducerNotFound)?;
    state.media.close_producer(&room_id, producer_id).await?;

    Ok(Json(serde_json::json!({})))
}

/// List a room's active producers.
///
/// `GET /api/rooms/{room_id}/producers`
pub async fn list_producers(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> Result<Json<ProducersResponse>, ApiError> {
    if state.rooms.get(&room_id).await.is_none() {
        return Err(ApiError::RoomNotFound);
    }

    let producers = state.media.list_producers(&room_id).await;
    Ok(Json(ProducersResponse { producers }))
}

/// Presence check for a required string field.
fn require(field: Option<String>, name: &str) -> Result<String, ApiError> {
    field
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ApiError::Validation(format!("Missing {name}")))
}

/// Ids that cannot be parsed can never name a live transport.
fn parse_transport_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::TransportNotFound)
}

/// RTP parameters stay opaque beyond requiring a non-empty codec list.
fn validate_rtp_parameters(value: &Value) -> Result<(), ApiError> {
    match value.get("codecs").and_then(Value::as_array) {
        Some(codecs) if !codecs.is_empty() => Ok(()),
        _ => Err(ApiError::Validation("Invalid rtpParameters".to_owned())),
    }
}

/// DTLS parameters stay opaque beyond requiring a non-empty fingerprint
/// list.
fn validate_dtls_parameters(value: &Value) -> Result<(), ApiError> {
    if !value.is_object() {
        return Err(ApiError::Validation("Invalid dtlsParameters".to_owned()));
    }
    match value.get("fingerprints").and_then(Value::as_array) {
        Some(fingerprints) if !fingerprints.is_empty() => Ok(()),
        _ => Err(ApiError::Validation("Invalid dtlsParameters".to_owned())),
    }
}
