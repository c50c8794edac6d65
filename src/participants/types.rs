//! Participant Domain Types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum length for a participant id.
pub const MAX_PARTICIPANT_ID_LEN: usize = 64;

/// Maximum length for a display name.
pub const MAX_DISPLAY_NAME_LEN: usize = 128;

/// A participant present in a room.
///
/// Membership is independent of transport state: a participant exists from
/// the moment they join, before any media negotiation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    /// Identity token supplied by the caller (validated upstream).
    pub id: String,
    /// Room the participant is in.
    pub room_id: String,
    /// When the participant joined.
    pub joined_at: DateTime<Utc>,
    /// Display name, when provided.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Last heartbeat; drives departure detection.
    #[serde(skip)]
    pub last_seen_at: DateTime<Utc>,
}

/// Request body for joining a room.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRoomRequest {
    /// Explicit participant id; generated when omitted.
    pub participant_id: Option<String>,
    /// Display name.
    pub display_name: Option<String>,
}

/// Validate a caller-supplied participant id. Returns an error message if
/// invalid.
pub fn validate_participant_id(id: &str) -> Result<(), &'static str> {
    if id.is_empty() {
        return Err("Participant id cannot be empty");
    }
    if id.len() > MAX_PARTICIPANT_ID_LEN {
        return Err("Participant id too long (max 64 characters)");
    }
    if id.chars().any(|c| c.is_control() || c.is_whitespace()) {
        return Err("Participant id contains invalid characters");
    }
    Ok(())
}

/// Validate a display name. Returns an error message if invalid.
pub fn validate_display_name(name: &str) -> Result<(), &'static str> {
    if name.trim().is_empty() {
        return Err("Display name cannot be empty");
    }
    if name.len() > MAX_DISPLAY_NAME_LEN {
        return Err("Display name too long (max 128 characters)");
    }
    if name.chars().any(|c| c.is_control()) {
        return Err("Display name contains invalid characters");
    }
    Ok(())
}
