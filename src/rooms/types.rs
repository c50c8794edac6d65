//! Room Domain Types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum length for a room id.
pub const MAX_ROOM_ID_LEN: usize = 64;

/// Maximum length for a room title.
pub const MAX_TITLE_LEN: usize = 128;

/// An ephemeral broadcast room.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    /// Room ID, unique process-wide.
    pub id: String,
    /// Display title.
    pub title: String,
    /// Hosting participant, when declared.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_id: Option<String>,
    /// When the room was created.
    pub created_at: DateTime<Utc>,
}

/// Room summary for listings.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummary {
    /// Room ID.
    pub id: String,
    /// Display title.
    pub title: String,
    /// Current roster size.
    pub participant_count: usize,
}

/// Request body for room creation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomRequest {
    /// Explicit room id; generated when omitted.
    pub id: Option<String>,
    /// Display title.
    pub title: Option<String>,
    /// Hosting participant.
    pub host_id: Option<String>,
}

/// Validate a caller-supplied room id. Returns an error message if invalid.
pub fn validate_room_id(id: &str) -> Result<(), &'static str> {
    if id.is_empty() {
        return Err("Room id cannot be empty");
    }
    if id.len() > MAX_ROOM_ID_LEN {
        return Err("Room id too long (max 64 characters)");
    }
    if id.chars().any(|c| c.is_control() || c.is_whitespace()) {
        return Err("Room id contains invalid characters");
    }
    Ok(())
}

/// Validate a room title. Returns an error message if invalid.
pub fn validate_title(title: &str) -> Result<(), &'static str> {
    if title.trim().is_empty() {
        return Err("Room title cannot be empty");
    }
    if title.len() > MAX_TITLE_LEN {
        return Err("Room title too long (max 128 characters)");
    }
    if title.chars().any(|c| c.is_control()) {
        return Err("Room title contains invalid characters");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_room_id() {
        assert!(validate_room_id("r1").is_ok());
        assert!(validate_room_id("01890b2e-90cd-7aaf-a342-11f4d7b1c1c5").is_ok());
        assert!(validate_room_id("").is_err());
        assert!(validate_room_id("has space").is_err());
        assert!(validate_room_id("ctrl\u{7}char").is_err());
        assert!(validate_room_id(&"x".repeat(MAX_ROOM_ID_LEN + 1)).is_err());
    }

    #[test]
    fn test_validate_title() {
        assert!(validate_title("Friday night show").is_ok());
        assert!(validate_title("").is_err());
        assert!(validate_title("   ").is_err());
        assert!(validate_title(&"x".repeat(MAX_TITLE_LEN + 1)).is_err());
    }

    #[test]
    fn test_room_wire_shape() {
        let room = Room {
            id: "r1".to_owned(),
            title: "Show".to_owned(),
            host_id: None,
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(&room).unwrap();
        assert_eq!(json["id"], "r1");
        assert_eq!(json["title"], "Show");
        assert!(json.get("hostId").is_none());
        assert!(json["createdAt"].is_string());
    }
}
