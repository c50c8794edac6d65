//! Producer Records
//!
//! One producer per media stream a participant contributes over a
//! transport. RTP parameters and application metadata are carried as
//! opaque payloads.

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// The kind of media a producer contributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    /// Audio stream (e.g., microphone).
    Audio,
    /// Video stream (e.g., camera, screen).
    Video,
}

impl MediaKind {
    /// Parse a wire-format kind string.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "audio" => Some(Self::Audio),
            "video" => Some(Self::Video),
            _ => None,
        }
    }

    /// Wire-format name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Audio => "audio",
            Self::Video => "video",
        }
    }
}

/// One media stream contributed over a transport.
#[derive(Debug)]
pub struct Producer {
    /// Producer ID, unique across the whole process.
    pub id: Uuid,
    /// Owning transport ID.
    pub transport_id: Uuid,
    /// Kind of media produced.
    pub kind: MediaKind,
    /// Opaque RTP parameters supplied by the client.
    pub rtp_parameters: Value,
    /// Opaque application metadata supplied by the client.
    pub app_data: Value,
    /// When the producer was created.
    pub created_at: DateTime<Utc>,
    closed: AtomicBool,
}

impl Producer {
    /// Create a new active producer.
    #[must_use]
    pub fn new(transport_id: Uuid, kind: MediaKind, rtp_parameters: Value, app_data: Value) -> Self {
        Self {
            id: Uuid::now_v7(),
            transport_id,
            kind,
            rtp_parameters,
            app_data,
            created_at: Utc::now(),
            closed: AtomicBool::new(false),
        }
    }

    /// Mark the producer closed. Idempotent.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    /// Whether the producer is still active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.closed.load(Ordering::SeqCst)
    }

    /// Snapshot for producer listings.
    #[must_use]
    pub fn info(&self) -> ProducerInfo {
        ProducerInfo {
            id: self.id,
            kind: self.kind,
            app_data: self.app_data.clone(),
        }
    }
}

/// Producer summary exposed to other participants for stream discovery.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProducerInfo {
    /// Producer ID.
    pub id: Uuid,
    /// Kind of media produced.
    pub kind: MediaKind,
    /// Opaque application metadata.
    pub app_data: Value,
}
