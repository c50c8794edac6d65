//! Media Service (SFU)
//!
//! WebRTC selective-forwarding core for broadcast rooms.
//!
//! This module provides:
//! - The process-wide media engine adapter and per-room routers
//! - Transport sessions with the connect/produce/close state machine
//! - Producer registration and discovery
//! - HTTP endpoints for the negotiation protocol

pub mod codecs;
pub mod engine;
pub mod handlers;
pub mod producer;
pub mod router;
pub mod transport;

use axum::routing::post;
use axum::Router;
// Re-exports
pub use codecs::{RouterRtpCapabilities, RtpCodecCapability};
pub use engine::MediaEngineAdapter;
pub use producer::{MediaKind, Producer, ProducerInfo};
pub use router::RoomRouter;
pub use transport::{TransportSession, TransportState};

use crate::api::AppState;

/// Create the media negotiation router.
///
/// Producer discovery is room-scoped and lives under the rooms router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/transport", post(handlers::create_transport))
        .route("/transport/connect", post(handlers::connect_transport))
        .route("/transport/close", post(handlers::close_transport))
        .route("/produce", post(handlers::produce))
        .route("/producer/close", post(handlers::close_producer))
}
