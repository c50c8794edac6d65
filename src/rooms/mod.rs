//! Room Directory
//!
//! Creation, lookup, and teardown of ephemeral broadcast rooms, plus the
//! room-scoped discovery endpoints (participants, producers).

pub mod handlers;
pub mod registry;
pub mod types;

use axum::routing::{delete, get, put};
use axum::Router;
// Re-exports
pub use registry::{start_empty_room_sweep, RoomRegistry};
pub use types::{CreateRoomRequest, Room, RoomSummary};

use crate::api::AppState;
use crate::media;
use crate::participants;

/// Create the rooms router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_rooms).post(handlers::create_room))
        .route(
            "/{room_id}",
            get(handlers::get_room).delete(handlers::remove_room),
        )
        .route(
            "/{room_id}/participants",
            get(participants::handlers::list_participants)
                .post(participants::handlers::join_room),
        )
        .route(
            "/{room_id}/participants/{participant_id}/heartbeat",
            put(participants::handlers::heartbeat),
        )
        .route(
            "/{room_id}/participants/{participant_id}",
            delete(participants::handlers::leave_room),
        )
        .route("/{room_id}/producers", get(media::handlers::list_producers))
}
