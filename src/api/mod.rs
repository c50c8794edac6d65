//! API Router and Application State
//!
//! Central routing configuration and shared state.

use std::sync::Arc;

use axum::{extract::State, response::IntoResponse, routing::get, Json, Router};
use serde::Serialize;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    config::Config,
    media::{self, MediaEngineAdapter},
    participants::ParticipantTracker,
    rooms::{self, RoomRegistry},
};

/// Shared application state.
///
/// Every service is an explicitly constructed instance; tests build as many
/// isolated states as they need.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration
    pub config: Arc<Config>,
    /// Room directory
    pub rooms: Arc<RoomRegistry>,
    /// Participant rosters
    pub participants: Arc<ParticipantTracker>,
    /// Media engine adapter
    pub media: Arc<MediaEngineAdapter>,
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(config: Config) -> Self {
        let config = Arc::new(config);
        Self {
            rooms: Arc::new(RoomRegistry::new()),
            participants: Arc::new(ParticipantTracker::new(config.participant_ttl())),
            media: Arc::new(MediaEngineAdapter::new(Arc::clone(&config))),
            config,
        }
    }
}

/// Create the main application router.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Room directory and room-scoped discovery
        .nest("/api/rooms", rooms::router())
        // Media negotiation
        .nest("/api/media", media::router())
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(cors)
        // State
        .with_state(state)
}

/// Health check response.
#[derive(Serialize)]
struct HealthResponse {
    /// Service status
    status: &'static str,
    /// Number of live rooms
    rooms: usize,
}

/// Health check endpoint.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        rooms: state.rooms.count().await,
    })
}

/// A panicking handler degrades to the generic error body instead of
/// tearing down the connection.
fn handle_panic(err: Box<dyn std::any::Any + Send + 'static>) -> axum::response::Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("panic");
    tracing::error!(detail = %detail, "Request handler panicked");

    (
        axum::http::StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({
            "ok": false,
            "error": "Internal server error",
        })),
    )
        .into_response()
}
