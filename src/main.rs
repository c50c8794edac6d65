//! Stagecast Server - Main Entry Point
//!
//! Live broadcast room and media session backend.

use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use stagecast_server::{api, config, participants, rooms};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize rustls crypto provider (required for the WebRTC stack)
    let _ =
        rustls::crypto::CryptoProvider::install_default(rustls::crypto::ring::default_provider());

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stagecast_server=debug,tower_http=debug".into()),
        )
        .json()
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = config::Config::from_env()?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting Stagecast Server"
    );

    // Build application state
    let state = api::AppState::new(config);
    let config = Arc::clone(&state.config);

    // Warm up the media engine so the first transport request does not pay
    // startup cost; init stays idempotent for callers racing this.
    if let Err(e) = state.media.init().await {
        tracing::warn!(error = %e, "Media engine warm-up failed; retrying on first use");
    } else {
        info!("Media engine ready");
    }

    // Background sweeps: participant heartbeat expiry and empty-room GC
    let _expiry_sweep = participants::start_expiry_sweep(
        Arc::clone(&state.participants),
        Arc::clone(&state.media),
        config.participant_sweep_interval(),
    );
    let _room_sweep = rooms::start_empty_room_sweep(
        Arc::clone(&state.rooms),
        Arc::clone(&state.participants),
        Arc::clone(&state.media),
        config.room_grace(),
        config.room_sweep_interval(),
    );

    // Build router
    let app = api::create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    info!(address = %config.bind_address, "Server listening");

    // Graceful shutdown handler
    let shutdown_signal = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install CTRL+C signal handler");
        info!("Received shutdown signal, cleaning up...");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("Server shutdown complete");

    Ok(())
}
