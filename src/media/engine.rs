//! Media Engine Adapter
//!
//! Owns the process-wide WebRTC engine, the per-room router table, and the
//! global transport/producer indexes used for cleanup lookups.
//!
//! The engine is initialized lazily and at most once; every transport
//! allocation runs without holding router locks and registers only after
//! the engine work has fully succeeded.

use std::sync::Arc;

use dashmap::DashMap;
use futures::future::join_all;
use serde_json::Value;
use tokio::sync::{mpsc, OnceCell};
use tracing::{debug, info};
use uuid::Uuid;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::api::setting_engine::SettingEngine;
use webrtc::api::{APIBuilder, API};
use webrtc::ice::udp_network::{EphemeralUDP, UDPNetwork};
use webrtc::ice_transport::ice_candidate_type::RTCIceCandidateType;
use webrtc::ice_transport::ice_gatherer::RTCIceGatherOptions;
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;

use super::codecs;
use super::producer::{MediaKind, Producer, ProducerInfo};
use super::router::RoomRouter;
use super::transport::{TransportSession, TransportState};
use crate::config::Config;
use crate::error::ApiError;

/// Where a producer lives, for O(1) cleanup lookup.
#[derive(Debug, Clone)]
struct ProducerLocation {
    room_id: String,
    transport_id: Uuid,
}

/// Adapter around the process-wide media engine.
pub struct MediaEngineAdapter {
    config: Arc<Config>,
    engine: OnceCell<Arc<API>>,
    routers: DashMap<String, Arc<RoomRouter>>,
    transport_index: DashMap<Uuid, String>,
    producer_index: DashMap<Uuid, ProducerLocation>,
}

impl MediaEngineAdapter {
    /// Create an adapter; the engine itself starts on first use.
    #[must_use]
    pub fn new(config: Arc<Config>) -> Self {
        Self {
            config,
            engine: OnceCell::new(),
            routers: DashMap::new(),
            transport_index: DashMap::new(),
            producer_index: DashMap::new(),
        }
    }

    /// Initialize the engine.
    ///
    /// Idempotent under arbitrary concurrent callers: the first performs
    /// real startup, the rest await the same in-flight initialization.
    pub async fn init(&self) -> Result<(), ApiError> {
        self.engine().await.map(|_| ())
    }

    async fn engine(&self) -> Result<Arc<API>, ApiError> {
        self.engine
            .get_or_try_init(|| async { build_engine(&self.config).map(Arc::new) })
            .await
            .map(Arc::clone)
    }

    /// Get a room's router, if one exists.
    #[must_use]
    pub fn router(&self, room_id: &str) -> Option<Arc<RoomRouter>> {
        self.routers.get(room_id).map(|r| Arc::clone(r.value()))
    }

    /// Get or create a room's router; concurrent first access yields
    /// exactly one router.
    pub fn get_or_create_router(&self, room_id: &str) -> Arc<RoomRouter> {
        let entry = self.routers.entry(room_id.to_owned()).or_insert_with(|| {
            debug!(room_id = %room_id, "Created media router");
            Arc::new(RoomRouter::new(
                room_id.to_owned(),
                codecs::router_capabilities(),
            ))
        });
        Arc::clone(entry.value())
    }

    /// Allocate an engine-side transport for a room and register it.
    ///
    /// Allocation failure or timeout registers nothing; a registration that
    /// loses a race with room removal rolls itself back.
    pub async fn create_transport(
        &self,
        room_id: &str,
        owner: Option<String>,
    ) -> Result<Arc<TransportSession>, ApiError> {
        let engine = self.engine().await?;
        let router = self.get_or_create_router(room_id);

        let session = tokio::time::timeout(
            self.config.engine_timeout(),
            allocate_session(&engine, &self.config, room_id, owner),
        )
        .await??;
        let session = Arc::new(session);

        router.insert_transport(Arc::clone(&session)).await;
        self.transport_index
            .insert(session.id, room_id.to_owned());

        // The router may have been detached while we were allocating; a
        // transport registered into a detached router would dangle.
        if !self.routers.contains_key(room_id) {
            router.take_transport(session.id).await;
            self.close_session(&router, &session).await;
            return Err(ApiError::RoomNotFound);
        }

        info!(
            room_id = %room_id,
            transport_id = %session.id,
            "Created WebRTC transport"
        );
        Ok(session)
    }

    /// Get a transport session by room and ID.
    pub async fn get_transport(
        &self,
        room_id: &str,
        transport_id: Uuid,
    ) -> Option<Arc<TransportSession>> {
        let router = self.router(room_id)?;
        router.transport(transport_id).await
    }

    /// Apply remote DTLS parameters to a transport.
    pub async fn connect_transport(
        &self,
        room_id: &str,
        transport_id: Uuid,
        remote: Value,
    ) -> Result<(), ApiError> {
        let session = self
            .get_transport(room_id, transport_id)
            .await
            .ok_or(ApiError::TransportNotFound)?;

        session.connect(remote, self.config.engine_timeout()).await?;

        info!(room_id = %room_id, transport_id = %transport_id, "Transport connected");
        Ok(())
    }

    /// Create a producer on a connected transport.
    ///
    /// Serialized with close on the owning session: either the close
    /// strictly precedes (produce then rejects) or strictly follows (close
    /// also tears down the new producer).
    pub async fn produce(
        &self,
        room_id: &str,
        transport_id: Uuid,
        kind: MediaKind,
        rtp_parameters: Value,
        app_data: Value,
    ) -> Result<Uuid, ApiError> {
        let router = self.router(room_id).ok_or(ApiError::TransportNotFound)?;
        let session = router
            .transport(transport_id)
            .await
            .ok_or(ApiError::TransportNotFound)?;

        let _op = session.begin_op().await;
        if session.state().await != TransportState::Connected {
            return Err(ApiError::InvalidState(
                "Transport is not connected".to_owned(),
            ));
        }

        let producer = Arc::new(Producer::new(transport_id, kind, rtp_parameters, app_data));
        let producer_id = producer.id;
        router.insert_producer(Arc::clone(&producer)).await;
        self.producer_index.insert(
            producer_id,
            ProducerLocation {
                room_id: room_id.to_owned(),
                transport_id,
            },
        );
        session.register_producer(producer_id).await;

        info!(
            room_id = %room_id,
            transport_id = %transport_id,
            producer_id = %producer_id,
            kind = kind.as_str(),
            "Producer created"
        );
        Ok(producer_id)
    }

    /// Snapshot of a room's active producers.
    ///
    /// Producers of closed transports are gone from the snapshot by the
    /// time the close call returns.
    pub async fn list_producers(&self, room_id: &str) -> Vec<ProducerInfo> {
        match self.router(room_id) {
            Some(router) => router.producers().await,
            None => Vec::new(),
        }
    }

    /// Close a transport and every producer flowing through it.
    pub async fn close_transport(
        &self,
        room_id: &str,
        transport_id: Uuid,
    ) -> Result<(), ApiError> {
        let router = self.router(room_id).ok_or(ApiError::TransportNotFound)?;
        let session = router
            .take_transport(transport_id)
            .await
            .ok_or(ApiError::TransportNotFound)?;

        self.close_session(&router, &session).await;
        Ok(())
    }

    /// Close an individual producer.
    pub async fn close_producer(&self, room_id: &str, producer_id: Uuid) -> Result<(), ApiError> {
        let router = self.router(room_id).ok_or(ApiError::ProducerNotFound)?;
        let location = self
            .producer_index
            .get(&producer_id)
            .map(|l| l.value().clone())
            .ok_or(ApiError::ProducerNotFound)?;
        if location.room_id != room_id {
            return Err(ApiError::ProducerNotFound);
        }

        // Serialize with produce/close on the owning session while it lives.
        let session = router.transport(location.transport_id).await;
        let _op = match &session {
            Some(s) => Some(s.begin_op().await),
            None => None,
        };

        let producer = router
            .remove_producer(producer_id)
            .await
            .ok_or(ApiError::ProducerNotFound)?;
        self.producer_index.remove(&producer_id);
        if let Some(session) = &session {
            session.unregister_producer(producer_id).await;
        }
        producer.close();

        debug!(room_id = %room_id, producer_id = %producer_id, "Producer closed");
        Ok(())
    }

    /// Close every transport owned by a participant.
    pub async fn close_owned(&self, room_id: &str, participant_id: &str) {
        let Some(router) = self.router(room_id) else {
            return;
        };

        let owned: Vec<Arc<TransportSession>> = router
            .transports()
            .await
            .into_iter()
            .filter(|t| t.owner.as_deref() == Some(participant_id))
            .collect();

        for session in owned {
            if router.take_transport(session.id).await.is_some() {
                self.close_session(&router, &session).await;
            }
        }
    }

    /// Detach and tear down a room's router, closing all its transports
    /// and producers.
    pub async fn remove_router(&self, room_id: &str) {
        let Some((_, router)) = self.routers.remove(room_id) else {
            return;
        };

        let sessions = router.transports().await;
        join_all(sessions.iter().map(|session| async {
            router.take_transport(session.id).await;
            self.close_session(&router, session).await;
        }))
        .await;

        debug!(room_id = %room_id, "Removed media router");
    }

    /// Tear down routers whose room no longer exists.
    ///
    /// Backstop for creation/removal races; driven by the room sweep.
    pub async fn remove_orphan_routers(&self, live_room_ids: &std::collections::HashSet<String>) {
        let orphans: Vec<String> = self
            .routers
            .iter()
            .filter(|entry| !live_room_ids.contains(entry.key()))
            .map(|entry| entry.key().clone())
            .collect();

        for room_id in orphans {
            info!(room_id = %room_id, "Removing orphaned media router");
            self.remove_router(&room_id).await;
        }
    }

    /// Close a session already removed from its router's transport map.
    async fn close_session(&self, router: &RoomRouter, session: &TransportSession) {
        let _op = session.begin_op().await;
        let Some(producer_ids) = session.mark_closed().await else {
            return;
        };

        for producer_id in producer_ids {
            if let Some(producer) = router.remove_producer(producer_id).await {
                producer.close();
            }
            self.producer_index.remove(&producer_id);
        }
        self.transport_index.remove(&session.id);

        session.shutdown_engine().await;

        debug!(
            room_id = %session.room_id,
            transport_id = %session.id,
            "Transport closed"
        );
    }
}

impl std::fmt::Debug for MediaEngineAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaEngineAdapter")
            .field("rooms", &self.routers.len())
            .finish_non_exhaustive()
    }
}

/// Build the process-wide engine: codec set, default interceptors, and
/// deployment-specific settings.
fn build_engine(config: &Config) -> Result<API, ApiError> {
    let mut media_engine = MediaEngine::default();
    for codec in codecs::supported_codecs() {
        media_engine.register_codec(codec.engine_parameters(), codec.engine_kind())?;
    }

    let mut registry = Registry::new();
    registry = register_default_interceptors(registry, &mut media_engine)?;

    let mut setting_engine = SettingEngine::default();
    if let Some(ip) = &config.announced_ip {
        setting_engine.set_nat_1to1_ips(vec![ip.clone()], RTCIceCandidateType::Host);
    }
    if config.rtc_min_port != 0 || config.rtc_max_port != 0 {
        setting_engine.set_udp_network(UDPNetwork::Ephemeral(
            EphemeralUDP::new(config.rtc_min_port, config.rtc_max_port)
                .map_err(webrtc::Error::from)?,
        ));
    }

    info!("Media engine initialized");

    Ok(APIBuilder::new()
        .with_media_engine(media_engine)
        .with_interceptor_registry(registry)
        .with_setting_engine(setting_engine)
        .build())
}

/// ICE servers handed to the gatherer, from deployment config.
fn ice_servers(config: &Config) -> Vec<RTCIceServer> {
    let mut servers = Vec::new();

    if let Some(stun) = &config.stun_server {
        servers.push(RTCIceServer {
            urls: vec![stun.clone()],
            ..Default::default()
        });
    }

    if let Some(turn) = &config.turn_server {
        servers.push(RTCIceServer {
            urls: vec![turn.clone()],
            username: config.turn_username.clone().unwrap_or_default(),
            credential: config.turn_credential.clone().unwrap_or_default(),
            ..Default::default()
        });
    }

    servers
}

/// Allocate the ICE/DTLS triple for one transport and gather local
/// candidates to completion.
async fn allocate_session(
    engine: &API,
    config: &Config,
    room_id: &str,
    owner: Option<String>,
) -> Result<TransportSession, ApiError> {
    let gatherer = Arc::new(engine.new_ice_gatherer(RTCIceGatherOptions {
        ice_servers: ice_servers(config),
        ..RTCIceGatherOptions::default()
    })?);
    let ice_transport = Arc::new(engine.new_ice_transport(Arc::clone(&gatherer)));
    let dtls_transport = Arc::new(engine.new_dtls_transport(Arc::clone(&ice_transport), vec![])?);

    // Gathering is complete once the gatherer surfaces a `None` candidate.
    let (done_tx, mut done_rx) = mpsc::channel::<()>(1);
    let mut done_tx = Some(done_tx);
    gatherer.on_local_candidate(Box::new(move |candidate| {
        if candidate.is_none() {
            done_tx.take();
        }
        Box::pin(async {})
    }));

    gatherer.gather().await?;
    let _ = done_rx.recv().await;

    let ice_parameters = gatherer.get_local_parameters().await?;
    let ice_candidates = gatherer.get_local_candidates().await?;
    let dtls_parameters = dtls_transport.get_local_parameters()?;

    Ok(TransportSession::new(
        room_id.to_owned(),
        owner,
        ice_parameters,
        ice_candidates,
        dtls_parameters,
        ice_transport,
        dtls_transport,
    ))
}
