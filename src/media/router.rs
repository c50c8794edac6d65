//! Per-Room Router
//!
//! One router per room: the negotiated capabilities plus the room's
//! transport and producer maps. Lock scope is the room, so rooms never
//! contend with each other.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use uuid::Uuid;

use super::codecs::RouterRtpCapabilities;
use super::producer::{Producer, ProducerInfo};
use super::transport::TransportSession;

/// Per-room owner of capabilities, transports, and producers.
pub struct RoomRouter {
    /// Owning room ID.
    pub room_id: String,
    /// Capabilities advertised to every transport in the room.
    pub rtp_capabilities: RouterRtpCapabilities,
    transports: RwLock<HashMap<Uuid, Arc<TransportSession>>>,
    producers: RwLock<HashMap<Uuid, Arc<Producer>>>,
}

impl RoomRouter {
    /// Create an empty router for a room.
    #[must_use]
    pub fn new(room_id: String, rtp_capabilities: RouterRtpCapabilities) -> Self {
        Self {
            room_id,
            rtp_capabilities,
            transports: RwLock::new(HashMap::new()),
            producers: RwLock::new(HashMap::new()),
        }
    }

    /// Register a transport session.
    pub async fn insert_transport(&self, session: Arc<TransportSession>) {
        self.transports.write().await.insert(session.id, session);
    }

    /// Get a transport session by ID.
    pub async fn transport(&self, id: Uuid) -> Option<Arc<TransportSession>> {
        self.transports.read().await.get(&id).cloned()
    }

    /// Remove a transport session, returning it for teardown.
    pub async fn take_transport(&self, id: Uuid) -> Option<Arc<TransportSession>> {
        self.transports.write().await.remove(&id)
    }

    /// Snapshot of all transport sessions.
    pub async fn transports(&self) -> Vec<Arc<TransportSession>> {
        self.transports.read().await.values().cloned().collect()
    }

    /// Number of registered transports.
    pub async fn transport_count(&self) -> usize {
        self.transports.read().await.len()
    }

    /// Register a producer.
    pub async fn insert_producer(&self, producer: Arc<Producer>) {
        self.producers.write().await.insert(producer.id, producer);
    }

    /// Remove a producer, returning it for teardown.
    pub async fn remove_producer(&self, id: Uuid) -> Option<Arc<Producer>> {
        self.producers.write().await.remove(&id)
    }

    /// Snapshot of active producers for stream discovery.
    pub async fn producers(&self) -> Vec<ProducerInfo> {
        self.producers
            .read()
            .await
            .values()
            .filter(|p| p.is_active())
            .map(|p| p.info())
            .collect()
    }

    /// Number of registered producers.
    pub async fn producer_count(&self) -> usize {
        self.producers.read().await.len()
    }
}

impl std::fmt::Debug for RoomRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomRouter")
            .field("room_id", &self.room_id)
            .finish_non_exhaustive()
    }
}
