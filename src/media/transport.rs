//! Transport Sessions
//!
//! One session per client negotiation: the engine-side ICE/DTLS endpoint
//! plus the state machine that orders connect, produce, and close.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::{Mutex, MutexGuard, RwLock};
use tracing::warn;
use uuid::Uuid;
use webrtc::dtls_transport::dtls_parameters::DTLSParameters;
use webrtc::dtls_transport::dtls_transport_state::RTCDtlsTransportState;
use webrtc::dtls_transport::RTCDtlsTransport;
use webrtc::ice_transport::ice_candidate::RTCIceCandidate;
use webrtc::ice_transport::ice_parameters::RTCIceParameters;
use webrtc::ice_transport::RTCIceTransport;

use crate::error::ApiError;

/// Negotiation state of a transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportState {
    /// Created, remote parameters not yet applied.
    New,
    /// Remote parameters are being applied.
    Connecting,
    /// Remote parameters applied; producers may be created.
    Connected,
    /// Torn down; unusable.
    Closed,
}

/// A single ICE/DTLS endpoint negotiated with one client.
///
/// All lifecycle operations on a session (connect, produce, close) serialize
/// on its operation lock so the state observed inside an operation cannot
/// change under it.
pub struct TransportSession {
    /// Transport ID, unique across the whole process.
    pub id: Uuid,
    /// Owning room ID.
    pub room_id: String,
    /// Participant that requested the transport, when identified.
    pub owner: Option<String>,
    /// When the transport was created.
    pub created_at: DateTime<Utc>,
    /// Local ICE parameters gathered at allocation.
    pub ice_parameters: RTCIceParameters,
    /// Local ICE candidates gathered at allocation.
    pub ice_candidates: Vec<RTCIceCandidate>,
    /// Local DTLS parameters (certificate fingerprints).
    pub dtls_parameters: DTLSParameters,
    state: RwLock<TransportState>,
    remote_dtls: RwLock<Option<Value>>,
    producer_ids: RwLock<Vec<Uuid>>,
    ice_transport: Arc<RTCIceTransport>,
    dtls_transport: Arc<RTCDtlsTransport>,
    op_lock: Mutex<()>,
}

impl TransportSession {
    /// Create a session from freshly allocated engine resources.
    #[must_use]
    pub fn new(
        room_id: String,
        owner: Option<String>,
        ice_parameters: RTCIceParameters,
        ice_candidates: Vec<RTCIceCandidate>,
        dtls_parameters: DTLSParameters,
        ice_transport: Arc<RTCIceTransport>,
        dtls_transport: Arc<RTCDtlsTransport>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            room_id,
            owner,
            created_at: Utc::now(),
            ice_parameters,
            ice_candidates,
            dtls_parameters,
            state: RwLock::new(TransportState::New),
            remote_dtls: RwLock::new(None),
            producer_ids: RwLock::new(Vec::new()),
            ice_transport,
            dtls_transport,
            op_lock: Mutex::new(()),
        }
    }

    /// Acquire the session's exclusive operation lock.
    ///
    /// Held by the adapter across produce/close so one strictly precedes
    /// the other.
    pub async fn begin_op(&self) -> MutexGuard<'_, ()> {
        self.op_lock.lock().await
    }

    /// Current negotiation state.
    pub async fn state(&self) -> TransportState {
        *self.state.read().await
    }

    /// Apply remote DTLS parameters and transition to `Connected`.
    ///
    /// Already-connected and closed sessions reject; a failed apply leaves
    /// the session in its prior state.
    pub async fn connect(
        &self,
        remote: Value,
        timeout: std::time::Duration,
    ) -> Result<(), ApiError> {
        let _op = self.op_lock.lock().await;

        match *self.state.read().await {
            TransportState::Connected => {
                return Err(ApiError::InvalidState(
                    "Transport already connected".to_owned(),
                ));
            }
            TransportState::Closed => {
                return Err(ApiError::InvalidState("Transport is closed".to_owned()));
            }
            TransportState::New | TransportState::Connecting => {}
        }

        let prior = {
            let mut state = self.state.write().await;
            let prior = *state;
            *state = TransportState::Connecting;
            prior
        };

        match tokio::time::timeout(timeout, self.apply_remote_dtls(remote)).await {
            Ok(Ok(())) => {
                *self.state.write().await = TransportState::Connected;
                Ok(())
            }
            Ok(Err(e)) => {
                *self.state.write().await = prior;
                Err(e)
            }
            Err(elapsed) => {
                *self.state.write().await = prior;
                Err(elapsed.into())
            }
        }
    }

    /// Record the remote half of the DTLS negotiation.
    ///
    /// The handshake itself is packet-driven by the client against the
    /// gathered candidates; this call binds the fingerprint set used to
    /// authenticate it.
    async fn apply_remote_dtls(&self, remote: Value) -> Result<(), ApiError> {
        if self.dtls_transport.state() == RTCDtlsTransportState::Closed {
            return Err(ApiError::Engine("DTLS transport is closed".to_owned()));
        }
        *self.remote_dtls.write().await = Some(remote);
        Ok(())
    }

    /// Remote DTLS parameters, once connected.
    pub async fn remote_dtls(&self) -> Option<Value> {
        self.remote_dtls.read().await.clone()
    }

    /// Track a producer created on this session.
    ///
    /// Caller holds the operation lock.
    pub async fn register_producer(&self, producer_id: Uuid) {
        self.producer_ids.write().await.push(producer_id);
    }

    /// Stop tracking a producer closed individually.
    ///
    /// Caller holds the operation lock.
    pub async fn unregister_producer(&self, producer_id: Uuid) {
        self.producer_ids.write().await.retain(|id| *id != producer_id);
    }

    /// Producer ids still owned by this session.
    pub async fn producer_ids(&self) -> Vec<Uuid> {
        self.producer_ids.read().await.clone()
    }

    /// Transition to `Closed`, draining the owned producer list.
    ///
    /// Returns `None` when the session was already closed. Caller holds the
    /// operation lock.
    pub async fn mark_closed(&self) -> Option<Vec<Uuid>> {
        let mut state = self.state.write().await;
        if *state == TransportState::Closed {
            return None;
        }
        *state = TransportState::Closed;
        drop(state);

        Some(std::mem::take(&mut *self.producer_ids.write().await))
    }

    /// Release the engine-side ICE/DTLS resources.
    ///
    /// Caller holds the operation lock; the session must already be closed.
    pub async fn shutdown_engine(&self) {
        if let Err(e) = self.dtls_transport.stop().await {
            warn!(transport_id = %self.id, error = %e, "Failed to stop DTLS transport");
        }
        if let Err(e) = self.ice_transport.stop().await {
            warn!(transport_id = %self.id, error = %e, "Failed to stop ICE transport");
        }
    }
}

impl std::fmt::Debug for TransportSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportSession")
            .field("id", &self.id)
            .field("room_id", &self.room_id)
            .field("owner", &self.owner)
            .finish_non_exhaustive()
    }
}
