//! Server Configuration
//!
//! Loads configuration from environment variables.

use anyhow::{bail, Result};
use std::env;
use std::time::Duration;

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address (e.g., "0.0.0.0:8080")
    pub bind_address: String,

    /// WebRTC STUN server (optional; host candidates only when unset)
    pub stun_server: Option<String>,

    /// WebRTC TURN server (optional)
    pub turn_server: Option<String>,

    /// WebRTC TURN username (optional)
    pub turn_username: Option<String>,

    /// WebRTC TURN credential (optional)
    pub turn_credential: Option<String>,

    /// Public IP announced in ICE candidates (optional, for NAT deployments)
    pub announced_ip: Option<String>,

    /// Lower bound of the UDP port range used for media (0 = OS-assigned)
    pub rtc_min_port: u16,

    /// Upper bound of the UDP port range used for media (0 = OS-assigned)
    pub rtc_max_port: u16,

    /// Bound on any single media engine call, in milliseconds (default: 10000)
    pub engine_timeout_ms: u64,

    /// Seconds without a heartbeat before a participant is considered
    /// departed (default: 30)
    pub participant_ttl_secs: u64,

    /// Interval of the participant expiry sweep, in seconds (default: 5)
    pub participant_sweep_secs: u64,

    /// Seconds a room may sit empty before it is removed (default: 60)
    pub room_grace_secs: u64,

    /// Interval of the empty-room sweep, in seconds (default: 15)
    pub room_sweep_secs: u64,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let config = Self {
            bind_address: env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8080".into()),
            stun_server: env::var("STUN_SERVER").ok(),
            turn_server: env::var("TURN_SERVER").ok(),
            turn_username: env::var("TURN_USERNAME").ok(),
            turn_credential: env::var("TURN_CREDENTIAL").ok(),
            announced_ip: env::var("ANNOUNCED_IP").ok(),
            rtc_min_port: env::var("RTC_MIN_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(0),
            rtc_max_port: env::var("RTC_MAX_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(0),
            engine_timeout_ms: env::var("ENGINE_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10_000),
            participant_ttl_secs: env::var("PARTICIPANT_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
            participant_sweep_secs: env::var("PARTICIPANT_SWEEP_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5),
            room_grace_secs: env::var("ROOM_GRACE_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(60),
            room_sweep_secs: env::var("ROOM_SWEEP_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(15),
        };

        if config.rtc_min_port > config.rtc_max_port {
            bail!("RTC_MIN_PORT must not exceed RTC_MAX_PORT");
        }

        Ok(config)
    }

    /// Check if TURN is configured.
    #[must_use]
    pub const fn has_turn(&self) -> bool {
        self.turn_server.is_some()
    }

    /// Bound on any single media engine call.
    #[must_use]
    pub const fn engine_timeout(&self) -> Duration {
        Duration::from_millis(self.engine_timeout_ms)
    }

    /// Heartbeat window after which a participant is considered departed.
    #[must_use]
    pub const fn participant_ttl(&self) -> Duration {
        Duration::from_secs(self.participant_ttl_secs)
    }

    /// Interval of the participant expiry sweep.
    #[must_use]
    pub const fn participant_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.participant_sweep_secs)
    }

    /// Grace period an empty room is kept around.
    #[must_use]
    pub const fn room_grace(&self) -> Duration {
        Duration::from_secs(self.room_grace_secs)
    }

    /// Interval of the empty-room sweep.
    #[must_use]
    pub const fn room_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.room_sweep_secs)
    }

    /// Create a default configuration for testing.
    ///
    /// Binds to an ephemeral loopback port and skips STUN/TURN so tests
    /// never touch the network.
    #[must_use]
    pub fn default_for_test() -> Self {
        Self {
            bind_address: "127.0.0.1:0".into(),
            stun_server: None,
            turn_server: None,
            turn_username: None,
            turn_credential: None,
            announced_ip: None,
            rtc_min_port: 0,
            rtc_max_port: 0,
            engine_timeout_ms: 10_000,
            participant_ttl_secs: 30,
            participant_sweep_secs: 1,
            room_grace_secs: 60,
            room_sweep_secs: 1,
        }
    }
}
