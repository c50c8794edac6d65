//! Participant Roster
//!
//! Per-room rosters with a heartbeat/TTL departure contract. Clients may
//! disconnect without a clean signal, so a participant not refreshed within
//! the TTL window is considered departed and swept out, taking their
//! transports with them.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

use super::types::Participant;
use crate::error::ApiError;
use crate::media::MediaEngineAdapter;

/// Per-room participant rosters.
pub struct ParticipantTracker {
    rooms: DashMap<String, HashMap<String, Participant>>,
    ttl: chrono::Duration,
}

impl ParticipantTracker {
    /// Create a tracker with the given heartbeat TTL.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            rooms: DashMap::new(),
            ttl: chrono::Duration::seconds(ttl.as_secs() as i64),
        }
    }

    /// Add a participant to a room's roster.
    ///
    /// Rejoining with the same id refreshes the existing record instead of
    /// duplicating it.
    pub fn join(
        &self,
        room_id: &str,
        participant_id: Option<String>,
        display_name: Option<String>,
    ) -> Participant {
        let id = participant_id.unwrap_or_else(|| Uuid::now_v7().to_string());
        let now = Utc::now();

        let mut roster = self.rooms.entry(room_id.to_owned()).or_default();
        let participant = roster
            .entry(id.clone())
            .and_modify(|existing| {
                existing.last_seen_at = now;
                if display_name.is_some() {
                    existing.display_name.clone_from(&display_name);
                }
            })
            .or_insert_with(|| Participant {
                id: id.clone(),
                room_id: room_id.to_owned(),
                joined_at: now,
                display_name: display_name.clone(),
                last_seen_at: now,
            })
            .clone();
        drop(roster);

        debug!(room_id = %room_id, participant_id = %id, "Participant joined");
        participant
    }

    /// Refresh a participant's heartbeat.
    pub fn heartbeat(&self, room_id: &str, participant_id: &str) -> Result<(), ApiError> {
        let mut roster = self
            .rooms
            .get_mut(room_id)
            .ok_or(ApiError::ParticipantNotFound)?;
        let participant = roster
            .get_mut(participant_id)
            .ok_or(ApiError::ParticipantNotFound)?;
        participant.last_seen_at = Utc::now();
        Ok(())
    }

    /// Remove a participant from a room's roster.
    pub fn leave(&self, room_id: &str, participant_id: &str) -> Option<Participant> {
        let removed = self
            .rooms
            .get_mut(room_id)
            .and_then(|mut roster| roster.remove(participant_id));

        if removed.is_some() {
            self.rooms.remove_if(room_id, |_, roster| roster.is_empty());
            debug!(room_id = %room_id, participant_id = %participant_id, "Participant left");
        }
        removed
    }

    /// Snapshot of a room's roster, oldest joiner first.
    pub fn list(&self, room_id: &str) -> Vec<Participant> {
        let mut participants: Vec<Participant> = self
            .rooms
            .get(room_id)
            .map(|roster| roster.values().cloned().collect())
            .unwrap_or_default();
        participants.sort_by(|a, b| a.joined_at.cmp(&b.joined_at));
        participants
    }

    /// Current roster size of a room.
    pub fn count(&self, room_id: &str) -> usize {
        self.rooms.get(room_id).map_or(0, |roster| roster.len())
    }

    /// Drop a room's roster entirely.
    pub fn remove_room(&self, room_id: &str) {
        self.rooms.remove(room_id);
    }

    /// Remove every participant whose heartbeat lapsed before `now - ttl`,
    /// returning `(room_id, participant_id)` pairs for transport teardown.
    pub fn collect_departed(&self, now: DateTime<Utc>) -> Vec<(String, String)> {
        let mut departed = Vec::new();

        for mut entry in self.rooms.iter_mut() {
            let room_id = entry.key().clone();
            entry.value_mut().retain(|id, participant| {
                if now.signed_duration_since(participant.last_seen_at) > self.ttl {
                    departed.push((room_id.clone(), id.clone()));
                    false
                } else {
                    true
                }
            });
        }
        self.rooms.retain(|_, roster| !roster.is_empty());

        departed
    }
}

impl std::fmt::Debug for ParticipantTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParticipantTracker")
            .field("rooms", &self.rooms.len())
            .finish_non_exhaustive()
    }
}

/// Start the background sweep that expires silent participants and tears
/// down the transports they own.
///
/// Returns a handle to the spawned task.
pub fn start_expiry_sweep(
    tracker: Arc<ParticipantTracker>,
    media: Arc<MediaEngineAdapter>,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            for (room_id, participant_id) in tracker.collect_departed(Utc::now()) {
                info!(
                    room_id = %room_id,
                    participant_id = %participant_id,
                    "Participant heartbeat lapsed; tearing down transports"
                );
                media.close_owned(&room_id, &participant_id).await;
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn tracker_with_ttl(secs: u64) -> ParticipantTracker {
        ParticipantTracker::new(Duration::from_secs(secs))
    }

    #[test]
    fn test_join_and_list() {
        let tracker = tracker_with_ttl(30);
        tracker.join("r1", Some("alice".to_owned()), Some("Alice".to_owned()));
        tracker.join("r1", Some("bob".to_owned()), None);
        tracker.join("r2", Some("carol".to_owned()), None);

        assert_eq!(tracker.count("r1"), 2);
        assert_eq!(tracker.count("r2"), 1);
        assert_eq!(tracker.count("empty"), 0);

        let listed = tracker.list("r1");
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, "alice");
    }

    #[test]
    fn test_rejoin_refreshes_instead_of_duplicating() {
        let tracker = tracker_with_ttl(30);
        let first = tracker.join("r1", Some("alice".to_owned()), None);
        let second = tracker.join("r1", Some("alice".to_owned()), Some("Alice".to_owned()));

        assert_eq!(tracker.count("r1"), 1);
        assert_eq!(first.joined_at, second.joined_at);
        assert_eq!(second.display_name.as_deref(), Some("Alice"));
    }

    #[test]
    fn test_generated_participant_ids_unique() {
        let tracker = tracker_with_ttl(30);
        let a = tracker.join("r1", None, None);
        let b = tracker.join("r1", None, None);
        assert_ne!(a.id, b.id);
        assert_eq!(tracker.count("r1"), 2);
    }

    #[test]
    fn test_heartbeat_unknown_participant() {
        let tracker = tracker_with_ttl(30);
        tracker.join("r1", Some("alice".to_owned()), None);

        assert!(tracker.heartbeat("r1", "alice").is_ok());
        assert!(matches!(
            tracker.heartbeat("r1", "ghost"),
            Err(ApiError::ParticipantNotFound)
        ));
        assert!(matches!(
            tracker.heartbeat("nope", "alice"),
            Err(ApiError::ParticipantNotFound)
        ));
    }

    #[test]
    fn test_leave() {
        let tracker = tracker_with_ttl(30);
        tracker.join("r1", Some("alice".to_owned()), None);

        assert!(tracker.leave("r1", "alice").is_some());
        assert!(tracker.leave("r1", "alice").is_none());
        assert_eq!(tracker.count("r1"), 0);
    }

    #[test]
    fn test_expiry_removes_only_lapsed() {
        let tracker = tracker_with_ttl(30);
        tracker.join("r1", Some("alice".to_owned()), None);
        tracker.join("r1", Some("bob".to_owned()), None);

        // Nothing lapses within the window.
        assert!(tracker.collect_departed(Utc::now()).is_empty());

        // Backdate one heartbeat past the TTL; the refreshed participant
        // stays.
        tracker
            .rooms
            .get_mut("r1")
            .unwrap()
            .get_mut("bob")
            .unwrap()
            .last_seen_at = Utc::now() - chrono::Duration::seconds(31);
        tracker.heartbeat("r1", "alice").unwrap();

        let departed = tracker.collect_departed(Utc::now());
        assert_eq!(departed, vec![("r1".to_owned(), "bob".to_owned())]);
        assert_eq!(tracker.count("r1"), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_expiry_sweep_tears_down_owned_transports() {
        let media = Arc::new(MediaEngineAdapter::new(Arc::new(
            Config::default_for_test(),
        )));
        let tracker = Arc::new(ParticipantTracker::new(Duration::from_secs(0)));

        tracker.join("r1", Some("alice".to_owned()), None);
        let session = media
            .create_transport("r1", Some("alice".to_owned()))
            .await
            .unwrap();

        let handle = start_expiry_sweep(
            Arc::clone(&tracker),
            Arc::clone(&media),
            Duration::from_millis(50),
        );
        tokio::time::sleep(Duration::from_millis(400)).await;
        handle.abort();

        assert_eq!(tracker.count("r1"), 0);
        assert!(media.get_transport("r1", session.id).await.is_none());
    }

    #[test]
    fn test_expiry_drops_emptied_rooms() {
        let tracker = tracker_with_ttl(30);
        tracker.join("r1", Some("alice".to_owned()), None);

        let future = Utc::now() + chrono::Duration::seconds(61);
        let departed = tracker.collect_departed(future);
        assert_eq!(departed.len(), 1);
        assert_eq!(tracker.count("r1"), 0);
        assert!(tracker.rooms.is_empty());
    }
}
