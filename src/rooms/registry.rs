//! Process-Wide Room Directory
//!
//! Holds room metadata and creation semantics, independent of the media
//! engine. Teardown of a removed room's media state is orchestrated by the
//! callers that own both collaborators.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

use super::types::{validate_room_id, validate_title, Room};
use crate::error::ApiError;
use crate::media::MediaEngineAdapter;
use crate::participants::ParticipantTracker;

/// Directory of all live rooms.
#[derive(Default)]
pub struct RoomRegistry {
    rooms: RwLock<HashMap<String, Arc<Room>>>,
}

impl RoomRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all rooms.
    pub async fn list(&self) -> Vec<Arc<Room>> {
        self.rooms.read().await.values().cloned().collect()
    }

    /// Create a room.
    ///
    /// An explicit id that is already present is rejected, first wins; the
    /// contains-check and insert happen under one write lock so two racing
    /// creates cannot both succeed.
    pub async fn create(
        &self,
        id: Option<String>,
        title: String,
        host_id: Option<String>,
    ) -> Result<Arc<Room>, ApiError> {
        let id = match id {
            Some(id) => {
                validate_room_id(&id).map_err(|e| ApiError::Validation(e.to_owned()))?;
                id
            }
            None => Uuid::now_v7().to_string(),
        };
        validate_title(&title).map_err(|e| ApiError::Validation(e.to_owned()))?;

        let mut rooms = self.rooms.write().await;
        if rooms.contains_key(&id) {
            return Err(ApiError::Conflict(format!("Room already exists: {id}")));
        }

        let room = Arc::new(Room {
            id: id.clone(),
            title,
            host_id,
            created_at: Utc::now(),
        });
        rooms.insert(id.clone(), Arc::clone(&room));
        drop(rooms);

        debug!(room_id = %id, "Created room");
        Ok(room)
    }

    /// Get a room by id.
    pub async fn get(&self, id: &str) -> Option<Arc<Room>> {
        self.rooms.read().await.get(id).cloned()
    }

    /// Remove a room entry, returning it if present.
    pub async fn remove(&self, id: &str) -> Option<Arc<Room>> {
        let removed = self.rooms.write().await.remove(id);
        if removed.is_some() {
            debug!(room_id = %id, "Removed room");
        }
        removed
    }

    /// Number of live rooms.
    pub async fn count(&self) -> usize {
        self.rooms.read().await.len()
    }
}

impl std::fmt::Debug for RoomRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomRegistry").finish_non_exhaustive()
    }
}

/// Start the background sweep that removes rooms left empty past the grace
/// period and tears down routers orphaned by creation/removal races.
///
/// Returns a handle to the spawned task.
pub fn start_empty_room_sweep(
    registry: Arc<RoomRegistry>,
    participants: Arc<ParticipantTracker>,
    media: Arc<MediaEngineAdapter>,
    grace: Duration,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        // First-seen-empty times, local to the sweep.
        let mut empty_since: HashMap<String, Instant> = HashMap::new();
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let now = Instant::now();
            let rooms = registry.list().await;

            let live_ids: HashSet<String> = rooms.iter().map(|r| r.id.clone()).collect();
            empty_since.retain(|id, _| live_ids.contains(id));
            media.remove_orphan_routers(&live_ids).await;

            for room in rooms {
                if participants.count(&room.id) == 0 {
                    let since = *empty_since.entry(room.id.clone()).or_insert(now);
                    if now.duration_since(since) >= grace {
                        info!(room_id = %room.id, "Removing room empty past grace period");
                        media.remove_router(&room.id).await;
                        participants.remove_room(&room.id);
                        registry.remove(&room.id).await;
                        empty_since.remove(&room.id);
                    }
                } else {
                    empty_since.remove(&room.id);
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_empty_room_sweep_removes_idle_rooms() {
        let registry = Arc::new(RoomRegistry::new());
        let participants = Arc::new(ParticipantTracker::new(Duration::from_secs(30)));
        let media = Arc::new(MediaEngineAdapter::new(Arc::new(
            Config::default_for_test(),
        )));

        registry
            .create(Some("idle".to_owned()), "Idle".to_owned(), None)
            .await
            .unwrap();
        registry
            .create(Some("busy".to_owned()), "Busy".to_owned(), None)
            .await
            .unwrap();
        participants.join("busy", Some("alice".to_owned()), None);

        let handle = start_empty_room_sweep(
            Arc::clone(&registry),
            Arc::clone(&participants),
            Arc::clone(&media),
            Duration::from_millis(100),
            Duration::from_millis(50),
        );
        tokio::time::sleep(Duration::from_millis(500)).await;
        handle.abort();

        assert!(registry.get("idle").await.is_none());
        assert!(registry.get("busy").await.is_some());
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let registry = RoomRegistry::new();
        let room = registry
            .create(Some("r1".to_owned()), "Show".to_owned(), None)
            .await
            .unwrap();
        assert_eq!(room.id, "r1");

        let fetched = registry.get("r1").await.unwrap();
        assert_eq!(fetched.title, "Show");
        assert!(registry.get("nope").await.is_none());
    }

    #[tokio::test]
    async fn test_generated_ids_are_unique() {
        let registry = RoomRegistry::new();
        let a = registry
            .create(None, "A".to_owned(), None)
            .await
            .unwrap();
        let b = registry
            .create(None, "B".to_owned(), None)
            .await
            .unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(registry.count().await, 2);
    }

    #[tokio::test]
    async fn test_explicit_id_conflict_rejected() {
        let registry = RoomRegistry::new();
        registry
            .create(Some("r1".to_owned()), "First".to_owned(), None)
            .await
            .unwrap();

        let err = registry
            .create(Some("r1".to_owned()), "Second".to_owned(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));

        // First wins.
        assert_eq!(registry.get("r1").await.unwrap().title, "First");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_creates_one_winner() {
        let registry = Arc::new(RoomRegistry::new());

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let registry = Arc::clone(&registry);
                tokio::spawn(async move {
                    registry
                        .create(Some("contested".to_owned()), format!("Attempt {i}"), None)
                        .await
                })
            })
            .collect();

        let mut successes = 0;
        let mut conflicts = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => successes += 1,
                Err(ApiError::Conflict(_)) => conflicts += 1,
                Err(other) => panic!("Unexpected error: {other}"),
            }
        }

        assert_eq!(successes, 1);
        assert_eq!(conflicts, 7);
        assert_eq!(registry.count().await, 1);
    }

    #[tokio::test]
    async fn test_invalid_inputs_rejected() {
        let registry = RoomRegistry::new();
        assert!(registry
            .create(Some(String::new()), "Show".to_owned(), None)
            .await
            .is_err());
        assert!(registry
            .create(Some("ok".to_owned()), "  ".to_owned(), None)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_remove() {
        let registry = RoomRegistry::new();
        registry
            .create(Some("r1".to_owned()), "Show".to_owned(), None)
            .await
            .unwrap();

        assert!(registry.remove("r1").await.is_some());
        assert!(registry.remove("r1").await.is_none());
        assert!(registry.get("r1").await.is_none());
    }
}
