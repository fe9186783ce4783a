//! Pagination checkpoint stored next to the exported documents

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;
use crate::providers::ObjectStore;

/// Object key of the checkpoint
pub const CHECKPOINT_KEY: &str = "sync/checkpoint.json";

/// Last completed pagination offset of an unfinished run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SyncCheckpoint {
    pub run_id: Uuid,
    pub skip: usize,
    pub total_count: usize,
    pub updated_at: DateTime<Utc>,
}

impl SyncCheckpoint {
    pub fn new(run_id: Uuid, skip: usize, total_count: usize) -> Self {
        Self {
            run_id,
            skip,
            total_count,
            updated_at: Utc::now(),
        }
    }

    /// Read the checkpoint, treating an unreadable one as absent
    pub async fn load(store: &dyn ObjectStore) -> Result<Option<Self>> {
        let Some(raw) = store.get(CHECKPOINT_KEY).await? else {
            return Ok(None);
        };

        match serde_json::from_slice::<Self>(&raw) {
            Ok(checkpoint) => Ok(Some(checkpoint)),
            Err(e) => {
                tracing::warn!("Ignoring unreadable checkpoint: {}", e);
                Ok(None)
            }
        }
    }

    pub async fn save(&self, store: &dyn ObjectStore) -> Result<()> {
        let raw = serde_json::to_vec(self)?;
        store.put(CHECKPOINT_KEY, raw.into()).await
    }

    pub async fn clear(store: &dyn ObjectStore) -> Result<()> {
        store.delete(CHECKPOINT_KEY).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::MemoryObjectStore;

    #[tokio::test]
    async fn test_save_load_clear() {
        let store = MemoryObjectStore::new();
        assert!(SyncCheckpoint::load(&store).await.unwrap().is_none());

        let checkpoint = SyncCheckpoint::new(Uuid::new_v4(), 200, 250);
        checkpoint.save(&store).await.unwrap();
        assert_eq!(SyncCheckpoint::load(&store).await.unwrap(), Some(checkpoint));

        SyncCheckpoint::clear(&store).await.unwrap();
        assert!(SyncCheckpoint::load(&store).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_corrupt_checkpoint_is_ignored() {
        let store = MemoryObjectStore::new();
        store.put(CHECKPOINT_KEY, "not json".into()).await.unwrap();
        assert!(SyncCheckpoint::load(&store).await.unwrap().is_none());
    }
}
