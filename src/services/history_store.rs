// src/services/history_store.rs
//! Client-side view of persisted transformations.
//!
//! The gateway owns the rows. The store keeps the last listing plus any rows
//! it created that the gateway has not listed back yet, so a `list` right
//! after a `create` always contains the new row.

use crate::errors::StudioError;
use crate::models::{HistoryEntry, NewHistoryEntry};
use crate::services::gateway::ImageGateway;
use chrono::Utc;
use log::{debug, info, warn};
use std::sync::{Arc, Mutex};

pub struct HistoryStore {
    gateway: Arc<dyn ImageGateway>,
    cache: Mutex<HistoryCache>,
}

#[derive(Default)]
struct HistoryCache {
    listed: Vec<HistoryEntry>,
    pending: Vec<(NewHistoryEntry, HistoryEntry)>,
}

impl HistoryCache {
    /// Pending rows first, then listed rows; each group newest first.
    /// Pending rows were created after the last listing, and server
    /// timestamps may not share the local clock's zone.
    fn merged(&self) -> Vec<HistoryEntry> {
        let mut pending: Vec<HistoryEntry> =
            self.pending.iter().map(|(_, stamped)| stamped.clone()).collect();
        pending.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

        let mut listed = self.listed.clone();
        listed.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

        pending.extend(listed);
        pending
    }
}

impl HistoryStore {
    pub fn new(gateway: Arc<dyn ImageGateway>) -> Self {
        Self {
            gateway,
            cache: Mutex::new(HistoryCache::default()),
        }
    }

    /// Fetches the persisted rows, newest first.
    pub async fn list(&self) -> Result<Vec<HistoryEntry>, StudioError> {
        let listed = self.gateway.list_history().await?;

        let mut cache = self.lock();
        // Each listed row confirms at most one pending row.
        let mut unclaimed: Vec<&HistoryEntry> = listed.iter().collect();
        cache.pending.retain(|(requested, _)| {
            match unclaimed.iter().position(|entry| requested.matches(entry)) {
                Some(index) => {
                    unclaimed.swap_remove(index);
                    debug!("History entry {} confirmed by listing", requested.uuid);
                    false
                }
                None => true,
            }
        });
        cache.listed = listed;

        Ok(cache.merged())
    }

    /// Last known rows without touching the network.
    pub fn cached(&self) -> Vec<HistoryEntry> {
        self.lock().merged()
    }

    /// Persists one completed recolor. Not deduplicated: creating the same
    /// uuid twice yields two rows unless the gateway refuses.
    pub async fn create(&self, entry: NewHistoryEntry) -> Result<HistoryEntry, StudioError> {
        self.gateway
            .create_history(&entry)
            .await
            .map_err(|e| match e {
                StudioError::HistoryPersistFailed(_) => e,
                other => StudioError::HistoryPersistFailed(other.to_string()),
            })?;

        let stamped = entry.clone().stamped(Utc::now());
        info!("Saved history entry for {}", stamped.uuid);
        self.lock().pending.push((entry, stamped.clone()));

        Ok(stamped)
    }

    /// Removes every row for `uuid`. The recolored artifact stays on the
    /// server.
    pub async fn delete(&self, uuid: &str) -> Result<(), StudioError> {
        if let Err(e) = self.gateway.delete_history(uuid).await {
            warn!("Failed to delete history entry {}: {}", uuid, e);
            return Err(e);
        }

        let mut cache = self.lock();
        cache.listed.retain(|entry| entry.uuid != uuid);
        cache.pending.retain(|(requested, _)| requested.uuid != uuid);
        info!("Deleted history entry {}", uuid);

        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HistoryCache> {
        self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
