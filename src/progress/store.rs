//! ProgressStore — session-scoped cache of tour completion/skip state,
//! written through to the remote progress API.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock, broadcast, watch};
use tracing::{debug, info, warn};

use crate::error::ProgressError;

use super::api::ProgressApi;
use super::model::{ProgressEntry, ProgressEvent, ProgressMap, ProgressPatch, is_valid_page_id};

/// Default broadcast channel capacity.
const DEFAULT_BROADCAST_CAPACITY: usize = 64;

/// Where the current session is in its one-shot load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    NotLoaded,
    Loading,
    Loaded,
}

/// What a call to [`ProgressStore::load`] ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The remote map replaced the local one.
    Loaded { pages: usize },
    /// The remote call failed; the map was left as it was.
    Failed,
    /// A load for this session is already in flight or done.
    Suppressed,
    /// The session ended while the request was in flight; the response was dropped.
    Stale,
}

struct StoreState {
    map: ProgressMap,
    load: LoadState,
    /// Bumped on logout so responses from a previous session are discarded.
    epoch: u64,
}

/// Single source of truth for tour progress, shared by every engine.
///
/// Reads never observe a half-applied update: merges happen under the write
/// lock after the remote call has already succeeded.
pub struct ProgressStore {
    api: Arc<dyn ProgressApi>,
    state: RwLock<StoreState>,
    /// Per-page writes hold this shared; a reset of every page holds it exclusively.
    writes: RwLock<()>,
    page_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    ready: watch::Sender<bool>,
    tx: broadcast::Sender<ProgressEvent>,
}

impl ProgressStore {
    pub fn new(api: Arc<dyn ProgressApi>) -> Arc<Self> {
        let (ready, _) = watch::channel(false);
        let (tx, _rx) = broadcast::channel(DEFAULT_BROADCAST_CAPACITY);
        Arc::new(Self {
            api,
            state: RwLock::new(StoreState {
                map: ProgressMap::new(),
                load: LoadState::NotLoaded,
                epoch: 0,
            }),
            writes: RwLock::new(()),
            page_locks: Mutex::new(HashMap::new()),
            ready,
            tx,
        })
    }

    /// Subscribe to progress change notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.tx.subscribe()
    }

    /// Whether this session's load has settled, successfully or not.
    pub fn is_ready(&self) -> bool {
        *self.ready.borrow()
    }

    /// Wait until this session's load has settled.
    pub async fn wait_ready(&self) {
        let mut rx = self.ready.subscribe();
        // The sender lives as long as `self`, so this only ends on readiness.
        let _ = rx.wait_for(|ready| *ready).await;
    }

    pub async fn load_state(&self) -> LoadState {
        self.state.read().await.load
    }

    /// Start of a user session: kick off the one load this session gets.
    pub async fn login(&self) -> LoadOutcome {
        self.load().await
    }

    /// End of a user session: drop all progress and re-arm the load guard.
    pub async fn logout(&self) {
        {
            let mut state = self.state.write().await;
            state.epoch += 1;
            state.map.clear();
            state.load = LoadState::NotLoaded;
        }
        self.prune_page_locks().await;
        self.ready.send_replace(false);
        info!("Guide progress cleared on logout");
        let _ = self.tx.send(ProgressEvent::Cleared);
    }

    /// Fetch the full progress map, at most once per session.
    ///
    /// Failures are logged and leave the map untouched; either way the store
    /// becomes ready so engines can decide.
    pub async fn load(&self) -> LoadOutcome {
        let epoch = {
            let mut state = self.state.write().await;
            if state.load != LoadState::NotLoaded {
                debug!(load_state = ?state.load, "Guide progress load suppressed");
                return LoadOutcome::Suppressed;
            }
            state.load = LoadState::Loading;
            state.epoch
        };

        let result = self.api.fetch_all().await;

        let outcome = {
            let mut state = self.state.write().await;
            if state.epoch != epoch {
                debug!("Discarding guide progress loaded for a previous session");
                return LoadOutcome::Stale;
            }
            state.load = LoadState::Loaded;
            match result {
                Ok(map) => {
                    let pages = map.len();
                    state.map = map;
                    info!(pages, "Guide progress loaded");
                    LoadOutcome::Loaded { pages }
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load guide progress");
                    LoadOutcome::Failed
                }
            }
        };

        if let LoadOutcome::Loaded { pages } = outcome {
            let _ = self.tx.send(ProgressEvent::Loaded { pages });
        }
        self.ready.send_replace(true);
        outcome
    }

    pub async fn is_completed(&self, page_id: &str) -> bool {
        self.state
            .read()
            .await
            .map
            .get(page_id)
            .is_some_and(|e| e.completed)
    }

    pub async fn is_skipped(&self, page_id: &str) -> bool {
        self.state
            .read()
            .await
            .map
            .get(page_id)
            .is_some_and(|e| e.skipped)
    }

    pub async fn entry(&self, page_id: &str) -> Option<ProgressEntry> {
        self.state.read().await.map.get(page_id).cloned()
    }

    pub async fn snapshot(&self) -> ProgressMap {
        self.state.read().await.map.clone()
    }

    /// Persist a patch remotely, then merge it locally.
    ///
    /// Writes for the same page are serialized. On failure nothing local
    /// changes and nothing is retried; callers may call again.
    pub async fn update(&self, page_id: &str, patch: ProgressPatch) -> Result<(), ProgressError> {
        if !is_valid_page_id(page_id) {
            return Err(ProgressError::InvalidPageId(page_id.to_string()));
        }
        if patch.is_empty() {
            return Ok(());
        }

        let _writes = self.writes.read().await;
        let lock = self.page_lock(page_id).await;
        let _guard = lock.lock().await;
        let epoch = self.state.read().await.epoch;

        if let Err(e) = self.api.patch(page_id, &patch).await {
            warn!(page_id, error = %e, "Failed to update guide progress");
            return Err(e);
        }

        let entry = {
            let mut state = self.state.write().await;
            if state.epoch != epoch {
                debug!(page_id, "Session ended during guide progress update");
                return Err(ProgressError::SessionEnded {
                    operation: "update".to_string(),
                });
            }
            let entry = state.map.entry(page_id.to_string()).or_default();
            entry.apply(&patch, chrono::Utc::now());
            entry.clone()
        };

        info!(
            page_id,
            completed = entry.completed,
            skipped = entry.skipped,
            "Guide progress updated"
        );
        let _ = self.tx.send(ProgressEvent::Updated {
            page_id: page_id.to_string(),
            entry,
        });
        Ok(())
    }

    /// Delete progress remotely for one page, or for all pages when `None`,
    /// then drop it locally.
    ///
    /// A reset of every page waits for in-flight page writes and blocks new
    /// ones until the local map has been cleared.
    pub async fn reset(&self, page_id: Option<&str>) -> Result<(), ProgressError> {
        match page_id {
            Some(id) => {
                if !is_valid_page_id(id) {
                    return Err(ProgressError::InvalidPageId(id.to_string()));
                }
                let _writes = self.writes.read().await;
                let lock = self.page_lock(id).await;
                let _guard = lock.lock().await;
                self.reset_locked(page_id).await
            }
            None => {
                let _writes = self.writes.write().await;
                let result = self.reset_locked(None).await;
                self.prune_page_locks().await;
                result
            }
        }
    }

    async fn reset_locked(&self, page_id: Option<&str>) -> Result<(), ProgressError> {
        let epoch = self.state.read().await.epoch;

        if let Err(e) = self.api.delete(page_id).await {
            warn!(page_id = ?page_id, error = %e, "Failed to reset guide progress");
            return Err(e);
        }

        {
            let mut state = self.state.write().await;
            if state.epoch != epoch {
                return Err(ProgressError::SessionEnded {
                    operation: "reset".to_string(),
                });
            }
            match page_id {
                Some(id) => {
                    state.map.remove(id);
                }
                None => state.map.clear(),
            }
        }

        info!(page_id = ?page_id, "Guide progress reset");
        let event = match page_id {
            Some(id) => ProgressEvent::Reset {
                page_id: id.to_string(),
            },
            None => ProgressEvent::Cleared,
        };
        let _ = self.tx.send(event);
        Ok(())
    }

    async fn page_lock(&self, page_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.page_locks.lock().await;
        Arc::clone(locks.entry(page_id.to_string()).or_default())
    }

    /// Drop page locks no write is holding.
    async fn prune_page_locks(&self) {
        let mut locks = self.page_locks.lock().await;
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
    }

    #[cfg(test)]
    async fn tracked_page_locks(&self) -> usize {
        self.page_locks.lock().await.len()
    }
}
