//! Continuity and durability for session timers.
//!
//! Local snapshots let a restarted tracker pick up where the previous one left
//! off; backend syncs record progress upstream. Every failure here is logged
//! and reported as a value. None of them is returned as an error.

use serde::Serialize;

use crate::{log_info, log_warn};

use super::{
    backend::SyncBackend,
    snapshot::{snapshot_key, SessionSnapshot, SyncPayload},
    store::SnapshotStore,
};

const ENABLE_LOGS: bool = true;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SyncOutcome {
    Synced,
    Failed,
    Disabled,
}

pub struct PersistenceBridge<S, B> {
    store: S,
    backend: B,
    staleness_ms: i64,
}

impl<S: SnapshotStore, B: SyncBackend> PersistenceBridge<S, B> {
    pub fn new(store: S, backend: B, staleness_ms: i64) -> Self {
        Self {
            store,
            backend,
            staleness_ms,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Overwrites the module's stored snapshot. Returns false on failure.
    pub async fn snapshot_to_local_store(&self, snapshot: &SessionSnapshot) -> bool {
        let serialized = match serde_json::to_string(snapshot) {
            Ok(serialized) => serialized,
            Err(err) => {
                log_warn!("Failed to serialize snapshot for module {}: {err}", snapshot.module_id);
                return false;
            }
        };

        match self
            .store
            .write(&snapshot_key(&snapshot.module_id), serialized)
            .await
        {
            Ok(()) => true,
            Err(err) => {
                log_warn!("Failed to write local snapshot for module {}: {err:#}", snapshot.module_id);
                false
            }
        }
    }

    /// Reads back a usable snapshot for `module_id`.
    ///
    /// Unreadable, mismatched and stale entries are removed and reported as a
    /// miss.
    pub async fn restore_from_local_store(&self, module_id: &str, now_ms: i64) -> Option<SessionSnapshot> {
        let key = snapshot_key(module_id);
        let raw = match self.store.read(&key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(err) => {
                log_warn!("Failed to read local snapshot for module {module_id}: {err:#}");
                return None;
            }
        };

        let discard_reason = match serde_json::from_str::<SessionSnapshot>(&raw) {
            Ok(snapshot) if snapshot.module_id != module_id => {
                format!("belongs to module {}", snapshot.module_id)
            }
            Ok(snapshot) if !snapshot.is_fresh(now_ms, self.staleness_ms) => {
                format!("is {} ms old", snapshot.age_ms(now_ms))
            }
            Ok(snapshot) => return Some(snapshot),
            Err(err) => format!("is unreadable ({err})"),
        };

        log_info!("Discarding local snapshot for module {module_id}: entry {discard_reason}");
        if let Err(err) = self.store.remove(&key).await {
            log_warn!("Failed to remove discarded snapshot for module {module_id}: {err:#}");
        }
        None
    }

    pub async fn clear_local_store(&self, module_id: &str) -> bool {
        match self.store.remove(&snapshot_key(module_id)).await {
            Ok(()) => true,
            Err(err) => {
                log_warn!("Failed to clear local snapshot for module {module_id}: {err:#}");
                false
            }
        }
    }

    /// One-shot push. Never retried here; the next sync interval tries again.
    pub async fn sync_to_backend(&self, payload: &SyncPayload) -> SyncOutcome {
        if !self.backend.is_enabled() {
            return SyncOutcome::Disabled;
        }

        match self.backend.push(payload).await {
            Ok(()) => SyncOutcome::Synced,
            Err(err) => {
                log_warn!("Backend sync failed for module {}: {err:#}", payload.module_id);
                SyncOutcome::Failed
            }
        }
    }
}
