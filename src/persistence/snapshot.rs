use serde::{Deserialize, Serialize};

const KEY_PREFIX: &str = "studyfocus.session.";

/// Key under which a module's snapshot lives in a [`SnapshotStore`](super::SnapshotStore).
pub fn snapshot_key(module_id: &str) -> String {
    format!("{KEY_PREFIX}{module_id}")
}

/// Serializable projection of a session timer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub module_id: String,
    pub session_time_sec: f64,
    pub focused_time_sec: f64,
    pub unfocused_time_sec: f64,
    /// Epoch milliseconds
    pub saved_at_ts: i64,
}

impl SessionSnapshot {
    pub fn age_ms(&self, now_ms: i64) -> i64 {
        now_ms - self.saved_at_ts
    }

    /// A snapshot stamped in the future (clock skew) counts as fresh.
    pub fn is_fresh(&self, now_ms: i64, staleness_ms: i64) -> bool {
        self.age_ms(now_ms) <= staleness_ms
    }
}

/// Body pushed to the persistence backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SyncPayload {
    pub module_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section_id: Option<String>,
    pub session_time_sec: f64,
    pub focused_time_sec: f64,
    pub unfocused_time_sec: f64,
}

impl SyncPayload {
    pub fn from_snapshot(snapshot: &SessionSnapshot, section_id: Option<String>) -> Self {
        Self {
            module_id: snapshot.module_id.clone(),
            section_id,
            session_time_sec: snapshot.session_time_sec,
            focused_time_sec: snapshot.focused_time_sec,
            unfocused_time_sec: snapshot.unfocused_time_sec,
        }
    }
}
