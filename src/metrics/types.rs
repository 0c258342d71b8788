use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TransitionRecord {
    /// Epoch milliseconds
    pub at_ms: i64,
    pub focused: bool,
    pub session_time_sec: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub frames_processed: u64,
    pub no_face_frames: u64,
    pub rejected_frames: u64,
    /// Cadence ticks on which the source had no frame ready
    pub skipped_cycles: u64,
    pub drowsy_frames: u64,
    pub transitions: u64,
    pub local_snapshot_failures: u64,
    pub backend_syncs: u64,
    pub backend_sync_failures: u64,
    pub recent_transitions: VecDeque<TransitionRecord>,
}
