mod types;

pub use types::{MetricsSnapshot, TransitionRecord};

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::{
    engine::{FrameKind, FrameOutcome},
    persistence::SyncOutcome,
};

const MAX_RECENT_TRANSITIONS: usize = 20;

/// Tracking counters shared by the periodic loops.
#[derive(Clone, Default)]
pub struct MetricsCollector {
    inner: Arc<Mutex<MetricsSnapshot>>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record_frame(&self, outcome: &FrameOutcome) {
        let mut state = self.inner.lock().await;

        state.frames_processed += 1;
        match outcome.kind {
            FrameKind::Landmarks => {}
            FrameKind::NoFace => state.no_face_frames += 1,
            FrameKind::Rejected => state.rejected_frames += 1,
        }
        if outcome.verdict.drowsy {
            state.drowsy_frames += 1;
        }

        if outcome.verdict.transitioned {
            state.transitions += 1;
            state.recent_transitions.push_back(TransitionRecord {
                at_ms: outcome.at_ms,
                focused: outcome.verdict.focused,
                session_time_sec: outcome.session_time_sec,
            });
            if state.recent_transitions.len() > MAX_RECENT_TRANSITIONS {
                state.recent_transitions.pop_front();
            }
        }
    }

    pub async fn record_skipped_cycle(&self) {
        self.inner.lock().await.skipped_cycles += 1;
    }

    pub async fn record_local_snapshot(&self, written: bool) {
        if !written {
            self.inner.lock().await.local_snapshot_failures += 1;
        }
    }

    pub async fn record_sync(&self, outcome: SyncOutcome) {
        let mut state = self.inner.lock().await;
        match outcome {
            SyncOutcome::Synced => state.backend_syncs += 1,
            SyncOutcome::Failed => state.backend_sync_failures += 1,
            SyncOutcome::Disabled => {}
        }
    }

    pub async fn get_snapshot(&self) -> MetricsSnapshot {
        self.inner.lock().await.clone()
    }

    pub async fn reset(&self) {
        *self.inner.lock().await = MetricsSnapshot::default();
    }
}
