//! Synchronous tracking core.
//!
//! One landmark frame flows through feature extraction, classification and
//! timer accounting per call. Time is always passed in by the caller, which
//! keeps the engine free of clocks and schedulers.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    config::TrackerConfig,
    focus::{FocusClassifier, FocusVerdict},
    landmarks::{FeatureTracker, LandmarkFrame},
    log_debug, log_info,
    persistence::{SessionSnapshot, SyncPayload},
    timer::{SessionTimer, TimerStatus},
};

const ENABLE_LOGS: bool = true;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveSession {
    pub module_id: String,
    pub section_id: Option<String>,
    pub session_id: Uuid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FrameKind {
    Landmarks,
    NoFace,
    /// Landmarks arrived without the iris refinement points
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameOutcome {
    pub kind: FrameKind,
    pub verdict: FocusVerdict,
    pub at_ms: i64,
    pub session_time_sec: f64,
}

/// What the engine reports to its caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FocusSnapshot {
    pub focused: bool,
    pub session_time_sec: f64,
    pub focused_time_sec: f64,
    pub unfocused_time_sec: f64,
    pub focus_percentage: f64,
    pub status: TimerStatus,
    pub module_id: Option<String>,
    pub session_id: Option<String>,
    pub frames_processed: u64,
}

pub struct FocusEngine {
    config: TrackerConfig,
    tracker: FeatureTracker,
    classifier: FocusClassifier,
    timer: SessionTimer,
    session: Option<ActiveSession>,
    frames_processed: u64,
}

impl FocusEngine {
    pub fn new(config: TrackerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            tracker: FeatureTracker::new(),
            classifier: FocusClassifier::new(&config),
            timer: SessionTimer::new(),
            session: None,
            frames_processed: 0,
            config,
        })
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn session(&self) -> Option<&ActiveSession> {
        self.session.as_ref()
    }

    pub fn is_running(&self) -> bool {
        self.timer.status().is_running()
    }

    /// Begins a session, seeded from `restored` when it is usable.
    ///
    /// Returns whether the restored snapshot was applied.
    pub fn start(
        &mut self,
        module_id: &str,
        section_id: Option<String>,
        restored: Option<&SessionSnapshot>,
        now_ms: i64,
    ) -> Result<bool> {
        if self.is_running() {
            bail!("tracking already active");
        }
        if module_id.trim().is_empty() {
            bail!("module id cannot be empty");
        }

        self.tracker.reset();
        self.classifier.reset();
        self.frames_processed = 0;

        let resumed = self
            .timer
            .start(module_id, restored, now_ms, self.config.staleness_ms());
        let session = ActiveSession {
            module_id: module_id.to_string(),
            section_id,
            session_id: Uuid::new_v4(),
        };

        log_info!(
            "Tracking started for module {} (session {}, {})",
            session.module_id,
            session.session_id,
            if resumed { "resumed" } else { "fresh" }
        );
        self.session = Some(session);
        Ok(resumed)
    }

    /// Classifies one detector result. `None` means no face was found.
    ///
    /// Returns `None` when no session is running.
    pub fn process_landmark_frame(&mut self, frame: Option<&LandmarkFrame>, now_ms: i64) -> Option<FrameOutcome> {
        if !self.is_running() {
            return None;
        }

        let (kind, verdict) = match frame {
            None => (FrameKind::NoFace, self.classifier.evaluate_no_face()),
            Some(frame) => {
                let features = self.tracker.extract(frame);
                let kind = if features.rejected {
                    FrameKind::Rejected
                } else {
                    FrameKind::Landmarks
                };
                (kind, self.classifier.evaluate(&features))
            }
        };

        if verdict.transitioned {
            self.timer.on_focus_change(verdict.focused, now_ms);
            log_debug!(
                "Focus changed to {} at {:.1}s",
                if verdict.focused { "focused" } else { "unfocused" },
                self.timer.session_time_sec()
            );
        }
        self.timer.tick(now_ms);
        self.frames_processed += 1;

        Some(FrameOutcome {
            kind,
            verdict,
            at_ms: now_ms,
            session_time_sec: self.timer.session_time_sec(),
        })
    }

    pub fn tick(&mut self, now_ms: i64) {
        self.timer.tick(now_ms);
    }

    pub fn snapshot(&self) -> FocusSnapshot {
        FocusSnapshot {
            focused: self.timer.is_focused(),
            session_time_sec: self.timer.session_time_sec(),
            focused_time_sec: self.timer.focused_time_sec(),
            unfocused_time_sec: self.timer.unfocused_time_sec(),
            focus_percentage: self.timer.focus_percentage(),
            status: self.timer.status(),
            module_id: self.timer.module_id().map(str::to_string),
            session_id: self.session.as_ref().map(|s| s.session_id.to_string()),
            frames_processed: self.frames_processed,
        }
    }

    pub fn session_snapshot(&self, now_ms: i64) -> Option<SessionSnapshot> {
        self.timer.to_snapshot(now_ms)
    }

    pub fn sync_payload(&self, now_ms: i64) -> Option<SyncPayload> {
        let snapshot = self.session_snapshot(now_ms)?;
        let section_id = self.session.as_ref().and_then(|s| s.section_id.clone());
        Some(SyncPayload::from_snapshot(&snapshot, section_id))
    }

    /// Closes the session. Calling it again returns the same snapshot.
    pub fn stop(&mut self, now_ms: i64) -> FocusSnapshot {
        let was_running = self.is_running();
        self.timer.stop(now_ms);
        let snapshot = self.snapshot();

        if was_running {
            log_info!(
                "Tracking stopped for module {}: {:.1}s total, {:.1}s focused, {:.1}s unfocused ({}%)",
                snapshot.module_id.as_deref().unwrap_or("-"),
                snapshot.session_time_sec,
                snapshot.focused_time_sec,
                snapshot.unfocused_time_sec,
                snapshot.focus_percentage
            );
        }
        snapshot
    }
}
