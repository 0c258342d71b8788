use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

pub const BACKEND_URL_ENV: &str = "STUDYFOCUS_BACKEND_URL";
pub const API_KEY_ENV: &str = "STUDYFOCUS_API_KEY";

/// Window of normalized gaze coordinates that counts as "looking at the screen".
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GazeBounds {
    pub h_min: f32,
    pub h_max: f32,
    pub v_min: f32,
    pub v_max: f32,
}

impl Default for GazeBounds {
    fn default() -> Self {
        Self {
            h_min: 0.30,
            h_max: 0.70,
            v_min: 0.25,
            v_max: 0.75,
        }
    }
}

/// Head rotation tolerance in degrees, applied to the absolute angle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HeadPoseBounds {
    pub max_yaw: f32,
    pub max_pitch: f32,
    pub max_roll: f32,
}

impl Default for HeadPoseBounds {
    fn default() -> Self {
        Self {
            max_yaw: 25.0,
            max_pitch: 20.0,
            max_roll: 20.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EarThresholds {
    /// Average EAR below this counts as closed eyes
    pub blink: f32,
    /// Average EAR below this (but not closed) flags the frame as drowsy
    pub drowsy: f32,
    /// Consecutive closed-eye frames that force an unfocused verdict
    pub closed_frames_for_unfocus: u32,
}

impl Default for EarThresholds {
    fn default() -> Self {
        Self {
            blink: 0.18,
            drowsy: 0.22,
            closed_frames_for_unfocus: 10,
        }
    }
}

/// Debounce sizes, in consecutive frames.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Hysteresis {
    pub focus_entry_frames: u32,
    pub unfocus_entry_frames: u32,
    pub no_face_unfocus_frames: u32,
}

impl Default for Hysteresis {
    fn default() -> Self {
        Self {
            focus_entry_frames: 5,
            unfocus_entry_frames: 3,
            no_face_unfocus_frames: 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MovementConfig {
    /// Number of gaze samples retained for velocity analysis
    pub history_capacity: usize,
    /// Per-frame Euclidean gaze delta above which movement counts as rapid
    pub velocity_threshold: f32,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            history_capacity: 5,
            velocity_threshold: 0.15,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum ClassifierMode {
    /// Gaze window, head pose, eye openness and gaze velocity.
    #[default]
    MultiFactor,
    /// Iris position only. Used when head pose cannot be trusted at all.
    IrisRatio,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BackendConfig {
    /// Sync endpoint. `None` disables backend sync entirely.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Bearer token. Read from a file or the environment, never written back.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            timeout_secs: 10,
        }
    }
}

/// Immutable tracker configuration, handed to the engine at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TrackerConfig {
    pub gaze_bounds: GazeBounds,
    pub head_pose_bounds: HeadPoseBounds,
    pub ear_thresholds: EarThresholds,
    pub hysteresis: Hysteresis,
    pub movement: MovementConfig,
    pub classifier_mode: ClassifierMode,
    pub frame_cadence_ms: u64,
    pub timer_tick_ms: u64,
    pub local_snapshot_interval_ms: u64,
    pub backend_sync_interval_ms: u64,
    pub snapshot_staleness_ms: u64,
    pub backend: BackendConfig,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            gaze_bounds: GazeBounds::default(),
            head_pose_bounds: HeadPoseBounds::default(),
            ear_thresholds: EarThresholds::default(),
            hysteresis: Hysteresis::default(),
            movement: MovementConfig::default(),
            classifier_mode: ClassifierMode::default(),
            frame_cadence_ms: 100,
            timer_tick_ms: 100,
            local_snapshot_interval_ms: 5_000,
            backend_sync_interval_ms: 60_000,
            snapshot_staleness_ms: 5 * 60 * 1_000,
            backend: BackendConfig::default(),
        }
    }
}

impl TrackerConfig {
    pub fn validate(&self) -> Result<()> {
        let gaze = &self.gaze_bounds;
        if !(gaze.h_min < gaze.h_max && gaze.v_min < gaze.v_max) {
            bail!("gaze bounds must satisfy min < max on both axes: {gaze:?}");
        }

        let pose = &self.head_pose_bounds;
        if pose.max_yaw <= 0.0 || pose.max_pitch <= 0.0 || pose.max_roll <= 0.0 {
            bail!("head pose bounds must be positive: {pose:?}");
        }

        let ear = &self.ear_thresholds;
        if ear.blink <= 0.0 || ear.blink > ear.drowsy {
            bail!(
                "EAR thresholds must satisfy 0 < blink <= drowsy (blink={}, drowsy={})",
                ear.blink,
                ear.drowsy
            );
        }
        if ear.closed_frames_for_unfocus == 0 {
            bail!("closedFramesForUnfocus must be greater than zero");
        }

        let hysteresis = &self.hysteresis;
        if hysteresis.focus_entry_frames == 0
            || hysteresis.unfocus_entry_frames == 0
            || hysteresis.no_face_unfocus_frames == 0
        {
            bail!("hysteresis frame counts must be greater than zero: {hysteresis:?}");
        }
        if hysteresis.unfocus_entry_frames > hysteresis.focus_entry_frames {
            bail!(
                "unfocusEntryFrames ({}) must not exceed focusEntryFrames ({})",
                hysteresis.unfocus_entry_frames,
                hysteresis.focus_entry_frames
            );
        }
        if hysteresis.no_face_unfocus_frames > hysteresis.unfocus_entry_frames {
            bail!(
                "noFaceUnfocusFrames ({}) must not exceed unfocusEntryFrames ({})",
                hysteresis.no_face_unfocus_frames,
                hysteresis.unfocus_entry_frames
            );
        }

        if self.movement.history_capacity < 2 {
            bail!("gaze history capacity must hold at least two samples");
        }

        for (name, value) in [
            ("frameCadenceMs", self.frame_cadence_ms),
            ("timerTickMs", self.timer_tick_ms),
            ("localSnapshotIntervalMs", self.local_snapshot_interval_ms),
            ("backendSyncIntervalMs", self.backend_sync_interval_ms),
            ("snapshotStalenessMs", self.snapshot_staleness_ms),
        ] {
            if value == 0 {
                bail!("{name} must be greater than zero");
            }
        }

        Ok(())
    }

    /// Backend endpoint and key from the environment win over the file.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(endpoint) = std::env::var(BACKEND_URL_ENV) {
            self.backend.endpoint = Some(endpoint);
        }
        if let Ok(api_key) = std::env::var(API_KEY_ENV) {
            self.backend.api_key = Some(api_key);
        }
        self
    }

    pub fn staleness_ms(&self) -> i64 {
        i64::try_from(self.snapshot_staleness_ms).unwrap_or(i64::MAX)
    }
}
