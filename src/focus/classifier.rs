//! Multi-factor focus classifier with hysteresis.
//!
//! Each frame yields a *candidate* verdict: gaze inside the screen window and
//! either (head facing the screen, no rapid flight of the gaze) or (eyes
//! open). The reported status only flips after the candidate holds for a run
//! of frames. Becoming unfocused needs a shorter run than becoming focused, a
//! missing face needs a shorter run still, and a long enough closed-eye run
//! flips to unfocused at once.

use serde::{Deserialize, Serialize};

use crate::config::{ClassifierMode, TrackerConfig};
use crate::landmarks::{FrameFeatures, GazePoint};

use super::{
    history::GazeHistory,
    state::{FocusState, FocusStatus},
};

/// Half-width of the centred window used by [`ClassifierMode::IrisRatio`].
const IRIS_RATIO_TOLERANCE: f32 = 0.2;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct FocusVerdict {
    pub focused: bool,
    pub transitioned: bool,
    /// Raw per-frame verdict before hysteresis
    pub candidate: bool,
    pub drowsy: bool,
    pub eyes_closed_override: bool,
}

pub struct FocusClassifier {
    config: TrackerConfig,
    state: FocusState,
    history: GazeHistory,
}

impl FocusClassifier {
    pub fn new(config: &TrackerConfig) -> Self {
        Self {
            config: config.clone(),
            state: FocusState::default(),
            history: GazeHistory::new(config.movement.history_capacity),
        }
    }

    pub fn state(&self) -> &FocusState {
        &self.state
    }

    pub fn is_focused(&self) -> bool {
        self.state.status.is_focused()
    }

    pub fn reset(&mut self) {
        self.state = FocusState::default();
        self.history.clear();
    }

    pub fn evaluate(&mut self, features: &FrameFeatures) -> FocusVerdict {
        if let Some(gaze) = features.gaze {
            self.history.push(gaze);
        }

        let ear = &self.config.ear_thresholds;
        let average_ear = features.eyes.map(|eyes| eyes.average);
        let eyes_open = average_ear.is_some_and(|avg| avg >= ear.blink);
        let drowsy = features.eyes_fresh && average_ear.is_some_and(|avg| avg >= ear.blink && avg < ear.drowsy);

        // Only a fresh measurement moves the closed-eye run.
        if features.eyes_fresh {
            if eyes_open {
                self.state.consecutive_closed_eye_frames = 0;
            } else {
                self.state.consecutive_closed_eye_frames =
                    self.state.consecutive_closed_eye_frames.saturating_add(1);
            }
        }
        let eyes_closed_override =
            self.state.consecutive_closed_eye_frames >= ear.closed_frames_for_unfocus;

        let candidate = !eyes_closed_override
            && match self.config.classifier_mode {
                ClassifierMode::MultiFactor => self.multi_factor_candidate(features, eyes_open),
                ClassifierMode::IrisRatio => features.gaze.is_some_and(iris_centred) && eyes_open,
            };

        self.state.consecutive_no_face_frames = 0;
        self.state.record_candidate(candidate);

        let hysteresis = &self.config.hysteresis;
        let transitioned = if eyes_closed_override {
            self.state.set_status(FocusStatus::Unfocused)
        } else if candidate && self.state.consecutive_focused_frames >= hysteresis.focus_entry_frames {
            self.state.set_status(FocusStatus::Focused)
        } else if !candidate
            && self.state.consecutive_unfocused_frames >= hysteresis.unfocus_entry_frames
        {
            self.state.set_status(FocusStatus::Unfocused)
        } else {
            false
        };

        FocusVerdict {
            focused: self.is_focused(),
            transitioned,
            candidate,
            drowsy,
            eyes_closed_override,
        }
    }

    /// A frame in which the detector found no face.
    pub fn evaluate_no_face(&mut self) -> FocusVerdict {
        self.history.clear();
        self.state.consecutive_closed_eye_frames = 0;
        self.state.consecutive_no_face_frames = self.state.consecutive_no_face_frames.saturating_add(1);
        self.state.record_candidate(false);

        let hysteresis = &self.config.hysteresis;
        let transitioned = if self.state.consecutive_no_face_frames >= hysteresis.no_face_unfocus_frames
            || self.state.consecutive_unfocused_frames >= hysteresis.unfocus_entry_frames
        {
            self.state.set_status(FocusStatus::Unfocused)
        } else {
            false
        };

        FocusVerdict {
            focused: self.is_focused(),
            transitioned,
            ..FocusVerdict::default()
        }
    }

    fn multi_factor_candidate(&self, features: &FrameFeatures, eyes_open: bool) -> bool {
        let bounds = &self.config.gaze_bounds;
        let gaze_in_bounds = features.gaze.is_some_and(|g| {
            (bounds.h_min..=bounds.h_max).contains(&g.x) && (bounds.v_min..=bounds.v_max).contains(&g.y)
        });
        if !gaze_in_bounds {
            return false;
        }

        let pose = &self.config.head_pose_bounds;
        // A carried-over pose is not trusted for the strict path.
        let head_facing_screen = features.head_pose_fresh
            && features.head_pose.within(pose.max_yaw, pose.max_pitch, pose.max_roll);
        let rapid_movement_away = self
            .history
            .rapid_movement_away(self.config.movement.velocity_threshold);

        (head_facing_screen && !rapid_movement_away) || eyes_open
    }
}

fn iris_centred(gaze: GazePoint) -> bool {
    (gaze.x - 0.5).abs() < IRIS_RATIO_TOLERANCE && (gaze.y - 0.5).abs() < IRIS_RATIO_TOLERANCE
}
