//! Geometry extractors over face-mesh landmark frames.
//!
//! The extractors are pure functions returning `Option`. [`FeatureTracker`]
//! adds the only memory they need: the last good head pose and eye openness,
//! reused (and flagged stale) when a frame lacks the landmarks for them.

pub mod eye_openness;
pub mod frame;
pub mod gaze;
pub mod head_pose;
pub mod indices;

#[cfg(test)]
pub(crate) mod fixtures;

pub use eye_openness::{estimate_eye_openness, EyeOpenness};
pub use frame::{LandmarkFrame, Point, REFINED_LANDMARK_COUNT};
pub use gaze::{estimate_gaze, GazePoint};
pub use head_pose::{estimate_head_pose, HeadPose};

/// Features of one frame, ready for classification.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameFeatures {
    pub gaze: Option<GazePoint>,
    pub head_pose: HeadPose,
    /// False when `head_pose` was carried over from an earlier frame
    pub head_pose_fresh: bool,
    /// Latest known eye openness; `None` until one frame measured it
    pub eyes: Option<EyeOpenness>,
    pub eyes_fresh: bool,
    /// The frame lacked the refinement points and was not usable for gaze
    pub rejected: bool,
}

#[derive(Debug, Clone, Default)]
pub struct FeatureTracker {
    last_head_pose: HeadPose,
    last_eyes: Option<EyeOpenness>,
}

impl FeatureTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extract(&mut self, frame: &LandmarkFrame) -> FrameFeatures {
        let gaze = estimate_gaze(frame);

        let head_pose = estimate_head_pose(frame);
        if let Some(pose) = head_pose {
            self.last_head_pose = pose;
        }

        let eyes = estimate_eye_openness(frame);
        if let Some(eyes) = eyes {
            self.last_eyes = Some(eyes);
        }

        FrameFeatures {
            gaze,
            head_pose: self.last_head_pose,
            head_pose_fresh: head_pose.is_some(),
            eyes: self.last_eyes,
            eyes_fresh: eyes.is_some(),
            rejected: !frame.is_complete(),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
