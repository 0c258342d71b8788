//! Landmark-ratio head pose.
//!
//! Yaw and pitch come from how far the nose tip sits from the midpoint of the
//! cheeks (resp. forehead and chin), scaled by the face width (resp. height).
//! Roll is the slope of the cheek-to-cheek line.

use serde::{Deserialize, Serialize};

use super::{
    frame::LandmarkFrame,
    indices::{CHIN, FOREHEAD, LEFT_CHEEK, NOSE_TIP, RIGHT_CHEEK},
};

/// Degrees per unit of nose offset relative to face size. An offset of half
/// the face width maps to 45 degrees.
pub const ANGLE_SCALE_DEGREES: f32 = 90.0;

const MIN_FACE_EXTENT: f32 = 1e-3;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct HeadPose {
    pub yaw: f32,
    pub pitch: f32,
    pub roll: f32,
}

impl HeadPose {
    pub fn within(&self, max_yaw: f32, max_pitch: f32, max_roll: f32) -> bool {
        self.yaw.abs() <= max_yaw && self.pitch.abs() <= max_pitch && self.roll.abs() <= max_roll
    }
}

/// `None` on missing landmarks or a collapsed face; callers keep the previous pose.
pub fn estimate_head_pose(frame: &LandmarkFrame) -> Option<HeadPose> {
    let nose = frame.get(NOSE_TIP)?;
    let left_cheek = frame.get(LEFT_CHEEK)?;
    let right_cheek = frame.get(RIGHT_CHEEK)?;
    let forehead = frame.get(FOREHEAD)?;
    let chin = frame.get(CHIN)?;

    let face_width = (right_cheek.x - left_cheek.x).abs();
    let face_height = (chin.y - forehead.y).abs();
    if face_width < MIN_FACE_EXTENT || face_height < MIN_FACE_EXTENT {
        return None;
    }

    let cheek_mid = left_cheek.midpoint(&right_cheek);
    let vertical_mid = forehead.midpoint(&chin);

    let yaw = (nose.x - cheek_mid.x) / face_width * ANGLE_SCALE_DEGREES;
    let pitch = (nose.y - vertical_mid.y) / face_height * ANGLE_SCALE_DEGREES;
    let roll = (right_cheek.y - left_cheek.y)
        .atan2(right_cheek.x - left_cheek.x)
        .to_degrees();

    Some(HeadPose { yaw, pitch, roll })
}
