//! Eye aspect ratio (EAR).
//!
//! EAR = mean of the two lid-to-lid distances over the corner-to-corner
//! distance. Roughly 0.3 for an open eye, falling toward 0 as it closes.

use serde::{Deserialize, Serialize};

use super::{frame::LandmarkFrame, indices::*};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EyeOpenness {
    pub left: f32,
    pub right: f32,
    pub average: f32,
}

pub fn estimate_eye_openness(frame: &LandmarkFrame) -> Option<EyeOpenness> {
    let left = eye_aspect_ratio(
        frame,
        [LEFT_EYE_TOP_1, LEFT_EYE_BOTTOM_1],
        [LEFT_EYE_TOP_2, LEFT_EYE_BOTTOM_2],
        [LEFT_EYE_OUTER, LEFT_EYE_INNER],
    )?;
    let right = eye_aspect_ratio(
        frame,
        [RIGHT_EYE_TOP_1, RIGHT_EYE_BOTTOM_1],
        [RIGHT_EYE_TOP_2, RIGHT_EYE_BOTTOM_2],
        [RIGHT_EYE_OUTER, RIGHT_EYE_INNER],
    )?;

    Some(EyeOpenness {
        left,
        right,
        average: (left + right) / 2.0,
    })
}

fn eye_aspect_ratio(
    frame: &LandmarkFrame,
    vertical_a: [usize; 2],
    vertical_b: [usize; 2],
    horizontal: [usize; 2],
) -> Option<f32> {
    let dist = |[a, b]: [usize; 2]| Some(frame.get(a)?.distance(&frame.get(b)?));

    let width = dist(horizontal)?;
    if width <= f32::EPSILON {
        return None;
    }
    Some((dist(vertical_a)? + dist(vertical_b)?) / (2.0 * width))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmarks::fixtures::FrameSpec;
    use crate::landmarks::frame::Point;

    #[test]
    fn open_eyes_measure_the_configured_ratio() {
        let frame = FrameSpec {
            ear: 0.3,
            ..FrameSpec::default()
        }
        .build();
        let eyes = estimate_eye_openness(&frame).unwrap();
        assert!((eyes.left - 0.3).abs() < 1e-4);
        assert!((eyes.right - 0.3).abs() < 1e-4);
        assert!((eyes.average - 0.3).abs() < 1e-4);
    }

    #[test]
    fn closed_eyes_drop_toward_zero() {
        let frame = FrameSpec {
            ear: 0.05,
            ..FrameSpec::default()
        }
        .build();
        assert!(estimate_eye_openness(&frame).unwrap().average < 0.1);
    }

    #[test]
    fn zero_width_eye_yields_none() {
        let mut frame = FrameSpec::default().build();
        let inner = frame.points()[LEFT_EYE_INNER];
        frame.points_mut()[LEFT_EYE_OUTER] = inner;
        assert!(estimate_eye_openness(&frame).is_none());
    }

    #[test]
    fn missing_lid_point_yields_none() {
        let mut frame = FrameSpec::default().build();
        frame.points_mut()[RIGHT_EYE_TOP_2] = Point::new(f32::INFINITY, 0.0);
        assert!(estimate_eye_openness(&frame).is_none());
    }
}
