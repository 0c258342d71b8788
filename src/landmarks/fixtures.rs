//! Synthetic face-mesh frames for tests.

use super::{
    frame::{LandmarkFrame, Point, REFINED_LANDMARK_COUNT},
    indices::*,
};

const EYE_WIDTH: f32 = 0.10;
const EYE_CENTER_Y: f32 = 0.42;
const LEFT_EYE_CENTER_X: f32 = 0.35;
const RIGHT_EYE_CENTER_X: f32 = 0.65;

/// Describes a frame by the features the extractors should read back.
#[derive(Debug, Clone, Copy)]
pub struct FrameSpec {
    /// Iris position inside each eye box, 0..1 per axis
    pub gaze_x: f32,
    pub gaze_y: f32,
    /// Eye aspect ratio of both eyes
    pub ear: f32,
    /// Horizontal nose displacement from the cheek midpoint
    pub nose_offset_x: f32,
}

impl Default for FrameSpec {
    fn default() -> Self {
        Self {
            gaze_x: 0.5,
            gaze_y: 0.5,
            ear: 0.3,
            nose_offset_x: 0.0,
        }
    }
}

impl FrameSpec {
    pub fn looking_at(gaze_x: f32, gaze_y: f32) -> Self {
        Self {
            gaze_x,
            gaze_y,
            ..Self::default()
        }
    }

    pub fn with_ear(ear: f32) -> Self {
        Self {
            ear,
            ..Self::default()
        }
    }

    pub fn build(&self) -> LandmarkFrame {
        let mut points = vec![Point::new(0.5, 0.5); REFINED_LANDMARK_COUNT];

        let lid = self.ear * EYE_WIDTH / 2.0;
        self.place_eye(
            &mut points,
            LEFT_EYE_CENTER_X,
            &LEFT_EYE_CONTOUR,
            &LEFT_IRIS,
            [LEFT_EYE_OUTER, LEFT_EYE_INNER],
            [LEFT_EYE_TOP_1, LEFT_EYE_BOTTOM_1],
            [LEFT_EYE_TOP_2, LEFT_EYE_BOTTOM_2],
            lid,
        );
        self.place_eye(
            &mut points,
            RIGHT_EYE_CENTER_X,
            &RIGHT_EYE_CONTOUR,
            &RIGHT_IRIS,
            [RIGHT_EYE_INNER, RIGHT_EYE_OUTER],
            [RIGHT_EYE_TOP_1, RIGHT_EYE_BOTTOM_1],
            [RIGHT_EYE_TOP_2, RIGHT_EYE_BOTTOM_2],
            lid,
        );

        points[NOSE_TIP] = Point::new(0.5 + self.nose_offset_x, 0.5);
        points[LEFT_CHEEK] = Point::new(0.2, 0.5);
        points[RIGHT_CHEEK] = Point::new(0.8, 0.5);
        points[FOREHEAD] = Point::new(0.5, 0.2);
        points[CHIN] = Point::new(0.5, 0.8);

        LandmarkFrame::new(points)
    }

    #[allow(clippy::too_many_arguments)]
    fn place_eye(
        &self,
        points: &mut [Point],
        center_x: f32,
        contour: &[usize],
        iris: &[usize],
        [left_corner, right_corner]: [usize; 2],
        [top_a, bottom_a]: [usize; 2],
        [top_b, bottom_b]: [usize; 2],
        lid: f32,
    ) {
        let min_x = center_x - EYE_WIDTH / 2.0;
        for &i in contour {
            points[i] = Point::new(center_x, EYE_CENTER_Y);
        }
        points[left_corner] = Point::new(min_x, EYE_CENTER_Y);
        points[right_corner] = Point::new(min_x + EYE_WIDTH, EYE_CENTER_Y);
        points[top_a] = Point::new(center_x - 0.01, EYE_CENTER_Y - lid);
        points[bottom_a] = Point::new(center_x - 0.01, EYE_CENTER_Y + lid);
        points[top_b] = Point::new(center_x + 0.01, EYE_CENTER_Y - lid);
        points[bottom_b] = Point::new(center_x + 0.01, EYE_CENTER_Y + lid);

        let iris_at = Point::new(
            min_x + self.gaze_x * EYE_WIDTH,
            EYE_CENTER_Y - lid + self.gaze_y * 2.0 * lid,
        );
        for &i in iris {
            points[i] = iris_at;
        }
    }
}
