//! Iris-in-eye gaze estimation.
//!
//! For each eye the iris centroid is located inside the bounding box of that
//! eye's contour. Both normalized positions are averaged, giving a point in
//! `[0, 1]²` where `(0.5, 0.5)` means the irises sit centred in the eyes.

use serde::{Deserialize, Serialize};

use super::{
    frame::{LandmarkFrame, Point},
    indices::{LEFT_EYE_CONTOUR, LEFT_IRIS, RIGHT_EYE_CONTOUR, RIGHT_IRIS},
};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GazePoint {
    pub x: f32,
    pub y: f32,
}

impl GazePoint {
    pub const CENTER: GazePoint = GazePoint { x: 0.5, y: 0.5 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &GazePoint) -> f32 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// Returns `None` when a referenced landmark is missing or an eye box collapses.
pub fn estimate_gaze(frame: &LandmarkFrame) -> Option<GazePoint> {
    if !frame.is_complete() {
        return None;
    }

    let left = eye_relative_iris(frame, &LEFT_EYE_CONTOUR, &LEFT_IRIS)?;
    let right = eye_relative_iris(frame, &RIGHT_EYE_CONTOUR, &RIGHT_IRIS)?;

    Some(GazePoint {
        x: ((left.x + right.x) / 2.0).clamp(0.0, 1.0),
        y: ((left.y + right.y) / 2.0).clamp(0.0, 1.0),
    })
}

fn eye_relative_iris(frame: &LandmarkFrame, contour: &[usize], iris: &[usize]) -> Option<Point> {
    let contour = frame.group(contour)?;
    let iris = frame.group(iris)?;

    let count = iris.len() as f32;
    let centroid = Point::new(
        iris.iter().map(|p| p.x).sum::<f32>() / count,
        iris.iter().map(|p| p.y).sum::<f32>() / count,
    );

    let (min_x, max_x) = span(contour.iter().map(|p| p.x));
    let (min_y, max_y) = span(contour.iter().map(|p| p.y));
    let width = max_x - min_x;
    let height = max_y - min_y;
    if width <= f32::EPSILON || height <= f32::EPSILON {
        return None;
    }

    Some(Point::new(
        (centroid.x - min_x) / width,
        (centroid.y - min_y) / height,
    ))
}

fn span(values: impl Iterator<Item = f32>) -> (f32, f32) {
    values.fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    })
}
