use serde::{Deserialize, Serialize};

/// Landmark count of a face mesh with iris refinement.
pub const REFINED_LANDMARK_COUNT: usize = 478;

/// Normalized image-space point, both axes in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point) -> f32 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    pub fn midpoint(&self, other: &Point) -> Point {
        Point::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }
}

/// One detector output. Serialized as a plain array of `[x, y]` pairs.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "Vec<[f32; 2]>", into = "Vec<[f32; 2]>")]
pub struct LandmarkFrame {
    points: Vec<Point>,
}

impl LandmarkFrame {
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// True when the frame carries the iris refinement points.
    pub fn is_complete(&self) -> bool {
        self.points.len() >= REFINED_LANDMARK_COUNT
    }

    /// Landmark at `index`; `None` when absent or not a finite coordinate.
    pub fn get(&self, index: usize) -> Option<Point> {
        self.points
            .get(index)
            .copied()
            .filter(|p| p.x.is_finite() && p.y.is_finite())
    }

    /// All landmarks of a group, or `None` if any one is missing.
    pub fn group(&self, indices: &[usize]) -> Option<Vec<Point>> {
        indices.iter().map(|&i| self.get(i)).collect()
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    #[cfg(test)]
    pub(crate) fn points_mut(&mut self) -> &mut [Point] {
        &mut self.points
    }
}

impl From<Vec<[f32; 2]>> for LandmarkFrame {
    fn from(raw: Vec<[f32; 2]>) -> Self {
        Self {
            points: raw.into_iter().map(|[x, y]| Point::new(x, y)).collect(),
        }
    }
}

impl From<LandmarkFrame> for Vec<[f32; 2]> {
    fn from(frame: LandmarkFrame) -> Self {
        frame.points.into_iter().map(|p| [p.x, p.y]).collect()
    }
}
