use std::collections::VecDeque;

use crate::landmarks::GazePoint;

const CENTER: f32 = 0.5;

/// Fixed-capacity FIFO of recent gaze points.
#[derive(Debug, Clone)]
pub struct GazeHistory {
    samples: VecDeque<GazePoint>,
    capacity: usize,
}

impl GazeHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(2);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, gaze: GazePoint) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(gaze);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    /// Last two samples, oldest first.
    pub fn last_pair(&self) -> Option<(GazePoint, GazePoint)> {
        let n = self.samples.len();
        if n < 2 {
            return None;
        }
        Some((self.samples[n - 2], self.samples[n - 1]))
    }

    /// The latest step is faster than `velocity_threshold` and carries the gaze
    /// further from the screen centre on at least one axis.
    pub fn rapid_movement_away(&self, velocity_threshold: f32) -> bool {
        let Some((previous, current)) = self.last_pair() else {
            return false;
        };

        if previous.distance(&current) <= velocity_threshold {
            return false;
        }

        let moving_out = |prev: f32, cur: f32| (cur - CENTER).abs() > (prev - CENTER).abs();
        moving_out(previous.x, current.x) || moving_out(previous.y, current.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicts_oldest_sample_first() {
        let mut history = GazeHistory::new(3);
        for x in [0.1, 0.2, 0.3, 0.4] {
            history.push(GazePoint::new(x, 0.5));
        }
        assert_eq!(history.len(), 3);
        let (prev, cur) = history.last_pair().unwrap();
        assert_eq!(prev.x, 0.3);
        assert_eq!(cur.x, 0.4);
    }

    #[test]
    fn single_sample_is_never_rapid() {
        let mut history = GazeHistory::new(5);
        history.push(GazePoint::new(0.95, 0.5));
        assert!(!history.rapid_movement_away(0.01));
    }

    #[test]
    fn fast_jump_toward_edge_is_rapid() {
        let mut history = GazeHistory::new(5);
        history.push(GazePoint::new(0.5, 0.5));
        history.push(GazePoint::new(0.75, 0.5));
        assert!(history.rapid_movement_away(0.15));
    }

    #[test]
    fn fast_return_to_centre_is_not_flight() {
        let mut history = GazeHistory::new(5);
        history.push(GazePoint::new(0.8, 0.5));
        history.push(GazePoint::new(0.5, 0.5));
        assert!(!history.rapid_movement_away(0.15));
    }

    #[test]
    fn slow_drift_is_not_rapid() {
        let mut history = GazeHistory::new(5);
        history.push(GazePoint::new(0.5, 0.5));
        history.push(GazePoint::new(0.6, 0.5));
        assert!(!history.rapid_movement_away(0.15));
    }
}
