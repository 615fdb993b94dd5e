//! Inner and outer bob trails recorded step by step.

use crate::error::{PendulumError, Result};
use crate::state::CartesianPose;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Upper bound on the poses reserved up front for a bounded trail.
const MAX_RESERVED_POSES: usize = 4096;

/// How many poses a [`Trajectory`] keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrailCapacity {
    /// Keep every pose for the lifetime of the session.
    #[default]
    Unbounded,
    /// Keep only the most recent `n` poses.
    Bounded(usize),
}

/// Append-only record of bob positions, indexed by step number.
///
/// With a bounded capacity the oldest poses are dropped first, and
/// [`first_index`](Self::first_index) moves forward accordingly.
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    inner: VecDeque<Point2<f64>>,
    outer: VecDeque<Point2<f64>>,
    first_index: usize,
    capacity: TrailCapacity,
}

impl Default for Trajectory {
    fn default() -> Self {
        Self {
            inner: VecDeque::new(),
            outer: VecDeque::new(),
            first_index: 0,
            capacity: TrailCapacity::Unbounded,
        }
    }
}

impl Trajectory {
    pub fn new(capacity: TrailCapacity) -> Result<Self> {
        if capacity == TrailCapacity::Bounded(0) {
            return Err(PendulumError::InvalidParameter {
                name: "trail capacity",
                value: 0.0,
                reason: "a bounded trail must hold at least one pose",
            });
        }
        let reserve = match capacity {
            TrailCapacity::Bounded(n) => n.min(MAX_RESERVED_POSES),
            TrailCapacity::Unbounded => 0,
        };
        Ok(Self {
            inner: VecDeque::with_capacity(reserve),
            outer: VecDeque::with_capacity(reserve),
            first_index: 0,
            capacity,
        })
    }

    pub fn capacity(&self) -> TrailCapacity {
        self.capacity
    }

    /// Records `pose` as step `step_index`, which must be the next index.
    pub fn record(&mut self, step_index: usize, pose: &CartesianPose) -> Result<()> {
        let expected = self.next_index();
        if step_index != expected {
            return Err(PendulumError::TrajectoryIndex {
                expected,
                found: step_index,
            });
        }
        self.append(pose);
        Ok(())
    }

    fn append(&mut self, pose: &CartesianPose) {
        if let TrailCapacity::Bounded(limit) = self.capacity {
            while self.inner.len() >= limit {
                self.inner.pop_front();
                self.outer.pop_front();
                self.first_index += 1;
            }
        }
        self.inner.push_back(pose.bob1);
        self.outer.push_back(pose.bob2);
    }

    /// Retained inner and outer points with step index `<= upto_index`.
    pub fn slice(&self, upto_index: usize) -> (Vec<Point2<f64>>, Vec<Point2<f64>>) {
        if upto_index < self.first_index {
            return (Vec::new(), Vec::new());
        }
        let count = (upto_index - self.first_index)
            .saturating_add(1)
            .min(self.inner.len());
        (
            self.inner.iter().take(count).copied().collect(),
            self.outer.iter().take(count).copied().collect(),
        )
    }

    /// Step index of the oldest retained pose.
    pub fn first_index(&self) -> usize {
        self.first_index
    }

    /// Step index the next recorded pose must carry.
    pub fn next_index(&self) -> usize {
        self.first_index + self.inner.len()
    }

    /// Number of retained poses.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn last_pose(&self) -> Option<CartesianPose> {
        Some(CartesianPose {
            bob1: *self.inner.back()?,
            bob2: *self.outer.back()?,
        })
    }

    pub fn inner_trail(&self) -> impl Iterator<Item = &Point2<f64>> {
        self.inner.iter()
    }

    pub fn outer_trail(&self) -> impl Iterator<Item = &Point2<f64>> {
        self.outer.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pose(i: usize) -> CartesianPose {
        let x = i as f64;
        CartesianPose {
            bob1: Point2::new(x, -1.0),
            bob2: Point2::new(x, -2.0),
        }
    }

    fn filled(capacity: TrailCapacity, count: usize) -> Trajectory {
        let mut trajectory = Trajectory::new(capacity).expect("trajectory");
        for i in 0..count {
            trajectory.record(i, &pose(i)).expect("sequential record");
        }
        trajectory
    }

    #[test]
    fn slice_returns_prefix_including_upto_index() {
        let trajectory = filled(TrailCapacity::Unbounded, 5);
        let (inner, outer) = trajectory.slice(2);
        assert_eq!(inner, vec![pose(0).bob1, pose(1).bob1, pose(2).bob1]);
        assert_eq!(outer, vec![pose(0).bob2, pose(1).bob2, pose(2).bob2]);
    }

    #[test]
    fn slice_past_the_end_returns_everything() {
        let trajectory = filled(TrailCapacity::Unbounded, 4);
        let (inner, outer) = trajectory.slice(100);
        assert_eq!(inner.len(), 4);
        assert_eq!(outer.len(), 4);

        let (inner, outer) = trajectory.slice(usize::MAX);
        assert_eq!(inner.len(), 4);
        assert_eq!(outer.len(), 4);

        let bounded = filled(TrailCapacity::Bounded(3), 10);
        assert_eq!(bounded.slice(usize::MAX).0.len(), 3);
    }

    #[test]
    fn record_rejects_out_of_sequence_index() {
        let mut trajectory = filled(TrailCapacity::Unbounded, 2);
        let err = trajectory.record(5, &pose(5)).expect_err("gap should fail");
        assert_eq!(
            err,
            PendulumError::TrajectoryIndex {
                expected: 2,
                found: 5
            }
        );
        assert!(trajectory.record(1, &pose(1)).is_err());
        assert_eq!(trajectory.len(), 2);
    }

    #[test]
    fn bounded_trail_keeps_most_recent_poses() {
        let trajectory = filled(TrailCapacity::Bounded(3), 10);
        assert_eq!(trajectory.len(), 3);
        assert_eq!(trajectory.first_index(), 7);
        assert_eq!(trajectory.next_index(), 10);
        let xs: Vec<f64> = trajectory.inner_trail().map(|p| p.x).collect();
        assert_eq!(xs, vec![7.0, 8.0, 9.0]);
        assert_eq!(trajectory.last_pose(), Some(pose(9)));
    }

    #[test]
    fn bounded_slice_skips_dropped_poses() {
        let trajectory = filled(TrailCapacity::Bounded(3), 10);
        let (inner, _) = trajectory.slice(5);
        assert!(inner.is_empty());
        let (inner, outer) = trajectory.slice(8);
        assert_eq!(inner, vec![pose(7).bob1, pose(8).bob1]);
        assert_eq!(outer.len(), 2);
    }

    #[test]
    fn huge_bounded_capacity_does_not_reserve_up_front() {
        let mut trajectory = Trajectory::new(TrailCapacity::Bounded(usize::MAX)).expect("trajectory");
        for i in 0..5 {
            trajectory.record(i, &pose(i)).expect("sequential record");
        }
        assert_eq!(trajectory.len(), 5);
        assert_eq!(trajectory.capacity(), TrailCapacity::Bounded(usize::MAX));
    }

    #[test]
    fn zero_bounded_capacity_is_rejected() {
        assert!(Trajectory::new(TrailCapacity::Bounded(0)).is_err());
        assert!(Trajectory::default().is_empty());
        assert_eq!(Trajectory::default().last_pose(), None);
    }

    #[test]
    fn capacity_deserializes_from_yaml() {
        let bounded: TrailCapacity = serde_yaml::from_str("!bounded 500").expect("bounded");
        assert_eq!(bounded, TrailCapacity::Bounded(500));
        let unbounded: TrailCapacity = serde_yaml::from_str("unbounded").expect("unbounded");
        assert_eq!(unbounded, TrailCapacity::Unbounded);
    }
}
