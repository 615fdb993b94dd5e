//! Pendulum state, its time derivative, and the kinematic transform.
//!
//! Angles are measured from the downward vertical and are never wrapped; the
//! trigonometric functions take care of periodicity.

use crate::params::PendulumParameters;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// Number of scalar components in a [`State`].
pub const STATE_DIM: usize = 4;

/// Angles (rad) and angular velocities (rad/s) of both links.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct State {
    pub theta1: f64,
    pub omega1: f64,
    pub theta2: f64,
    pub omega2: f64,
}

/// Time derivative of a [`State`], component for component.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct StateDelta {
    pub dtheta1: f64,
    pub domega1: f64,
    pub dtheta2: f64,
    pub domega2: f64,
}

impl State {
    pub fn new(theta1: f64, omega1: f64, theta2: f64, omega2: f64) -> Self {
        Self {
            theta1,
            omega1,
            theta2,
            omega2,
        }
    }

    /// Builds a state from angles in degrees and angular velocities in
    /// degrees per second.
    pub fn from_degrees(theta1: f64, omega1: f64, theta2: f64, omega2: f64) -> Self {
        Self::new(
            theta1.to_radians(),
            omega1.to_radians(),
            theta2.to_radians(),
            omega2.to_radians(),
        )
    }

    /// Both links hanging straight down, motionless.
    pub fn rest() -> Self {
        Self::default()
    }

    /// Flat `[θ1, ω1, θ2, ω2]` layout used by the generic solvers.
    pub fn to_array(&self) -> [f64; STATE_DIM] {
        [self.theta1, self.omega1, self.theta2, self.omega2]
    }

    pub fn from_array(values: [f64; STATE_DIM]) -> Self {
        Self::new(values[0], values[1], values[2], values[3])
    }

    pub fn is_finite(&self) -> bool {
        self.to_array().iter().all(|v| v.is_finite())
    }

    pub fn to_cartesian(&self, params: &PendulumParameters) -> CartesianPose {
        to_cartesian(self, params)
    }

    /// Total mechanical energy (kinetic plus gravitational potential, with the
    /// pivot as the potential reference).
    ///
    /// The coupling term is `m2·l1·l2·ω1·ω2·cos(θ1 − θ2)` with no `½` factor;
    /// halving it gives a quantity the equations of motion do not conserve.
    pub fn energy(&self, params: &PendulumParameters) -> f64 {
        let PendulumParameters { g, l1, l2, m1, m2, .. } = *params;
        let total = m1 + m2;
        let kinetic = 0.5 * total * l1 * l1 * self.omega1 * self.omega1
            + 0.5 * m2 * l2 * l2 * self.omega2 * self.omega2
            + m2 * l1 * l2 * self.omega1 * self.omega2 * (self.theta1 - self.theta2).cos();
        let potential = -total * g * l1 * self.theta1.cos() - m2 * g * l2 * self.theta2.cos();
        kinetic + potential
    }
}

impl StateDelta {
    pub fn to_array(&self) -> [f64; STATE_DIM] {
        [self.dtheta1, self.domega1, self.dtheta2, self.domega2]
    }

    pub fn from_array(values: [f64; STATE_DIM]) -> Self {
        Self {
            dtheta1: values[0],
            domega1: values[1],
            dtheta2: values[2],
            domega2: values[3],
        }
    }
}

/// Bob positions derived from a [`State`].
///
/// The pivot sits at the origin and gravity points towards negative `y`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CartesianPose {
    pub bob1: Point2<f64>,
    pub bob2: Point2<f64>,
}

impl CartesianPose {
    pub fn is_finite(&self) -> bool {
        [self.bob1.x, self.bob1.y, self.bob2.x, self.bob2.y]
            .iter()
            .all(|v| v.is_finite())
    }

    /// Maps the pose into a y-down screen frame with the pivot at `center`
    /// and `scale` pixels per metre.
    pub fn to_screen(&self, center: Point2<f64>, scale: f64) -> CartesianPose {
        let map = |p: Point2<f64>| Point2::new(center.x + p.x * scale, center.y - p.y * scale);
        CartesianPose {
            bob1: map(self.bob1),
            bob2: map(self.bob2),
        }
    }
}

/// Kinematic transform from joint angles to bob positions.
pub fn to_cartesian(state: &State, params: &PendulumParameters) -> CartesianPose {
    let x1 = params.l1 * state.theta1.sin();
    let y1 = -params.l1 * state.theta1.cos();
    let x2 = params.l2 * state.theta2.sin() + x1;
    let y2 = -params.l2 * state.theta2.cos() + y1;
    CartesianPose {
        bob1: Point2::new(x1, y1),
        bob2: Point2::new(x2, y2),
    }
}
