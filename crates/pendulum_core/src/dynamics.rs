//! Equations of motion of the double pendulum.
//!
//! [`derivative`] is the Lagrangian form and the reference truth for the
//! crate. [`explicit_accelerations`] is the trigonometric rearrangement used by
//! the fixed-step integrator; the two agree up to rounding.
//!
//! Neither form guards its denominator. It only vanishes at measure-zero
//! configurations, and NaN/inf are left to propagate through the state.

use crate::params::PendulumParameters;
use crate::state::{State, StateDelta, STATE_DIM};
use crate::traits::{lift, DynamicalSystem, Scalar};

/// The double pendulum as a vector field over `[θ1, ω1, θ2, ω2]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DoublePendulumSystem {
    params: PendulumParameters,
}

impl DoublePendulumSystem {
    pub fn new(params: PendulumParameters) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &PendulumParameters {
        &self.params
    }
}

impl<T: Scalar> DynamicalSystem<T> for DoublePendulumSystem {
    fn dimension(&self) -> usize {
        STATE_DIM
    }

    fn apply(&self, _t: T, x: &[T], out: &mut [T]) {
        let g: T = lift(self.params.g);
        let l1: T = lift(self.params.l1);
        let l2: T = lift(self.params.l2);
        let m1: T = lift(self.params.m1);
        let m2: T = lift(self.params.m2);
        let total = m1 + m2;

        let (theta1, omega1, theta2, omega2) = (x[0], x[1], x[2], x[3]);
        let (sin_d, cos_d) = (theta2 - theta1).sin_cos();

        let den1 = total * l1 - m2 * l1 * cos_d * cos_d;
        let num1 = m2 * l1 * omega1 * omega1 * sin_d * cos_d
            + m2 * g * theta2.sin() * cos_d
            + m2 * l2 * omega2 * omega2 * sin_d
            - total * g * theta1.sin();

        let den2 = (l2 / l1) * den1;
        let num2 = -m2 * l2 * omega2 * omega2 * sin_d * cos_d
            + total * g * theta1.sin() * cos_d
            - total * l1 * omega1 * omega1 * sin_d
            - total * g * theta2.sin();

        out[0] = omega1;
        out[1] = num1 / den1;
        out[2] = omega2;
        out[3] = num2 / den2;
    }
}

/// Rate of change of `state` under the Lagrangian equations of motion.
pub fn derivative(state: &State, params: &PendulumParameters) -> StateDelta {
    let mut out = [0.0; STATE_DIM];
    let system = DoublePendulumSystem::new(*params);
    DynamicalSystem::<f64>::apply(&system, 0.0, &state.to_array(), &mut out);
    StateDelta::from_array(out)
}

/// Angular accelerations `(dω1/dt, dω2/dt)` in the form used by the
/// fixed-step integrator.
pub fn explicit_accelerations(state: &State, params: &PendulumParameters) -> (f64, f64) {
    let PendulumParameters { g, l1, l2, m1, m2, .. } = *params;
    let State {
        theta1,
        omega1,
        theta2,
        omega2,
    } = *state;
    let diff = theta1 - theta2;
    let (sin_diff, cos_diff) = diff.sin_cos();
    let common = 2.0 * m1 + m2 - m2 * (2.0 * theta1 - 2.0 * theta2).cos();

    let f1 = (-g * (2.0 * m1 + m2) * theta1.sin()
        - m2 * g * (theta1 - 2.0 * theta2).sin()
        - 2.0 * sin_diff * m2 * (omega2 * omega2 * l2 + omega1 * omega1 * l1 * cos_diff))
        / (l1 * common);

    let f2 = 2.0
        * sin_diff
        * (omega1 * omega1 * l1 * (m1 + m2)
            + g * (m1 + m2) * theta1.cos()
            + omega2 * omega2 * l2 * m2 * cos_diff)
        / (l2 * common);

    (f1, f2)
}
