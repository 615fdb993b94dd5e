use num_traits::{Float, FromPrimitive};
use std::fmt::Debug;

/// A floating point type the pendulum dynamics can be evaluated in.
pub trait Scalar: Float + FromPrimitive + Debug + 'static {}

impl<T: Float + FromPrimitive + Debug + 'static> Scalar for T {}

/// Converts an `f64` constant into `T`.
///
/// Constants that cannot be represented become NaN so they propagate through
/// the state instead of aborting the step.
pub(crate) fn lift<T: Scalar>(value: f64) -> T {
    T::from_f64(value).unwrap_or_else(T::nan)
}

/// An autonomous or time-dependent vector field `dx/dt = f(t, x)`.
pub trait DynamicalSystem<T: Scalar> {
    /// Returns the dimension of the state space.
    fn dimension(&self) -> usize;

    /// Evaluates the vector field at `(t, x)` and writes `dx/dt` into `out`.
    fn apply(&self, t: T, x: &[T], out: &mut [T]);
}

/// A solver that advances a system over one output interval.
pub trait Steppable<T: Scalar> {
    /// Advances `state` from `t` to `t + dt` and updates `t`.
    ///
    /// Adaptive solvers may take several internal steps, but always land on
    /// `t + dt` exactly.
    fn step(&mut self, system: &impl DynamicalSystem<T>, t: &mut T, state: &mut [T], dt: T);
}
