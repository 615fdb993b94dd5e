//! Adaptive Tsitouras 5(4) solver.
//!
//! Each call to [`Steppable::step`] covers one output interval `[t, t + dt]`
//! with as many internal steps as the error controller needs. The last
//! internal step is clipped so the solution lands exactly on `t + dt`, and the
//! unclipped step-size proposal carries over to the next interval. This is how
//! solutions are resampled onto a uniform output grid.

use crate::error::{PendulumError, Result};
use crate::traits::{lift, DynamicalSystem, Scalar, Steppable};
use serde::{Deserialize, Serialize};
use tracing::warn;

pub const DEFAULT_RTOL: f64 = 1e-8;
pub const DEFAULT_ATOL: f64 = 1e-10;

fn default_rtol() -> f64 {
    DEFAULT_RTOL
}

fn default_atol() -> f64 {
    DEFAULT_ATOL
}

/// Mixed error tolerance: each component must satisfy
/// `|err_i| <= atol + rtol * max(|y_i|, |y_new_i|)` in the RMS sense.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tolerances {
    #[serde(default = "default_rtol")]
    pub rtol: f64,
    #[serde(default = "default_atol")]
    pub atol: f64,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            rtol: DEFAULT_RTOL,
            atol: DEFAULT_ATOL,
        }
    }
}

impl Tolerances {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [("rtol", self.rtol), ("atol", self.atol)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(PendulumError::InvalidTolerance { name, value });
            }
        }
        Ok(())
    }
}

/// Step-size controller settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepControl {
    pub safety: f64,
    pub min_factor: f64,
    pub max_factor: f64,
    /// Steps at or below this size are accepted regardless of their error.
    pub min_step: f64,
    /// Attempts per output interval before the remainder is taken in one step.
    pub max_steps: usize,
}

impl Default for StepControl {
    fn default() -> Self {
        Self {
            safety: 0.9,
            min_factor: 0.2,
            max_factor: 5.0,
            min_step: 1e-12,
            max_steps: 10_000,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SolverStats {
    pub fn_evals: u64,
    pub accepted: u64,
    pub rejected: u64,
}

// Tsitouras 5(4) tableau. The fifth-order weights equal the last stage row
// (first same as last), and `E*` are the embedded error weights.
const C2: f64 = 0.161;
const C3: f64 = 0.327;
const C4: f64 = 0.9;
const C5: f64 = 0.9800255409045097;

const A21: f64 = 0.161;
const A31: f64 = -0.008480655492356989;
const A32: f64 = 0.335480655492357;
const A41: f64 = 2.897153057105493;
const A42: f64 = -6.359448489975075;
const A43: f64 = 4.3622954328695815;
const A51: f64 = 5.325864828439257;
const A52: f64 = -11.748883564062828;
const A53: f64 = 7.4955393428898365;
const A54: f64 = -0.09249506636175525;
const A61: f64 = 5.86145544294642;
const A62: f64 = -12.92096931784711;
const A63: f64 = 8.159367898576159;
const A64: f64 = -0.071584973281401;
const A65: f64 = -0.028269050394068383;

const B1: f64 = 0.09646076681806523;
const B2: f64 = 0.01;
const B3: f64 = 0.4798896504144996;
const B4: f64 = 1.379008574103742;
const B5: f64 = -3.290069515436081;
const B6: f64 = 2.324710524099774;

const E1: f64 = -0.0017800110522257772;
const E2: f64 = -0.0008164344596567469;
const E3: f64 = 0.007880878010261995;
const E4: f64 = -0.1447110071732629;
const E5: f64 = 0.5823571654525552;
const E6: f64 = -0.45808210592918697;
const E7: f64 = 1.0 / 66.0;

/// Tsitouras 5(4) with embedded error estimation and step-size control.
#[derive(Debug, Clone)]
pub struct Tsit5<T: Scalar> {
    k1: Vec<T>,
    k2: Vec<T>,
    k3: Vec<T>,
    k4: Vec<T>,
    k5: Vec<T>,
    k6: Vec<T>,
    k7: Vec<T>,
    tmp: Vec<T>,
    y_new: Vec<T>,
    tolerances: Tolerances,
    control: StepControl,
    next_step: Option<T>,
    stats: SolverStats,
}

impl<T: Scalar> Tsit5<T> {
    pub fn new(dim: usize, tolerances: Tolerances) -> Self {
        let z = T::zero();
        Self {
            k1: vec![z; dim],
            k2: vec![z; dim],
            k3: vec![z; dim],
            k4: vec![z; dim],
            k5: vec![z; dim],
            k6: vec![z; dim],
            k7: vec![z; dim],
            tmp: vec![z; dim],
            y_new: vec![z; dim],
            tolerances,
            control: StepControl::default(),
            next_step: None,
            stats: SolverStats::default(),
        }
    }

    pub fn with_control(mut self, control: StepControl) -> Self {
        self.control = control;
        self
    }

    pub fn tolerances(&self) -> Tolerances {
        self.tolerances
    }

    pub fn stats(&self) -> SolverStats {
        self.stats
    }

    /// Internal step size the next interval will start with.
    pub fn proposed_step(&self) -> Option<T> {
        self.next_step
    }

    /// Evaluates stages 2..=7 from `k1`, writing the fifth-order solution to
    /// `y_new` and its derivative to `k7`.
    fn stages(&mut self, system: &impl DynamicalSystem<T>, t0: T, state: &[T], h: T) {
        let n = state.len();

        for i in 0..n {
            self.tmp[i] = state[i] + h * (lift::<T>(A21) * self.k1[i]);
        }
        system.apply(t0 + lift::<T>(C2) * h, &self.tmp, &mut self.k2);

        for i in 0..n {
            self.tmp[i] =
                state[i] + h * (lift::<T>(A31) * self.k1[i] + lift::<T>(A32) * self.k2[i]);
        }
        system.apply(t0 + lift::<T>(C3) * h, &self.tmp, &mut self.k3);

        for i in 0..n {
            self.tmp[i] = state[i]
                + h * (lift::<T>(A41) * self.k1[i]
                    + lift::<T>(A42) * self.k2[i]
                    + lift::<T>(A43) * self.k3[i]);
        }
        system.apply(t0 + lift::<T>(C4) * h, &self.tmp, &mut self.k4);

        for i in 0..n {
            self.tmp[i] = state[i]
                + h * (lift::<T>(A51) * self.k1[i]
                    + lift::<T>(A52) * self.k2[i]
                    + lift::<T>(A53) * self.k3[i]
                    + lift::<T>(A54) * self.k4[i]);
        }
        system.apply(t0 + lift::<T>(C5) * h, &self.tmp, &mut self.k5);

        for i in 0..n {
            self.tmp[i] = state[i]
                + h * (lift::<T>(A61) * self.k1[i]
                    + lift::<T>(A62) * self.k2[i]
                    + lift::<T>(A63) * self.k3[i]
                    + lift::<T>(A64) * self.k4[i]
                    + lift::<T>(A65) * self.k5[i]);
        }
        system.apply(t0 + h, &self.tmp, &mut self.k6);

        for i in 0..n {
            self.y_new[i] = state[i]
                + h * (lift::<T>(B1) * self.k1[i]
                    + lift::<T>(B2) * self.k2[i]
                    + lift::<T>(B3) * self.k3[i]
                    + lift::<T>(B4) * self.k4[i]
                    + lift::<T>(B5) * self.k5[i]
                    + lift::<T>(B6) * self.k6[i]);
        }
        system.apply(t0 + h, &self.y_new, &mut self.k7);

        self.stats.fn_evals += 6;
    }

    /// RMS of the embedded error estimate scaled by the tolerances.
    fn error_norm(&self, state: &[T], h: T) -> T {
        let atol: T = lift(self.tolerances.atol);
        let rtol: T = lift(self.tolerances.rtol);
        let mut sum = T::zero();
        for i in 0..state.len() {
            let err = h
                * (lift::<T>(E1) * self.k1[i]
                    + lift::<T>(E2) * self.k2[i]
                    + lift::<T>(E3) * self.k3[i]
                    + lift::<T>(E4) * self.k4[i]
                    + lift::<T>(E5) * self.k5[i]
                    + lift::<T>(E6) * self.k6[i]
                    + lift::<T>(E7) * self.k7[i]);
            let scale = atol + rtol * state[i].abs().max(self.y_new[i].abs());
            let ratio = err / scale;
            sum = sum + ratio * ratio;
        }
        (sum / lift(state.len() as f64)).sqrt()
    }

    fn step_factor(&self, err: T) -> T {
        if !err.is_finite() {
            return T::one();
        }
        let max_factor: T = lift(self.control.max_factor);
        if err == T::zero() {
            return max_factor;
        }
        let factor = lift::<T>(self.control.safety) * err.powf(lift(-0.2));
        factor.max(lift(self.control.min_factor)).min(max_factor)
    }
}

impl<T: Scalar> Steppable<T> for Tsit5<T> {
    fn step(&mut self, system: &impl DynamicalSystem<T>, t: &mut T, state: &mut [T], dt: T) {
        let t_end = *t + dt;
        let min_step: T = lift(self.control.min_step);
        let mut h = self.next_step.unwrap_or(dt).max(min_step);
        let mut attempts = 0usize;

        system.apply(*t, state, &mut self.k1);
        self.stats.fn_evals += 1;

        while *t < t_end {
            let remaining = t_end - *t;
            let exhausted = attempts >= self.control.max_steps;
            let clipped = exhausted || h >= remaining;
            let h_try = if clipped { remaining } else { h };
            attempts += 1;

            self.stages(system, *t, state, h_try);
            let err = self.error_norm(state, h_try);
            let factor = self.step_factor(err);

            if exhausted {
                warn!(
                    attempts,
                    error = ?err,
                    "Adaptive solver exhausted its step budget; forcing the rest of the interval."
                );
            }

            let accept = err <= T::one() || !err.is_finite() || h_try <= min_step || exhausted;
            if accept {
                state.copy_from_slice(&self.y_new);
                std::mem::swap(&mut self.k1, &mut self.k7);
                self.stats.accepted += 1;
                if clipped {
                    *t = t_end;
                } else {
                    *t = *t + h_try;
                    h = (h_try * factor).max(min_step);
                }
            } else {
                self.stats.rejected += 1;
                h = (h_try * factor).max(min_step);
            }
        }

        self.next_step = Some(h);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    struct Decay;

    impl DynamicalSystem<f64> for Decay {
        fn dimension(&self) -> usize {
            1
        }

        fn apply(&self, _t: f64, x: &[f64], out: &mut [f64]) {
            out[0] = -x[0];
        }
    }

    struct Oscillator;

    impl DynamicalSystem<f64> for Oscillator {
        fn dimension(&self) -> usize {
            2
        }

        fn apply(&self, _t: f64, x: &[f64], out: &mut [f64]) {
            out[0] = x[1];
            out[1] = -x[0];
        }
    }

    struct Poisoned;

    impl DynamicalSystem<f64> for Poisoned {
        fn dimension(&self) -> usize {
            1
        }

        fn apply(&self, _t: f64, _x: &[f64], out: &mut [f64]) {
            out[0] = f64::NAN;
        }
    }

    #[test]
    fn tableau_weights_are_consistent() {
        let b = B1 + B2 + B3 + B4 + B5 + B6;
        let e = E1 + E2 + E3 + E4 + E5 + E6 + E7;
        assert_relative_eq!(b, 1.0, epsilon = 1e-12);
        assert!(e.abs() < 1e-12);
        assert_relative_eq!(A61 + A62 + A63 + A64 + A65, 1.0, epsilon = 1e-12);
        assert_relative_eq!(A51 + A52 + A53 + A54, C5, epsilon = 1e-12);
    }

    #[test]
    fn exponential_decay_over_one_interval() {
        let mut solver = Tsit5::new(1, Tolerances::default());
        let mut t = 0.0;
        let mut state = [1.0];
        solver.step(&Decay, &mut t, &mut state, 1.0);

        assert_eq!(t, 1.0);
        assert_relative_eq!(state[0], (-1.0f64).exp(), epsilon = 1e-8);
        let stats = solver.stats();
        assert!(stats.accepted >= 1);
        assert_eq!(stats.fn_evals, 1 + 6 * (stats.accepted + stats.rejected));
    }

    #[test]
    fn oscillator_follows_cosine_on_uniform_grid() {
        let mut solver = Tsit5::new(2, Tolerances::default());
        let mut t = 0.0;
        let mut state = [1.0, 0.0];
        for n in 1..=50 {
            solver.step(&Oscillator, &mut t, &mut state, 0.1);
            let expected_t = n as f64 * 0.1;
            assert_relative_eq!(t, expected_t, epsilon = 1e-12);
            assert_relative_eq!(state[0], t.cos(), epsilon = 1e-7);
            assert_relative_eq!(state[1], -t.sin(), epsilon = 1e-7);
        }
    }

    #[test]
    fn step_size_proposal_carries_between_intervals() {
        let mut solver = Tsit5::new(2, Tolerances::default());
        assert!(solver.proposed_step().is_none());
        let mut t = 0.0;
        let mut state = [1.0, 0.0];
        solver.step(&Oscillator, &mut t, &mut state, 0.5);
        let proposal = solver.proposed_step().expect("proposal after a step");
        assert!(proposal > 0.0);
    }

    #[test]
    fn looser_tolerance_needs_fewer_evaluations() {
        let run = |tolerances: Tolerances| {
            let mut solver = Tsit5::new(2, tolerances);
            let mut t = 0.0;
            let mut state = [1.0, 0.0];
            for _ in 0..20 {
                solver.step(&Oscillator, &mut t, &mut state, 0.5);
            }
            solver.stats().fn_evals
        };
        let tight = run(Tolerances {
            rtol: 1e-12,
            atol: 1e-12,
        });
        let loose = run(Tolerances {
            rtol: 1e-4,
            atol: 1e-6,
        });
        assert!(loose < tight, "loose = {loose}, tight = {tight}");
    }

    #[test]
    fn non_finite_derivative_propagates_without_stalling() {
        let mut solver = Tsit5::new(1, Tolerances::default());
        let mut t = 0.0;
        let mut state = [1.0];
        solver.step(&Poisoned, &mut t, &mut state, 0.25);
        assert_eq!(t, 0.25);
        assert!(state[0].is_nan());
        assert_eq!(solver.stats().accepted, 1);
    }

    #[test]
    fn exhausted_budget_still_reaches_interval_end() {
        let control = StepControl {
            max_steps: 2,
            ..StepControl::default()
        };
        let mut solver = Tsit5::new(2, Tolerances {
            rtol: 1e-14,
            atol: 1e-14,
        })
        .with_control(control);
        let mut t = 0.0;
        let mut state = [1.0, 0.0];
        solver.step(&Oscillator, &mut t, &mut state, 5.0);
        assert_eq!(t, 5.0);
        assert!(state.iter().all(|v| v.is_finite()));
        assert!(solver.stats().accepted + solver.stats().rejected <= 3);
    }

    #[test]
    fn tolerances_must_be_positive() {
        assert!(Tolerances::default().validate().is_ok());
        let err = Tolerances {
            rtol: 0.0,
            atol: 1e-9,
        }
        .validate()
        .expect_err("zero rtol");
        assert!(format!("{err}").contains("rtol"));
        assert!(Tolerances {
            rtol: 1e-6,
            atol: f64::NAN,
        }
        .validate()
        .is_err());
    }
}
