//! Integration strategies for advancing a pendulum by one time step.
//!
//! Two interchangeable strategies share the [`State`] representation:
//!
//! - [`IntegrationStrategy::AdaptiveOde`] solves the Lagrangian equations with
//!   the adaptive [`Tsit5`] solver, sampled on the uniform `dt` grid. This is
//!   the reference model.
//! - [`IntegrationStrategy::FixedStepDamped`] is the fast single-evaluation
//!   Euler update with velocity damping. It is cheaper but does not conserve
//!   energy over long horizons.
//!
//! Friction below `1.0` scales both angular velocities by `friction^dt` after
//! every step, for either strategy.

use crate::dynamics::{explicit_accelerations, DoublePendulumSystem};
use crate::error::Result;
use crate::params::PendulumParameters;
use crate::solvers::{SolverStats, Tolerances, Tsit5};
use crate::state::{State, STATE_DIM};
use crate::traits::Steppable;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IntegrationStrategy {
    AdaptiveOde {
        #[serde(default)]
        tolerances: Tolerances,
    },
    FixedStepDamped,
}

impl Default for IntegrationStrategy {
    fn default() -> Self {
        IntegrationStrategy::AdaptiveOde {
            tolerances: Tolerances::default(),
        }
    }
}

/// Semi-implicit Euler update with per-step damping.
///
/// Velocities are advanced first, angles use the advanced (undamped)
/// velocities, and the damping factor is applied last.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DampedEuler {
    damping: f64,
}

impl DampedEuler {
    /// Caches `friction^dt` from `params`.
    pub fn new(params: &PendulumParameters) -> Self {
        Self {
            damping: params.damping_factor(),
        }
    }

    pub fn damping(&self) -> f64 {
        self.damping
    }

    pub fn advance(&self, state: &State, params: &PendulumParameters) -> State {
        let dt = params.dt;
        let (f1, f2) = explicit_accelerations(state, params);
        let omega1 = state.omega1 + dt * f1;
        let omega2 = state.omega2 + dt * f2;
        State {
            theta1: state.theta1 + dt * omega1,
            omega1: omega1 * self.damping,
            theta2: state.theta2 + dt * omega2,
            omega2: omega2 * self.damping,
        }
    }
}

#[derive(Debug, Clone)]
enum Method {
    AdaptiveOde {
        solver: Tsit5<f64>,
        system: DoublePendulumSystem,
        t: f64,
        damping: f64,
    },
    FixedStepDamped(DampedEuler),
}

/// A configured integrator bound to one set of parameters. Holds solver
/// scratch space and, for the adaptive strategy, the step-size proposal
/// carried between steps.
#[derive(Debug, Clone)]
pub struct Integrator {
    params: PendulumParameters,
    method: Method,
}

impl Integrator {
    pub fn new(strategy: IntegrationStrategy, params: &PendulumParameters) -> Result<Self> {
        params.validate()?;
        let method = match strategy {
            IntegrationStrategy::AdaptiveOde { tolerances } => {
                tolerances.validate()?;
                Method::AdaptiveOde {
                    solver: Tsit5::new(STATE_DIM, tolerances),
                    system: DoublePendulumSystem::new(*params),
                    t: 0.0,
                    damping: params.damping_factor(),
                }
            }
            IntegrationStrategy::FixedStepDamped => {
                Method::FixedStepDamped(DampedEuler::new(params))
            }
        };
        debug!(?strategy, dt = params.dt, "Built integrator.");
        Ok(Self {
            params: *params,
            method,
        })
    }

    pub fn params(&self) -> &PendulumParameters {
        &self.params
    }

    pub fn strategy(&self) -> IntegrationStrategy {
        match &self.method {
            Method::AdaptiveOde { solver, .. } => IntegrationStrategy::AdaptiveOde {
                tolerances: solver.tolerances(),
            },
            Method::FixedStepDamped(_) => IntegrationStrategy::FixedStepDamped,
        }
    }

    /// Solver counters for the adaptive strategy.
    pub fn stats(&self) -> Option<SolverStats> {
        match &self.method {
            Method::AdaptiveOde { solver, .. } => Some(solver.stats()),
            Method::FixedStepDamped(_) => None,
        }
    }

    /// Advances `state` by one `dt`.
    pub fn step(&mut self, state: State) -> State {
        match &mut self.method {
            Method::AdaptiveOde {
                solver,
                system,
                t,
                damping,
            } => {
                let mut x = state.to_array();
                solver.step(&*system, t, &mut x, self.params.dt);
                let mut next = State::from_array(x);
                next.omega1 *= *damping;
                next.omega2 *= *damping;
                next
            }
            Method::FixedStepDamped(euler) => euler.advance(&state, &self.params),
        }
    }

    /// States on the grid `0, dt, ..., steps·dt`, starting with `initial`.
    pub fn run(&mut self, initial: State, steps: usize) -> Vec<State> {
        let mut states = Vec::with_capacity(steps.saturating_add(1));
        states.push(initial);
        let mut state = initial;
        for _ in 0..steps {
            state = self.step(state);
            states.push(state);
        }
        states
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamics::derivative;
    use approx::assert_relative_eq;

    fn fixed(params: &PendulumParameters) -> Integrator {
        Integrator::new(IntegrationStrategy::FixedStepDamped, params).expect("fixed integrator")
    }

    fn adaptive(params: &PendulumParameters) -> Integrator {
        Integrator::new(IntegrationStrategy::default(), params).expect("adaptive integrator")
    }

    #[test]
    fn rest_state_is_a_fixed_point_of_both_strategies() {
        let params = PendulumParameters::default();
        for mut integrator in [fixed(&params), adaptive(&params)] {
            let states = integrator.run(State::rest(), 500);
            assert!(states.iter().all(|s| *s == State::rest()));
        }
    }

    #[test]
    fn fixed_step_applies_the_documented_update() {
        let params = PendulumParameters {
            friction: 0.8,
            dt: 0.05,
            ..PendulumParameters::default()
        };
        let state = State::new(0.4, 0.3, -0.2, 0.1);
        let (f1, f2) = explicit_accelerations(&state, &params);
        let omega1 = state.omega1 + params.dt * f1;
        let omega2 = state.omega2 + params.dt * f2;
        let damping = 0.8f64.powf(0.05);

        let next = fixed(&params).step(state);
        assert_eq!(next.theta1, state.theta1 + params.dt * omega1);
        assert_eq!(next.theta2, state.theta2 + params.dt * omega2);
        assert_eq!(next.omega1, omega1 * damping);
        assert_eq!(next.omega2, omega2 * damping);
    }

    #[test]
    fn fixed_step_energy_drift_stays_small() {
        let params = PendulumParameters {
            dt: 0.001,
            ..PendulumParameters::default()
        };
        let initial = State::from_degrees(30.0, 0.0, -20.0, 0.0);
        let e0 = initial.energy(&params);
        let states = fixed(&params).run(initial, 1000);
        let drift = states
            .iter()
            .map(|s| (s.energy(&params) - e0).abs())
            .fold(0.0, f64::max);
        assert!(drift < 0.05, "energy drift {drift}");
    }

    #[test]
    fn adaptive_strategy_conserves_energy() {
        let params = PendulumParameters::default();
        let initial = State::from_degrees(120.0, 0.01, -10.0, 0.0);
        let e0 = initial.energy(&params);
        let mut integrator = adaptive(&params);
        let states = integrator.run(initial, 300);
        for state in &states {
            assert_relative_eq!(state.energy(&params), e0, epsilon = 1e-5);
        }
        let stats = integrator.stats().expect("adaptive stats");
        assert!(stats.accepted >= 300);
    }

    #[test]
    fn damping_drives_velocities_to_zero() {
        let params = PendulumParameters {
            dt: 0.01,
            friction: 0.5,
            ..PendulumParameters::default()
        };
        let initial = State::new(60f64.to_radians(), 1.0, -30f64.to_radians(), -1.0);
        for mut integrator in [fixed(&params), adaptive(&params)] {
            let states = integrator.run(initial, 5000);
            let last = states[states.len() - 1];
            assert!(last.omega1.abs() < 1e-3, "omega1 = {}", last.omega1);
            assert!(last.omega2.abs() < 1e-3, "omega2 = {}", last.omega2);
            assert!(last.energy(&params) < initial.energy(&params));
        }
    }

    #[test]
    fn small_steps_converge_to_the_derivative() {
        let params = PendulumParameters {
            dt: 1e-7,
            ..PendulumParameters::default()
        };
        let state = State::new(0.7, 0.4, -0.9, -1.2);
        let expected = derivative(&state, &params);
        for mut integrator in [fixed(&params), adaptive(&params)] {
            let next = integrator.step(state);
            let rates = [
                (next.theta1 - state.theta1) / params.dt,
                (next.omega1 - state.omega1) / params.dt,
                (next.theta2 - state.theta2) / params.dt,
                (next.omega2 - state.omega2) / params.dt,
            ];
            for (rate, exact) in rates.iter().zip(expected.to_array()) {
                assert_relative_eq!(*rate, exact, epsilon = 1e-4, max_relative = 1e-4);
            }
        }
    }

    #[test]
    fn fixed_step_runs_are_bitwise_reproducible() {
        let params = PendulumParameters::default();
        let initial = State::from_degrees(130.0, 0.01, -10.0, 0.0);
        let a = fixed(&params).run(initial, 400);
        let b = fixed(&params).run(initial, 400);
        assert_eq!(a, b);
    }

    #[test]
    fn run_includes_initial_state() {
        let params = PendulumParameters::default();
        let initial = State::from_degrees(10.0, 0.0, 5.0, 0.0);
        let states = adaptive(&params).run(initial, 3);
        assert_eq!(states.len(), 4);
        assert_eq!(states[0], initial);
    }

    #[test]
    fn construction_rejects_bad_tolerances_and_parameters() {
        let params = PendulumParameters::default();
        let strategy = IntegrationStrategy::AdaptiveOde {
            tolerances: Tolerances {
                rtol: -1.0,
                atol: 1e-9,
            },
        };
        assert!(Integrator::new(strategy, &params).is_err());

        let bad = PendulumParameters {
            l1: 0.0,
            ..params
        };
        assert!(Integrator::new(IntegrationStrategy::FixedStepDamped, &bad).is_err());
    }

    #[test]
    fn integrator_steps_with_its_own_parameters() {
        let damped = PendulumParameters {
            friction: 0.5,
            dt: 0.01,
            ..PendulumParameters::default()
        };
        let state = State::new(0.4, 0.3, -0.2, 0.1);
        for strategy in [IntegrationStrategy::FixedStepDamped, IntegrationStrategy::default()] {
            let mut integrator = Integrator::new(strategy, &damped).expect("integrator");
            assert_eq!(*integrator.params(), damped);
            let mut undamped = Integrator::new(
                strategy,
                &PendulumParameters {
                    friction: 1.0,
                    ..damped
                },
            )
            .expect("integrator");
            let a = integrator.step(state);
            let b = undamped.step(state);
            assert_eq!(a.theta1, b.theta1);
            assert_eq!(a.omega1, b.omega1 * damped.damping_factor());
        }
    }

    #[test]
    fn strategy_is_reported_back() {
        let params = PendulumParameters::default();
        assert_eq!(fixed(&params).strategy(), IntegrationStrategy::FixedStepDamped);
        assert_eq!(adaptive(&params).strategy(), IntegrationStrategy::default());
        assert!(fixed(&params).stats().is_none());
    }

    #[test]
    fn strategy_deserializes_from_tagged_yaml() {
        let fixed: IntegrationStrategy =
            serde_yaml::from_str("kind: fixed_step_damped").expect("fixed strategy");
        assert_eq!(fixed, IntegrationStrategy::FixedStepDamped);

        let adaptive: IntegrationStrategy =
            serde_yaml::from_str("kind: adaptive_ode\ntolerances:\n  rtol: 1.0e-6\n")
                .expect("adaptive strategy");
        match adaptive {
            IntegrationStrategy::AdaptiveOde { tolerances } => {
                assert_eq!(tolerances.rtol, 1e-6);
                assert_eq!(tolerances.atol, crate::solvers::DEFAULT_ATOL);
            }
            other => panic!("unexpected strategy {other:?}"),
        }
    }
}
