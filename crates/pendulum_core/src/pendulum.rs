//! A single pendulum: parameters, current state, trail and integrator.

use crate::error::Result;
use crate::integrator::{IntegrationStrategy, Integrator};
use crate::params::PendulumParameters;
use crate::state::{CartesianPose, State};
use crate::trajectory::{TrailCapacity, Trajectory};
use serde::Serialize;
use tracing::{debug, warn};

/// State and bob positions of one pendulum after a step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Snapshot {
    pub state: State,
    pub pose: CartesianPose,
}

impl Snapshot {
    /// True once NaN or infinity has entered the state.
    pub fn is_degenerate(&self) -> bool {
        !self.state.is_finite()
    }
}

#[derive(Debug, Clone)]
pub struct Pendulum {
    params: PendulumParameters,
    initial: State,
    state: State,
    steps: usize,
    trajectory: Trajectory,
    integrator: Integrator,
}

impl Pendulum {
    /// Validates the parameters and records the initial pose as step 0.
    pub fn new(
        params: PendulumParameters,
        initial: State,
        strategy: IntegrationStrategy,
        trail: TrailCapacity,
    ) -> Result<Self> {
        params.validate()?;
        let integrator = Integrator::new(strategy, &params)?;
        let mut trajectory = Trajectory::new(trail)?;
        trajectory.record(0, &initial.to_cartesian(&params))?;
        debug!(?params, ?initial, "Created pendulum.");
        Ok(Self {
            params,
            initial,
            state: initial,
            steps: 0,
            trajectory,
            integrator,
        })
    }

    /// Advances by one `dt` and appends the new pose to the trail.
    pub fn step(&mut self) -> Snapshot {
        self.state = self.integrator.step(self.state);
        self.steps += 1;
        let pose = self.state.to_cartesian(&self.params);
        if let Err(err) = self.trajectory.record(self.steps, &pose) {
            warn!(%err, step = self.steps, "Pose was not recorded in the trail.");
        }
        Snapshot {
            state: self.state,
            pose,
        }
    }

    pub fn params(&self) -> &PendulumParameters {
        &self.params
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Steps taken since construction.
    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn initial_state(&self) -> State {
        self.initial
    }

    pub fn pose(&self) -> CartesianPose {
        self.state.to_cartesian(&self.params)
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            state: self.state,
            pose: self.pose(),
        }
    }

    pub fn trajectory(&self) -> &Trajectory {
        &self.trajectory
    }

    pub fn integrator(&self) -> &Integrator {
        &self.integrator
    }

    pub fn strategy(&self) -> IntegrationStrategy {
        self.integrator.strategy()
    }

    /// Parameters and initial conditions (degrees) joined with `_` in
    /// scientific notation, suitable as an export file stem.
    pub fn parameter_signature(&self) -> String {
        let p = &self.params;
        let s = &self.initial;
        [
            p.g,
            p.l1,
            p.l2,
            p.m1,
            p.m2,
            p.dt,
            s.theta1.to_degrees(),
            s.omega1.to_degrees(),
            s.theta2.to_degrees(),
            s.omega2.to_degrees(),
        ]
        .iter()
        .map(|v| format!("{v:.1e}"))
        .collect::<Vec<_>>()
        .join("_")
    }
}
