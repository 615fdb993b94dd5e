//! Simulation configuration loaded from YAML.
//!
//! ```yaml
//! duration: 20.0
//! dt: 0.03
//! strategy:
//!   kind: fixed_step_damped
//! trail: !bounded 400
//! pendulums:
//!   - { theta1: 120.0, omega1: 0.01, theta2: -10.0 }
//!   - { l2: 0.5, friction: 0.8, theta1: 130.0, theta2: -10.0 }
//! ```
//!
//! Angles are given in degrees and angular velocities in degrees per second.
//! Omitted lengths and masses default to `1.0`.

use crate::error::Result as CoreResult;
use crate::integrator::IntegrationStrategy;
use crate::params::{PendulumParameters, DEFAULT_DT, DEFAULT_GRAVITY};
use crate::session::{Session, SessionOptions};
use crate::state::State;
use crate::trajectory::TrailCapacity;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;

pub const DEFAULT_DURATION: f64 = 20.0;

fn default_duration() -> f64 {
    DEFAULT_DURATION
}

fn default_dt() -> f64 {
    DEFAULT_DT
}

fn default_gravity() -> f64 {
    DEFAULT_GRAVITY
}

fn unit() -> f64 {
    1.0
}

/// Physical setup and initial conditions of one pendulum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendulumSeed {
    #[serde(default = "unit")]
    pub l1: f64,
    #[serde(default = "unit")]
    pub l2: f64,
    #[serde(default = "unit")]
    pub m1: f64,
    #[serde(default = "unit")]
    pub m2: f64,
    #[serde(default = "unit")]
    pub friction: f64,
    /// Overrides the session-wide gravity for this pendulum.
    #[serde(default)]
    pub gravity: Option<f64>,
    #[serde(default)]
    pub theta1: f64,
    #[serde(default)]
    pub omega1: f64,
    #[serde(default)]
    pub theta2: f64,
    #[serde(default)]
    pub omega2: f64,
}

impl PendulumSeed {
    /// Unit lengths and masses, no friction, starting from the given angles
    /// in degrees.
    pub fn at_angles(theta1: f64, theta2: f64) -> Self {
        Self {
            l1: 1.0,
            l2: 1.0,
            m1: 1.0,
            m2: 1.0,
            friction: 1.0,
            gravity: None,
            theta1,
            omega1: 0.0,
            theta2,
            omega2: 0.0,
        }
    }

    pub fn initial_state(&self) -> State {
        State::from_degrees(self.theta1, self.omega1, self.theta2, self.omega2)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Simulated seconds to precompute.
    #[serde(default = "default_duration")]
    pub duration: f64,
    #[serde(default = "default_dt")]
    pub dt: f64,
    #[serde(default = "default_gravity")]
    pub gravity: f64,
    #[serde(default)]
    pub strategy: IntegrationStrategy,
    #[serde(default)]
    pub trail: TrailCapacity,
    pub pendulums: Vec<PendulumSeed>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self::reference()
    }
}

impl SimulationConfig {
    /// Two unit pendulums released 10 degrees apart, integrated for 20 s.
    pub fn reference() -> Self {
        Self {
            duration: DEFAULT_DURATION,
            dt: DEFAULT_DT,
            gravity: DEFAULT_GRAVITY,
            strategy: IntegrationStrategy::default(),
            trail: TrailCapacity::Unbounded,
            pendulums: vec![
                PendulumSeed {
                    omega1: 0.01,
                    ..PendulumSeed::at_angles(120.0, -10.0)
                },
                PendulumSeed {
                    omega1: 0.01,
                    ..PendulumSeed::at_angles(130.0, -10.0)
                },
            ],
        }
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let config: SimulationConfig =
            serde_yaml::from_str(text).context("Failed to parse simulation config.")?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("Failed to open config file {}.", path.display()))?;
        let config: SimulationConfig = serde_yaml::from_reader(file)
            .with_context(|| format!("Failed to parse config file {}.", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.duration.is_finite() || self.duration <= 0.0 {
            bail!("duration must be positive, got {}.", self.duration);
        }
        if self.pendulums.is_empty() {
            bail!("Config must list at least one pendulum.");
        }
        for (index, params) in self.parameters().into_iter().enumerate() {
            params
                .validate()
                .with_context(|| format!("Invalid parameters for pendulum {index}."))?;
        }
        Ok(())
    }

    fn parameters(&self) -> Vec<PendulumParameters> {
        self.pendulums
            .iter()
            .map(|seed| PendulumParameters {
                g: seed.gravity.unwrap_or(self.gravity),
                l1: seed.l1,
                l2: seed.l2,
                m1: seed.m1,
                m2: seed.m2,
                dt: self.dt,
                friction: seed.friction,
            })
            .collect()
    }

    /// `(parameters, initial state)` pairs in declaration order.
    pub fn seeds(&self) -> CoreResult<Vec<(PendulumParameters, State)>> {
        self.parameters()
            .into_iter()
            .zip(&self.pendulums)
            .map(|(params, seed)| {
                params.validate()?;
                Ok((params, seed.initial_state()))
            })
            .collect()
    }

    pub fn options(&self) -> SessionOptions {
        SessionOptions {
            strategy: self.strategy,
            trail: self.trail,
        }
    }

    /// Ticks needed to cover `duration`.
    pub fn total_steps(&self) -> usize {
        Session::steps_for_duration(self.duration, self.dt)
    }

    pub fn build_session(&self) -> Result<Session> {
        let seeds = self.seeds().context("Invalid pendulum parameters.")?;
        Session::new(seeds, self.options()).context("Failed to build simulation session.")
    }
}
