//! Physical parameters of a single double pendulum.

use crate::error::{PendulumError, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_GRAVITY: f64 = 9.8;
pub const DEFAULT_DT: f64 = 0.03;

fn no_friction() -> f64 {
    1.0
}

/// Gravity, link lengths, bob masses, time step and friction of one pendulum.
///
/// Lengths are in metres, masses in kilograms, `dt` in seconds. `friction` is
/// the fraction of angular velocity kept per simulated second; `1.0` disables
/// damping.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PendulumParameters {
    pub g: f64,
    pub l1: f64,
    pub l2: f64,
    pub m1: f64,
    pub m2: f64,
    pub dt: f64,
    #[serde(default = "no_friction")]
    pub friction: f64,
}

impl Default for PendulumParameters {
    fn default() -> Self {
        Self {
            g: DEFAULT_GRAVITY,
            l1: 1.0,
            l2: 1.0,
            m1: 1.0,
            m2: 1.0,
            dt: DEFAULT_DT,
            friction: 1.0,
        }
    }
}

impl PendulumParameters {
    /// Builds undamped parameters and validates them.
    pub fn new(g: f64, l1: f64, l2: f64, m1: f64, m2: f64, dt: f64) -> Result<Self> {
        let params = Self {
            g,
            l1,
            l2,
            m1,
            m2,
            dt,
            friction: 1.0,
        };
        params.validate()?;
        Ok(params)
    }

    /// Returns a copy with the given friction coefficient.
    pub fn with_friction(self, friction: f64) -> Result<Self> {
        let params = Self { friction, ..self };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.g.is_finite() {
            return Err(invalid("g", self.g, "must be finite"));
        }
        for (name, value) in [
            ("l1", self.l1),
            ("l2", self.l2),
            ("m1", self.m1),
            ("m2", self.m2),
            ("dt", self.dt),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(invalid(name, value, "must be positive and finite"));
            }
        }
        if !(self.friction > 0.0 && self.friction <= 1.0) {
            return Err(invalid("friction", self.friction, "must lie in (0, 1]"));
        }
        Ok(())
    }

    /// Multiplicative velocity decay applied once per step, `friction^dt`.
    pub fn damping_factor(&self) -> f64 {
        self.friction.powf(self.dt)
    }

    pub fn total_mass(&self) -> f64 {
        self.m1 + self.m2
    }

    /// Distance from the pivot to the outer bob when both links are aligned.
    pub fn reach(&self) -> f64 {
        self.l1 + self.l2
    }
}

fn invalid(name: &'static str, value: f64, reason: &'static str) -> PendulumError {
    PendulumError::InvalidParameter {
        name,
        value,
        reason,
    }
}
