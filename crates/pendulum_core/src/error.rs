//! Error types for the simulation core.

use thiserror::Error;

/// Errors raised while building pendulums and sessions.
///
/// Numeric degeneration (NaN/inf in the state) is not an error: it is
/// carried through [`State`](crate::state::State) values and reported on each
/// [`Snapshot`](crate::pendulum::Snapshot) instead.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PendulumError {
    #[error("Invalid parameter `{name}` = {value}: {reason}.")]
    InvalidParameter {
        name: &'static str,
        value: f64,
        reason: &'static str,
    },

    #[error("Invalid solver tolerance `{name}` = {value}: must be positive and finite.")]
    InvalidTolerance { name: &'static str, value: f64 },

    #[error("Pendulum {index} uses dt = {found}, but the session steps with dt = {expected}.")]
    MismatchedTimeStep {
        index: usize,
        expected: f64,
        found: f64,
    },

    #[error("A session needs at least one pendulum.")]
    EmptySession,

    #[error("Trajectory expected step {expected}, got step {found}.")]
    TrajectoryIndex { expected: usize, found: usize },
}

pub type Result<T> = std::result::Result<T, PendulumError>;
