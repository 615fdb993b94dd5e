//! The `pendulum_core` crate provides the simulation engine for planar double
//! pendulums. It has no rendering code; consumers read snapshots and trails.
//!
//! Key components:
//! - **Traits**: `Scalar` (numeric type abstraction), `DynamicalSystem` (ODEs), `Steppable` (Solvers).
//! - **Dynamics**: the Lagrangian equations of motion and the kinematic transform.
//! - **Solvers**: the adaptive Tsitouras 5(4) integrator.
//! - **Integrator**: the adaptive and fixed-step damped strategies behind one type.
//! - **Session**: independent pendulums advanced in lock step, with their trails.
//! - **Config**: YAML-driven session setup.
pub mod config;
pub mod dynamics;
pub mod error;
pub mod integrator;
pub mod params;
pub mod pendulum;
pub mod session;
pub mod solvers;
pub mod state;
pub mod traits;
pub mod trajectory;

pub use config::{PendulumSeed, SimulationConfig};
pub use dynamics::{derivative, DoublePendulumSystem};
pub use error::{PendulumError, Result};
pub use integrator::{IntegrationStrategy, Integrator};
pub use params::PendulumParameters;
pub use pendulum::{Pendulum, Snapshot};
pub use session::{Session, SessionOptions};
pub use solvers::Tolerances;
pub use state::{to_cartesian, CartesianPose, State, StateDelta};
pub use trajectory::{TrailCapacity, Trajectory};
