//! Drives a set of independent pendulums through a shared time grid.

use crate::error::{PendulumError, Result};
use crate::integrator::IntegrationStrategy;
use crate::params::PendulumParameters;
use crate::pendulum::{Pendulum, Snapshot};
use crate::state::State;
use crate::trajectory::TrailCapacity;
use nalgebra::Point2;
use tracing::{debug, trace, warn};

/// Strategy and trail settings shared by every pendulum of a session.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SessionOptions {
    pub strategy: IntegrationStrategy,
    pub trail: TrailCapacity,
}

/// An ordered set of pendulums advanced in lock step.
///
/// Pendulums never interact; the only shared quantity is `dt`. Iteration
/// order matches the seed order and is stable for the session's lifetime.
#[derive(Debug, Clone)]
pub struct Session {
    pendulums: Vec<Pendulum>,
    degenerate: Vec<bool>,
    step_count: usize,
    dt: f64,
}

impl Session {
    /// Builds a session from `(parameters, initial state)` seeds. Every seed
    /// must share the same `dt`.
    pub fn new(seeds: Vec<(PendulumParameters, State)>, options: SessionOptions) -> Result<Self> {
        let dt = match seeds.first() {
            Some((params, _)) => params.dt,
            None => return Err(PendulumError::EmptySession),
        };

        let mut pendulums = Vec::with_capacity(seeds.len());
        for (index, (params, initial)) in seeds.into_iter().enumerate() {
            params.validate()?;
            if params.dt != dt {
                return Err(PendulumError::MismatchedTimeStep {
                    index,
                    expected: dt,
                    found: params.dt,
                });
            }
            pendulums.push(Pendulum::new(
                params,
                initial,
                options.strategy,
                options.trail,
            )?);
        }

        debug!(
            pendulums = pendulums.len(),
            dt,
            strategy = ?options.strategy,
            trail = ?options.trail,
            "Created simulation session."
        );

        Ok(Self {
            degenerate: vec![false; pendulums.len()],
            pendulums,
            step_count: 0,
            dt,
        })
    }

    /// Number of ticks needed to sample `[0, duration)` on a `dt` grid,
    /// excluding the initial sample.
    pub fn steps_for_duration(duration: f64, dt: f64) -> usize {
        if !duration.is_finite() || !dt.is_finite() || duration <= 0.0 || dt <= 0.0 {
            return 0;
        }
        let samples = (duration / dt).ceil() as usize;
        samples.saturating_sub(1)
    }

    /// Advances every pendulum by one step and returns their snapshots in
    /// seed order.
    pub fn tick(&mut self) -> Vec<Snapshot> {
        self.step_count += 1;
        let mut snapshots = Vec::with_capacity(self.pendulums.len());
        for (index, pendulum) in self.pendulums.iter_mut().enumerate() {
            let snapshot = pendulum.step();
            if snapshot.is_degenerate() && !self.degenerate[index] {
                self.degenerate[index] = true;
                warn!(
                    pendulum = index,
                    step = self.step_count,
                    state = ?snapshot.state,
                    "Pendulum state became non-finite."
                );
            }
            snapshots.push(snapshot);
        }
        trace!(step = self.step_count, "Tick.");
        snapshots
    }

    /// Ticks `n_steps` times and collects every snapshot.
    pub fn run(&mut self, n_steps: usize) -> Vec<Vec<Snapshot>> {
        (0..n_steps).map(|_| self.tick()).collect()
    }

    /// Ticks enough times to cover `duration` simulated seconds.
    pub fn run_for(&mut self, duration: f64) -> Vec<Vec<Snapshot>> {
        self.run(Self::steps_for_duration(duration, self.dt))
    }

    /// Inner and outer trail of pendulum `index` up to the current step.
    pub fn trajectory(&self, index: usize) -> Option<(Vec<Point2<f64>>, Vec<Point2<f64>>)> {
        self.pendulums
            .get(index)
            .map(|p| p.trajectory().slice(self.step_count))
    }

    /// Current snapshot of every pendulum, in seed order.
    pub fn snapshots(&self) -> Vec<Snapshot> {
        self.pendulums.iter().map(Pendulum::snapshot).collect()
    }

    pub fn step_count(&self) -> usize {
        self.step_count
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Simulated time since the session started.
    pub fn elapsed(&self) -> f64 {
        self.step_count as f64 * self.dt
    }

    pub fn len(&self) -> usize {
        self.pendulums.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pendulums.is_empty()
    }

    pub fn pendulum(&self, index: usize) -> Option<&Pendulum> {
        self.pendulums.get(index)
    }

    pub fn pendulums(&self) -> &[Pendulum] {
        &self.pendulums
    }

    /// Whether pendulum `index` has produced a non-finite state.
    pub fn is_degenerate(&self, index: usize) -> bool {
        self.degenerate.get(index).copied().unwrap_or(false)
    }
}
