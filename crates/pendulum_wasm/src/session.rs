//! Browser-facing wrapper around a core simulation session.

use js_sys::Float64Array;
use pendulum_core::config::SimulationConfig;
use pendulum_core::pendulum::Snapshot;
use pendulum_core::session::Session;
use wasm_bindgen::prelude::*;

/// Values emitted per pendulum by [`WasmSession::tick`]:
/// `[θ1, ω1, θ2, ω2, x1, y1, x2, y2]`.
pub const SNAPSHOT_STRIDE: usize = 8;

#[wasm_bindgen]
pub struct WasmSession {
    session: Session,
    duration: f64,
}

pub(crate) fn build_session(config_yaml: &str) -> anyhow::Result<(Session, f64)> {
    let config = SimulationConfig::from_yaml_str(config_yaml)?;
    let session = config.build_session()?;
    Ok((session, config.duration))
}

/// Ticks `steps` times and returns every frame back to back.
pub(crate) fn collect_frames(session: &mut Session, steps: u32) -> Vec<f64> {
    let mut out = Vec::new();
    for _ in 0..steps {
        out.extend(flatten_snapshots(&session.tick()));
    }
    out
}

pub(crate) fn flatten_snapshots(snapshots: &[Snapshot]) -> Vec<f64> {
    let mut out = Vec::with_capacity(snapshots.len() * SNAPSHOT_STRIDE);
    for snapshot in snapshots {
        out.extend_from_slice(&snapshot.state.to_array());
        out.extend_from_slice(&[
            snapshot.pose.bob1.x,
            snapshot.pose.bob1.y,
            snapshot.pose.bob2.x,
            snapshot.pose.bob2.y,
        ]);
    }
    out
}

#[wasm_bindgen]
impl WasmSession {
    /// Builds a session from a YAML configuration document.
    #[wasm_bindgen(constructor)]
    pub fn new(config_yaml: &str) -> Result<WasmSession, JsValue> {
        console_error_panic_hook::set_once();

        let (session, duration) =
            build_session(config_yaml).map_err(|err| JsValue::from_str(&format!("{err:#}")))?;
        Ok(WasmSession { session, duration })
    }

    /// Advances every pendulum by one step.
    pub fn tick(&mut self) -> Vec<f64> {
        flatten_snapshots(&self.session.tick())
    }

    /// Ticks `steps` times and returns every frame back to back.
    pub fn run(&mut self, steps: u32) -> Float64Array {
        Float64Array::from(collect_frames(&mut self.session, steps).as_slice())
    }

    /// Inner trail as `[x, y, ...]` followed by the outer trail in the same
    /// layout. Both halves have equal length.
    pub fn trajectory(&self, index: usize) -> Result<Vec<f64>, JsValue> {
        let (inner, outer) = self
            .session
            .trajectory(index)
            .ok_or_else(|| JsValue::from_str(&format!("No pendulum at index {index}.")))?;
        Ok(inner
            .iter()
            .chain(outer.iter())
            .flat_map(|p| [p.x, p.y])
            .collect())
    }

    pub fn snapshot_js(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(&self.session.snapshots())
            .map_err(|err| JsValue::from_str(&format!("Failed to serialize snapshots: {err}")))
    }

    pub fn step_count(&self) -> usize {
        self.session.step_count()
    }

    pub fn dt(&self) -> f64 {
        self.session.dt()
    }

    pub fn elapsed(&self) -> f64 {
        self.session.elapsed()
    }

    pub fn pendulum_count(&self) -> usize {
        self.session.len()
    }

    /// Ticks needed for the configured duration.
    pub fn steps_for_duration(&self) -> usize {
        Session::steps_for_duration(self.duration, self.session.dt())
    }

    /// File stem describing pendulum `index`, empty for an unknown index.
    pub fn parameter_signature(&self, index: usize) -> String {
        self.session
            .pendulum(index)
            .map(|p| p.parameter_signature())
            .unwrap_or_default()
    }
}
