//! WASM bindings for the double pendulum simulation core.

mod session;

pub use session::{WasmSession, SNAPSHOT_STRIDE};
