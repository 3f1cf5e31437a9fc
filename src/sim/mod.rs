//! Deterministic per-frame core
//!
//! Everything that mutates the package graph lives here:
//! - Single-threaded, synchronous; the only yield is between frames
//! - Stable iteration order (collection insertion order)
//! - No rendering or platform dependencies

pub mod callbacks;
pub mod camera;
pub mod physics;
pub mod state;
pub mod tick;
pub mod walker;

pub use callbacks::{TickCallbacks, Unregister};
pub use camera::{CameraConfig, CameraController};
pub use physics::{PhysicsConfig, kinetic_energy};
pub use state::{CameraView, GameStore, Package, PackageId, PackageState, Resources, Wire};
pub use tick::{GameLoop, HookError, HookResult, NoHooks, TickError, TickHooks, TickStage};
pub use walker::{advance_install, advance_wires};
