//! Cascade Core - tick scheduler and layout physics for a nested package graph
//!
//! Core modules:
//! - `sim`: Per-frame pipeline (tree walker, physics, camera, scheduler)
//! - `config`: Runtime-tunable simulation settings
//! - `platform`: Frame-scheduling hosts (headless / requestAnimationFrame)

pub mod config;
pub mod platform;
pub mod sim;

pub use config::{ConfigError, SimConfig};
pub use sim::{GameLoop, GameStore, TickError, TickHooks};

/// Fixed tuning constants consumed by the core
pub mod consts {
    /// Install progress gained per second at multiplier 1 (2 second baseline install)
    pub const INSTALL_RATE: f32 = 0.5;
    /// Wire flow phase gained per second
    pub const WIRE_FLOW_RATE: f32 = 0.5;

    /// Spring rest length for a depth-0 child
    pub const SPRING_BASE_LENGTH: f32 = 80.0;
    /// Extra spring rest length per nesting depth
    pub const SPRING_DEPTH_STEP: f32 = 10.0;
    /// Pairs closer than this (squared) skip repulsion
    pub const REPULSION_MIN_DIST_SQ: f32 = 1.0;
    /// Repulsion is ignored beyond this radius
    pub const REPULSION_RADIUS: f32 = 200.0;

    /// Camera snaps to its target position below this distance
    pub const CAMERA_POSITION_EPSILON: f32 = 0.5;
    /// Camera snaps to its target zoom below this difference
    pub const CAMERA_ZOOM_EPSILON: f32 = 0.01;
    /// Base of the exponential easing curve (1% remains after one rate unit)
    pub const CAMERA_EASE_BASE: f32 = 0.01;

    /// Derived stats are recomputed every N ticks
    pub const STAT_RECOMPUTE_INTERVAL: u64 = 30;
}

/// Spring rest length for a node at the given depth
#[inline]
pub fn spring_length(depth: u32) -> f32 {
    consts::SPRING_BASE_LENGTH + depth as f32 * consts::SPRING_DEPTH_STEP
}

/// Frame-rate independent easing factor for one step of `dt` seconds
#[inline]
pub fn ease_factor(dt: f32, speed: f32) -> f32 {
    1.0 - consts::CAMERA_EASE_BASE.powf(dt * speed)
}
