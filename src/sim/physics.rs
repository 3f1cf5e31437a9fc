//! Force-directed layout for one nesting level
//!
//! Siblings repel each other and are pulled toward their parent by a linear
//! spring. Integration is explicit Euler with per-step damping.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::state::Package;
use crate::consts::{REPULSION_MIN_DIST_SQ, REPULSION_RADIUS};

/// Force constants, supplied by configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhysicsConfig {
    pub repulsion_constant: f32,
    pub attraction_constant: f32,
    /// Velocity multiplier applied once per step (not per second)
    pub damping_factor: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            repulsion_constant: 800.0,
            attraction_constant: 0.05,
            damping_factor: 0.9,
        }
    }
}

/// Repulsive force on a node at `pos` from a node at `other`
///
/// Zero outside `(1, 200)` units of separation.
#[inline]
pub fn repulsion(pos: Vec2, other: Vec2, constant: f32) -> Vec2 {
    let delta = pos - other;
    let dist_sq = delta.length_squared();
    if dist_sq < REPULSION_MIN_DIST_SQ || dist_sq > REPULSION_RADIUS * REPULSION_RADIUS {
        return Vec2::ZERO;
    }
    let dist = dist_sq.sqrt();
    delta / dist * (constant / dist_sq)
}

/// Spring force pulling a node at `pos` toward its parent, pushing out when
/// closer than `rest_length`
#[inline]
pub fn attraction(pos: Vec2, parent: Vec2, rest_length: f32, constant: f32) -> Vec2 {
    let delta = parent - pos;
    let dist = delta.length();
    if dist <= 0.0 {
        return Vec2::ZERO;
    }
    delta / dist * ((dist - rest_length) * constant)
}

/// Advance one physics step over a single level
///
/// Nodes are integrated in order, each right after its own forces are
/// summed, so later nodes see the already-moved positions of earlier ones.
/// The anchor (no parent) never moves. A parent missing from `level` means no
/// spring for that node this step.
pub fn step(level: &mut [Package], dt: f32, config: &PhysicsConfig) {
    for i in 0..level.len() {
        let Some(parent_id) = level[i].parent_id else {
            continue;
        };
        let pos = level[i].position;

        let mut force = Vec2::ZERO;
        for (j, other) in level.iter().enumerate() {
            if i != j {
                force += repulsion(pos, other.position, config.repulsion_constant);
            }
        }
        if let Some(parent) = level.iter().find(|p| p.id == parent_id) {
            force += attraction(
                pos,
                parent.position,
                level[i].spring_length(),
                config.attraction_constant,
            );
        }

        let node = &mut level[i];
        node.velocity += force * dt;
        node.velocity *= config.damping_factor;
        node.position += node.velocity;
    }
}

/// Total kinetic energy of the movable nodes in a level
pub fn kinetic_energy(level: &[Package]) -> f32 {
    level
        .iter()
        .filter(|p| !p.is_root())
        .map(|p| 0.5 * p.velocity.length_squared())
        .sum()
}
