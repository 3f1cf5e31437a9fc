//! Package graph and shared store types
//!
//! The store is the only state shared with collaborators. Rendering may read
//! it between ticks; only the core writes positions, progress and camera.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::spring_length;

/// Stable package identifier
pub type PackageId = u32;

/// Lifecycle state of a package
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PackageState {
    /// Install progress is advancing
    Installing,
    /// Installed, dependencies may spawn
    Ready,
    /// Blocked by a version conflict (collaborator-managed)
    Conflict,
    /// Upgraded past ready (collaborator-managed)
    Optimized,
}

/// A vertex in the nested graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Package {
    pub id: PackageId,
    /// Owning package within the same level, `None` for the anchor
    pub parent_id: Option<PackageId>,
    pub depth: u32,
    pub state: PackageState,
    /// 0..=1, only advances while installing
    pub install_progress: f32,
    pub position: Vec2,
    pub velocity: Vec2,
    /// Nested sub-graph, absent for leaf packages
    #[serde(default)]
    pub internal_packages: Option<Vec<Package>>,
    /// Wires between `internal_packages`
    #[serde(default)]
    pub internal_wires: Option<Vec<Wire>>,
}

impl Package {
    /// The immovable anchor of a level
    pub fn root(id: PackageId) -> Self {
        Self {
            id,
            parent_id: None,
            depth: 0,
            state: PackageState::Ready,
            install_progress: 1.0,
            position: Vec2::ZERO,
            velocity: Vec2::ZERO,
            internal_packages: None,
            internal_wires: None,
        }
    }

    /// A freshly spawned package that starts installing
    pub fn installing(id: PackageId, parent_id: PackageId, depth: u32) -> Self {
        Self {
            parent_id: Some(parent_id),
            depth,
            state: PackageState::Installing,
            install_progress: 0.0,
            ..Self::root(id)
        }
    }

    pub fn with_position(mut self, position: Vec2) -> Self {
        self.position = position;
        self
    }

    pub fn with_state(mut self, state: PackageState) -> Self {
        self.state = state;
        self
    }

    /// Attach a nested level
    pub fn with_internal(mut self, packages: Vec<Package>, wires: Vec<Wire>) -> Self {
        self.internal_packages = Some(packages);
        self.internal_wires = Some(wires);
        self
    }

    #[inline]
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Rest length of the spring to this package's parent
    #[inline]
    pub fn spring_length(&self) -> f32 {
        spring_length(self.depth)
    }
}

/// A directed edge inside one nesting level
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wire {
    pub from_id: PackageId,
    pub to_id: PackageId,
    /// Animation phase in [0, 1)
    pub flow_progress: f32,
}

impl Wire {
    pub fn new(from_id: PackageId, to_id: PackageId) -> Self {
        Self {
            from_id,
            to_id,
            flow_progress: 0.0,
        }
    }
}

/// Camera position and zoom as seen by collaborators
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraView {
    pub x: f32,
    pub y: f32,
    pub zoom: f32,
}

impl Default for CameraView {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            zoom: 1.0,
        }
    }
}

/// Shared resource counters
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Resources {
    pub bandwidth: f64,
    pub max_bandwidth: f64,
}

impl Resources {
    /// Add `rate * dt` bandwidth, clamped to `[0, max_bandwidth]`
    pub fn regenerate(&mut self, rate: f64, dt: f32) {
        let next = self.bandwidth + rate * f64::from(dt);
        self.bandwidth = next.clamp(0.0, self.max_bandwidth.max(0.0));
    }
}

/// State shared between the core and its collaborators
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GameStore {
    /// Top-level packages, in insertion order
    pub packages: Vec<Package>,
    /// Top-level wires
    pub wires: Vec<Wire>,
    /// Path of package ids from the top level to the focused level
    pub scope_stack: Vec<PackageId>,
    pub camera: CameraView,
    pub resources: Resources,
    /// Timestamp of the last tick (ms)
    pub last_tick: f64,
    pub tick_count: u64,
}

impl GameStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Find a top-level package by id
    pub fn find_package(&self, id: PackageId) -> Option<&Package> {
        self.packages.iter().find(|p| p.id == id)
    }

    /// Resolve the nested collection at `path`
    ///
    /// Returns `None` if any segment is missing or has no internal level.
    /// An empty path resolves to the top level.
    pub fn level_mut(&mut self, path: &[PackageId]) -> Option<&mut Vec<Package>> {
        resolve_level_mut(&mut self.packages, path)
    }

    /// Collection at the current scope, `None` when unscoped or unresolvable
    pub fn scoped_level_mut(&mut self) -> Option<&mut Vec<Package>> {
        if self.scope_stack.is_empty() {
            return None;
        }
        resolve_level_mut(&mut self.packages, &self.scope_stack)
    }
}

fn resolve_level_mut<'a>(
    mut level: &'a mut Vec<Package>,
    path: &[PackageId],
) -> Option<&'a mut Vec<Package>> {
    for id in path {
        level = level
            .iter_mut()
            .find(|p| p.id == *id)?
            .internal_packages
            .as_mut()?;
    }
    Some(level)
}
