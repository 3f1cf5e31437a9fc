//! Recursive tree walker
//!
//! Advances install progress and wire flow at every depth of the nested
//! package graph. Nesting is unbounded, so levels are visited from an
//! explicit work stack instead of call recursion.

use super::state::{Package, PackageId, PackageState, Wire};
use crate::consts::{INSTALL_RATE, WIRE_FLOW_RATE};

/// Advance install progress over `level` and every nested level below it
///
/// Returns the ids of packages in `level` itself that finished installing
/// during this call, in insertion order. Nested packages are advanced too but
/// their completions are not reported.
pub fn advance_install(
    level: &mut [Package],
    dt: f32,
    install_speed_multiplier: f32,
) -> Vec<PackageId> {
    let step = (dt * INSTALL_RATE * install_speed_multiplier).max(0.0);
    let mut completed = Vec::new();
    let mut nested_completed = 0usize;

    let mut stack: Vec<(&mut [Package], bool)> = vec![(level, true)];
    while let Some((packages, is_top)) = stack.pop() {
        for package in packages.iter_mut() {
            if advance_package(package, step) {
                if is_top {
                    completed.push(package.id);
                } else {
                    nested_completed += 1;
                }
            }
            if let Some(internal) = package.internal_packages.as_deref_mut() {
                stack.push((internal, false));
            }
        }
    }

    if nested_completed > 0 {
        log::debug!("{nested_completed} nested packages finished installing");
    }
    completed
}

/// Advance one package, returning true if it just became ready
fn advance_package(package: &mut Package, step: f32) -> bool {
    if package.state != PackageState::Installing {
        return false;
    }
    package.install_progress = (package.install_progress + step).min(1.0);
    if package.install_progress >= 1.0 {
        package.install_progress = 1.0;
        package.state = PackageState::Ready;
        return true;
    }
    false
}

/// Advance flow on `wires` and on every nested level's wires below `packages`
pub fn advance_wires(packages: &mut [Package], wires: &mut [Wire], dt: f32) {
    let step = (dt * WIRE_FLOW_RATE).max(0.0);
    advance_flow(wires, step);

    let mut stack: Vec<&mut [Package]> = vec![packages];
    while let Some(level) = stack.pop() {
        for package in level.iter_mut() {
            if let Some(wires) = package.internal_wires.as_deref_mut() {
                advance_flow(wires, step);
            }
            if let Some(internal) = package.internal_packages.as_deref_mut() {
                stack.push(internal);
            }
        }
    }
}

fn advance_flow(wires: &mut [Wire], step: f32) {
    for wire in wires {
        let phase = (wire.flow_progress + step).rem_euclid(1.0);
        // rem_euclid can round up to exactly 1.0 for tiny negative inputs
        wire.flow_progress = if phase >= 1.0 { 0.0 } else { phase };
    }
}
