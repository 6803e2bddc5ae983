//! Kinematics traits and implementations mapping canonical axis positions
//! to motor positions.
//!
//! The planner and executor operate entirely in canonical (axis) space --
//! per the Open Question resolution in the design ledger, this core
//! assumes a 1:1 axis-to-motor mapping (`CartesianKinematics`) for the
//! step generator itself. `CoreXYKinematics` is kept here, generalized to
//! `Vector`, as the transform the canonical-machine layer (an external
//! collaborator) would apply before handing targets to the planner on a
//! CoreXY machine; it is not invoked by `tinyg-planner` internally.

use crate::types::{Vector, MAX_AXES};

#[cfg(feature = "std")]
fn fsqrt(v: f64) -> f64 {
    v.sqrt()
}
#[cfg(not(feature = "std"))]
fn fsqrt(v: f64) -> f64 {
    libm::sqrt(v)
}

/// A kinematic model translating canonical-space moves to motor-space
/// positions.
pub trait Kinematics {
    /// Motor positions for a given canonical-space point.
    fn canonical_to_motor(&self, point: Vector) -> Vector;

    /// Distance a move travels in motor space, used when a machine's
    /// geometry means motor-space distance differs from canonical-space
    /// distance (e.g. CoreXY).
    fn motor_move_distance(&self, from: Vector, to: Vector) -> f64 {
        let start = self.canonical_to_motor(from);
        let end = self.canonical_to_motor(to);
        end.sub(&start).magnitude()
    }
}

/// Standard Cartesian kinematics: canonical axes map 1:1 onto motors.
#[derive(Debug, Default, Copy, Clone)]
pub struct CartesianKinematics;

impl Kinematics for CartesianKinematics {
    fn canonical_to_motor(&self, point: Vector) -> Vector {
        point
    }
}

/// CoreXY kinematics: the X/Y canonical axes map onto the A/B motors as
/// `a = x + y`, `b = x - y`; all other axes pass through unchanged. See
/// <https://corexy.com/theory.html>.
#[derive(Debug, Default, Copy, Clone)]
pub struct CoreXYKinematics;

impl Kinematics for CoreXYKinematics {
    fn canonical_to_motor(&self, point: Vector) -> Vector {
        let mut out = point;
        out.axes[0] = point.axes[0] + point.axes[1];
        out.axes[1] = point.axes[0] - point.axes[1];
        out
    }
}

/// Euclidean distance between two canonical-space points over the linear
/// axes only (indices 0..3); rotary axes (A/B/C) are excluded since their
/// units are degrees, not millimeters.
pub fn linear_distance(from: &Vector, to: &Vector) -> f64 {
    let mut sum_sq = 0.0;
    for i in 0..3.min(MAX_AXES) {
        let d = to.axes[i] - from.axes[i];
        sum_sq += d * d;
    }
    fsqrt(sum_sq)
}
