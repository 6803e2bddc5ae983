//! The arc generator: a pollable continuation that decomposes a circular
//! arc into short chord lines fed one at a time into the planner, pausing
//! (without blocking) whenever the planner queue fills.
//!
//! Grounded in the design note on the source's "persistent static state plus
//! polled re-entry": the replacement here is a small owned state machine
//! whose `step()` either submits the next chord and returns `Pending`, or
//! finalizes and returns `Done`.

use crate::errors::ArcError;
use crate::planner::MotionPlanner;
use crate::types::{MotionMode, Vector, MAX_AXES};

#[cfg(feature = "std")]
fn fsqrt(v: f64) -> f64 {
    v.sqrt()
}
#[cfg(not(feature = "std"))]
fn fsqrt(v: f64) -> f64 {
    libm::sqrt(v)
}
#[cfg(feature = "std")]
fn fsin(v: f64) -> f64 {
    v.sin()
}
#[cfg(not(feature = "std"))]
fn fsin(v: f64) -> f64 {
    libm::sin(v)
}
#[cfg(feature = "std")]
fn fcos(v: f64) -> f64 {
    v.cos()
}
#[cfg(not(feature = "std"))]
fn fcos(v: f64) -> f64 {
    libm::cos(v)
}

const TAU: f64 = 2.0 * core::f64::consts::PI;

/// Result of one `ArcGenerator::step` call.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ArcStepResult {
    /// Chords remain; call `step` again once the planner has room.
    Pending,
    /// All chords (including the snapped final one) were submitted.
    Done,
}

/// The two axes an arc plane maps to, and the (unused in this core) third
/// axis that moves linearly during a helix.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PlaneAxes {
    pub plane_axis_0: usize,
    pub plane_axis_1: usize,
    pub linear_axis: usize,
}

pub const PLANE_XY: PlaneAxes = PlaneAxes { plane_axis_0: 0, plane_axis_1: 1, linear_axis: 2 };

/// A pollable arc-to-chords continuation. Owns all the state needed to
/// resume mid-arc after a `would-block` return from the planner.
pub struct ArcGenerator {
    center: (f64, f64),
    radius: f64,
    theta_start: f64,
    angular_travel: f64,
    linear_travel: f64,
    linear_start: f64,
    plane: PlaneAxes,
    target: Vector,
    base: Vector,
    segment_count: u32,
    segment_index: u32,
    move_time_min_per_segment: f64,
    mode: MotionMode,
}

impl ArcGenerator {
    /// Builds an arc continuation. `target` is the absolute endpoint in
    /// canonical units; `base` is the position the arc starts from.
    /// `ijk_offset` gives the center relative to `base` in the plane's two
    /// axes. Fails with `ArcSpecificationError` if the computed arc length
    /// is shorter than `min_segment_len`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        base: Vector,
        target: Vector,
        ijk_offset: (f64, f64),
        clockwise: bool,
        plane: PlaneAxes,
        duration_min: f64,
        min_segment_time_min: f64,
        min_segment_len: f64,
    ) -> Result<Self, ArcError> {
        let start0 = base.axes[plane.plane_axis_0];
        let start1 = base.axes[plane.plane_axis_1];
        let end0 = target.axes[plane.plane_axis_0];
        let end1 = target.axes[plane.plane_axis_1];

        let center0 = start0 + ijk_offset.0;
        let center1 = start1 + ijk_offset.1;
        let radius = fsqrt(ijk_offset.0 * ijk_offset.0 + ijk_offset.1 * ijk_offset.1);

        let theta_start = (start1 - center1).atan2(start0 - center0);
        let theta_end = (end1 - center1).atan2(end0 - center0);

        let mut angular_travel = theta_end - theta_start;
        if clockwise && angular_travel > 0.0 {
            angular_travel -= TAU;
        } else if !clockwise && angular_travel < 0.0 {
            angular_travel += TAU;
        }
        // Zero computed travel with explicit intent means a full circle.
        if angular_travel.abs() < 1e-9 {
            angular_travel = if clockwise { -TAU } else { TAU };
        }

        let linear_start = base.axes[plane.linear_axis];
        let linear_travel = target.axes[plane.linear_axis] - linear_start;

        let arc_length = fsqrt((angular_travel.abs() * radius).powi(2) + linear_travel * linear_travel);
        if arc_length < min_segment_len {
            return Err(ArcError::ArcSpecificationError);
        }

        let by_time = (duration_min / min_segment_time_min).ceil().max(1.0);
        let by_length = (arc_length / min_segment_len).ceil().max(1.0);
        let segment_count = by_time.max(by_length) as u32;

        Ok(Self {
            center: (center0, center1),
            radius,
            theta_start,
            angular_travel,
            linear_travel,
            linear_start,
            plane,
            target,
            base,
            segment_count,
            segment_index: 0,
            move_time_min_per_segment: duration_min / segment_count as f64,
            mode: if clockwise { MotionMode::ArcCw } else { MotionMode::ArcCcw },
        })
    }

    pub fn segment_count(&self) -> u32 {
        self.segment_count
    }

    pub fn segments_remaining(&self) -> u32 {
        self.segment_count - self.segment_index
    }

    fn chord_point(&self, segment_index: u32) -> Vector {
        if segment_index >= self.segment_count {
            return self.target;
        }
        let fraction = segment_index as f64 / self.segment_count as f64;
        let theta = self.theta_start + self.angular_travel * fraction;
        let mut point = self.base;
        point.axes[self.plane.plane_axis_0] = self.center.0 + self.radius * fcos(theta);
        point.axes[self.plane.plane_axis_1] = self.center.1 + self.radius * fsin(theta);
        point.axes[self.plane.linear_axis] = self.linear_start + self.linear_travel * fraction;
        point
    }

    /// Submits as many chords as fit before the planner queue fills,
    /// holding the planner's arc lock for the duration of the call.
    /// Returns `Pending` if chords remain (retry once the queue drains) or
    /// `Done` once the snapped final chord lands at `target` exactly.
    pub fn step<const N: usize>(&mut self, planner: &mut MotionPlanner<N>) -> Result<ArcStepResult, ArcError> {
        if self.segment_index == 0 {
            planner.begin_arc()?;
        }

        while self.segment_index < self.segment_count {
            let next_index = self.segment_index + 1;
            let point = if next_index == self.segment_count {
                // Snap the last chord's endpoint exactly to target to avoid
                // accumulated trig rounding drift.
                self.target
            } else {
                self.chord_point(next_index)
            };

            match planner.submit_arc_chord(point, self.move_time_min_per_segment, self.mode) {
                Ok(()) => {
                    self.segment_index = next_index;
                }
                Err(crate::errors::PlannerError::QueueFull) => {
                    return Ok(ArcStepResult::Pending);
                }
                Err(e) => {
                    return Err(ArcError::from(e));
                }
            }
        }

        planner.end_arc();
        Ok(ArcStepResult::Done)
    }
}
