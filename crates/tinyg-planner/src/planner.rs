//! The motion planner: per-move preparation, junction-velocity calculation
//! and the back-planning reverse pass over the planner queue.
//!
//! Structured around a lookahead/recalculate-timing pass over
//! `PlannerQueue`/`PlannerBuffer`, driving `scurve::plan_profile` instead of
//! building a `VecDeque` of owned segments.

use crate::errors::PlannerError;
use crate::queue::PlannerQueue;
use crate::scurve;
use crate::types::{BufferState, McodeKind, MotionMode, MoveType, PlannerBuffer, Vector, MAX_AXES};

const EPSILON: f64 = 1e-9;

/// Static per-axis kinematic limits the planner needs to compute junction
/// velocities and cruise caps. A lighter-weight sibling of
/// `tinyg-config::AxisConfig`, kept separate so this crate never depends on
/// the host config crate (mirrors `motion` never depending on
/// `klipper-host::config`).
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct AxisLimits {
    pub feedrate_max: f64,
    pub velocity_max: f64,
    pub jerk_max: f64,
    pub junction_deviation: f64,
}

impl Default for AxisLimits {
    fn default() -> Self {
        Self {
            feedrate_max: 0.0,
            velocity_max: 0.0,
            jerk_max: 0.0,
            junction_deviation: 0.0,
        }
    }
}

#[derive(Debug, Copy, Clone, Default)]
pub struct PlannerLimits {
    pub axes: [AxisLimits; MAX_AXES],
}

/// Projected limit: `min` over axes with a nonzero unit component of
/// `per_axis(i) / |unit_i|` -- the same projection `cruise_vmax` and
/// `jerk_norm` both use.
fn project_limit(unit: &Vector, per_axis: impl Fn(usize) -> f64) -> f64 {
    let mut limit = f64::INFINITY;
    for i in 0..MAX_AXES {
        let u = fabs(unit.axes[i]);
        if u > EPSILON {
            let axis_limit = per_axis(i) / u;
            if axis_limit < limit {
                limit = axis_limit;
            }
        }
    }
    limit
}

fn min_active_junction_deviation(unit: &Vector, limits: &PlannerLimits) -> f64 {
    let mut d = f64::INFINITY;
    for i in 0..MAX_AXES {
        if fabs(unit.axes[i]) > EPSILON && limits.axes[i].junction_deviation < d {
            d = limits.axes[i].junction_deviation;
        }
    }
    if d.is_finite() {
        d
    } else {
        0.0
    }
}

#[cfg(feature = "std")]
fn fabs(v: f64) -> f64 {
    v.abs()
}
#[cfg(not(feature = "std"))]
fn fabs(v: f64) -> f64 {
    libm::fabs(v)
}
#[cfg(feature = "std")]
fn fsqrt(v: f64) -> f64 {
    v.sqrt()
}
#[cfg(not(feature = "std"))]
fn fsqrt(v: f64) -> f64 {
    libm::sqrt(v)
}

/// The motion planner: a bounded ring of planning buffers (`PlannerQueue`)
/// plus the continuity state (`last_target`/`last_unit`/`last_cruise_vmax`)
/// needed to compute each new move's junction velocity against its
/// predecessor.
pub struct MotionPlanner<const N: usize> {
    queue: PlannerQueue<N>,
    limits: PlannerLimits,
    last_target: Vector,
    last_unit: Option<Vector>,
    last_cruise_vmax: f64,
    arc_active: bool,
    next_line_number: u32,
}

impl<const N: usize> MotionPlanner<N> {
    pub fn new(limits: PlannerLimits) -> Self {
        Self {
            queue: PlannerQueue::new(),
            limits,
            last_target: Vector::ZERO,
            last_unit: None,
            last_cruise_vmax: 0.0,
            arc_active: false,
            next_line_number: 0,
        }
    }

    pub fn queue(&self) -> &PlannerQueue<N> {
        &self.queue
    }

    pub fn limits(&self) -> &PlannerLimits {
        &self.limits
    }

    /// Absolute position the next submitted move will be measured from.
    pub fn current_position(&self) -> Vector {
        self.last_target
    }

    fn breaks_continuity(&mut self) {
        self.last_unit = None;
        self.last_cruise_vmax = 0.0;
    }

    /// Enqueues a straight-line feed or rapid traverse move ending at
    /// `target`, requested to complete in `move_time_min` minutes (the
    /// canonical machine's feedrate/inverse-time resolution). `mode`
    /// selects whether `feedrate_max` or `velocity_max` bounds the cruise
    /// velocity.
    pub fn submit_line(&mut self, target: Vector, move_time_min: f64, mode: MotionMode) -> Result<(), PlannerError> {
        if self.arc_active {
            return Err(PlannerError::ArcInProgress);
        }
        self.submit_line_internal(target, move_time_min, mode)
    }

    fn submit_line_internal(&mut self, target: Vector, move_time_min: f64, mode: MotionMode) -> Result<(), PlannerError> {
        if self.queue.is_full() {
            return Err(PlannerError::QueueFull);
        }

        let delta = target.sub(&self.last_target);
        if delta.is_zero(1e-9) {
            return Err(PlannerError::ZeroLengthMove);
        }
        let length = delta.magnitude();
        let unit = delta.unit();

        let axis_cap = |i: usize| -> f64 {
            match mode {
                MotionMode::Feed => self.limits.axes[i].feedrate_max,
                _ => self.limits.axes[i].velocity_max,
            }
        };
        let projected_cap = project_limit(&unit, axis_cap);
        let commanded_v = if move_time_min > EPSILON { length / move_time_min } else { f64::INFINITY };
        let cruise_vmax = projected_cap.min(commanded_v);
        if !cruise_vmax.is_finite() || cruise_vmax < 0.0 {
            return Err(PlannerError::InternalError);
        }

        let jerk_norm = project_limit(&unit, |i| self.limits.axes[i].jerk_max);
        if !jerk_norm.is_finite() {
            return Err(PlannerError::InternalError);
        }

        let entry_vmax = self.junction_velocity(&unit, jerk_norm, cruise_vmax);

        let mut buf = PlannerBuffer::default();
        buf.state = BufferState::Queued;
        buf.move_type = match mode {
            MotionMode::ArcCw | MotionMode::ArcCcw => MoveType::ArcChord,
            _ => MoveType::Line,
        };
        buf.unit = unit;
        buf.target = target;
        buf.length = length;
        buf.entry_vmax = entry_vmax;
        buf.cruise_vmax = cruise_vmax;
        buf.exit_vmax = cruise_vmax;
        buf.entry_v = entry_vmax;
        buf.exit_v = 0.0;
        buf.cruise_v = cruise_vmax;
        buf.jerk = jerk_norm;
        buf.line_number = self.next_line_number;
        self.next_line_number += 1;

        self.queue.push(buf)?;

        self.last_target = target;
        self.last_unit = Some(unit);
        self.last_cruise_vmax = cruise_vmax;

        self.back_plan();
        Ok(())
    }

    /// `v_junction = sqrt(jerk_norm * d * sin(theta/2) / (1 - sin(theta/2)))`,
    /// with the collinear (`theta = 0`) and reversal (`theta = pi`) boundary
    /// cases special-cased since the raw formula degenerates at both ends.
    /// A `None` previous move (the very first submission) starts from rest.
    fn junction_velocity(&self, unit: &Vector, jerk_norm: f64, cruise_vmax: f64) -> f64 {
        let prev_unit = match self.last_unit {
            Some(u) => u,
            None => return 0.0,
        };
        let cos_theta = prev_unit.dot(unit).clamp(-1.0, 1.0);
        let sin_half = fsqrt(((1.0 - cos_theta) / 2.0).max(0.0));

        if sin_half < 1e-6 {
            // Collinear: carry the lower of the two moves' cruise caps.
            return cruise_vmax.min(self.last_cruise_vmax);
        }
        if (1.0 - sin_half) < 1e-6 {
            // Reversal: must come to a full stop.
            return 0.0;
        }

        let d = min_active_junction_deviation(unit, &self.limits);
        let raw = fsqrt(jerk_norm * d * sin_half / (1.0 - sin_half));
        raw.min(cruise_vmax).min(self.last_cruise_vmax)
    }

    pub fn submit_dwell(&mut self, seconds: f64) -> Result<(), PlannerError> {
        if self.arc_active {
            return Err(PlannerError::ArcInProgress);
        }
        if self.queue.is_full() {
            return Err(PlannerError::QueueFull);
        }
        let mut buf = PlannerBuffer::default();
        buf.state = BufferState::Queued;
        buf.move_type = MoveType::Dwell;
        buf.target = self.last_target;
        buf.dwell_seconds = seconds;
        buf.line_number = self.next_line_number;
        self.next_line_number += 1;
        self.queue.push(buf)?;
        self.breaks_continuity();
        self.back_plan();
        Ok(())
    }

    pub fn submit_mcode(&mut self, kind: McodeKind) -> Result<(), PlannerError> {
        if self.arc_active {
            return Err(PlannerError::ArcInProgress);
        }
        if self.queue.is_full() {
            return Err(PlannerError::QueueFull);
        }
        let mut buf = PlannerBuffer::default();
        buf.state = BufferState::Queued;
        buf.move_type = MoveType::Mcode(kind);
        buf.target = self.last_target;
        buf.line_number = self.next_line_number;
        self.next_line_number += 1;
        self.queue.push(buf)?;
        self.breaks_continuity();
        self.back_plan();
        Ok(())
    }

    pub fn submit_null(&mut self) -> Result<(), PlannerError> {
        if self.queue.is_full() {
            return Err(PlannerError::QueueFull);
        }
        let mut buf = PlannerBuffer::default();
        buf.state = BufferState::Queued;
        buf.move_type = MoveType::Null;
        buf.target = self.last_target;
        buf.line_number = self.next_line_number;
        self.next_line_number += 1;
        self.queue.push(buf)?;
        self.back_plan();
        Ok(())
    }

    /// Acquires the arc-generation lock; fails with `ArcInProgress` if
    /// another arc continuation already holds it. Only `submit_arc_chord`
    /// accepts submissions while held; `submit_line`/`submit_dwell`/etc.
    /// reject with `ArcInProgress` until `end_arc` releases it.
    pub fn begin_arc(&mut self) -> Result<(), PlannerError> {
        if self.arc_active {
            return Err(PlannerError::ArcInProgress);
        }
        self.arc_active = true;
        Ok(())
    }

    pub fn end_arc(&mut self) {
        self.arc_active = false;
    }

    /// Submits one arc chord while the arc lock is held. The arc generator
    /// calls this from its `step()` continuation between `begin_arc` and
    /// `end_arc`.
    pub fn submit_arc_chord(&mut self, target: Vector, move_time_min: f64, mode: MotionMode) -> Result<(), PlannerError> {
        self.submit_line_internal(target, move_time_min, mode)
    }

    /// Walks the queue from newest back to (but not including) the
    /// currently-running buffer, tightening each buffer's `exit_v` to match
    /// its successor's `entry_v` and recomputing its velocity profile.
    /// Idempotent: re-running with no new submissions reproduces the same
    /// velocities.
    fn back_plan(&mut self) {
        let newest = match self.queue.newest_index() {
            Some(n) => n,
            None => return,
        };
        let mut idx = newest;
        loop {
            if self.queue.get(idx).state == BufferState::Running {
                break;
            }

            let successor = self.queue.successor_index(idx);
            let new_exit_v = match successor {
                Some(s_idx) => {
                    let exit_vmax = self.queue.get(idx).exit_vmax;
                    let succ_entry = self.queue.get(s_idx).entry_v;
                    exit_vmax.min(succ_entry)
                }
                None => self.queue.get(idx).exit_v,
            };

            {
                let buf = self.queue.get_mut(idx);
                buf.exit_v = new_exit_v;
                if buf.is_motion() {
                    // Reachability: a decelerating buffer (`entry_v > exit_v`)
                    // whose pure decel ramp doesn't fit in `length` had an
                    // `entry_v` that was optimistic for the `exit_v` its
                    // successor now demands. Clamp it to what this buffer's
                    // own length can deliver; the predecessor picks the
                    // lowered value up as its own `exit_v` ceiling on the
                    // next loop iteration, so the single backward walk
                    // already re-checks it -- no separate dirty re-pass
                    // needed.
                    if buf.entry_v > buf.exit_v {
                        let (_, decel_dist) = scurve::ramp_time_distance(buf.entry_v, buf.exit_v, buf.jerk);
                        if decel_dist > buf.length {
                            buf.entry_v = scurve::max_entry_for_exit(buf.exit_v, buf.length, buf.jerk);
                        }
                    }
                    let (cruise_v, head_len, body_len, tail_len, _timing) =
                        scurve::plan_profile(buf.length, buf.entry_v, buf.exit_v, buf.cruise_vmax, buf.jerk);
                    buf.cruise_v = cruise_v;
                    buf.head_len = head_len;
                    buf.body_len = body_len;
                    buf.tail_len = tail_len;
                }
                buf.planned = true;
            }

            if self.queue.run_index() == Some(idx) {
                break;
            }
            idx = self.queue.predecessor_index(idx);
        }
    }

    /// Marks the run-cursor buffer as `Running`, if one exists and it is
    /// not already. Returns the now-running buffer.
    pub fn mark_running(&mut self) -> Option<&PlannerBuffer> {
        let idx = self.queue.run_index()?;
        self.queue.mark_state(idx, BufferState::Running);
        Some(self.queue.get(idx))
    }

    /// Frees the running buffer's slot once its last segment has been
    /// loaded.
    pub fn pop_completed(&mut self) -> Option<PlannerBuffer> {
        self.queue.pop_run()
    }

    /// Resume after a hold: submits a fresh move from `current_pos` back to
    /// `original_target`, re-accelerating under ordinary junction rules
    /// (continuity was already broken by the hold).
    pub fn resume_from(
        &mut self,
        current_pos: Vector,
        original_target: Vector,
        move_time_min: f64,
        mode: MotionMode,
    ) -> Result<(), PlannerError> {
        self.last_target = current_pos;
        self.breaks_continuity();
        self.submit_line(original_target, move_time_min, mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_limits(feedrate_max: f64, jerk_max: f64, junction_deviation: f64) -> PlannerLimits {
        let axis = AxisLimits {
            feedrate_max,
            velocity_max: feedrate_max,
            jerk_max,
            junction_deviation,
        };
        PlannerLimits { axes: [axis; MAX_AXES] }
    }

    fn vec_x(x: f64) -> Vector {
        let mut v = Vector::ZERO;
        v.axes[0] = x;
        v
    }

    fn vec_xy(x: f64, y: f64) -> Vector {
        let mut v = Vector::ZERO;
        v.axes[0] = x;
        v.axes[1] = y;
        v
    }

    // Scenario 1: G1 X10 F1200 from (0,0). Single BF, triangular profile,
    // entry 0, exit 0.
    #[test]
    fn single_short_move_is_triangular_from_rest() {
        let limits = full_limits(1200.0, 5e7, 0.05);
        let mut planner: MotionPlanner<32> = MotionPlanner::new(limits);
        planner.submit_line(vec_x(10.0), 10.0 / 1200.0, MotionMode::Feed).unwrap();

        let buf = planner.queue().newest().unwrap();
        assert_eq!(buf.entry_v, 0.0);
        assert_eq!(buf.exit_v, 0.0);
        assert!(buf.cruise_v < 1200.0);
        assert!(buf.body_len.abs() < 1e-6);
        assert!((buf.head_len + buf.body_len + buf.tail_len - 10.0).abs() < 1e-6);
    }

    // Scenario 2: two collinear moves raise the shared junction to 1200.
    #[test]
    fn collinear_moves_share_full_feedrate_at_junction() {
        let limits = full_limits(1200.0, 5e7, 0.05);
        let mut planner: MotionPlanner<32> = MotionPlanner::new(limits);
        planner.submit_line(vec_x(10.0), 10.0 / 1200.0, MotionMode::Feed).unwrap();
        planner.submit_line(vec_x(20.0), 10.0 / 1200.0, MotionMode::Feed).unwrap();

        let q = planner.queue();
        let first = q.get(q.predecessor_index(q.newest_index().unwrap()));
        let second = q.newest().unwrap();
        assert!((first.exit_v - 1200.0).abs() < 1e-6);
        assert!((second.entry_v - 1200.0).abs() < 1e-6);
        assert_eq!(first.exit_v, second.entry_v);
    }

    // Scenario 3: a 90 degree corner limits the junction velocity per the
    // closed-form formula.
    #[test]
    fn perpendicular_corner_uses_junction_deviation_formula() {
        let jerk = 5e7_f64;
        let d = 0.05_f64;
        let limits = full_limits(1200.0, jerk, d);
        let mut planner: MotionPlanner<32> = MotionPlanner::new(limits);
        planner.submit_line(vec_x(10.0), 10.0 / 1200.0, MotionMode::Feed).unwrap();
        planner.submit_line(vec_xy(10.0, 10.0), 10.0 / 1200.0, MotionMode::Feed).unwrap();

        let sin_half = core::f64::consts::FRAC_PI_4.sin();
        let expected = (jerk * d * sin_half / (1.0 - sin_half)).sqrt();

        let q = planner.queue();
        let first = q.get(q.predecessor_index(q.newest_index().unwrap()));
        let second = q.newest().unwrap();
        assert!((first.exit_v - expected).abs() < 1e-3);
        assert!((second.entry_v - expected).abs() < 1e-3);
    }

    #[test]
    fn reversal_forces_zero_junction_velocity() {
        let limits = full_limits(1200.0, 5e7, 0.05);
        let mut planner: MotionPlanner<32> = MotionPlanner::new(limits);
        planner.submit_line(vec_x(10.0), 10.0 / 1200.0, MotionMode::Feed).unwrap();
        planner.submit_line(vec_x(0.0), 10.0 / 1200.0, MotionMode::Feed).unwrap();

        let second = planner.queue().newest().unwrap();
        assert_eq!(second.entry_v, 0.0);
    }

    #[test]
    fn zero_length_move_is_rejected() {
        let limits = full_limits(1200.0, 5e7, 0.05);
        let mut planner: MotionPlanner<32> = MotionPlanner::new(limits);
        assert_eq!(planner.submit_line(Vector::ZERO, 1.0, MotionMode::Feed), Err(PlannerError::ZeroLengthMove));
    }

    #[test]
    fn queue_full_is_reported_without_panicking() {
        let limits = full_limits(1200.0, 5e7, 0.05);
        let mut planner: MotionPlanner<2> = MotionPlanner::new(limits);
        planner.submit_line(vec_x(1.0), 1.0, MotionMode::Feed).unwrap();
        planner.submit_line(vec_x(2.0), 1.0, MotionMode::Feed).unwrap();
        assert_eq!(planner.submit_line(vec_x(3.0), 1.0, MotionMode::Feed), Err(PlannerError::QueueFull));
    }

    #[test]
    fn back_planning_is_idempotent() {
        let limits = full_limits(1200.0, 5e7, 0.05);
        let mut planner: MotionPlanner<32> = MotionPlanner::new(limits);
        planner.submit_line(vec_x(10.0), 10.0 / 1200.0, MotionMode::Feed).unwrap();
        planner.submit_line(vec_x(20.0), 10.0 / 1200.0, MotionMode::Feed).unwrap();

        let before = snapshot(&planner);
        planner.back_plan();
        let after = snapshot(&planner);
        assert_eq!(before, after);
    }

    fn snapshot(planner: &MotionPlanner<32>) -> [(f64, f64, f64); 8] {
        let mut out = [(0.0, 0.0, 0.0); 8];
        for (i, (_, b)) in planner.queue().iter_newest_to_oldest().enumerate().take(8) {
            out[i] = (b.entry_v, b.cruise_v, b.exit_v);
        }
        out
    }

    // A short buffer forced to a low exit_v by its successor, whose own
    // entry_v is too high to decelerate to that exit_v within its length,
    // has entry_v clamped down -- and the predecessor picks that clamp up
    // as its own exit_v ceiling on the very next loop iteration.
    #[test]
    fn back_planning_lowers_unreachable_entry_v_and_cascades_to_predecessor() {
        let limits = full_limits(1200.0, 5e7, 0.05);
        let mut planner: MotionPlanner<32> = MotionPlanner::new(limits);
        // Long approach so the first move reaches full feedrate.
        planner.submit_line(vec_x(200.0), 200.0 / 1200.0, MotionMode::Feed).unwrap();
        // Tiny second move: junction stays at the shared feedrate (collinear)
        // but its own length can't decelerate from that entry_v down to the
        // forced reversal exit_v of the third move.
        planner.submit_line(vec_x(200.0 + 1e-4), 1e-4 / 1200.0, MotionMode::Feed).unwrap();
        // Reversal forces the middle move's exit_v to 0.
        planner.submit_line(vec_x(200.0), 1e-4 / 1200.0, MotionMode::Feed).unwrap();

        let q = planner.queue();
        let third_idx = q.newest_index().unwrap();
        let second_idx = q.predecessor_index(third_idx);
        let first_idx = q.predecessor_index(second_idx);

        let second = q.get(second_idx);
        let first = q.get(first_idx);

        // The middle buffer's entry_v was clamped to what its own (tiny)
        // length can actually decelerate from, given its forced exit_v = 0.
        assert!(second.entry_v < 1200.0);
        let (_, decel_dist) = scurve::ramp_time_distance(second.entry_v, second.exit_v, second.jerk);
        assert!(decel_dist <= second.length + 1e-6);

        // The cascade reached the first buffer: its exit_v was capped to
        // the clamped entry_v rather than left at the full feedrate.
        assert_eq!(first.exit_v, second.entry_v);

        // A second, submit-free pass is stable (idempotent) at the new
        // values.
        let before = (first.exit_v, second.entry_v, second.exit_v);
        planner.back_plan();
        let q = planner.queue();
        let second = q.get(second_idx);
        let first = q.get(first_idx);
        assert_eq!(before, (first.exit_v, second.entry_v, second.exit_v));
    }

    #[test]
    fn arc_lock_blocks_direct_submission_until_released() {
        let limits = full_limits(1200.0, 5e7, 0.05);
        let mut planner: MotionPlanner<32> = MotionPlanner::new(limits);
        planner.begin_arc().unwrap();
        assert_eq!(planner.submit_line(vec_x(1.0), 1.0, MotionMode::Feed), Err(PlannerError::ArcInProgress));
        assert_eq!(planner.begin_arc(), Err(PlannerError::ArcInProgress));
        planner.submit_arc_chord(vec_x(1.0), 1.0, MotionMode::ArcCw).unwrap();
        planner.end_arc();
        assert!(planner.submit_line(vec_x(2.0), 1.0, MotionMode::Feed).is_ok());
    }
}
