//! The segment executor: MED-priority logic that slices the currently
//! running planner buffer (the runtime block, `MR`) into fixed-duration
//! prep segments (`SP`) for the step generator to load.
//!
//! Per the design note on floating point vs fixed point, the executor
//! keeps doubles all the way through the runtime block and only converts
//! to integer step counts and DDA tick counts at the `PrepSegment`
//! boundary -- the HI-priority step generator downstream never touches a
//! float.

use crate::planner::MotionPlanner;
use crate::scurve::{self, ScurveTiming};
use crate::types::{MoveType, Phase, Vector, MAX_AXES};

/// Step direction for one motor in a segment.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Positive,
    Negative,
}

/// Single-slot ownership, matching the data model's `owned-by-loader` /
/// `owned-by-exec` alternation. The loader (HI/LO priority) must never read
/// a `PrepSegment` while this is `OwnedByExec`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Ownership {
    OwnedByExec,
    #[default]
    OwnedByLoader,
}

/// Values ready to be loaded by the step generator: one ~5 ms slice of a
/// running buffer's motion (or a null/idle marker).
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PrepSegment {
    pub step_count: [u32; MAX_AXES],
    pub direction: [Direction; MAX_AXES],
    /// Timer reload value driving the DDA tick rate for this segment.
    pub dda_period: u32,
    /// Number of DDA ticks the step generator runs for this segment.
    pub tick_count: u32,
    /// `tick_count * substep_scale`, handed to the step generator's
    /// Bresenham accumulator so its integer math never needs to know the
    /// segment's real-world duration.
    pub tick_substep_product: u64,
    /// Set on the first segment of a freshly loaded buffer, where a
    /// velocity discontinuity across the BF boundary means the DDA
    /// accumulator should restart rather than carry its residual forward.
    pub counter_reset: bool,
    pub owner: Ownership,
    /// No motor motion and no tick countdown: the executor has nothing
    /// queued. The step generator idles until the next load request.
    pub is_null: bool,
}

impl PrepSegment {
    pub fn null() -> Self {
        Self {
            step_count: [0; MAX_AXES],
            direction: [Direction::Positive; MAX_AXES],
            dda_period: 0,
            tick_count: 0,
            tick_substep_product: 0,
            counter_reset: false,
            owner: Ownership::OwnedByExec,
            is_null: true,
        }
    }

    /// A segment with a tick countdown but no step emission, for dwells.
    fn dwell(dda_period: u32, tick_count: u32) -> Self {
        Self {
            step_count: [0; MAX_AXES],
            direction: [Direction::Positive; MAX_AXES],
            dda_period,
            tick_count,
            tick_substep_product: 0,
            counter_reset: false,
            owner: Ownership::OwnedByExec,
            is_null: false,
        }
    }
}

/// Static parameters the executor needs beyond what the planner buffer
/// carries: the per-axis step scale and the fixed segment/DDA timing.
/// Lighter-weight sibling of `tinyg-config::MotorConfig`, kept separate for
/// the same reason `PlannerLimits` is.
#[derive(Debug, Copy, Clone)]
pub struct ExecutorLimits {
    pub steps_per_unit: [f64; MAX_AXES],
    /// Nominal segment duration, seconds (spec targets ~5 ms).
    pub segment_duration_seconds: f64,
    /// DDA tick rate, Hz (overclocking off: this is the real tick rate).
    pub dda_tick_rate_hz: f64,
    /// Timer reload value corresponding to `dda_tick_rate_hz`.
    pub dda_period: u32,
    /// Power-of-two substep scale applied to the tick/step accumulator.
    pub substep_scale: u32,
}

impl ExecutorLimits {
    fn segment_duration_min(&self) -> f64 {
        self.segment_duration_seconds / 60.0
    }
}

/// The runtime block (`MR`): the currently executing buffer's profile plus
/// the executor's progress through it.
#[derive(Debug, Copy, Clone)]
struct RuntimeBlock {
    move_type: MoveType,
    unit: Vector,
    length: f64,
    entry_v: f64,
    cruise_v: f64,
    exit_v: f64,
    jerk: f64,
    timing: ScurveTiming,
    dwell_seconds: f64,
    elapsed_time: f64,
    distance_traveled: f64,
    phase: Phase,
    active: bool,
}

impl Default for RuntimeBlock {
    fn default() -> Self {
        Self {
            move_type: MoveType::Null,
            unit: Vector::ZERO,
            length: 0.0,
            entry_v: 0.0,
            cruise_v: 0.0,
            exit_v: 0.0,
            jerk: 0.0,
            timing: ScurveTiming::default(),
            dwell_seconds: 0.0,
            elapsed_time: 0.0,
            distance_traveled: 0.0,
            phase: Phase::Head,
            active: false,
        }
    }
}

/// Produces `PrepSegment`s from the planner's running buffer, one call per
/// load request from the step generator.
pub struct SegmentExecutor {
    limits: ExecutorLimits,
    mr: RuntimeBlock,
    position: Vector,
    step_accum: [f64; MAX_AXES],
}

impl SegmentExecutor {
    pub fn new(limits: ExecutorLimits) -> Self {
        Self {
            limits,
            mr: RuntimeBlock::default(),
            position: Vector::ZERO,
            step_accum: [0.0; MAX_AXES],
        }
    }

    /// Current machine position as tracked by the executor (used to
    /// recover the exact position a feedhold stopped at).
    pub fn position(&self) -> Vector {
        self.position
    }

    pub fn is_idle(&self) -> bool {
        !self.mr.active
    }

    /// Instantaneous commanded velocity at the executor's current point in
    /// the running buffer's profile, used by a feedhold request to seed the
    /// decel recompute with the actual velocity rather than a stale value.
    pub fn current_velocity(&self) -> f64 {
        if !self.mr.active || !matches!(self.mr.move_type, MoveType::Line | MoveType::ArcChord) {
            return 0.0;
        }
        scurve::velocity_at(self.mr.entry_v, self.mr.cruise_v, self.mr.exit_v, self.mr.jerk, &self.mr.timing, self.mr.elapsed_time)
    }

    /// Produces the next prep segment, pulling a new buffer from the
    /// planner's run cursor if the executor is idle, and skipping
    /// zero-length administrative buffers (M-codes, nulls) instantly.
    pub fn run_once<const N: usize>(&mut self, planner: &mut MotionPlanner<N>) -> PrepSegment {
        if !self.mr.active && !self.try_load_next(planner) {
            return PrepSegment::null();
        }

        while matches!(self.mr.move_type, MoveType::Mcode(_) | MoveType::Null) {
            self.finish_current(planner);
            if !self.try_load_next(planner) {
                return PrepSegment::null();
            }
        }

        if self.mr.move_type == MoveType::Dwell {
            return self.run_dwell_segment(planner);
        }

        self.run_motion_segment(planner)
    }

    fn try_load_next<const N: usize>(&mut self, planner: &mut MotionPlanner<N>) -> bool {
        let buf = match planner.mark_running() {
            Some(b) => *b,
            None => {
                self.mr.active = false;
                return false;
            }
        };

        let (cruise_v, _head_len, _body_len, _tail_len, timing) =
            scurve::plan_profile(buf.length, buf.entry_v, buf.exit_v, buf.cruise_vmax, buf.jerk);

        self.mr = RuntimeBlock {
            move_type: buf.move_type,
            unit: buf.unit,
            length: buf.length,
            entry_v: buf.entry_v,
            cruise_v,
            exit_v: buf.exit_v,
            jerk: buf.jerk,
            timing,
            dwell_seconds: buf.dwell_seconds,
            elapsed_time: 0.0,
            distance_traveled: 0.0,
            phase: Phase::Head,
            active: true,
        };
        true
    }

    fn finish_current<const N: usize>(&mut self, planner: &mut MotionPlanner<N>) {
        planner.pop_completed();
    }

    /// Feedhold: recomputes the runtime block in place so it decelerates to
    /// rest from its current velocity within the distance remaining in the
    /// buffer, per the simpler of the two documented feedhold policies. A
    /// no-op while idle or mid-dwell/administrative buffer.
    pub fn feedhold(&mut self) {
        if !self.mr.active || !matches!(self.mr.move_type, MoveType::Line | MoveType::ArcChord) {
            return;
        }
        let current_v = self.current_velocity();
        let remaining = (self.mr.length - self.mr.distance_traveled).max(0.0);
        let (cruise_v, _head_len, _body_len, _tail_len, timing) = scurve::plan_profile(remaining, current_v, 0.0, current_v, self.mr.jerk);
        self.mr.entry_v = current_v;
        self.mr.exit_v = 0.0;
        self.mr.cruise_v = cruise_v;
        self.mr.timing = timing;
        self.mr.length = remaining;
        self.mr.distance_traveled = 0.0;
        self.mr.elapsed_time = 0.0;
    }

    fn phase_at(&self, t: f64) -> Phase {
        let head_end = self.mr.timing.t_j1 + self.mr.timing.t_a + self.mr.timing.t_j2;
        let body_end = head_end + self.mr.timing.t_c;
        if t < head_end {
            Phase::Head
        } else if t < body_end {
            Phase::Body
        } else if t < self.mr.timing.total() {
            Phase::Tail
        } else {
            Phase::TailEnd
        }
    }

    fn run_motion_segment<const N: usize>(&mut self, planner: &mut MotionPlanner<N>) -> PrepSegment {
        let total_time = self.mr.timing.total();
        let t_start = self.mr.elapsed_time;
        let t_end = (t_start + self.limits.segment_duration_min()).min(total_time);
        let dt = (t_end - t_start).max(0.0);

        let v_start = scurve::velocity_at(self.mr.entry_v, self.mr.cruise_v, self.mr.exit_v, self.mr.jerk, &self.mr.timing, t_start);
        let v_end = scurve::velocity_at(self.mr.entry_v, self.mr.cruise_v, self.mr.exit_v, self.mr.jerk, &self.mr.timing, t_end);
        let mut distance = (v_start + v_end) / 2.0 * dt;

        let remaining = (self.mr.length - self.mr.distance_traveled).max(0.0);
        let finished_by_time = t_end >= total_time - 1e-9;
        if distance >= remaining {
            distance = remaining;
        }
        let finished = finished_by_time || distance >= remaining - 1e-9;

        let counter_reset = t_start <= 1e-12;
        self.mr.phase = self.phase_at(t_end);
        let sp = self.build_prep_segment(distance, dt, counter_reset);

        self.mr.elapsed_time = t_end;
        self.mr.distance_traveled += distance;
        for i in 0..MAX_AXES {
            self.position.axes[i] += self.mr.unit.axes[i] * distance;
        }

        if finished {
            self.finish_current(planner);
            self.mr.active = false;
        }

        sp
    }

    fn run_dwell_segment<const N: usize>(&mut self, planner: &mut MotionPlanner<N>) -> PrepSegment {
        let total_min = self.mr.dwell_seconds / 60.0;
        let t_start = self.mr.elapsed_time;
        let t_end = (t_start + self.limits.segment_duration_min()).min(total_min);
        let dt = (t_end - t_start).max(0.0);

        let tick_count = (dt * 60.0 * self.limits.dda_tick_rate_hz).round().max(0.0) as u32;
        self.mr.elapsed_time = t_end;
        let finished = t_end >= total_min - 1e-9;
        if finished {
            self.finish_current(planner);
            self.mr.active = false;
        }

        PrepSegment::dwell(self.limits.dda_period, tick_count)
    }

    fn build_prep_segment(&mut self, distance: f64, dt_min: f64, counter_reset: bool) -> PrepSegment {
        let mut step_count = [0u32; MAX_AXES];
        let mut direction = [Direction::Positive; MAX_AXES];
        for i in 0..MAX_AXES {
            let mm = self.mr.unit.axes[i] * distance;
            self.step_accum[i] += mm * self.limits.steps_per_unit[i];
            let whole = self.step_accum[i].trunc();
            self.step_accum[i] -= whole;
            direction[i] = if whole >= 0.0 { Direction::Positive } else { Direction::Negative };
            step_count[i] = whole.abs() as u32;
        }

        let dt_seconds = dt_min * 60.0;
        let tick_count = (dt_seconds * self.limits.dda_tick_rate_hz).round().max(0.0) as u32;

        PrepSegment {
            step_count,
            direction,
            dda_period: self.limits.dda_period,
            tick_count,
            tick_substep_product: tick_count as u64 * self.limits.substep_scale as u64,
            counter_reset,
            owner: Ownership::OwnedByExec,
            is_null: false,
        }
    }
}
