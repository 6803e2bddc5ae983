//! Constant-jerk S-curve velocity profile math.
//!
//! A head or tail ramp is modelled as two concatenated parabolic-velocity
//! half-segments (closed form): for a transition from `v1` to `v2` under
//! jerk `J`, duration `T = 2*sqrt(|v2-v1|/J)` and distance
//! `D = (v1+v2)/2 * T`. There is no separate constant-acceleration
//! plateau -- the data model only carries a per-buffer `jerk`, not an
//! `accel` -- so a full head/tail ramp is exactly two equal-duration
//! parabolic halves, `T/2` each: the same seven-segment head/body/tail
//! layout other jerk-limited planners use, with the constant-accel
//! segments (`t_a`, `t_d`) always zero.
//!
//! When a move is too short to reach its nominal cruise velocity, the
//! triangular peak velocity is found by bisection on the (monotone) total
//! ramp distance, since the general asymmetric-entry/exit case has no
//! simple closed form.

#[inline]
fn fsqrt(v: f64) -> f64 {
    #[cfg(feature = "std")]
    {
        v.sqrt()
    }
    #[cfg(not(feature = "std"))]
    {
        libm::sqrt(v)
    }
}

#[inline]
fn ffabs(v: f64) -> f64 {
    #[cfg(feature = "std")]
    {
        v.abs()
    }
    #[cfg(not(feature = "std"))]
    {
        libm::fabs(v)
    }
}

/// Timing of one full move's velocity profile, broken into the seven
/// jerk-limited segments TinyG's S-curve uses: accel-jerk-in, accel-const,
/// accel-jerk-out, cruise, decel-jerk-in, decel-const, decel-jerk-out. The
/// const-accel segments (`t_a`, `t_d`) are always zero in this model; the
/// fields are kept separate to mirror the data model's phase layout.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct ScurveTiming {
    pub t_j1: f64,
    pub t_a: f64,
    pub t_j2: f64,
    pub t_c: f64,
    pub t_j3: f64,
    pub t_d: f64,
    pub t_j4: f64,
}

impl ScurveTiming {
    pub fn total(&self) -> f64 {
        self.t_j1 + self.t_a + self.t_j2 + self.t_c + self.t_j3 + self.t_d + self.t_j4
    }
}

/// Duration and distance of a single constant-jerk ramp from `v1` to `v2`.
pub fn ramp_time_distance(v1: f64, v2: f64, jerk: f64) -> (f64, f64) {
    if jerk <= 0.0 || ffabs(v2 - v1) < 1e-12 {
        return (0.0, 0.0);
    }
    let t = 2.0 * fsqrt(ffabs(v2 - v1) / jerk);
    let d = (v1 + v2) / 2.0 * t;
    (t, d)
}

/// Finds, by bisection, the peak velocity `v` (`>= max(entry_v, exit_v)`,
/// `<= nominal_cruise_v`) such that the head ramp `entry_v -> v` plus the
/// tail ramp `v -> exit_v` together consume exactly `length`.
fn solve_triangular_peak(length: f64, entry_v: f64, exit_v: f64, nominal_cruise_v: f64, jerk: f64) -> f64 {
    let lo_bound = entry_v.max(exit_v);
    let mut lo = lo_bound;
    let mut hi = nominal_cruise_v.max(lo_bound);

    let total_dist = |v: f64| -> f64 {
        let (_, d1) = ramp_time_distance(entry_v, v, jerk);
        let (_, d2) = ramp_time_distance(v, exit_v, jerk);
        d1 + d2
    };

    // Guard against a degenerate (zero-jerk or zero-range) configuration.
    if hi <= lo || total_dist(hi) <= length {
        return hi;
    }

    for _ in 0..60 {
        let mid = (lo + hi) / 2.0;
        if total_dist(mid) > length {
            hi = mid;
        } else {
            lo = mid;
        }
    }
    (lo + hi) / 2.0
}

/// Finds, by bisection, the largest `entry_v` (`>= exit_v`) whose pure decel
/// ramp down to `exit_v` fits within `length` at the given jerk. Used by
/// back-planning when a buffer's recorded `entry_v` turns out to be
/// unreachable within its own length once a tighter `exit_v` is forced on
/// it by its successor -- the buffer's `entry_v` is clamped to what its
/// own length can actually deliver, and the predecessor picks that up as
/// its own `exit_v` constraint on the next loop iteration.
pub fn max_entry_for_exit(exit_v: f64, length: f64, jerk: f64) -> f64 {
    if jerk <= 0.0 || length <= 0.0 {
        return exit_v;
    }
    let mut lo = exit_v;
    let mut hi = exit_v + fsqrt(length * jerk).max(1.0);
    let mut expand = 0;
    while ramp_time_distance(hi, exit_v, jerk).1 < length && expand < 64 {
        hi *= 2.0;
        expand += 1;
    }
    for _ in 0..60 {
        let mid = (lo + hi) / 2.0;
        if ramp_time_distance(mid, exit_v, jerk).1 > length {
            hi = mid;
        } else {
            lo = mid;
        }
    }
    (lo + hi) / 2.0
}

/// Computes the cruise velocity actually reached, the head/body/tail
/// lengths, and the full jerk-limited timing for a move of length
/// `length` given `entry_v`, `exit_v`, a nominal (junction- and
/// feedrate-limited) cruise velocity, and jerk. `cruise_v` may be lower
/// than `nominal_cruise_v` if the move is too short to reach it (a
/// triangular profile).
pub fn plan_profile(
    length: f64,
    entry_v: f64,
    exit_v: f64,
    nominal_cruise_v: f64,
    jerk: f64,
) -> (f64, f64, f64, f64, ScurveTiming) {
    let nominal_cruise_v = nominal_cruise_v.max(entry_v).max(exit_v);
    let (_, nominal_head) = ramp_time_distance(entry_v, nominal_cruise_v, jerk);
    let (_, nominal_tail) = ramp_time_distance(nominal_cruise_v, exit_v, jerk);

    let cruise_v = if nominal_head + nominal_tail > length {
        solve_triangular_peak(length, entry_v, exit_v, nominal_cruise_v, jerk)
    } else {
        nominal_cruise_v
    };

    let (t_head, head_len) = ramp_time_distance(entry_v, cruise_v, jerk);
    let (t_tail, tail_len) = ramp_time_distance(cruise_v, exit_v, jerk);
    let body_len = (length - head_len - tail_len).max(0.0);
    let t_c = if cruise_v > 1e-9 { body_len / cruise_v } else { 0.0 };

    let timing = ScurveTiming {
        t_j1: t_head / 2.0,
        t_a: 0.0,
        t_j2: t_head / 2.0,
        t_c,
        t_j3: t_tail / 2.0,
        t_d: 0.0,
        t_j4: t_tail / 2.0,
    };

    (cruise_v, head_len, body_len, tail_len, timing)
}

/// Samples instantaneous velocity at time `t` (seconds) into a move whose
/// profile was computed by `plan_profile`.
pub fn velocity_at(entry_v: f64, cruise_v: f64, exit_v: f64, jerk: f64, timing: &ScurveTiming, t: f64) -> f64 {
    let t1 = timing.t_j1;
    let t2 = t1 + timing.t_a;
    let t3 = t2 + timing.t_j2;
    let t4 = t3 + timing.t_c;
    let t5 = t4 + timing.t_j3;
    let t6 = t5 + timing.t_d;

    if t < t1 {
        entry_v + 0.5 * jerk * t * t
    } else if t < t2 {
        let plateau = jerk * t1;
        entry_v + 0.5 * jerk * t1 * t1 + plateau * (t - t1)
    } else if t < t3 {
        let dt = t3 - t;
        cruise_v - 0.5 * jerk * dt * dt
    } else if t < t4 {
        cruise_v
    } else if t < t5 {
        let dt = t - t4;
        cruise_v - 0.5 * jerk * dt * dt
    } else if t < t6 {
        let plateau = jerk * timing.t_j3;
        let dt = t - t5;
        cruise_v - 0.5 * jerk * timing.t_j3 * timing.t_j3 - plateau * dt
    } else {
        let dt = (timing.t_j4 - (t - t6)).max(0.0);
        exit_v + 0.5 * jerk * dt * dt
    }
}
