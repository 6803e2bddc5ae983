//! Shared data types for the planner, arc generator and segment executor.
//!
//! These mirror the `BF` (planner buffer) and `MR` (runtime block) entities
//! from the data model: a fixed-size, stack-only representation so the
//! planner can run with no allocator on the MCU build.

#![allow(clippy::len_without_is_empty)]

/// Number of logical axes the planner understands (X, Y, Z, A, B, C).
pub const MAX_AXES: usize = 6;

/// A vector with one component per logical axis, in internal canonical
/// units (mm for linear axes, degrees for rotary axes).
#[derive(Debug, Copy, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
pub struct Vector {
    pub axes: [f64; MAX_AXES],
}

impl Vector {
    pub const ZERO: Vector = Vector { axes: [0.0; MAX_AXES] };

    pub fn sub(&self, other: &Vector) -> Vector {
        let mut out = Vector::ZERO;
        for i in 0..MAX_AXES {
            out.axes[i] = self.axes[i] - other.axes[i];
        }
        out
    }

    pub fn magnitude(&self) -> f64 {
        sqrt(self.axes.iter().map(|v| v * v).sum())
    }

    pub fn is_zero(&self, epsilon: f64) -> bool {
        self.axes.iter().all(|v| fabs(*v) < epsilon)
    }

    /// Unit vector, or `Vector::ZERO` if `self` has ~zero length.
    pub fn unit(&self) -> Vector {
        let mag = self.magnitude();
        if mag < 1e-12 {
            return Vector::ZERO;
        }
        let mut out = Vector::ZERO;
        for i in 0..MAX_AXES {
            out.axes[i] = self.axes[i] / mag;
        }
        out
    }

    pub fn dot(&self, other: &Vector) -> f64 {
        self.axes.iter().zip(other.axes.iter()).map(|(a, b)| a * b).sum()
    }
}

#[cfg(feature = "std")]
fn sqrt(v: f64) -> f64 {
    v.sqrt()
}
#[cfg(not(feature = "std"))]
fn sqrt(v: f64) -> f64 {
    libm::sqrt(v)
}

#[cfg(feature = "std")]
fn fabs(v: f64) -> f64 {
    v.abs()
}
#[cfg(not(feature = "std"))]
fn fabs(v: f64) -> f64 {
    libm::fabs(v)
}

/// Whether a line is commanded as a feed move (bounded by `feedrate_max`) or
/// a rapid traverse (bounded by `velocity_max`).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MotionMode {
    Feed,
    Traverse,
    /// CW arc chord.
    ArcCw,
    /// CCW arc chord.
    ArcCcw,
}

/// The M-code categories the core motion pipeline needs to sequence, as
/// opaque tokens -- their semantics (spindle, coolant, program flow) belong
/// to the canonical machine, an external collaborator.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum McodeKind {
    SpindleOn,
    SpindleOff,
    CoolantOn,
    CoolantOff,
    ProgramStop,
    ProgramEnd,
}

/// Lifecycle state of a single planner buffer (`BF`).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum BufferState {
    #[default]
    Empty,
    Queued,
    Pending,
    Running,
}

/// What kind of move a planner buffer represents.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum MoveType {
    Line,
    ArcChord,
    Dwell,
    Mcode(McodeKind),
    Null,
}

/// Which third of the jerk-limited velocity profile the executor is
/// currently sampling.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Head,
    Body,
    Tail,
    TailEnd,
}

/// One planned move: a `BF` in the data model.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PlannerBuffer {
    pub state: BufferState,
    pub move_type: MoveType,
    pub unit: Vector,
    /// Absolute canonical-space position this move ends at.
    pub target: Vector,
    pub length: f64,
    pub entry_vmax: f64,
    pub cruise_vmax: f64,
    pub exit_vmax: f64,
    pub entry_v: f64,
    pub cruise_v: f64,
    pub exit_v: f64,
    pub head_len: f64,
    pub body_len: f64,
    pub tail_len: f64,
    /// Effective jerk bounding the head/tail ramps of this move (mm/min^3).
    pub jerk: f64,
    /// Dwell duration in seconds, only meaningful for `MoveType::Dwell`.
    pub dwell_seconds: f64,
    pub line_number: u32,
    /// True once back-planning has converged for this buffer (used to
    /// short-circuit the idempotent back-planning walk).
    pub planned: bool,
}

impl Default for PlannerBuffer {
    fn default() -> Self {
        Self {
            state: BufferState::Empty,
            move_type: MoveType::Null,
            unit: Vector::ZERO,
            target: Vector::ZERO,
            length: 0.0,
            entry_vmax: 0.0,
            cruise_vmax: 0.0,
            exit_vmax: 0.0,
            entry_v: 0.0,
            cruise_v: 0.0,
            exit_v: 0.0,
            head_len: 0.0,
            body_len: 0.0,
            tail_len: 0.0,
            jerk: 0.0,
            dwell_seconds: 0.0,
            line_number: 0,
            planned: false,
        }
    }
}

impl PlannerBuffer {
    pub fn is_motion(&self) -> bool {
        matches!(self.move_type, MoveType::Line | MoveType::ArcChord)
    }
}
