//! Error types for the planner, arc generator and segment executor.
//!
//! These stay plain `core`-only enums (no `thiserror`) since this crate is
//! `no_std`-capable and runs inside the MED-priority segment executor;
//! `thiserror` is reserved for the `std`-only host crates (`tinyg-config`,
//! `tinyg-cycle`, `tinyg-sim`) that wrap these into richer error types.

use core::fmt;

/// Errors raised while submitting moves to the planner.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum PlannerError {
    /// No empty buffer is available; the caller must retry.
    QueueFull,
    /// Total step delta across all motors is below epsilon.
    ZeroLengthMove,
    /// An invariant was violated (NaN/Inf arithmetic, BF in an unexpected
    /// state). Escalates to alarm in the cycle controller.
    InternalError,
    /// `submit_line`/`submit_arc` called while an arc generator holds the
    /// write slot mid-generation.
    ArcInProgress,
}

impl fmt::Display for PlannerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            PlannerError::QueueFull => "planner queue is full",
            PlannerError::ZeroLengthMove => "move has zero length",
            PlannerError::InternalError => "internal planner invariant violated",
            PlannerError::ArcInProgress => "arc generation holds the write slot",
        };
        f.write_str(msg)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for PlannerError {}

/// Errors raised by the arc generator.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ArcError {
    /// `arc_length < min_segment_len`.
    ArcSpecificationError,
    /// The underlying planner submission failed for a reason other than
    /// `QueueFull` (a full queue is expected flow control, signaled by
    /// `ArcStepResult::Pending` from `ArcGenerator::step` instead of an
    /// error).
    PlannerError(PlannerError),
}

impl From<PlannerError> for ArcError {
    fn from(e: PlannerError) -> Self {
        ArcError::PlannerError(e)
    }
}

impl fmt::Display for ArcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArcError::ArcSpecificationError => f.write_str("arc length is shorter than the minimum segment length"),
            ArcError::PlannerError(e) => write!(f, "arc chord submission failed: {e}"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ArcError {}
