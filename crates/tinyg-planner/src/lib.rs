//! The motion planner, arc generator and segment executor: the part of the
//! pipeline that turns prepared line/arc/dwell/M-code submissions into
//! jerk-limited velocity profiles and, downstream, fixed-duration prep
//! segments for the step generator.
//!
//! `no_std`-capable (`std` is the default feature) since the segment
//! executor runs at MED priority on the MCU build; the planner itself is
//! only ever driven from the foreground.

#![cfg_attr(not(feature = "std"), no_std)]

pub mod arc;
pub mod errors;
pub mod executor;
pub mod kinematics;
pub mod planner;
pub mod queue;
pub mod scurve;
pub mod types;

pub use arc::{ArcGenerator, ArcStepResult, PlaneAxes, PLANE_XY};
pub use errors::{ArcError, PlannerError};
pub use executor::{Direction, ExecutorLimits, Ownership, PrepSegment, SegmentExecutor};
pub use kinematics::{CartesianKinematics, CoreXYKinematics, Kinematics};
pub use planner::{AxisLimits, MotionPlanner, PlannerLimits};
pub use queue::{PlannerQueue, DEFAULT_QUEUE_DEPTH};
pub use types::{BufferState, McodeKind, MotionMode, MoveType, Phase, PlannerBuffer, Vector, MAX_AXES};
