//! Axis/motor/system configuration registry and persisted-record layout.
//!
//! `std`-only: the INI bring-up loader and the registry's mutation methods
//! are foreground-only concerns, never touched from ISR context. ISR-side
//! crates (`tinyg-planner`, `tinyg-stepgen`, `tinyg-switch`) only ever see
//! the lightweight projections this crate derives from a `ConfigRegistry`
//! (`PlannerLimits`, `ExecutorLimits`, `SwitchArray`), never this crate
//! itself.

mod ini;
mod record;
mod registry;
mod types;

pub use record::{decode_profile, encode_profile, ConfigRecord, GroupId, PROFILE_TRAILER, RECORD_SIZE};
pub use registry::{ConfigLockedError, ConfigRegistry, MotionGate};
pub use types::{
    AxisConfig, AxisMode, DistanceMode, GcodeDefaults, IdlePowerMode, MotorConfig, Microsteps, Plane, Polarity,
    PathControl, SystemConfig, Units, MAX_AXES, MAX_MOTORS,
};
