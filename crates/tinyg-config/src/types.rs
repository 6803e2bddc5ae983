//! Strongly-typed configuration records for the axis/motor config and the
//! general configuration surface.

use tinyg_switch::SwitchMode;

/// Number of logical axes the config surface supports (X, Y, Z, A, B, C).
pub const MAX_AXES: usize = 6;
/// Number of motors supported, one per of up to 6 motors.
pub const MAX_MOTORS: usize = 6;

/// How an axis participates in motion, including the slave-axis gantry
/// modes a configuration surface needs to enumerate.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum AxisMode {
    Disabled,
    #[default]
    Standard,
    Inhibited,
    Radius,
    SlaveX,
    SlaveY,
    SlaveZ,
    SlaveXY,
    SlaveXZ,
    SlaveYZ,
    SlaveXYZ,
}

/// Static kinematics for one axis.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct AxisConfig {
    pub axis_mode: AxisMode,
    pub feedrate_max: f64,
    pub velocity_max: f64,
    pub travel_max: f64,
    pub jerk_max: f64,
    pub junction_deviation: f64,
    /// Only meaningful when `axis_mode == Radius` (a rotary axis geared to
    /// a linear-equivalent radius).
    pub radius: f64,
    pub switch_min: SwitchMode,
    pub switch_max: SwitchMode,
    pub homing_search_velocity: f64,
    pub homing_latch_velocity: f64,
    pub homing_latch_backoff: f64,
    pub homing_zero_backoff: f64,
}

impl Default for AxisConfig {
    fn default() -> Self {
        Self {
            axis_mode: AxisMode::Disabled,
            feedrate_max: 0.0,
            velocity_max: 0.0,
            travel_max: 0.0,
            jerk_max: 0.0,
            junction_deviation: 0.0,
            radius: 0.0,
            switch_min: SwitchMode::Disabled,
            switch_max: SwitchMode::Disabled,
            homing_search_velocity: 0.0,
            homing_latch_velocity: 0.0,
            homing_latch_backoff: 0.0,
            homing_zero_backoff: 0.0,
        }
    }
}

/// Microstep divisor a motor driver is wired for.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Microsteps {
    #[default]
    X1,
    X2,
    X4,
    X8,
}

impl Microsteps {
    pub fn divisor(self) -> u32 {
        match self {
            Microsteps::X1 => 1,
            Microsteps::X2 => 2,
            Microsteps::X4 => 4,
            Microsteps::X8 => 8,
        }
    }
}

/// Polarity of a motor's step/dir output relative to its commanded
/// direction.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Polarity {
    #[default]
    Normal,
    Inverted,
}

/// Whether a motor's driver is left powered when idle.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum IdlePowerMode {
    AlwaysOff,
    #[default]
    AlwaysOn,
}

/// Per-motor mapping onto an axis.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct MotorConfig {
    /// Index into the axis table this motor drives, or `None` if unmapped.
    pub axis: Option<usize>,
    pub microsteps: Microsteps,
    pub polarity: Polarity,
    pub idle_power_mode: IdlePowerMode,
    pub step_angle_deg: f64,
    pub travel_per_rev: f64,
}

impl Default for MotorConfig {
    fn default() -> Self {
        Self {
            axis: None,
            microsteps: Microsteps::X1,
            polarity: Polarity::Normal,
            idle_power_mode: IdlePowerMode::AlwaysOn,
            step_angle_deg: 1.8,
            travel_per_rev: 1.0,
        }
    }
}

impl MotorConfig {
    /// Steps-per-unit derived from step angle, microsteps and travel-per-rev,
    /// matching the data model's `steps_per_unit` the executor needs.
    pub fn steps_per_unit(&self) -> f64 {
        let steps_per_rev = 360.0 / self.step_angle_deg * self.microsteps.divisor() as f64;
        if self.travel_per_rev.abs() < 1e-12 {
            0.0
        } else {
            steps_per_rev / self.travel_per_rev
        }
    }
}

/// System-wide tuning parameters, the "system" configuration group.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SystemConfig {
    pub min_segment_len_mm: f64,
    pub arc_segment_len_mm: f64,
    pub min_segment_time_us: f64,
    pub junction_acceleration: f64,
    pub enable_acceleration: bool,
    pub segment_duration_seconds: f64,
    pub dda_tick_rate_hz: f64,
    pub substep_scale: u32,
    pub planner_queue_depth: usize,
    pub switch_lockout_ticks: u16,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            min_segment_len_mm: 0.01,
            arc_segment_len_mm: 0.1,
            min_segment_time_us: 2500.0,
            junction_acceleration: 100_000.0,
            enable_acceleration: true,
            segment_duration_seconds: 0.005,
            dda_tick_rate_hz: 50_000.0,
            substep_scale: 256,
            planner_queue_depth: 32,
            switch_lockout_ticks: 50,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Plane {
    #[default]
    Xy,
    Xz,
    Yz,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Units {
    Inches,
    #[default]
    Millimeters,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum PathControl {
    ExactStop,
    ExactPath,
    #[default]
    ContinuousWithTolerance,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum DistanceMode {
    #[default]
    Absolute,
    Incremental,
}

/// G-code modal defaults: the canonical machine's starting modal state,
/// not mutated by the motion core itself.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct GcodeDefaults {
    /// Active coordinate system, 0-based (G54 = 0 .. G59 = 5).
    pub coordinate_system: u8,
    pub plane: Plane,
    pub units: Units,
    pub path_control: PathControl,
    pub distance_mode: DistanceMode,
}

impl Default for GcodeDefaults {
    fn default() -> Self {
        Self {
            coordinate_system: 0,
            plane: Plane::Xy,
            units: Units::Millimeters,
            path_control: PathControl::ContinuousWithTolerance,
            distance_mode: DistanceMode::Absolute,
        }
    }
}
