//! `ConfigRegistry`: the owned, non-global configuration struct the rest of
//! the core reads through a shared reference. Grounded in
//! `klipper-host::state::PrinterState`'s "owned struct, not a global" shape,
//! but carrying TinyG's axis/motor/system tables instead of a printer's
//! temperature map.

use tinyg_planner::planner::{AxisLimits, PlannerLimits};
use tinyg_planner::executor::ExecutorLimits;
use tinyg_switch::{Endpoint, SwitchArray, MAX_AXES as SWITCH_MAX_AXES};

use crate::types::{AxisConfig, GcodeDefaults, MotorConfig, SystemConfig, MAX_AXES, MAX_MOTORS};

/// Whether the machine is standing still. Config mutation is only allowed
/// while this reports `Stopped`: parameters are mutated only in foreground,
/// and only when motion is not running. `tinyg-cycle`'s `MotionState` maps
/// onto this at the call site so this crate never needs to depend on the
/// cycle controller's FSM.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MotionGate {
    Stopped,
    Moving,
}

/// Raised when a configuration mutator is called while `MotionGate::Moving`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
#[error("configuration cannot be mutated while motion is in progress")]
pub struct ConfigLockedError;

/// Owned configuration for every axis, motor, system-wide tunable and
/// G-code modal default. Never a global: `tinyg-cycle`, `tinyg-sim` and
/// `tinyg-firmware` each own one and pass `&ConfigRegistry` into ISR-side
/// code, which only ever gets a const view.
#[derive(Debug, Clone)]
pub struct ConfigRegistry {
    axes: [AxisConfig; MAX_AXES],
    motors: [MotorConfig; MAX_MOTORS],
    system: SystemConfig,
    gcode_defaults: GcodeDefaults,
}

impl Default for ConfigRegistry {
    fn default() -> Self {
        Self {
            axes: [AxisConfig::default(); MAX_AXES],
            motors: [MotorConfig::default(); MAX_MOTORS],
            system: SystemConfig::default(),
            gcode_defaults: GcodeDefaults::default(),
        }
    }
}

impl ConfigRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn axis(&self, index: usize) -> &AxisConfig {
        &self.axes[index]
    }

    pub fn motor(&self, index: usize) -> &MotorConfig {
        &self.motors[index]
    }

    pub fn system(&self) -> &SystemConfig {
        &self.system
    }

    pub fn gcode_defaults(&self) -> &GcodeDefaults {
        &self.gcode_defaults
    }

    /// Overwrites one axis's configuration. Rejected with
    /// `ConfigLockedError` unless `gate == MotionGate::Stopped`.
    pub fn set_axis(&mut self, index: usize, gate: MotionGate, cfg: AxisConfig) -> Result<(), ConfigLockedError> {
        self.guard(gate)?;
        self.axes[index] = cfg;
        tracing::info!(axis = index, "axis config updated");
        Ok(())
    }

    pub fn set_motor(&mut self, index: usize, gate: MotionGate, cfg: MotorConfig) -> Result<(), ConfigLockedError> {
        self.guard(gate)?;
        self.motors[index] = cfg;
        Ok(())
    }

    pub fn set_system(&mut self, gate: MotionGate, cfg: SystemConfig) -> Result<(), ConfigLockedError> {
        self.guard(gate)?;
        self.system = cfg;
        Ok(())
    }

    pub fn set_gcode_defaults(&mut self, gate: MotionGate, defaults: GcodeDefaults) -> Result<(), ConfigLockedError> {
        self.guard(gate)?;
        self.gcode_defaults = defaults;
        Ok(())
    }

    fn guard(&self, gate: MotionGate) -> Result<(), ConfigLockedError> {
        match gate {
            MotionGate::Stopped => Ok(()),
            MotionGate::Moving => {
                tracing::warn!("rejected configuration mutation while motion is in progress");
                Err(ConfigLockedError)
            }
        }
    }

    /// Projects the axis table into the `PlannerLimits` the planner crate
    /// needs, keeping `tinyg-planner` free of any dependency on this crate
    /// (mirrors `motion` never depending on `klipper-host::config`).
    pub fn planner_limits(&self) -> PlannerLimits {
        let mut axes = [AxisLimits::default(); tinyg_planner::types::MAX_AXES];
        for (i, axis) in self.axes.iter().enumerate().take(axes.len()) {
            axes[i] = AxisLimits {
                feedrate_max: axis.feedrate_max,
                velocity_max: axis.velocity_max,
                jerk_max: axis.jerk_max,
                junction_deviation: axis.junction_deviation,
            };
        }
        PlannerLimits { axes }
    }

    /// Builds the executor's per-motor step scale and fixed segment/DDA
    /// timing from the system and motor tables.
    pub fn executor_limits(&self) -> ExecutorLimits {
        let mut steps_per_unit = [0.0; tinyg_planner::types::MAX_AXES];
        for motor in &self.motors {
            if let Some(axis) = motor.axis {
                if axis < steps_per_unit.len() {
                    steps_per_unit[axis] = motor.steps_per_unit();
                }
            }
        }
        let dda_period = if self.system.dda_tick_rate_hz > 0.0 {
            (1.0e6 / self.system.dda_tick_rate_hz).round().max(1.0) as u32
        } else {
            1
        };
        ExecutorLimits {
            steps_per_unit,
            segment_duration_seconds: self.system.segment_duration_seconds,
            dda_tick_rate_hz: self.system.dda_tick_rate_hz,
            dda_period,
            substep_scale: self.system.substep_scale,
        }
    }

    /// Builds a `SwitchArray` pre-populated with every axis's configured
    /// switch modes.
    pub fn build_switch_array<const N: usize>(&self) -> SwitchArray<N> {
        let mut switches = SwitchArray::new(self.system.switch_lockout_ticks);
        for (i, axis) in self.axes.iter().enumerate().take(N.min(SWITCH_MAX_AXES)) {
            switches.set_mode(i, Endpoint::Min, axis.switch_min);
            switches.set_mode(i, Endpoint::Max, axis.switch_max);
        }
        switches
    }
}
