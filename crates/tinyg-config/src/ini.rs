//! Human-editable bring-up config loader: a `configparser` INI
//! section-by-section reader. This is explicitly *not* the persisted
//! key/value parameter store (`record.rs`) -- it is a `printer.cfg`-style
//! text file for host tooling and tests.

use anyhow::{Context, Result};
use configparser::ini::Ini;
use std::path::Path;

use crate::registry::{ConfigRegistry, MotionGate};
use crate::types::{AxisConfig, AxisMode, GcodeDefaults, MotorConfig, SystemConfig};

const AXIS_NAMES: [&str; crate::types::MAX_AXES] = ["x", "y", "z", "a", "b", "c"];

impl ConfigRegistry {
    /// Loads a `[system]` section plus one `[axis_<letter>]` and
    /// `[motor_<n>]` section per configured axis/motor from an INI file.
    /// Missing sections keep their `Default::default()` values, matching
    /// `PrinterConfig::load`'s per-section parsing but tolerant of a
    /// partially specified bring-up file.
    pub fn load_ini(path: &Path) -> Result<Self> {
        let mut ini = Ini::new();
        ini.load(path).map_err(|e| anyhow::anyhow!(e)).with_context(|| format!("failed to load config file: {path:?}"))?;

        let mut registry = ConfigRegistry::new();

        if ini.get("system", "min_segment_len_mm").is_some() {
            let system = SystemConfig {
                min_segment_len_mm: getfloat(&ini, "system", "min_segment_len_mm", registry.system().min_segment_len_mm)?,
                arc_segment_len_mm: getfloat(&ini, "system", "arc_segment_len_mm", registry.system().arc_segment_len_mm)?,
                min_segment_time_us: getfloat(&ini, "system", "min_segment_time_us", registry.system().min_segment_time_us)?,
                junction_acceleration: getfloat(&ini, "system", "junction_acceleration", registry.system().junction_acceleration)?,
                enable_acceleration: ini.getbool("system", "enable_acceleration").ok().flatten().unwrap_or(registry.system().enable_acceleration),
                segment_duration_seconds: getfloat(&ini, "system", "segment_duration_seconds", registry.system().segment_duration_seconds)?,
                dda_tick_rate_hz: getfloat(&ini, "system", "dda_tick_rate_hz", registry.system().dda_tick_rate_hz)?,
                substep_scale: ini.getuint("system", "substep_scale").ok().flatten().unwrap_or(registry.system().substep_scale as u64) as u32,
                planner_queue_depth: ini.getuint("system", "planner_queue_depth").ok().flatten().unwrap_or(registry.system().planner_queue_depth as u64) as usize,
                switch_lockout_ticks: ini.getuint("system", "switch_lockout_ticks").ok().flatten().unwrap_or(registry.system().switch_lockout_ticks as u64) as u16,
            };
            registry.set_system(MotionGate::Stopped, system).expect("registry starts unlocked");
        }

        for (i, name) in AXIS_NAMES.iter().enumerate() {
            let section = format!("axis_{name}");
            if ini.get(&section, "feedrate_max").is_none() {
                continue;
            }
            let axis = AxisConfig {
                axis_mode: if ini.getbool(&section, "disabled").ok().flatten().unwrap_or(false) { AxisMode::Disabled } else { AxisMode::Standard },
                feedrate_max: getfloat(&ini, &section, "feedrate_max", 0.0)?,
                velocity_max: getfloat(&ini, &section, "velocity_max", 0.0)?,
                travel_max: getfloat(&ini, &section, "travel_max", 0.0)?,
                jerk_max: getfloat(&ini, &section, "jerk_max", 0.0)?,
                junction_deviation: getfloat(&ini, &section, "junction_deviation", 0.05)?,
                radius: getfloat(&ini, &section, "radius", 0.0)?,
                homing_search_velocity: getfloat(&ini, &section, "homing_search_velocity", 0.0)?,
                homing_latch_velocity: getfloat(&ini, &section, "homing_latch_velocity", 0.0)?,
                homing_latch_backoff: getfloat(&ini, &section, "homing_latch_backoff", 0.0)?,
                homing_zero_backoff: getfloat(&ini, &section, "homing_zero_backoff", 0.0)?,
                ..AxisConfig::default()
            };
            registry.set_axis(i, MotionGate::Stopped, axis).expect("registry starts unlocked");
        }

        for i in 0..crate::types::MAX_MOTORS {
            let section = format!("motor_{i}");
            if ini.get(&section, "step_angle_deg").is_none() {
                continue;
            }
            let mapped_axis = ini.get(&section, "axis").and_then(|name| AXIS_NAMES.iter().position(|n| *n == name.to_lowercase()));
            let motor = MotorConfig {
                axis: mapped_axis,
                step_angle_deg: getfloat(&ini, &section, "step_angle_deg", 1.8)?,
                travel_per_rev: getfloat(&ini, &section, "travel_per_rev", 1.0)?,
                ..MotorConfig::default()
            };
            registry.set_motor(i, MotionGate::Stopped, motor).expect("registry starts unlocked");
        }

        let _ = GcodeDefaults::default();
        Ok(registry)
    }
}

fn getfloat(ini: &Ini, section: &str, key: &str, default: f64) -> Result<f64> {
    Ok(ini.getfloat(section, key).map_err(|e| anyhow::anyhow!(e)).with_context(|| format!("[{section}] {key}"))?.unwrap_or(default))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_axis_and_system_sections() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[system]\nmin_segment_len_mm = 0.02\n\n[axis_x]\nfeedrate_max = 1200\njerk_max = 50000000\njunction_deviation = 0.05\n\n[motor_0]\naxis = x\nstep_angle_deg = 1.8\ntravel_per_rev = 8\n"
        )
        .unwrap();

        let registry = ConfigRegistry::load_ini(file.path()).unwrap();
        assert_eq!(registry.system().min_segment_len_mm, 0.02);
        assert_eq!(registry.axis(0).feedrate_max, 1200.0);
        assert_eq!(registry.motor(0).axis, Some(0));
    }

    #[test]
    fn missing_sections_keep_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[system]\nmin_segment_len_mm = 0.02\n").unwrap();
        let registry = ConfigRegistry::load_ini(file.path()).unwrap();
        assert_eq!(registry.axis(0).axis_mode, AxisMode::Disabled);
    }
}
