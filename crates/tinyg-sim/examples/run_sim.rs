//! Runs a short G-code-equivalent program through the simulated motion
//! core and prints its trace, the in-process analogue of the teacher's
//! `run_sim` example that drove a host process against a socket MCU.

use tinyg_config::{AxisConfig, AxisMode, ConfigRegistry, MotionGate};
use tinyg_planner::types::{MotionMode, Vector};
use tinyg_sim::SimHarness;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let mut config = ConfigRegistry::new();
    for axis in 0..2 {
        config.set_axis(
            axis,
            MotionGate::Stopped,
            AxisConfig { axis_mode: AxisMode::Standard, feedrate_max: 1200.0, velocity_max: 1200.0, jerk_max: 5e7, junction_deviation: 0.05, ..AxisConfig::default() },
        )?;
    }

    let mut harness: SimHarness<32, 6> = SimHarness::new(config, 1000);

    let mut target = Vector::ZERO;
    target.axes[0] = 10.0;
    harness.submit_line(target, 10.0 / 1200.0, MotionMode::Feed)?;

    target.axes[1] = 10.0;
    harness.submit_line(target, 10.0 / 1200.0, MotionMode::Feed)?;

    let outcome = harness.run_until_idle(10_000);
    tracing::info!(?outcome, "simulation settled");
    tracing::info!(position = ?harness.commanded_position(), "final commanded position");

    println!("{}", harness.trace().to_json_pretty()?);
    Ok(())
}
