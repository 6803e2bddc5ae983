//! End-to-end scenarios driving the full planner -> executor -> step
//! generator -> cycle controller pipeline through [`SimHarness`], mirroring
//! the literal-valued scenarios the motion core's test plan enumerates:
//! a single triangular move, a feedhold/resume round trip, a full-circle
//! arc, and a limit-switch trip mid-motion.

use tinyg_config::{AxisConfig, AxisMode, ConfigRegistry, MotionGate};
use tinyg_planner::arc::{ArcGenerator, ArcStepResult, PLANE_XY};
use tinyg_planner::types::{MotionMode, Vector};
use tinyg_sim::SimHarness;
use tinyg_switch::{Endpoint, SwitchMode};

const JERK: f64 = 5e7;
const FEED: f64 = 1200.0;
const JUNCTION_DEV: f64 = 0.05;
const STEPS_PER_MM: f64 = 100.0;

fn standard_config(axes: usize) -> ConfigRegistry {
    let mut config = ConfigRegistry::new();
    for axis in 0..axes {
        config
            .set_axis(
                axis,
                MotionGate::Stopped,
                AxisConfig {
                    axis_mode: AxisMode::Standard,
                    feedrate_max: FEED,
                    velocity_max: FEED,
                    jerk_max: JERK,
                    junction_deviation: JUNCTION_DEV,
                    ..AxisConfig::default()
                },
            )
            .unwrap();
        config
            .set_motor(
                axis,
                MotionGate::Stopped,
                tinyg_config::MotorConfig { axis: Some(axis), step_angle_deg: 1.8, travel_per_rev: 1.0 / STEPS_PER_MM * 200.0, ..tinyg_config::MotorConfig::default() },
            )
            .unwrap();
    }
    config
}

fn vec_x(x: f64) -> Vector {
    let mut v = Vector::ZERO;
    v.axes[0] = x;
    v
}

// Scenario 1: G1 X10 F1200 from rest settles with 1000 emitted steps on X.
#[test]
fn single_move_emits_expected_step_count() {
    let config = standard_config(2);
    let mut harness: SimHarness<32, 6> = SimHarness::new(config, 10_000);
    harness.submit_line(vec_x(10.0), 10.0 / FEED, MotionMode::Feed).unwrap();
    harness.run_until_idle(20_000);

    let steps = harness.step_position(0);
    assert!((steps - 1000).abs() <= 1, "expected ~1000 steps, got {steps}");
}

// Scenario 4: a rapid traverse held at 50ms then resumed returns to the
// same endpoint.
#[test]
fn feedhold_then_resume_reaches_original_target() {
    let config = standard_config(2);
    let mut harness: SimHarness<32, 6> = SimHarness::new(config, 10_000);
    harness.submit_line(vec_x(100.0), 100.0 / FEED, MotionMode::Traverse).unwrap();

    for _ in 0..10 {
        harness.tick(&tinyg_cycle::DispatchRequest::default());
    }

    harness.tick_feedhold();
    for _ in 0..2_000 {
        if harness.controller().hold_state() == tinyg_cycle::HoldState::Held {
            break;
        }
        harness.tick(&tinyg_cycle::DispatchRequest::default());
    }
    assert_eq!(harness.controller().hold_state(), tinyg_cycle::HoldState::Held);
    assert!(harness.commanded_position().axes[0] < 100.0);

    harness.tick_cycle_start();
    assert_eq!(harness.controller().motion_state(), tinyg_cycle::MotionState::Run);
    harness.run_until_idle(50_000);

    assert!((harness.commanded_position().axes[0] - 100.0).abs() < 1.0);
}

// Scenario 5: a full circle starting from (20,0) submitted through the
// arc generator lands back at its starting chord with interruption across
// a queue-full boundary tolerated.
#[test]
fn full_circle_arc_round_trips_through_a_full_queue() {
    let config = standard_config(2);
    let mut harness: SimHarness<4, 6> = SimHarness::new(config, 10_000);

    let base = vec_x(20.0);
    let mut gen = ArcGenerator::new(base, base, (-20.0, 0.0), false, PLANE_XY, 20.0 * core::f64::consts::TAU / FEED, 0.001, 0.1).unwrap();

    let mut guard = 0;
    loop {
        guard += 1;
        assert!(guard < 10_000, "arc generation did not converge");
        match gen.step(harness.planner_mut()) {
            Ok(ArcStepResult::Done) => break,
            Ok(ArcStepResult::Pending) => {
                harness.run_until_idle(50);
            }
            Err(e) => panic!("unexpected arc error: {e:?}"),
        }
    }

    harness.run_until_idle(50_000);
    assert!((harness.commanded_position().axes[0] - 20.0).abs() < 1e-2);
    assert!(harness.commanded_position().axes[1].abs() < 1e-2);
}

// Scenario 6: a limit switch tripped mid-motion alarms the machine and
// further submissions are rejected.
#[test]
fn limit_switch_trip_alarms_and_blocks_further_submission() {
    let mut config = standard_config(2);
    config
        .set_axis(
            0,
            MotionGate::Stopped,
            AxisConfig { axis_mode: AxisMode::Standard, feedrate_max: FEED, velocity_max: FEED, jerk_max: JERK, junction_deviation: JUNCTION_DEV, switch_min: SwitchMode::EnabledNo, ..AxisConfig::default() },
        )
        .unwrap();

    let mut harness: SimHarness<32, 6> = SimHarness::new(config, 10_000);
    harness.submit_line(vec_x(-100.0), 100.0 / 500.0, MotionMode::Feed).unwrap();

    for _ in 0..5 {
        harness.tick(&tinyg_cycle::DispatchRequest::default());
    }

    harness.observe_switch(0, Endpoint::Min, true);

    let mut alarmed = false;
    for _ in 0..200 {
        harness.tick(&tinyg_cycle::DispatchRequest::default());
        if harness.controller().machine_state() == tinyg_cycle::MachineState::Alarm {
            alarmed = true;
            break;
        }
    }
    assert!(alarmed, "machine did not alarm after limit switch trip");
    assert!(harness.submit_line(vec_x(-200.0), 1.0, MotionMode::Feed).is_err());
}
