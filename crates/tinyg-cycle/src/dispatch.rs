//! The foreground dispatch list: the fixed, priority-ordered sequence of
//! checks the foreground loop runs every pass. Each handler gets first
//! refusal -- if it has work to do it does it and returns, leaving the rest
//! of the list for the next pass, a "run to completion or yield" discipline
//! a serial/command dispatch loop commonly uses.

use tinyg_config::ConfigRegistry;
use tinyg_planner::executor::SegmentExecutor;
use tinyg_planner::planner::MotionPlanner;
use tinyg_switch::SwitchArray;

use crate::fsm::{CycleController, HoldState, MachineState};

/// Requests pending for this dispatch pass, collected from the serial
/// line, a reset pin, or a bootloader-entry pin by layers outside this
/// crate. Plain data in, so `run_dispatch_cycle` stays synchronous and
/// testable without any I/O.
#[derive(Debug, Clone, Copy, Default)]
pub struct DispatchRequest {
    pub reset_pressed: bool,
    pub bootloader_pressed: bool,
    pub feedhold_pressed: bool,
    pub cycle_start_pressed: bool,
    /// A fatal assertion fired elsewhere (stack check, NaN guard) this pass.
    pub fatal_assertion: bool,
}

/// What the dispatch pass actually did, so the caller (and tests) can
/// observe which branch fired without re-deriving it from state deltas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A hard reset was requested; the caller should reinitialize
    /// everything above this crate (queues, executor, switches) too.
    HardReset,
    /// Bootloader entry was requested; the caller should hand off to the
    /// bootloader and never return.
    EnterBootloader,
    /// The machine is alarmed or shut down: all further handlers are
    /// skipped until a reset clears it.
    AlarmIdle,
    /// A limit switch tripped outside homing this pass; motion was
    /// aborted.
    LimitAlarm,
    /// A fatal assertion escalated to shutdown this pass.
    FatalShutdown,
    /// A feedhold advanced by one hold-state step this pass.
    FeedholdProgress,
    /// Cycle start resumed a held cycle this pass.
    Resumed,
    /// Back-planning/sync work ran this pass with no state transition.
    PlannerSynced,
    /// Nothing needed doing this pass.
    Idle,
}

/// Runs one pass of the fixed dispatch list, in order: reset, bootloader,
/// alarm-idler, limit switches, fatal assertions, feedhold, cycle-start,
/// planner sync, then whatever's left for command dispatch above this
/// crate. Returns as soon as a handler finds work, an early-return-on-
/// first-match discipline that keeps each pass's worst case bounded.
pub fn run_dispatch_cycle<const N: usize, const M: usize>(
    controller: &mut CycleController,
    planner: &mut MotionPlanner<N>,
    executor: &mut SegmentExecutor,
    switches: &mut SwitchArray<M>,
    config: &ConfigRegistry,
    request: &DispatchRequest,
) -> DispatchOutcome {
    if request.reset_pressed {
        *controller = CycleController::new();
        return DispatchOutcome::HardReset;
    }

    if request.bootloader_pressed {
        return DispatchOutcome::EnterBootloader;
    }

    if matches!(controller.machine_state(), MachineState::Alarm | MachineState::Shutdown) {
        return DispatchOutcome::AlarmIdle;
    }

    if request.fatal_assertion {
        controller.raise_fatal_fault();
        return DispatchOutcome::FatalShutdown;
    }

    if let Some(axis) = tripped_limit_axis(switches) {
        let homing_only = switches.is_homing_only(axis.0, axis.1);
        let outcome = controller.limit_switch_event(homing_only);
        switches.clear(axis.0, axis.1);
        return match outcome {
            crate::fsm::LimitOutcome::Alarmed => DispatchOutcome::LimitAlarm,
            crate::fsm::LimitOutcome::ConsumedAsHoming => DispatchOutcome::PlannerSynced,
        };
    }

    if request.feedhold_pressed && controller.motion_state() == crate::fsm::MotionState::Run {
        controller.request_feedhold().ok();
        return DispatchOutcome::FeedholdProgress;
    }

    if controller.motion_state() == crate::fsm::MotionState::Hold && controller.hold_state() != HoldState::Held {
        advance_feedhold(controller, executor);
        return DispatchOutcome::FeedholdProgress;
    }

    if request.cycle_start_pressed && controller.hold_state() == HoldState::Held {
        if let Ok(action) = controller.resume() {
            apply_resume(action, planner, executor, config);
            return DispatchOutcome::Resumed;
        }
    }

    let queue_empty = planner.queue().is_empty();
    controller.notify_buffer_completed(queue_empty && executor.is_idle());
    if queue_empty && executor.is_idle() {
        return DispatchOutcome::Idle;
    }
    DispatchOutcome::PlannerSynced
}

/// Scans every axis's min/max switches for one newly-thrown edge. Returns
/// the first it finds; the rest are picked up on subsequent passes.
fn tripped_limit_axis<const M: usize>(switches: &SwitchArray<M>) -> Option<(usize, tinyg_switch::Endpoint)> {
    for axis in 0..M {
        if switches.thrown(axis, tinyg_switch::Endpoint::Min) {
            return Some((axis, tinyg_switch::Endpoint::Min));
        }
        if switches.thrown(axis, tinyg_switch::Endpoint::Max) {
            return Some((axis, tinyg_switch::Endpoint::Max));
        }
    }
    None
}

/// Walks the feedhold sub-state machine one step, performing the actual
/// work each step implies: `Sync` drains nothing further (the executor's
/// next `run_once` already observes `Hold`'s decel below), `Plan` recomputes
/// the runtime block via `SegmentExecutor::feedhold`, `Decel` is observed
/// complete once the executor reports zero velocity.
fn advance_feedhold(controller: &mut CycleController, executor: &mut SegmentExecutor) {
    match controller.hold_state() {
        HoldState::Sync => controller.advance_hold(),
        HoldState::Plan => {
            executor.feedhold();
            controller.advance_hold();
        }
        HoldState::Decel => {
            if executor.current_velocity() <= 1e-6 {
                controller.advance_hold();
            }
        }
        HoldState::Off | HoldState::Held | HoldState::End => {}
    }
}

/// `ResumeAction::InsertAccelBackBlock`: re-submits a move from the
/// executor's current (held) position back to the buffer's original
/// target, letting the planner's ordinary junction rules re-accelerate, at
/// the rate the first configured axis is willing to run.
fn apply_resume<const N: usize>(action: crate::fsm::ResumeAction, planner: &mut MotionPlanner<N>, executor: &SegmentExecutor, config: &ConfigRegistry) {
    match action {
        crate::fsm::ResumeAction::InsertAccelBackBlock => {
            let current = executor.position();
            let target = planner.current_position();
            let distance = target.sub(&current).magnitude();
            if distance > 1e-9 {
                let feedrate = config.axis(0).feedrate_max.max(1.0);
                let _ = planner.resume_from(current, target, distance / feedrate, tinyg_planner::types::MotionMode::Feed);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tinyg_config::ConfigRegistry;
    use tinyg_planner::executor::ExecutorLimits;
    use tinyg_planner::planner::{AxisLimits, PlannerLimits};
    use tinyg_planner::types::{MotionMode, Vector, MAX_AXES};
    use tinyg_switch::Endpoint;

    fn full_limits() -> PlannerLimits {
        let axis = AxisLimits { feedrate_max: 1200.0, velocity_max: 1200.0, jerk_max: 5e7, junction_deviation: 0.05 };
        PlannerLimits { axes: [axis; MAX_AXES] }
    }

    fn exec_limits() -> ExecutorLimits {
        ExecutorLimits {
            steps_per_unit: [200.0; MAX_AXES],
            segment_duration_seconds: 0.005,
            dda_tick_rate_hz: 50_000.0,
            dda_period: 20,
            substep_scale: 256,
        }
    }

    fn vec_x(x: f64) -> Vector {
        let mut v = Vector::ZERO;
        v.axes[0] = x;
        v
    }

    #[test]
    fn reset_request_reinitializes_the_controller() {
        let mut controller = CycleController::new();
        controller.notify_motion_submitted().unwrap();
        let mut planner: MotionPlanner<8> = MotionPlanner::new(full_limits());
        let mut executor = SegmentExecutor::new(exec_limits());
        let mut switches: SwitchArray<2> = SwitchArray::new(5);
        let config = ConfigRegistry::new();

        let req = DispatchRequest { reset_pressed: true, ..Default::default() };
        let outcome = run_dispatch_cycle(&mut controller, &mut planner, &mut executor, &mut switches, &config, &req);
        assert_eq!(outcome, DispatchOutcome::HardReset);
        assert_eq!(controller.machine_state(), crate::fsm::MachineState::Ready);
    }

    #[test]
    fn alarmed_machine_idles_every_handler_until_reset() {
        let mut controller = CycleController::new();
        controller.notify_motion_submitted().unwrap();
        controller.limit_switch_event(false);
        let mut planner: MotionPlanner<8> = MotionPlanner::new(full_limits());
        let mut executor = SegmentExecutor::new(exec_limits());
        let mut switches: SwitchArray<2> = SwitchArray::new(5);
        let config = ConfigRegistry::new();

        let req = DispatchRequest { cycle_start_pressed: true, ..Default::default() };
        let outcome = run_dispatch_cycle(&mut controller, &mut planner, &mut executor, &mut switches, &config, &req);
        assert_eq!(outcome, DispatchOutcome::AlarmIdle);
    }

    #[test]
    fn tripped_limit_switch_outside_homing_alarms() {
        let mut controller = CycleController::new();
        controller.notify_motion_submitted().unwrap();
        let mut planner: MotionPlanner<8> = MotionPlanner::new(full_limits());
        let mut executor = SegmentExecutor::new(exec_limits());
        let mut switches: SwitchArray<2> = SwitchArray::new(5);
        switches.set_mode(0, Endpoint::Min, tinyg_switch::SwitchMode::EnabledNo);
        switches.observe(0, Endpoint::Min, true);
        let config = ConfigRegistry::new();

        let req = DispatchRequest::default();
        let outcome = run_dispatch_cycle(&mut controller, &mut planner, &mut executor, &mut switches, &config, &req);
        assert_eq!(outcome, DispatchOutcome::LimitAlarm);
        assert_eq!(controller.machine_state(), crate::fsm::MachineState::Alarm);
    }

    #[test]
    fn feedhold_request_begins_the_hold_walk() {
        let mut controller = CycleController::new();
        planner_with_one_move(&mut controller);
        let mut planner: MotionPlanner<8> = MotionPlanner::new(full_limits());
        planner.submit_line(vec_x(10.0), 10.0 / 1200.0, MotionMode::Feed).unwrap();
        let mut executor = SegmentExecutor::new(exec_limits());
        let mut switches: SwitchArray<2> = SwitchArray::new(5);
        let config = ConfigRegistry::new();

        let req = DispatchRequest { feedhold_pressed: true, ..Default::default() };
        let outcome = run_dispatch_cycle(&mut controller, &mut planner, &mut executor, &mut switches, &config, &req);
        assert_eq!(outcome, DispatchOutcome::FeedholdProgress);
        assert_eq!(controller.motion_state(), crate::fsm::MotionState::Hold);
    }

    fn planner_with_one_move(controller: &mut CycleController) {
        controller.notify_motion_submitted().unwrap();
    }

    #[test]
    fn empty_queue_and_idle_executor_reports_idle() {
        let mut controller = CycleController::new();
        let mut planner: MotionPlanner<8> = MotionPlanner::new(full_limits());
        let mut executor = SegmentExecutor::new(exec_limits());
        let mut switches: SwitchArray<2> = SwitchArray::new(5);
        let config = ConfigRegistry::new();

        let req = DispatchRequest::default();
        let outcome = run_dispatch_cycle(&mut controller, &mut planner, &mut executor, &mut switches, &config, &req);
        assert_eq!(outcome, DispatchOutcome::Idle);
    }
}
