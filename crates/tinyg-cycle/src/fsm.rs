//! The cycle controller: the hierarchical machine/cycle/motion/hold state
//! machine, the entry point for homing/probing/jogging, and the target of
//! limit-switch notifications.
//!
//! Shaped as an owned, plain-enum status struct, with a latch-until-reset
//! emergency-stop pattern for the alarm/shutdown states.

use tinyg_config::MotionGate;

use crate::errors::CycleError;

/// Top-level machine status.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum MachineState {
    #[default]
    Ready,
    Cycle,
    ProgramStop,
    ProgramEnd,
    Alarm,
    Shutdown,
}

/// What kind of cycle is currently running, if any.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum CycleState {
    #[default]
    Off,
    Started,
    Homing,
    Probe,
    Jog,
}

/// Whether the machine is moving, stopped, or paused.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum MotionState {
    #[default]
    Stop,
    Run,
    Hold,
}

/// Feedhold's own sub-state machine: off -> sync -> plan -> decel -> held,
/// then end -> (back to) off on resume.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum HoldState {
    #[default]
    Off,
    Sync,
    Plan,
    Decel,
    Held,
    End,
}

/// What the caller must do in response to a successful resume: the
/// planner needs a fresh accel-back block submitted to return to the
/// velocity the hold interrupted.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ResumeAction {
    InsertAccelBackBlock,
}

/// How a limit-switch event was handled.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LimitOutcome {
    /// Thrown while homing: consumed as a homing event, not an alarm.
    ConsumedAsHoming,
    /// Thrown outside homing: escalated to alarm, motion aborted.
    Alarmed,
}

/// The cycle controller: owns `machine_state`/`cycle_state`/`motion_state`/
/// `hold_state` and enforces the transitions between them. Does not itself
/// own a `MotionPlanner` or `SegmentExecutor` -- those live in the
/// foreground/MED contexts that call into this controller, which is a plain
/// status struct other code reads and mutates through, not an owner of the
/// serial link.
#[derive(Debug, Clone, Default)]
pub struct CycleController {
    machine_state: MachineState,
    cycle_state: CycleState,
    motion_state: MotionState,
    hold_state: HoldState,
}

impl CycleController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn machine_state(&self) -> MachineState {
        self.machine_state
    }
    pub fn cycle_state(&self) -> CycleState {
        self.cycle_state
    }
    pub fn motion_state(&self) -> MotionState {
        self.motion_state
    }
    pub fn hold_state(&self) -> HoldState {
        self.hold_state
    }

    /// The gate `tinyg-config::ConfigRegistry` mutators check: config may
    /// only change while motion is stopped.
    pub fn motion_gate(&self) -> MotionGate {
        if self.motion_state == MotionState::Stop {
            MotionGate::Stopped
        } else {
            MotionGate::Moving
        }
    }

    /// Whether the planner should currently accept new submissions.
    /// `false` during alarm/shutdown, where the dispatch list's
    /// alarm-idler handler latches out all further motion.
    pub fn accepts_motion(&self) -> bool {
        !matches!(self.machine_state, MachineState::Alarm | MachineState::Shutdown)
    }

    /// *ready* + first motion submit -> *cycle* / *started* / *run*. A
    /// no-op while already running; rejected with `MachineNotReady` while
    /// alarmed or shut down.
    pub fn notify_motion_submitted(&mut self) -> Result<(), CycleError> {
        if !self.accepts_motion() {
            return Err(CycleError::MachineNotReady);
        }
        if self.machine_state == MachineState::Ready {
            self.machine_state = MachineState::Cycle;
            self.cycle_state = CycleState::Started;
            tracing::info!("cycle started");
        }
        self.motion_state = MotionState::Run;
        Ok(())
    }

    /// *run* + feedhold request -> *hold*, hold_state begins its
    /// off->sync walk. Rejected with `NotRunning` unless motion is
    /// actually running.
    pub fn request_feedhold(&mut self) -> Result<(), CycleError> {
        if self.motion_state != MotionState::Run {
            return Err(CycleError::NotRunning);
        }
        self.motion_state = MotionState::Hold;
        self.hold_state = HoldState::Sync;
        tracing::info!("feedhold requested");
        Ok(())
    }

    /// Advances the hold sub-state machine by one step once the caller has
    /// completed the corresponding work (plan recompute, decel start,
    /// velocity reaching zero). Only valid along the forward path
    /// sync -> plan -> decel -> held; calling out of order is a no-op.
    pub fn advance_hold(&mut self) {
        self.hold_state = match self.hold_state {
            HoldState::Sync => HoldState::Plan,
            HoldState::Plan => HoldState::Decel,
            HoldState::Decel => HoldState::Held,
            other => other,
        };
    }

    /// *held* + resume request -> hold_state = *end* -> *run*. Returns the
    /// action the planner must take (insert a fresh accel-back block).
    /// Rejected with `NotHeld` unless `hold_state == Held`.
    pub fn resume(&mut self) -> Result<ResumeAction, CycleError> {
        if self.hold_state != HoldState::Held {
            return Err(CycleError::NotHeld);
        }
        self.hold_state = HoldState::End;
        self.motion_state = MotionState::Run;
        self.hold_state = HoldState::Off;
        tracing::info!("resumed from feedhold");
        Ok(ResumeAction::InsertAccelBackBlock)
    }

    /// *any* + limit switch thrown while not homing -> *alarm*; motion
    /// aborts and the planner must be drained without emitting further
    /// motion. *homing* + limit switch thrown -> consumed as a homing
    /// event, not an alarm.
    pub fn limit_switch_event(&mut self, homing_only: bool) -> LimitOutcome {
        if homing_only || self.cycle_state == CycleState::Homing {
            return LimitOutcome::ConsumedAsHoming;
        }
        self.machine_state = MachineState::Alarm;
        self.cycle_state = CycleState::Off;
        self.motion_state = MotionState::Stop;
        self.hold_state = HoldState::Off;
        tracing::error!("limit switch tripped outside homing; alarm latched");
        LimitOutcome::Alarmed
    }

    /// Escalates an internal invariant violation (buffer in an unexpected
    /// state, segment ownership conflict, NaN arithmetic) to alarm.
    pub fn raise_internal_fault(&mut self) {
        self.machine_state = MachineState::Alarm;
        self.motion_state = MotionState::Stop;
        self.hold_state = HoldState::Off;
        tracing::error!("internal invariant violated; alarm latched");
    }

    /// Escalates a fatal condition (assertion/memory failure) to shutdown,
    /// a terminal state that only a hard reset recovers.
    pub fn raise_fatal_fault(&mut self) {
        self.machine_state = MachineState::Shutdown;
        self.motion_state = MotionState::Stop;
        self.hold_state = HoldState::Off;
        tracing::error!("fatal fault; machine shut down");
    }

    /// *cycle* + last BF completed -> *program-stop* (if `queue_empty`) or
    /// continue waiting otherwise.
    pub fn notify_buffer_completed(&mut self, queue_empty: bool) {
        if self.machine_state == MachineState::Cycle && queue_empty {
            self.machine_state = MachineState::ProgramStop;
            self.cycle_state = CycleState::Off;
            self.motion_state = MotionState::Stop;
        }
    }

    /// An M2/M30 program-end M-code was dispatched.
    pub fn notify_program_end(&mut self) {
        self.machine_state = MachineState::ProgramEnd;
        self.cycle_state = CycleState::Off;
        self.motion_state = MotionState::Stop;
    }

    /// Clears an alarm, the only transition out of it: the controller must
    /// never move from alarm to a running cycle without a reset in
    /// between. Rejected with `NotAlarmed` from any other state,
    /// including `Shutdown` -- that one needs a hard reset, not this call.
    pub fn reset(&mut self) -> Result<(), CycleError> {
        if self.machine_state != MachineState::Alarm {
            return Err(CycleError::NotAlarmed);
        }
        *self = CycleController::new();
        tracing::info!("alarm cleared by reset");
        Ok(())
    }

    /// Enters a homing cycle. Only valid from `Ready`.
    pub fn begin_homing(&mut self) -> Result<(), CycleError> {
        if self.machine_state != MachineState::Ready {
            return Err(CycleError::InvalidCycleState);
        }
        self.machine_state = MachineState::Cycle;
        self.cycle_state = CycleState::Homing;
        self.motion_state = MotionState::Run;
        Ok(())
    }

    /// Enters a probing cycle. Only valid from `Ready`.
    pub fn begin_probe(&mut self) -> Result<(), CycleError> {
        if self.machine_state != MachineState::Ready {
            return Err(CycleError::InvalidCycleState);
        }
        self.machine_state = MachineState::Cycle;
        self.cycle_state = CycleState::Probe;
        self.motion_state = MotionState::Run;
        Ok(())
    }

    /// Enters manual jog mode. Only valid from `Ready`.
    pub fn begin_jog(&mut self) -> Result<(), CycleError> {
        if self.machine_state != MachineState::Ready {
            return Err(CycleError::InvalidCycleState);
        }
        self.machine_state = MachineState::Cycle;
        self.cycle_state = CycleState::Jog;
        self.motion_state = MotionState::Run;
        Ok(())
    }

    /// Ends whichever homing/probe/jog cycle is active, returning to
    /// `Ready`/`Off`/`Stop`.
    pub fn end_special_cycle(&mut self) {
        self.machine_state = MachineState::Ready;
        self.cycle_state = CycleState::Off;
        self.motion_state = MotionState::Stop;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_motion_submit_starts_the_cycle() {
        let mut c = CycleController::new();
        c.notify_motion_submitted().unwrap();
        assert_eq!(c.machine_state(), MachineState::Cycle);
        assert_eq!(c.cycle_state(), CycleState::Started);
        assert_eq!(c.motion_state(), MotionState::Run);
    }

    #[test]
    fn feedhold_walks_off_sync_plan_decel_held() {
        let mut c = CycleController::new();
        c.notify_motion_submitted().unwrap();
        c.request_feedhold().unwrap();
        assert_eq!(c.hold_state(), HoldState::Sync);
        assert_eq!(c.motion_state(), MotionState::Hold);
        c.advance_hold();
        assert_eq!(c.hold_state(), HoldState::Plan);
        c.advance_hold();
        assert_eq!(c.hold_state(), HoldState::Decel);
        c.advance_hold();
        assert_eq!(c.hold_state(), HoldState::Held);
    }

    #[test]
    fn resume_returns_to_run_and_requests_accel_back_block() {
        let mut c = CycleController::new();
        c.notify_motion_submitted().unwrap();
        c.request_feedhold().unwrap();
        c.advance_hold();
        c.advance_hold();
        c.advance_hold();
        let action = c.resume().unwrap();
        assert_eq!(action, ResumeAction::InsertAccelBackBlock);
        assert_eq!(c.motion_state(), MotionState::Run);
        assert_eq!(c.hold_state(), HoldState::Off);
    }

    #[test]
    fn resume_before_held_is_rejected() {
        let mut c = CycleController::new();
        c.notify_motion_submitted().unwrap();
        c.request_feedhold().unwrap();
        assert_eq!(c.resume(), Err(CycleError::NotHeld));
    }

    #[test]
    fn limit_switch_outside_homing_alarms_and_aborts_motion() {
        let mut c = CycleController::new();
        c.notify_motion_submitted().unwrap();
        let outcome = c.limit_switch_event(false);
        assert_eq!(outcome, LimitOutcome::Alarmed);
        assert_eq!(c.machine_state(), MachineState::Alarm);
        assert_eq!(c.motion_state(), MotionState::Stop);
        assert!(!c.accepts_motion());
    }

    #[test]
    fn limit_switch_while_homing_is_consumed_not_alarmed() {
        let mut c = CycleController::new();
        c.begin_homing().unwrap();
        let outcome = c.limit_switch_event(false);
        assert_eq!(outcome, LimitOutcome::ConsumedAsHoming);
        assert_eq!(c.machine_state(), MachineState::Cycle);
    }

    #[test]
    fn alarm_requires_reset_before_a_new_cycle_can_start() {
        let mut c = CycleController::new();
        c.notify_motion_submitted().unwrap();
        c.limit_switch_event(false);
        assert_eq!(c.notify_motion_submitted(), Err(CycleError::MachineNotReady));
        c.reset().unwrap();
        c.notify_motion_submitted().unwrap();
        assert_eq!(c.machine_state(), MachineState::Cycle);
    }

    #[test]
    fn shutdown_cannot_be_cleared_by_reset() {
        let mut c = CycleController::new();
        c.raise_fatal_fault();
        assert_eq!(c.machine_state(), MachineState::Shutdown);
        assert_eq!(c.reset(), Err(CycleError::NotAlarmed));
    }

    #[test]
    fn last_buffer_completing_an_empty_queue_stops_the_cycle() {
        let mut c = CycleController::new();
        c.notify_motion_submitted().unwrap();
        c.notify_buffer_completed(true);
        assert_eq!(c.machine_state(), MachineState::ProgramStop);
        assert_eq!(c.motion_state(), MotionState::Stop);
    }

    #[test]
    fn buffer_completing_with_more_queued_keeps_the_cycle_running() {
        let mut c = CycleController::new();
        c.notify_motion_submitted().unwrap();
        c.notify_buffer_completed(false);
        assert_eq!(c.machine_state(), MachineState::Cycle);
    }

    #[test]
    fn config_gate_reflects_motion_state() {
        let mut c = CycleController::new();
        assert_eq!(c.motion_gate(), MotionGate::Stopped);
        c.notify_motion_submitted().unwrap();
        assert_eq!(c.motion_gate(), MotionGate::Moving);
    }
}
