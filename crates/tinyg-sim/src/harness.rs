//! The deterministic simulation harness: wires a [`ConfigRegistry`]-derived
//! planner/executor/step-generator/switch-array/cycle-controller stack
//! together and drives it one scheduler pass at a time, recording a
//! [`Trace`] of what happened.
//!
//! Drives the system under test and captures a trace for golden-trace
//! comparison, the same role a host/MCU socket harness plays, but this
//! core has no wire boundary between host and MCU, so the harness calls
//! straight into the library crates instead of serializing commands.

use std::cell::RefCell;

use critical_section::Mutex;

use tinyg_config::ConfigRegistry;
use tinyg_cycle::{run_dispatch_cycle, CycleController, CycleError, DispatchOutcome, DispatchRequest};
use tinyg_planner::executor::SegmentExecutor;
use tinyg_planner::planner::MotionPlanner;
use tinyg_planner::types::{MotionMode, Vector, MAX_AXES};
use tinyg_stepgen::StepGenerator;
use tinyg_switch::{Endpoint, SwitchArray};

use crate::mcu::{SimDriverPower, SimGpioPort, SimTimer};
use crate::trace::{Trace, TraceEvent};

/// One fully wired simulated machine: `N` is the planner queue depth, `M`
/// the number of axes the switch array tracks.
pub struct SimHarness<const N: usize, const M: usize> {
    config: ConfigRegistry,
    controller: CycleController,
    planner: MotionPlanner<N>,
    executor: SegmentExecutor,
    stepgen: StepGenerator,
    switches: SwitchArray<M>,
    dir_port: SimGpioPort,
    step_port: Mutex<RefCell<SimGpioPort>>,
    timer: Mutex<RefCell<SimTimer>>,
    power: Mutex<RefCell<SimDriverPower>>,
    trace: Trace,
}

impl<const N: usize, const M: usize> SimHarness<N, M> {
    /// Builds a harness from a fully populated [`ConfigRegistry`], deriving
    /// the planner/executor limits and switch array the same way
    /// `tinyg-firmware`'s bring-up does.
    pub fn new(config: ConfigRegistry, stepgen_idle_timeout_ticks: u32) -> Self {
        let planner = MotionPlanner::new(config.planner_limits());
        let executor = SegmentExecutor::new(config.executor_limits());
        let switches = config.build_switch_array::<M>();
        Self {
            config,
            controller: CycleController::new(),
            planner,
            executor,
            stepgen: StepGenerator::new(stepgen_idle_timeout_ticks),
            switches,
            dir_port: SimGpioPort::default(),
            step_port: Mutex::new(RefCell::new(SimGpioPort::default())),
            timer: Mutex::new(RefCell::new(SimTimer::default())),
            power: Mutex::new(RefCell::new(SimDriverPower::default())),
            trace: Trace::default(),
        }
    }

    pub fn config(&self) -> &ConfigRegistry {
        &self.config
    }

    pub fn controller(&self) -> &CycleController {
        &self.controller
    }

    pub fn planner(&self) -> &MotionPlanner<N> {
        &self.planner
    }

    pub fn trace(&self) -> &Trace {
        &self.trace
    }

    /// Commanded position as tracked by the segment executor (not the raw
    /// step-generator pulse count, which lags by whatever is still loaded).
    pub fn commanded_position(&self) -> Vector {
        self.executor.position()
    }

    pub fn step_position(&self, axis: usize) -> i64 {
        self.stepgen.position(axis)
    }

    pub fn submit_line(&mut self, target: Vector, move_time_min: f64, mode: MotionMode) -> Result<(), CycleError> {
        if !self.controller.accepts_motion() {
            return Err(CycleError::MachineNotReady);
        }
        self.planner.submit_line(target, move_time_min, mode)?;
        let _ = self.controller.notify_motion_submitted();
        Ok(())
    }

    pub fn submit_dwell(&mut self, seconds: f64) -> Result<(), CycleError> {
        if !self.controller.accepts_motion() {
            return Err(CycleError::MachineNotReady);
        }
        self.planner.submit_dwell(seconds)?;
        let _ = self.controller.notify_motion_submitted();
        Ok(())
    }

    /// Forwards a raw switch edge the way a switch ISR would, ahead of the
    /// next [`Self::tick`] picking it up through the dispatch list.
    pub fn observe_switch(&mut self, axis: usize, endpoint: Endpoint, raw_high: bool) {
        self.switches.observe(axis, endpoint, raw_high);
    }

    /// Direct mutable access to the planner, for continuation-style
    /// submitters (the arc generator) that need to retry across ticks.
    pub fn planner_mut(&mut self) -> &mut MotionPlanner<N> {
        &mut self.planner
    }

    /// Runs one foreground dispatch pass, then one MED-priority segment
    /// load (if the step generator is idle), then one HI-priority DDA
    /// tick (if a segment is loaded), recording each stage to the trace.
    /// Mirrors the priority order of `tinyg-firmware`'s interrupt
    /// hierarchy, run synchronously instead of preemptively.
    pub fn tick(&mut self, request: &DispatchRequest) -> DispatchOutcome {
        let outcome = run_dispatch_cycle(&mut self.controller, &mut self.planner, &mut self.executor, &mut self.switches, &self.config, request);
        self.trace.push(TraceEvent::Dispatch(format!("{:?}", outcome)));

        let motion_allowed = self.controller.accepts_motion();

        if motion_allowed && self.stepgen.is_idle() {
            let sp = self.executor.run_once(&mut self.planner);
            if !sp.is_null {
                critical_section::with(|cs| {
                    let mut power = self.power.borrow(cs).borrow_mut();
                    self.stepgen.load_segment(&sp, &mut self.dir_port, &mut *power, cs);
                });
                self.trace.push(TraceEvent::SegmentLoaded { step_count: sp.step_count, tick_count: sp.tick_count });
            }
        }

        if motion_allowed && !self.stepgen.is_idle() {
            self.stepgen.on_dda_tick(&self.step_port, &self.timer, &self.power);
            let mut positions = [0i64; MAX_AXES];
            for (axis, slot) in positions.iter_mut().enumerate() {
                *slot = self.stepgen.position(axis);
            }
            self.trace.push(TraceEvent::StepTick { positions });
        } else if outcome == DispatchOutcome::Idle {
            self.trace.push(TraceEvent::Idle);
        }

        outcome
    }

    /// Ticks until both the planner queue and the step generator go idle,
    /// or `max_ticks` passes with no progress, whichever comes first (a
    /// stalled harness is a test bug, not a hang).
    pub fn run_until_idle(&mut self, max_ticks: usize) -> DispatchOutcome {
        let mut last = DispatchOutcome::Idle;
        for _ in 0..max_ticks {
            last = self.tick(&DispatchRequest::default());
            if self.planner.queue().is_empty() && self.executor.is_idle() && self.stepgen.is_idle() {
                break;
            }
        }
        last
    }

    /// Ticks once with a feedhold request asserted.
    pub fn tick_feedhold(&mut self) -> DispatchOutcome {
        self.tick(&DispatchRequest { feedhold_pressed: true, ..Default::default() })
    }

    /// Ticks once with a cycle-start (resume) request asserted.
    pub fn tick_cycle_start(&mut self) -> DispatchOutcome {
        self.tick(&DispatchRequest { cycle_start_pressed: true, ..Default::default() })
    }
}
