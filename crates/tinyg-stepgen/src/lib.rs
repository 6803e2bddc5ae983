#![deny(clippy::all)]
#![deny(warnings)]
#![no_std]

//! # Per-Axis Bresenham Step Pulse Generator
//!
//! HI-priority logic that turns one [`tinyg_planner::PrepSegment`] at a time
//! into GPIO step/direction pulses, timed off a single DDA tick clock.
//!
//! ## Pipelined single-slot handoff
//!
//! There is no queue of commands here: the segment executor (MED priority)
//! loads exactly one prepared segment into the generator's single slot and
//! the generator counts it down tick by tick. This mirrors the data model's
//! `owned-by-loader` / `owned-by-exec` alternation -- `load_segment` must
//! only be called while the generator reports [`StepGenerator::is_idle`],
//! and the generator must not be read by the loader while a tick handler is
//! mid-flight. Both sides are expected to coordinate via `critical_section`.
//!
//! ## Bresenham distribution
//!
//! Each axis accumulates `step_count[axis]` every tick and emits a pulse
//! whenever the accumulator reaches `tick_count`, then subtracts it back
//! off. This spreads exactly `step_count[axis]` pulses evenly across
//! `tick_count` ticks for every axis in the segment, including axes with
//! very low step counts relative to the segment's dominant axis.
//!
//! ## Safety
//!
//! - **No heap allocations:** fully `#[no_std]`, no queue, no boxed state.
//! - **Atomic GPIO:** [`AtomicGpioPort`]'s `set`/`clear` each map to a single
//!   atomic write across every axis on a shared port (STM32 BSRR-style: the
//!   low half sets, the high half resets). They are deliberately two calls,
//!   not one -- on BSRR, writing a pin's set and reset bits in the same
//!   write leaves the pin set (set wins ties), so a real step pulse needs a
//!   genuine SET, a minimum hold, then a separate CLEAR.

use critical_section::Mutex;
use core::cell::RefCell;
use tinyg_planner::{Direction, Ownership, PrepSegment, MAX_AXES};

/// A GPIO port supporting atomic multi-pin set/clear, as well as a direct
/// write for setting several direction pins at once.
pub trait AtomicGpioPort {
    /// Atomically sets every pin in `mask`.
    fn set(&mut self, mask: u8);
    /// Atomically clears every pin in `mask`.
    fn clear(&mut self, mask: u8);
    fn write(&mut self, mask: u8);
}

/// Spin iterations held between SET and CLEAR to guarantee the step pulse's
/// minimum high time. A placeholder for a cycle-counted delay calibrated to
/// the target's clock speed and driver's datasheet minimum (DRV8825: ~1.9us).
const MIN_PULSE_SPIN_ITERATIONS: u32 = 32;

#[inline]
fn hold_min_pulse_width() {
    for _ in 0..MIN_PULSE_SPIN_ITERATIONS {
        core::hint::spin_loop();
    }
}

/// The hardware timer driving the DDA tick clock.
pub trait Timer {
    fn schedule_next(&mut self, ticks: u32);
    fn stop(&mut self);
}

/// Powers the stepper drivers up or down. Used for the idle-power hook:
/// drivers are disabled once the generator has sat idle past
/// `idle_timeout_ticks`, and re-enabled the moment a fresh segment loads.
pub trait DriverPower {
    fn enable(&mut self);
    fn disable(&mut self);
}

/// A [`PrepSegment`] translated into the generator's own per-axis counters.
/// Kept separate from `PrepSegment` so the ISR-facing state never carries
/// fields (like `owner`) that are meaningless once a segment is loaded.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
struct LoadedSegment {
    step_count: [u32; MAX_AXES],
    direction: [Direction; MAX_AXES],
    dda_period: u32,
    /// Fixed Bresenham modulus for this segment: the tick count it was
    /// loaded with. Must stay constant across ticks -- only `ticks_remaining`
    /// counts down.
    tick_total: u32,
    ticks_remaining: u32,
    /// Per-axis Bresenham accumulator, reset to zero whenever `counter_reset`
    /// is set on load (a velocity discontinuity across a buffer boundary).
    accumulator: [u32; MAX_AXES],
}

/// Generates step pulses for up to [`MAX_AXES`] motors from one loaded
/// segment at a time, driven by repeated calls to [`on_dda_tick`] from a
/// hardware timer interrupt.
///
/// [`on_dda_tick`]: StepGenerator::on_dda_tick
pub struct StepGenerator {
    segment: Option<LoadedSegment>,
    positions: [i64; MAX_AXES],
    current_directions: u8,
    idle_ticks: u32,
    idle_timeout_ticks: u32,
    driver_enabled: bool,
}

impl StepGenerator {
    pub fn new(idle_timeout_ticks: u32) -> Self {
        Self {
            segment: None,
            positions: [0; MAX_AXES],
            current_directions: 0,
            idle_ticks: 0,
            idle_timeout_ticks,
            driver_enabled: false,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.segment.is_none()
    }

    pub fn position(&self, axis: usize) -> i64 {
        self.positions[axis]
    }

    /// Loads a prepared segment into the single slot. The caller (the
    /// segment executor, running at MED priority) must only call this while
    /// [`is_idle`](Self::is_idle) reports true, or from inside the same
    /// critical section the ISR uses.
    pub fn load_segment<DIR_PORT, POWER>(&mut self, sp: &PrepSegment, dir_port: &mut DIR_PORT, power: &mut POWER, cs: critical_section::CriticalSection<'_>)
    where
        DIR_PORT: AtomicGpioPort,
        POWER: DriverPower,
    {
        let _ = cs;
        if sp.is_null {
            self.segment = None;
            return;
        }

        let mut direction_mask = 0u8;
        for axis in 0..MAX_AXES {
            if sp.direction[axis] == Direction::Positive {
                direction_mask |= 1 << axis;
            }
        }
        if direction_mask != self.current_directions {
            dir_port.write(direction_mask);
            self.current_directions = direction_mask;
        }

        if !self.driver_enabled {
            power.enable();
            self.driver_enabled = true;
        }
        self.idle_ticks = 0;

        let accumulator = if sp.counter_reset {
            [0; MAX_AXES]
        } else {
            self.segment.map(|s| s.accumulator).unwrap_or([0; MAX_AXES])
        };

        self.segment = Some(LoadedSegment {
            step_count: sp.step_count,
            direction: sp.direction,
            dda_period: sp.dda_period,
            tick_total: sp.tick_count.max(1),
            ticks_remaining: sp.tick_count,
            accumulator,
        });
        debug_assert_eq!(sp.owner, Ownership::OwnedByExec);
    }

    /// The DDA tick handler: call this from the hardware timer interrupt at
    /// `dda_tick_rate_hz`. Emits a SET covering every axis due this tick,
    /// holds for the minimum pulse width, then CLEARs, reschedules the
    /// timer, and reports whether the segment just finished (so the loader
    /// can be notified to refill).
    #[inline]
    pub fn on_dda_tick<STEP_PORT, TIMER, POWER>(
        &mut self,
        step_port: &Mutex<RefCell<STEP_PORT>>,
        timer: &Mutex<RefCell<TIMER>>,
        power: &Mutex<RefCell<POWER>>,
    ) -> bool
    where
        STEP_PORT: AtomicGpioPort,
        TIMER: Timer,
        POWER: DriverPower,
    {
        let Some(seg) = self.segment.as_mut() else {
            critical_section::with(|cs| timer.borrow(cs).borrow_mut().stop());
            self.tick_idle_power(power);
            return false;
        };

        let mut step_mask = 0u8;
        let direction = seg.direction;
        for axis in 0..MAX_AXES {
            seg.accumulator[axis] += seg.step_count[axis];
            if seg.accumulator[axis] >= seg.tick_total {
                seg.accumulator[axis] -= seg.tick_total;
                step_mask |= 1 << axis;
            }
        }
        seg.ticks_remaining = seg.ticks_remaining.saturating_sub(1);
        let finished = seg.ticks_remaining == 0;

        if step_mask != 0 {
            critical_section::with(|cs| step_port.borrow(cs).borrow_mut().set(step_mask));
            hold_min_pulse_width();
            critical_section::with(|cs| step_port.borrow(cs).borrow_mut().clear(step_mask));
        }

        critical_section::with(|cs| {
            for axis in 0..MAX_AXES {
                if (step_mask >> axis) & 1 != 0 {
                    self.positions[axis] += if direction[axis] == Direction::Positive { 1 } else { -1 };
                }
            }
        });

        if finished {
            self.segment = None;
        }

        critical_section::with(|cs| {
            let mut timer = timer.borrow(cs).borrow_mut();
            if finished {
                timer.stop();
            } else {
                timer.schedule_next(self.segment.as_ref().map(|s| s.dda_period).unwrap_or(0));
            }
        });

        finished
    }

    fn tick_idle_power<POWER: DriverPower>(&mut self, power: &Mutex<RefCell<POWER>>) {
        if !self.driver_enabled {
            return;
        }
        self.idle_ticks = self.idle_ticks.saturating_add(1);
        if self.idle_ticks >= self.idle_timeout_ticks {
            critical_section::with(|cs| power.borrow(cs).borrow_mut().disable());
            self.driver_enabled = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct MockPort {
        state: u8,
        pulses: u32,
        clears: u32,
    }
    impl AtomicGpioPort for MockPort {
        fn set(&mut self, mask: u8) {
            self.state |= mask;
            self.pulses += mask.count_ones();
        }
        fn clear(&mut self, mask: u8) {
            self.state &= !mask;
            self.clears += mask.count_ones();
        }
        fn write(&mut self, mask: u8) {
            self.state = mask;
        }
    }

    #[derive(Debug, Default)]
    struct MockTimer {
        scheduled: u32,
        stopped: bool,
    }
    impl Timer for MockTimer {
        fn schedule_next(&mut self, ticks: u32) {
            self.scheduled = ticks;
            self.stopped = false;
        }
        fn stop(&mut self) {
            self.stopped = true;
        }
    }

    #[derive(Debug, Default)]
    struct MockPower {
        enabled: bool,
        disable_calls: u32,
    }
    impl DriverPower for MockPower {
        fn enable(&mut self) {
            self.enabled = true;
        }
        fn disable(&mut self) {
            self.enabled = false;
            self.disable_calls += 1;
        }
    }

    fn segment(step_count_x: u32, tick_count: u32, counter_reset: bool) -> PrepSegment {
        let mut sp = PrepSegment::null();
        sp.is_null = false;
        sp.step_count[0] = step_count_x;
        sp.direction[0] = Direction::Positive;
        sp.dda_period = 1000;
        sp.tick_count = tick_count;
        sp.counter_reset = counter_reset;
        sp
    }

    #[test]
    fn loading_a_segment_enables_the_driver_and_sets_direction() {
        let mut gen = StepGenerator::new(1000);
        let mut dir_port = MockPort::default();
        let mut power = MockPower::default();
        let sp = segment(4, 10, true);
        critical_section::with(|cs| gen.load_segment(&sp, &mut dir_port, &mut power, cs));
        assert!(!gen.is_idle());
        assert_eq!(dir_port.state, 0b1);
        assert!(power.enabled);
    }

    #[test]
    fn ten_ticks_emit_exactly_four_pulses_for_four_steps() {
        let mut gen = StepGenerator::new(1000);
        let mut dir_port = MockPort::default();
        let mut power = MockPower::default();
        let sp = segment(4, 10, true);
        critical_section::with(|cs| gen.load_segment(&sp, &mut dir_port, &mut power, cs));

        let step_port = Mutex::new(RefCell::new(MockPort::default()));
        let timer = Mutex::new(RefCell::new(MockTimer::default()));
        let power_cell = Mutex::new(RefCell::new(MockPower { enabled: true, disable_calls: 0 }));

        let mut finished = false;
        for _ in 0..10 {
            finished = gen.on_dda_tick(&step_port, &timer, &power_cell);
        }
        assert!(finished);
        assert!(gen.is_idle());
        critical_section::with(|cs| {
            let port = step_port.borrow(cs).borrow();
            assert_eq!(port.pulses, 4);
            assert_eq!(port.clears, 4);
            assert_eq!(port.state, 0);
        });
        assert_eq!(gen.position(0), 4);
    }

    #[test]
    fn idle_generator_disables_the_driver_after_the_timeout() {
        let mut gen = StepGenerator::new(3);
        let mut dir_port = MockPort::default();
        let mut power = MockPower::default();
        let sp = segment(1, 1, true);
        critical_section::with(|cs| gen.load_segment(&sp, &mut dir_port, &mut power, cs));

        let step_port = Mutex::new(RefCell::new(MockPort::default()));
        let timer = Mutex::new(RefCell::new(MockTimer::default()));
        let power_cell = Mutex::new(RefCell::new(MockPower { enabled: true, disable_calls: 0 }));

        gen.on_dda_tick(&step_port, &timer, &power_cell);
        assert!(gen.is_idle());
        for _ in 0..5 {
            gen.on_dda_tick(&step_port, &timer, &power_cell);
        }
        critical_section::with(|cs| {
            assert!(power_cell.borrow(cs).borrow().disable_calls >= 1);
        });
    }
}
