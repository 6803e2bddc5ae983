#![no_std]
#![no_main]

use core::cell::RefCell;
use critical_section::Mutex;
use defmt_rtt as _;
use panic_probe as _;
use tinyg_planner::{Direction, PrepSegment, MAX_AXES};
use tinyg_stepgen::{AtomicGpioPort, DriverPower, StepGenerator, Timer};

struct MockPort(&'static str);
impl AtomicGpioPort for MockPort {
    fn set(&mut self, mask: u8) {
        defmt::info!("{}: set {:08b}", self.0, mask);
    }
    fn clear(&mut self, mask: u8) {
        defmt::info!("{}: clear {:08b}", self.0, mask);
    }
    fn write(&mut self, mask: u8) {
        defmt::info!("{}: write {:08b}", self.0, mask);
    }
}

struct MockTimer;
impl Timer for MockTimer {
    fn schedule_next(&mut self, ticks: u32) {
        defmt::info!("TIMER: scheduled next tick in {} ticks", ticks);
    }
    fn stop(&mut self) {
        defmt::info!("TIMER: stopped");
    }
}

struct MockPower;
impl DriverPower for MockPower {
    fn enable(&mut self) {
        defmt::info!("POWER: drivers enabled");
    }
    fn disable(&mut self) {
        defmt::info!("POWER: drivers disabled (idle timeout)");
    }
}

static STEP_PORT: Mutex<RefCell<MockPort>> = Mutex::new(RefCell::new(MockPort("STEP")));
static TIMER: Mutex<RefCell<MockTimer>> = Mutex::new(RefCell::new(MockTimer));
static POWER: Mutex<RefCell<MockPower>> = Mutex::new(RefCell::new(MockPower));

fn example_segment() -> PrepSegment {
    let mut sp = PrepSegment::null();
    sp.is_null = false;
    sp.step_count[0] = 5;
    sp.step_count[1] = 3;
    sp.direction = [Direction::Positive; MAX_AXES];
    sp.direction[1] = Direction::Negative;
    sp.dda_period = 1000;
    sp.tick_count = 5;
    sp.counter_reset = true;
    sp
}

#[cortex_m_rt::entry]
fn main() -> ! {
    defmt::info!("--- Step Generator Example ---");

    let mut generator = StepGenerator::new(10);
    let mut dir_port = MockPort("DIR");
    let mut power = MockPower;

    defmt::info!("Loading a 5-tick segment: axis0 +5 steps, axis1 -3 steps");
    critical_section::with(|cs| generator.load_segment(&example_segment(), &mut dir_port, &mut power, cs));

    while !generator.is_idle() {
        generator.on_dda_tick(&STEP_PORT, &TIMER, &POWER);
    }

    defmt::info!("Final positions: axis0={} axis1={}", generator.position(0), generator.position(1));

    loop {
        cortex_m::asm::wfi();
    }
}
