//! Simulated MCU-side peripherals: a deterministic, in-process stand-in for
//! the GPIO/timer/driver-power hardware [`tinyg_stepgen::StepGenerator`]
//! expects -- a fake MCU the harness drives instead of real silicon, modeled
//! as plain trait impls called in-process rather than a Unix-socket
//! protocol responder, since this core has no IPC boundary to simulate.

use tinyg_stepgen::{AtomicGpioPort, DriverPower, Timer};

/// A simulated GPIO port recording every pulse it is asked to emit, so
/// tests can assert on exactly which axes stepped and how many times.
#[derive(Debug, Default, Clone)]
pub struct SimGpioPort {
    pub state: u8,
    pub pulse_counts: [u32; 8],
}

impl AtomicGpioPort for SimGpioPort {
    fn set(&mut self, mask: u8) {
        self.state |= mask;
        for axis in 0..8 {
            if (mask >> axis) & 1 != 0 {
                self.pulse_counts[axis] += 1;
            }
        }
    }

    fn clear(&mut self, mask: u8) {
        self.state &= !mask;
    }

    fn write(&mut self, mask: u8) {
        self.state = mask;
    }
}

/// A simulated DDA tick timer. The harness drives ticks itself rather than
/// waiting on a real interrupt, so this only records the reload value the
/// step generator last asked for.
#[derive(Debug, Default, Clone)]
pub struct SimTimer {
    pub last_scheduled_period: u32,
    pub stopped: bool,
}

impl Timer for SimTimer {
    fn schedule_next(&mut self, ticks: u32) {
        self.last_scheduled_period = ticks;
        self.stopped = false;
    }

    fn stop(&mut self) {
        self.stopped = true;
    }
}

/// Tracks stepper driver enable/disable calls from the idle-power hook.
#[derive(Debug, Default, Clone)]
pub struct SimDriverPower {
    pub enabled: bool,
    pub enable_count: u32,
    pub disable_count: u32,
}

impl DriverPower for SimDriverPower {
    fn enable(&mut self) {
        self.enabled = true;
        self.enable_count += 1;
    }

    fn disable(&mut self) {
        self.enabled = false;
        self.disable_count += 1;
    }
}
