//! Per-axis min/max limit and homing switch state.
//!
//! Generalizes the endstop reader into the full switch state the data model
//! requires: five polarity/role modes per switch, a thrown latch, and a
//! lockout tick counter driving debounce. [`SwitchArray`] holds the pure
//! ISR-facing state (no GPIO dependency, so it is trivially testable);
//! [`SwitchPins`] wraps actual input pins and forwards polarity-raw reads
//! into it, the same split the original endstop reader drew between pin
//! access and state.

#![no_std]

use embedded_hal::digital::InputPin;

/// Number of axes a switch array tracks limits for.
pub const MAX_AXES: usize = 6;

/// A switch's configured role: disabled, or one of NO/NC wired either as a
/// homing-only input or as an always-enabled hard limit.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum SwitchMode {
    #[default]
    Disabled,
    HomingNo,
    EnabledNo,
    HomingNc,
    EnabledNc,
}

impl SwitchMode {
    fn is_active(self) -> bool {
        !matches!(self, SwitchMode::Disabled)
    }

    fn active_low(self) -> bool {
        matches!(self, SwitchMode::HomingNc | SwitchMode::EnabledNc)
    }

    /// True for the two homing-only modes: a thrown switch here is consumed
    /// as a homing event by the cycle controller, never an alarm.
    fn homing_only(self) -> bool {
        matches!(self, SwitchMode::HomingNo | SwitchMode::HomingNc)
    }
}

/// Which end of an axis's travel a switch guards.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Endpoint {
    Min,
    Max,
}

#[derive(Debug, Copy, Clone, Default)]
struct SwitchState {
    mode: SwitchMode,
    thrown: bool,
    lockout_ticks: u16,
}

/// Per-axis min/max switch state: mode, latched thrown flag, and lockout
/// countdown. No GPIO dependency -- `observe` takes an already-read raw
/// pin level, so this type is usable from a switch ISR, a host simulation,
/// or a unit test without a pin at all.
pub struct SwitchArray<const N: usize> {
    min: [SwitchState; N],
    max: [SwitchState; N],
    lockout_window_ticks: u16,
}

impl<const N: usize> SwitchArray<N> {
    pub fn new(lockout_window_ticks: u16) -> Self {
        Self {
            min: [SwitchState::default(); N],
            max: [SwitchState::default(); N],
            lockout_window_ticks,
        }
    }

    pub fn set_mode(&mut self, axis: usize, endpoint: Endpoint, mode: SwitchMode) {
        self.slot_mut(axis, endpoint).mode = mode;
    }

    fn slot_mut(&mut self, axis: usize, endpoint: Endpoint) -> &mut SwitchState {
        match endpoint {
            Endpoint::Min => &mut self.min[axis],
            Endpoint::Max => &mut self.max[axis],
        }
    }

    fn slot(&self, axis: usize, endpoint: Endpoint) -> &SwitchState {
        match endpoint {
            Endpoint::Min => &self.min[axis],
            Endpoint::Max => &self.max[axis],
        }
    }

    /// Forwards one raw (polarity-unaware) pin read into this switch's
    /// state. A rising edge while not in lockout latches `thrown` and
    /// starts the lockout window; repeated edges during lockout are
    /// ignored, per the debounce rule.
    pub fn observe(&mut self, axis: usize, endpoint: Endpoint, raw_high: bool) {
        let slot = self.slot_mut(axis, endpoint);
        if !slot.mode.is_active() || slot.lockout_ticks > 0 {
            return;
        }
        let active = if slot.mode.active_low() { !raw_high } else { raw_high };
        if active && !slot.thrown {
            slot.thrown = true;
            slot.lockout_ticks = self.lockout_window_ticks;
        }
    }

    /// Counts down every switch's lockout window by one tick. Called at a
    /// fixed period from the same priority level as the switch ISR.
    pub fn tick(&mut self) {
        for slot in self.min.iter_mut().chain(self.max.iter_mut()) {
            if slot.lockout_ticks > 0 {
                slot.lockout_ticks -= 1;
            }
        }
    }

    pub fn thrown(&self, axis: usize, endpoint: Endpoint) -> bool {
        self.slot(axis, endpoint).thrown
    }

    pub fn any_thrown(&self) -> bool {
        self.min.iter().chain(self.max.iter()).any(|s| s.thrown)
    }

    /// Whether the named switch is wired for homing only -- if so, the
    /// cycle controller should consume a thrown event rather than alarm.
    pub fn is_homing_only(&self, axis: usize, endpoint: Endpoint) -> bool {
        self.slot(axis, endpoint).mode.homing_only()
    }

    /// Acknowledges a thrown switch. The switch re-arms for a fresh edge
    /// once its lockout window (started when it was first thrown) elapses.
    pub fn clear(&mut self, axis: usize, endpoint: Endpoint) {
        self.slot_mut(axis, endpoint).thrown = false;
    }
}

/// Owns the physical input pins for every axis's min/max switch and reads
/// them into a [`SwitchArray`].
pub struct SwitchPins<const N: usize, PIN> {
    min_pins: [PIN; N],
    max_pins: [PIN; N],
}

impl<const N: usize, PIN, E> SwitchPins<N, PIN>
where
    PIN: InputPin<Error = E>,
{
    pub fn new(min_pins: [PIN; N], max_pins: [PIN; N]) -> Self {
        Self { min_pins, max_pins }
    }

    /// Reads every pin and forwards the raw level into `switches`. Call
    /// from the switch ISR.
    pub fn poll(&mut self, switches: &mut SwitchArray<N>) -> Result<(), E> {
        for axis in 0..N {
            let raw = self.min_pins[axis].is_high()?;
            switches.observe(axis, Endpoint::Min, raw);
            let raw = self.max_pins[axis].is_high()?;
            switches.observe(axis, Endpoint::Max, raw);
        }
        Ok(())
    }
}
