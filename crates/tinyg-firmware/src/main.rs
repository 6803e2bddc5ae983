#![no_std]
#![no_main]

//! Thin RTIC binary wiring the HI/MED/LO motion tasks to real hardware.
//!
//! Board bring-up (clock trees, specific GPIO/timer peripheral mapping) is
//! out of scope for this core; `rtic_main` wires the HI step-pulse ISR, the
//! MED segment executor and a LO-priority loader software task, leaving
//! real peripheral setup behind a documented
//! `GpioProxy`/`StepperTimerProxy` placeholder.

use defmt_rtt as _; // global logger
use panic_probe as _;

mod rtic_main;
