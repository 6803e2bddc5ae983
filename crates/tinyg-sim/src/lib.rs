//! Deterministic in-process simulation harness for the motion core.
//!
//! Drives host/MCU logic without physical hardware and captures a trace for
//! CI comparison, on a core with no IPC boundary at all: `SimHarness` owns
//! the planner, executor, step generator, switch array and cycle controller
//! directly, and `tick`/`run_until_idle` step them exactly as the firmware's
//! interrupt priorities would, synchronously.

pub mod harness;
pub mod mcu;
pub mod trace;

pub use harness::SimHarness;
pub use trace::{Trace, TraceEvent};
