//! The cycle controller: the hierarchical machine/cycle/motion/hold state
//! machine and the fixed foreground dispatch list that drives reset,
//! limit-switch, feedhold, and cycle-start handling on top of the planner
//! and switch arrays.
//!
//! `std`-only: this crate is the foreground-side aggregation point, never
//! touched from ISR context -- the MED/HI-priority crates (`tinyg-planner`'s
//! executor, `tinyg-stepgen`, `tinyg-switch`) know nothing about it.

mod dispatch;
mod errors;
mod fsm;

pub use dispatch::{run_dispatch_cycle, DispatchOutcome, DispatchRequest};
pub use errors::CycleError;
pub use fsm::{CycleController, HoldState, LimitOutcome, MachineState, MotionState, ResumeAction};
