//! `CycleError`: the cycle controller's error enum, `thiserror`-derived
//! since this crate is the `std`-side aggregation point the foreground
//! dispatch loop matches on. The `tinyg-planner`/`tinyg-switch` plain-enum
//! errors wrap into variants here rather than the other way around.

use tinyg_config::ConfigLockedError;
use tinyg_planner::PlannerError;

#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CycleError {
    #[error("cannot accept motion while alarmed or shut down")]
    MachineNotReady,
    #[error("feedhold requested while motion is not running")]
    NotRunning,
    #[error("resume requested while not held")]
    NotHeld,
    #[error("reset requested outside of alarm state")]
    NotAlarmed,
    #[error("cycle_state transition invalid from the current state")]
    InvalidCycleState,
    #[error("planner rejected submission: {0}")]
    Planner(#[from] PlannerError),
    #[error("configuration is locked while motion is in progress")]
    ConfigLocked(#[from] ConfigLockedError),
}
