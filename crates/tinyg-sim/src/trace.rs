//! Trace recording: a serializable log of what happened during a
//! [`crate::harness::SimHarness`] run, in the style of a golden-trace
//! mechanism recording host/MCU socket frames, but logging scheduler
//! passes instead since this harness has no wire boundary to log across.

use serde::{Deserialize, Serialize};

/// One event observed during a single [`crate::harness::SimHarness::tick`]
/// call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TraceEvent {
    /// The foreground dispatch list's outcome this pass (`Debug`-formatted,
    /// since `tinyg_cycle::DispatchOutcome` is a plain enum without its own
    /// serde impl).
    Dispatch(String),
    /// The segment executor handed a fresh segment to the step generator.
    SegmentLoaded { step_count: [u32; 6], tick_count: u32 },
    /// One DDA tick ran to completion.
    StepTick { positions: [i64; 6] },
    /// Nothing was pending this pass.
    Idle,
}

/// The full ordered trace of a harness run. A thin wrapper so callers can
/// serialize/deserialize (and diff against a golden trace) without reaching
/// into harness internals.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Trace {
    pub events: Vec<TraceEvent>,
}

impl Trace {
    pub fn push(&mut self, event: TraceEvent) {
        self.events.push(event);
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
