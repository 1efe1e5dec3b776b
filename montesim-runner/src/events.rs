//! Wire shapes for streamed run events, transport-agnostic.
//!
//! Whatever carries these to the consumer (an in-process channel today, a
//! socket upstream) sees exactly this tagged layout.

use serde::Serialize;

use montesim_core::domain::DailyResult;
use montesim_core::metrics::SimulationMetrics;

/// One message on a run's stream.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// One simulated business day. `day` is the calendar-day index from the
    /// run's start date.
    DailyUpdate { day: u32, data: DailyResult },
    /// Terminal: the run finished its whole horizon.
    SimulationComplete {
        daily_results: Vec<DailyResult>,
        metrics: SimulationMetrics,
    },
    /// Terminal: the run was stopped before finishing. No result payload.
    SimulationStopped { message: String },
}

impl StreamEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::DailyUpdate { .. })
    }
}
