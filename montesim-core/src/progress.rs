//! Progress sink — the streaming contract between a run and its consumer.
//!
//! The engine hands each daily snapshot to the sink and waits for it to
//! return before simulating the next day, so a slow consumer naturally
//! backpressures the producer. Channel-backed and stdout implementations
//! live in the orchestration layer; the engine only knows this trait.

use thiserror::Error;

use crate::domain::DailyResult;
use crate::metrics::SimulationMetrics;

/// Why a hand-off to the consumer failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SinkError {
    #[error("consumer disconnected")]
    Disconnected,
    #[error("sink error: {0}")]
    Other(String),
}

/// Receives the stream of one run's updates.
///
/// `on_day` is invoked once per simulated business day, in day order. Exactly
/// one of `on_complete` / `on_stopped` follows per run attempt — never both,
/// never neither.
pub trait ProgressSink: Send + Sync {
    /// One daily snapshot. `day` is the calendar-day index from the start
    /// date (weekend indices are skipped, so the sequence has gaps).
    fn on_day(&self, day: u32, result: &DailyResult) -> Result<(), SinkError>;

    /// The run finished its whole horizon.
    fn on_complete(
        &self,
        daily_results: &[DailyResult],
        metrics: &SimulationMetrics,
    ) -> Result<(), SinkError>;

    /// The run was cancelled before finishing.
    fn on_stopped(&self, message: &str) -> Result<(), SinkError>;
}

/// Sink that discards everything. Benchmarks and fire-and-forget runs.
pub struct NullSink;

impl ProgressSink for NullSink {
    fn on_day(&self, _day: u32, _result: &DailyResult) -> Result<(), SinkError> {
        Ok(())
    }

    fn on_complete(
        &self,
        _daily_results: &[DailyResult],
        _metrics: &SimulationMetrics,
    ) -> Result<(), SinkError> {
        Ok(())
    }

    fn on_stopped(&self, _message: &str) -> Result<(), SinkError> {
        Ok(())
    }
}
