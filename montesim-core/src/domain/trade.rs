//! TradeRecord — one executed trade in the append-only run log.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Outcome of a single trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeOutcome {
    Win,
    Loss,
}

/// One executed trade. The log of these is owned exclusively by the engine
/// instance that produced it and is only ever appended to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub date: NaiveDate,
    pub outcome: TradeOutcome,
    /// Signed profit or loss: positive for wins, negative for losses.
    pub pnl: f64,
    pub balance_after: f64,
}

impl TradeRecord {
    pub fn is_win(&self) -> bool {
        self.outcome == TradeOutcome::Win
    }
}
