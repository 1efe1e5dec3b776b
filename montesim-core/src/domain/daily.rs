//! DailyResult — immutable snapshot of one simulated business day.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One simulated business day. Emitted in strict date order, exactly once
/// per day, and never mutated after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyResult {
    pub date: NaiveDate,
    pub starting_balance: f64,
    pub ending_balance: f64,
    pub trades_taken: u32,
    pub wins: u32,
    pub losses: u32,
    pub daily_pnl: f64,
    /// Win rate for this day alone: `wins / trades_taken`, 0 with no trades.
    pub win_rate: f64,
    /// `ending_balance - initial_balance` at the end of this day.
    pub cumulative_pnl: f64,
    /// Percentage shortfall below the running peak balance.
    pub drawdown: f64,
    /// Largest drawdown seen so far, in currency units. Non-decreasing.
    pub max_drawdown_to_date: f64,
}
