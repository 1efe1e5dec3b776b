//! Aggregate performance metrics — pure functions over a finished run.
//!
//! Everything here is computed from explicit inputs: the trade log, the daily
//! sequence, and the path extremes the engine tracked while stepping. No
//! dependency on the engine, the controller, or any I/O.

use serde::{Deserialize, Serialize};

use crate::domain::{DailyResult, TradeRecord};

/// Trading days per year, for annualizing the Sharpe ratio.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Path-dependent extremes accumulated during the run. These cannot be
/// recovered from the trade log alone (cashouts, drawdown duration), so the
/// engine hands them over explicitly.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PathSummary {
    /// Largest peak-to-balance shortfall, in currency units.
    pub max_drawdown: f64,
    /// Longest run of consecutive business days spent below the peak.
    pub max_drawdown_duration: u32,
    pub longest_winning_streak: u32,
    pub longest_losing_streak: u32,
    pub total_cashout: f64,
    pub final_balance: f64,
}

/// Summary metrics for one finished run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationMetrics {
    pub total_trades: u32,
    pub total_wins: u32,
    pub total_losses: u32,
    pub overall_win_rate: f64,
    pub total_pnl: f64,
    pub max_drawdown: f64,
    pub max_drawdown_duration: u32,
    pub longest_winning_streak: u32,
    pub longest_losing_streak: u32,
    pub total_cashout: f64,
    pub final_balance: f64,
    pub sharpe_ratio: f64,
    /// Gross profit over gross loss. `+inf` when there are wins and no
    /// losses; stored as JSON null and read back as `+inf`.
    #[serde(with = "nullable_infinity")]
    pub profit_factor: f64,
    /// Mean winning trade, 0 with no wins.
    pub average_win: f64,
    /// Mean losing trade as a positive magnitude, 0 with no losses.
    pub average_loss: f64,
    pub largest_win: f64,
    pub largest_loss: f64,
}

/// Compute all metrics for a finished run.
///
/// The empty-trades case is a required base case, not an error: every field
/// is zero except `final_balance`, which passes through.
pub fn aggregate(
    trades: &[TradeRecord],
    daily_results: &[DailyResult],
    path: &PathSummary,
) -> SimulationMetrics {
    if trades.is_empty() {
        return SimulationMetrics {
            total_trades: 0,
            total_wins: 0,
            total_losses: 0,
            overall_win_rate: 0.0,
            total_pnl: 0.0,
            max_drawdown: 0.0,
            max_drawdown_duration: 0,
            longest_winning_streak: 0,
            longest_losing_streak: 0,
            total_cashout: 0.0,
            final_balance: path.final_balance,
            sharpe_ratio: 0.0,
            profit_factor: 0.0,
            average_win: 0.0,
            average_loss: 0.0,
            largest_win: 0.0,
            largest_loss: 0.0,
        };
    }

    let win_amounts: Vec<f64> = trades.iter().filter(|t| t.is_win()).map(|t| t.pnl).collect();
    let loss_amounts: Vec<f64> = trades
        .iter()
        .filter(|t| !t.is_win())
        .map(|t| t.pnl.abs())
        .collect();

    let total_trades = trades.len() as u32;
    let total_wins = win_amounts.len() as u32;
    let total_losses = loss_amounts.len() as u32;

    let gross_profit: f64 = win_amounts.iter().sum();
    let gross_loss: f64 = loss_amounts.iter().sum();

    SimulationMetrics {
        total_trades,
        total_wins,
        total_losses,
        overall_win_rate: total_wins as f64 / total_trades as f64,
        total_pnl: trades.iter().map(|t| t.pnl).sum(),
        max_drawdown: path.max_drawdown,
        max_drawdown_duration: path.max_drawdown_duration,
        longest_winning_streak: path.longest_winning_streak,
        longest_losing_streak: path.longest_losing_streak,
        total_cashout: path.total_cashout,
        final_balance: path.final_balance,
        sharpe_ratio: sharpe_ratio(daily_results),
        profit_factor: if gross_loss > 0.0 {
            gross_profit / gross_loss
        } else {
            f64::INFINITY
        },
        average_win: mean(&win_amounts),
        average_loss: mean(&loss_amounts),
        largest_win: win_amounts.iter().copied().fold(0.0, f64::max),
        largest_loss: loss_amounts.iter().copied().fold(0.0, f64::max),
    }
}

/// Annualized Sharpe ratio over per-day returns `daily_pnl / starting_balance`.
///
/// Days with a non-positive starting balance are excluded. Returns 0.0 when
/// no day qualifies or the return spread is zero.
pub fn sharpe_ratio(daily_results: &[DailyResult]) -> f64 {
    let returns: Vec<f64> = daily_results
        .iter()
        .filter(|r| r.starting_balance > 0.0)
        .map(|r| r.daily_pnl / r.starting_balance)
        .collect();
    if returns.is_empty() {
        return 0.0;
    }
    let std = std_dev_population(&returns);
    if std < 1e-15 {
        return 0.0;
    }
    mean(&returns) / std * TRADING_DAYS_PER_YEAR.sqrt()
}

// ─── Helpers ────────────────────────────────────────────────────────

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

// Population standard deviation (divide by n, not n-1), matching the
// per-day return convention the Sharpe figure is defined against.
fn std_dev_population(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Serializes non-finite floats as JSON null and reads null back as `+inf`.
/// serde_json writes null for `f64::INFINITY` anyway; without this the value
/// could never be read back.
mod nullable_infinity {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &f64, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if value.is_finite() {
            serializer.serialize_f64(*value)
        } else {
            serializer.serialize_none()
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<f64, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::INFINITY))
    }
}
