//! TradeParameters — the immutable inputs of one simulation run.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Upper bound on per-trade risk, as a percentage of balance.
pub const MAX_RISK_PER_TRADE_PERCENT: f64 = 10.0;
/// Upper bound on trades per day.
pub const MAX_TRADES_PER_DAY: u32 = 50;
/// Upper bound on the simulation horizon, in calendar days (three years).
pub const MAX_SIMULATION_DAYS: u32 = 1095;

/// A parameter rejected at construction time, with the offending value.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParamsError {
    #[error("initial_balance must be positive, got {0}")]
    InitialBalance(f64),
    #[error("risk_per_trade_percent must be in (0, {MAX_RISK_PER_TRADE_PERCENT}], got {0}")]
    RiskPerTrade(f64),
    #[error("risk_reward_ratio must be positive, got {0}")]
    RiskReward(f64),
    #[error("max_trades_per_day must be in 1..={MAX_TRADES_PER_DAY}, got {0}")]
    MaxTradesPerDay(u32),
    #[error("monthly_cashout_percent must be in [0, 100], got {0}")]
    MonthlyCashout(f64),
    #[error("win_rate must be strictly between 0 and 1, got {0}")]
    WinRate(f64),
    #[error("simulation_days must be in 1..={MAX_SIMULATION_DAYS}, got {0}")]
    SimulationDays(u32),
}

/// Inputs for one simulation run. Immutable once the run starts.
///
/// `simulation_days` counts calendar days: weekends consume the budget but
/// are never simulated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeParameters {
    pub initial_balance: f64,
    /// Percentage of the current balance risked on each trade.
    pub risk_per_trade_percent: f64,
    /// Reward-to-risk ratio: a win pays `risk * ratio`.
    pub risk_reward_ratio: f64,
    pub max_trades_per_day: u32,
    /// Percentage of accrued profit withdrawn on the 1st of each month.
    #[serde(default)]
    pub monthly_cashout_percent: f64,
    /// Probability that a single trade wins. Strictly between 0 and 1.
    pub win_rate: f64,
    pub simulation_days: u32,
}

impl Default for TradeParameters {
    fn default() -> Self {
        Self {
            initial_balance: 10_000.0,
            risk_per_trade_percent: 1.0,
            risk_reward_ratio: 2.0,
            max_trades_per_day: 3,
            monthly_cashout_percent: 0.0,
            win_rate: 0.55,
            simulation_days: 365,
        }
    }
}

impl TradeParameters {
    /// Check every field against its documented range.
    ///
    /// Non-finite floats fail the same check as out-of-range values, so the
    /// engine can assume finite arithmetic throughout.
    pub fn validate(&self) -> Result<(), ParamsError> {
        if !self.initial_balance.is_finite() || self.initial_balance <= 0.0 {
            return Err(ParamsError::InitialBalance(self.initial_balance));
        }
        if !self.risk_per_trade_percent.is_finite()
            || self.risk_per_trade_percent <= 0.0
            || self.risk_per_trade_percent > MAX_RISK_PER_TRADE_PERCENT
        {
            return Err(ParamsError::RiskPerTrade(self.risk_per_trade_percent));
        }
        if !self.risk_reward_ratio.is_finite() || self.risk_reward_ratio <= 0.0 {
            return Err(ParamsError::RiskReward(self.risk_reward_ratio));
        }
        if self.max_trades_per_day == 0 || self.max_trades_per_day > MAX_TRADES_PER_DAY {
            return Err(ParamsError::MaxTradesPerDay(self.max_trades_per_day));
        }
        if !self.monthly_cashout_percent.is_finite()
            || self.monthly_cashout_percent < 0.0
            || self.monthly_cashout_percent > 100.0
        {
            return Err(ParamsError::MonthlyCashout(self.monthly_cashout_percent));
        }
        if !self.win_rate.is_finite() || self.win_rate <= 0.0 || self.win_rate >= 1.0 {
            return Err(ParamsError::WinRate(self.win_rate));
        }
        if self.simulation_days == 0 || self.simulation_days > MAX_SIMULATION_DAYS {
            return Err(ParamsError::SimulationDays(self.simulation_days));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_parameters_are_valid() {
        assert!(TradeParameters::default().validate().is_ok());
    }

    #[test]
    fn boundary_values_are_accepted() {
        let params = TradeParameters {
            risk_per_trade_percent: 10.0,
            max_trades_per_day: 50,
            monthly_cashout_percent: 100.0,
            simulation_days: 1095,
            ..TradeParameters::default()
        };
        assert!(params.validate().is_ok());
    }

    #[test]
    fn non_positive_balance_is_rejected() {
        let params = TradeParameters {
            initial_balance: 0.0,
            ..TradeParameters::default()
        };
        assert_eq!(params.validate(), Err(ParamsError::InitialBalance(0.0)));
    }

    #[test]
    fn excessive_risk_is_rejected() {
        let params = TradeParameters {
            risk_per_trade_percent: 10.5,
            ..TradeParameters::default()
        };
        assert!(matches!(
            params.validate(),
            Err(ParamsError::RiskPerTrade(_))
        ));
    }

    #[test]
    fn zero_risk_reward_is_rejected() {
        let params = TradeParameters {
            risk_reward_ratio: 0.0,
            ..TradeParameters::default()
        };
        assert!(matches!(params.validate(), Err(ParamsError::RiskReward(_))));
    }

    #[test]
    fn trade_count_bounds_are_enforced() {
        for bad in [0, 51] {
            let params = TradeParameters {
                max_trades_per_day: bad,
                ..TradeParameters::default()
            };
            assert!(matches!(
                params.validate(),
                Err(ParamsError::MaxTradesPerDay(_))
            ));
        }
    }

    #[test]
    fn cashout_percent_bounds_are_enforced() {
        let params = TradeParameters {
            monthly_cashout_percent: 100.1,
            ..TradeParameters::default()
        };
        assert!(matches!(
            params.validate(),
            Err(ParamsError::MonthlyCashout(_))
        ));
    }

    #[test]
    fn win_rate_endpoints_are_rejected() {
        for bad in [0.0, 1.0] {
            let params = TradeParameters {
                win_rate: bad,
                ..TradeParameters::default()
            };
            assert!(matches!(params.validate(), Err(ParamsError::WinRate(_))));
        }
    }

    #[test]
    fn horizon_bounds_are_enforced() {
        for bad in [0, 1096] {
            let params = TradeParameters {
                simulation_days: bad,
                ..TradeParameters::default()
            };
            assert!(matches!(
                params.validate(),
                Err(ParamsError::SimulationDays(_))
            ));
        }
    }

    #[test]
    fn nan_fields_are_rejected() {
        let params = TradeParameters {
            win_rate: f64::NAN,
            ..TradeParameters::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn parameters_serialization_roundtrip() {
        let params = TradeParameters::default();
        let json = serde_json::to_string(&params).unwrap();
        let deser: TradeParameters = serde_json::from_str(&json).unwrap();
        assert_eq!(params, deser);
    }

    #[test]
    fn missing_cashout_defaults_to_zero() {
        let json = r#"{
            "initial_balance": 5000.0,
            "risk_per_trade_percent": 2.0,
            "risk_reward_ratio": 1.5,
            "max_trades_per_day": 5,
            "win_rate": 0.6,
            "simulation_days": 90
        }"#;
        let params: TradeParameters = serde_json::from_str(json).unwrap();
        assert_eq!(params.monthly_cashout_percent, 0.0);
    }
}
