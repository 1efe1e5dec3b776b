//! TOML run configuration.
//!
//! A config file captures everything needed to reproduce a run: the trade
//! parameters plus the optional seed, start date, and initial speed.

use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use montesim_core::domain::{ParamsError, TradeParameters};

use crate::registry::StartOptions;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Read(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid parameters: {0}")]
    Params(#[from] ParamsError),
}

/// A complete run description, loadable from TOML.
///
/// ```toml
/// name = "baseline"
/// seed = 42
/// start_date = "2025-01-06"
///
/// [parameters]
/// initial_balance = 10000.0
/// risk_per_trade_percent = 1.0
/// risk_reward_ratio = 2.0
/// max_trades_per_day = 3
/// monthly_cashout_percent = 10.0
/// win_rate = 0.55
/// simulation_days = 365
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub parameters: TradeParameters,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub speed: Option<f64>,
}

impl RunConfig {
    /// Parse and validate a config from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.parameters.validate()?;
        Ok(config)
    }

    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        Self::from_toml_str(&std::fs::read_to_string(path)?)
    }

    /// The start options this config pins down.
    pub fn start_options(&self) -> StartOptions {
        StartOptions {
            name: self.name.clone(),
            description: self.description.clone(),
            seed: self.seed,
            start_date: self.start_date,
            speed: self.speed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        name = "baseline"
        seed = 42
        start_date = "2025-01-06"
        speed = 2.0

        [parameters]
        initial_balance = 10000.0
        risk_per_trade_percent = 1.0
        risk_reward_ratio = 2.0
        max_trades_per_day = 3
        monthly_cashout_percent = 10.0
        win_rate = 0.55
        simulation_days = 365
    "#;

    #[test]
    fn sample_config_parses() {
        let config = RunConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(config.name.as_deref(), Some("baseline"));
        assert_eq!(config.seed, Some(42));
        assert_eq!(
            config.start_date,
            Some(NaiveDate::from_ymd_opt(2025, 1, 6).unwrap())
        );
        assert_eq!(config.parameters.max_trades_per_day, 3);

        let options = config.start_options();
        assert_eq!(options.seed, Some(42));
        assert_eq!(options.speed, Some(2.0));
    }

    #[test]
    fn minimal_config_only_needs_parameters() {
        let text = r#"
            [parameters]
            initial_balance = 5000.0
            risk_per_trade_percent = 2.0
            risk_reward_ratio = 1.5
            max_trades_per_day = 5
            win_rate = 0.6
            simulation_days = 90
        "#;
        let config = RunConfig::from_toml_str(text).unwrap();
        assert!(config.name.is_none());
        assert!(config.seed.is_none());
        assert_eq!(config.parameters.monthly_cashout_percent, 0.0);
    }

    #[test]
    fn out_of_range_parameters_are_rejected() {
        let text = r#"
            [parameters]
            initial_balance = 5000.0
            risk_per_trade_percent = 50.0
            risk_reward_ratio = 1.5
            max_trades_per_day = 5
            win_rate = 0.6
            simulation_days = 90
        "#;
        assert!(matches!(
            RunConfig::from_toml_str(text),
            Err(ConfigError::Params(_))
        ));
    }

    #[test]
    fn missing_parameters_table_is_a_parse_error() {
        assert!(matches!(
            RunConfig::from_toml_str("name = \"x\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn config_roundtrips_through_toml() {
        let config = RunConfig::from_toml_str(SAMPLE).unwrap();
        let text = toml::to_string(&config).unwrap();
        let reparsed = RunConfig::from_toml_str(&text).unwrap();
        assert_eq!(config, reparsed);
    }
}
