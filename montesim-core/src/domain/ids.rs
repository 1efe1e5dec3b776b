//! SimulationId — opaque, printable identifier for one run attempt.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::params::TradeParameters;

/// Identifies one run attempt across the registry, the event stream, and the
/// persistence collaborator.
///
/// Derived by BLAKE3 over the parameters, the seed, and the creation
/// timestamp, so two attempts with identical parameters still get distinct
/// ids while the derivation itself stays deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SimulationId(String);

impl SimulationId {
    pub fn derive(params: &TradeParameters, seed: u64, created_at: DateTime<Utc>) -> Self {
        let params_json =
            serde_json::to_string(params).expect("TradeParameters serialization failed");
        let mut hasher = blake3::Hasher::new();
        hasher.update(params_json.as_bytes());
        hasher.update(&seed.to_le_bytes());
        hasher.update(&created_at.timestamp_micros().to_le_bytes());
        let hash = hasher.finalize();
        Self(hash.to_hex()[..16].to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SimulationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for SimulationId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for SimulationId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_instant() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 15, 9, 30, 0).unwrap()
    }

    #[test]
    fn derivation_is_deterministic() {
        let params = TradeParameters::default();
        let a = SimulationId::derive(&params, 42, fixed_instant());
        let b = SimulationId::derive(&params, 42, fixed_instant());
        assert_eq!(a, b);
    }

    #[test]
    fn different_seeds_give_different_ids() {
        let params = TradeParameters::default();
        let a = SimulationId::derive(&params, 42, fixed_instant());
        let b = SimulationId::derive(&params, 43, fixed_instant());
        assert_ne!(a, b);
    }

    #[test]
    fn different_timestamps_give_different_ids() {
        let params = TradeParameters::default();
        let a = SimulationId::derive(&params, 42, fixed_instant());
        let b = SimulationId::derive(
            &params,
            42,
            fixed_instant() + chrono::Duration::microseconds(1),
        );
        assert_ne!(a, b);
    }

    #[test]
    fn id_is_short_hex() {
        let id = SimulationId::derive(&TradeParameters::default(), 7, fixed_instant());
        assert_eq!(id.as_str().len(), 16);
        assert!(id.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }
}
