//! Domain types: parameters, trades, daily snapshots, run identifiers.

pub mod daily;
pub mod ids;
pub mod params;
pub mod trade;

pub use daily::DailyResult;
pub use ids::SimulationId;
pub use params::{ParamsError, TradeParameters};
pub use trade::{TradeOutcome, TradeRecord};
