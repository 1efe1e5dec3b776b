//! MonteSim Core — parameters, daily simulation loop, metrics.
//!
//! This crate contains the numeric heart of the simulator:
//! - Domain types (trade parameters, trade records, daily snapshots, run ids)
//! - Seeded RNG helpers for reproducible runs
//! - Day-by-day Monte Carlo engine with cooperative cancellation between days
//! - Progress sink trait for streaming daily snapshots to a single consumer
//! - Pure metrics aggregation (win/loss stats, drawdown, Sharpe, profit factor)

pub mod domain;
pub mod engine;
pub mod metrics;
pub mod progress;
pub mod rng;
