//! MonteSim Runner — run orchestration around the core engine.
//!
//! This crate builds on `montesim-core` to provide:
//! - A lifecycle state machine per run (created/running/paused/stopped/completed)
//! - A registry of active runs with the start/control/status surface
//! - The pacing policy that throttles streamed updates without touching results
//! - Channel-backed sinks and the transport-agnostic event wire shapes
//! - TOML run configuration
//! - The persistence collaborator interface plus a JSONL implementation

pub mod config;
pub mod controller;
pub mod events;
pub mod registry;
pub mod sink;
pub mod store;
pub mod throttle;

pub use config::{ConfigError, RunConfig};
pub use controller::{ControlAction, ControlError, RunController, RunStatus, StatusSnapshot};
pub use events::StreamEvent;
pub use registry::{SimulationRegistry, StartOptions};
pub use sink::{ChannelSink, CollectingSink};
pub use store::{
    FinalResults, JsonlStore, RunDescriptor, SimulationRecord, SimulationStore, StoreError,
};
pub use throttle::{clamp_speed, delay_for_speed, DEFAULT_SPEED, MAX_SPEED, MIN_SPEED};
