//! Registry of active simulation runs.
//!
//! The map from simulation id to controller is the only structure shared
//! between runs, and every insert/lookup/remove goes through one mutex.
//! Entries are created by `start` and removed when the run reaches a terminal
//! state — completion, stop, or a fault (including consumer disconnection).

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};

use chrono::{NaiveDate, Utc};

use montesim_core::domain::{ParamsError, SimulationId, TradeParameters};
use montesim_core::engine::SimulationEngine;
use montesim_core::progress::ProgressSink;
use montesim_core::rng;

use crate::controller::{ControlAction, ControlError, RunController, StatusSnapshot};
use crate::store::RunDescriptor;
use crate::throttle::DEFAULT_SPEED;

/// Per-run knobs fixed at start. Everything defaults to "let the registry
/// decide": a random seed, today's date, the standard initial speed.
#[derive(Debug, Clone, Default)]
pub struct StartOptions {
    pub name: Option<String>,
    pub description: Option<String>,
    pub seed: Option<u64>,
    pub start_date: Option<NaiveDate>,
    pub speed: Option<f64>,
}

pub struct SimulationRegistry {
    runs: Mutex<HashMap<SimulationId, Arc<RunController>>>,
}

impl SimulationRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            runs: Mutex::new(HashMap::new()),
        })
    }

    /// Validate parameters, register a new run, and launch it.
    ///
    /// The sink is the run's single consumer; it receives every daily update
    /// and exactly one terminal event.
    pub fn start(
        self: &Arc<Self>,
        params: TradeParameters,
        options: StartOptions,
        sink: Arc<dyn ProgressSink>,
    ) -> Result<SimulationId, ParamsError> {
        let seed = options.seed.unwrap_or_else(rng::random_seed);
        let start_date = options
            .start_date
            .unwrap_or_else(|| Utc::now().date_naive());
        let created_at = Utc::now();
        let id = SimulationId::derive(&params, seed, created_at);

        let engine = SimulationEngine::new(params.clone(), seed, start_date)?;
        let descriptor = RunDescriptor {
            simulation_id: id.clone(),
            name: options.name,
            description: options.description,
            params,
            seed,
            start_date,
            created_at,
        };

        let registry = Arc::downgrade(self);
        let controller = RunController::new(
            descriptor,
            engine,
            sink,
            options.speed.unwrap_or(DEFAULT_SPEED),
            Box::new(move |id: &SimulationId| {
                if let Some(registry) = Weak::upgrade(&registry) {
                    registry.remove(id);
                }
            }),
        );

        self.runs
            .lock()
            .expect("registry lock poisoned")
            .insert(id.clone(), Arc::clone(&controller));
        controller.launch();
        log::debug!("simulation {id} started (seed {seed}, from {start_date})");
        Ok(id)
    }

    /// Apply a control action to a registered run. Returns the speed in
    /// effect afterwards.
    pub fn control(&self, id: &SimulationId, action: ControlAction) -> Result<f64, ControlError> {
        self.lookup(id)?.control(action)
    }

    /// Side-effect-free status query.
    pub fn status(&self, id: &SimulationId) -> Result<StatusSnapshot, ControlError> {
        Ok(self.lookup(id)?.status_snapshot())
    }

    /// The descriptor fixed when the run was registered.
    pub fn descriptor(&self, id: &SimulationId) -> Result<RunDescriptor, ControlError> {
        Ok(self.lookup(id)?.descriptor().clone())
    }

    pub fn contains(&self, id: &SimulationId) -> bool {
        self.runs
            .lock()
            .expect("registry lock poisoned")
            .contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.runs.lock().expect("registry lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lookup(&self, id: &SimulationId) -> Result<Arc<RunController>, ControlError> {
        self.runs
            .lock()
            .expect("registry lock poisoned")
            .get(id)
            .cloned()
            .ok_or_else(|| ControlError::NotFound(id.clone()))
    }

    fn remove(&self, id: &SimulationId) {
        if self
            .runs
            .lock()
            .expect("registry lock poisoned")
            .remove(id)
            .is_some()
        {
            log::debug!("simulation {id} removed from registry");
        }
    }
}
