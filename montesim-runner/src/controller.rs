//! Run controller — lifecycle state machine around one simulation engine.
//!
//! Each run owns its engine, its sink, and (while active) one worker thread
//! stepping the engine day by day. Control requests flip the shared state;
//! the worker observes it at day boundaries. Pausing parks the worker without
//! touching engine state; resuming re-enters the day loop from the last
//! completed day, so a paused-and-resumed run emits exactly the sequence an
//! uninterrupted one would.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use montesim_core::domain::{DailyResult, SimulationId, TradeParameters};
use montesim_core::engine::{RunOutcome, SimulationEngine};
use montesim_core::metrics::SimulationMetrics;
use montesim_core::progress::{ProgressSink, SinkError};

use crate::store::RunDescriptor;
use crate::throttle::{clamp_speed, delay_for_speed};

/// Lifecycle of one run. Legal transitions:
/// `Created → Running → {Paused, Stopped, Completed}` and `Paused → Running`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Created,
    Running,
    Paused,
    Stopped,
    Completed,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Created => "created",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Stopped => "stopped",
            Self::Completed => "completed",
        };
        f.write_str(name)
    }
}

/// A control request against a registered run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlAction {
    Pause,
    Resume,
    Stop,
    SpeedUp,
    SlowDown,
}

impl fmt::Display for ControlAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pause => "pause",
            Self::Resume => "resume",
            Self::Stop => "stop",
            Self::SpeedUp => "speed_up",
            Self::SlowDown => "slow_down",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ControlError {
    #[error("simulation '{0}' not found")]
    NotFound(SimulationId),
    #[error("cannot {action} a {from} simulation")]
    InvalidTransition {
        from: RunStatus,
        action: ControlAction,
    },
}

/// Point-in-time view of one run, for status queries.
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub simulation_id: SimulationId,
    pub status: RunStatus,
    pub speed: f64,
    pub current_day: u32,
}

/// Invoked exactly once, after the terminal event, to unregister the run.
pub(crate) type TerminalHook = Box<dyn Fn(&SimulationId) + Send + Sync>;

#[derive(Debug)]
struct ControlBlock {
    status: RunStatus,
    speed: f64,
    /// True while a worker thread exists that has not parked or exited.
    /// Written only under the block lock, so resume can decide atomically
    /// whether a fresh worker is needed.
    worker_active: bool,
}

struct ControlState {
    block: Mutex<ControlBlock>,
    cancel: AtomicBool,
    current_day: AtomicU32,
}

pub struct RunController {
    descriptor: RunDescriptor,
    engine: Mutex<SimulationEngine>,
    sink: Arc<dyn ProgressSink>,
    control: ControlState,
    on_terminal: TerminalHook,
}

impl RunController {
    pub(crate) fn new(
        descriptor: RunDescriptor,
        engine: SimulationEngine,
        sink: Arc<dyn ProgressSink>,
        initial_speed: f64,
        on_terminal: TerminalHook,
    ) -> Arc<Self> {
        Arc::new(Self {
            descriptor,
            engine: Mutex::new(engine),
            sink,
            control: ControlState {
                block: Mutex::new(ControlBlock {
                    status: RunStatus::Created,
                    speed: clamp_speed(initial_speed),
                    worker_active: false,
                }),
                cancel: AtomicBool::new(false),
                current_day: AtomicU32::new(0),
            },
            on_terminal,
        })
    }

    pub fn id(&self) -> &SimulationId {
        &self.descriptor.simulation_id
    }

    pub fn params(&self) -> &TradeParameters {
        &self.descriptor.params
    }

    pub fn descriptor(&self) -> &RunDescriptor {
        &self.descriptor
    }

    /// Side-effect-free status query, available at any time.
    pub fn status_snapshot(&self) -> StatusSnapshot {
        let block = self.block();
        StatusSnapshot {
            simulation_id: self.descriptor.simulation_id.clone(),
            status: block.status,
            speed: block.speed,
            current_day: self.control.current_day.load(Ordering::Relaxed),
        }
    }

    /// Created → Running: spawn the first worker.
    pub(crate) fn launch(self: &Arc<Self>) {
        {
            let mut block = self.block();
            debug_assert_eq!(block.status, RunStatus::Created);
            block.status = RunStatus::Running;
            block.worker_active = true;
        }
        self.spawn_worker();
    }

    /// Apply a control action. Returns the speed in effect afterwards.
    pub fn control(self: &Arc<Self>, action: ControlAction) -> Result<f64, ControlError> {
        match action {
            ControlAction::SpeedUp => {
                let mut block = self.block();
                block.speed = clamp_speed(block.speed * 2.0);
                Ok(block.speed)
            }
            ControlAction::SlowDown => {
                let mut block = self.block();
                block.speed = clamp_speed(block.speed / 2.0);
                Ok(block.speed)
            }
            ControlAction::Pause => {
                let mut block = self.block();
                if block.status != RunStatus::Running {
                    return Err(ControlError::InvalidTransition {
                        from: block.status,
                        action,
                    });
                }
                block.status = RunStatus::Paused;
                self.control.cancel.store(true, Ordering::Relaxed);
                Ok(block.speed)
            }
            ControlAction::Resume => {
                let need_spawn;
                let speed;
                {
                    let mut block = self.block();
                    if block.status != RunStatus::Paused {
                        return Err(ControlError::InvalidTransition {
                            from: block.status,
                            action,
                        });
                    }
                    block.status = RunStatus::Running;
                    self.control.cancel.store(false, Ordering::Relaxed);
                    speed = block.speed;
                    // A worker that has not parked yet will simply observe
                    // Running and keep going; otherwise start a fresh one.
                    need_spawn = !block.worker_active;
                    if need_spawn {
                        block.worker_active = true;
                    }
                }
                if need_spawn {
                    self.spawn_worker();
                }
                Ok(speed)
            }
            ControlAction::Stop => {
                let mut block = self.block();
                if block.status != RunStatus::Running {
                    return Err(ControlError::InvalidTransition {
                        from: block.status,
                        action,
                    });
                }
                block.status = RunStatus::Stopped;
                self.control.cancel.store(true, Ordering::Relaxed);
                Ok(block.speed)
            }
        }
    }

    fn block(&self) -> MutexGuard<'_, ControlBlock> {
        self.control.block.lock().expect("control lock poisoned")
    }

    fn spawn_worker(self: &Arc<Self>) {
        let controller = Arc::clone(self);
        thread::Builder::new()
            .name(format!("montesim-run-{}", self.id()))
            .spawn(move || controller.worker_loop())
            .expect("failed to spawn worker thread");
    }

    /// Worker body: run engine segments until a terminal state or a park.
    fn worker_loop(self: Arc<Self>) {
        loop {
            let outcome = {
                let paced = PacedSink {
                    inner: self.sink.as_ref(),
                    control: &self.control,
                };
                let mut engine = self.engine.lock().expect("engine lock poisoned");
                engine.run(&paced, Some(&self.control.cancel))
            };

            match outcome {
                Ok(RunOutcome::Completed {
                    daily_results,
                    metrics,
                }) => {
                    {
                        let mut block = self.block();
                        block.status = RunStatus::Completed;
                        block.worker_active = false;
                    }
                    if let Err(e) = self.sink.on_complete(&daily_results, &metrics) {
                        log::warn!("simulation {}: completion event undeliverable: {e}", self.id());
                    }
                    (self.on_terminal)(self.id());
                    return;
                }
                Ok(RunOutcome::Cancelled) => {
                    let mut block = self.block();
                    match block.status {
                        // Resumed before this worker parked: keep stepping.
                        RunStatus::Running => continue,
                        // Parked. Engine state stays put; resume will spawn.
                        RunStatus::Paused => {
                            block.worker_active = false;
                            return;
                        }
                        _ => {
                            block.worker_active = false;
                            drop(block);
                            if let Err(e) = self.sink.on_stopped("simulation stopped") {
                                log::warn!(
                                    "simulation {}: stopped event undeliverable: {e}",
                                    self.id()
                                );
                            }
                            (self.on_terminal)(self.id());
                            return;
                        }
                    }
                }
                Err(e) => {
                    {
                        let mut block = self.block();
                        block.status = RunStatus::Stopped;
                        block.worker_active = false;
                    }
                    log::warn!("simulation {} aborted: {e}", self.id());
                    let _ = self.sink.on_stopped(&format!("simulation aborted: {e}"));
                    (self.on_terminal)(self.id());
                    return;
                }
            }
        }
    }
}

/// Wraps the run's sink for the engine: forwards each day, then records the
/// day index and applies the throttle delay at the current speed. Terminal
/// notifications pass through untouched (the controller emits those itself,
/// unpaced).
struct PacedSink<'a> {
    inner: &'a dyn ProgressSink,
    control: &'a ControlState,
}

impl ProgressSink for PacedSink<'_> {
    fn on_day(&self, day: u32, result: &DailyResult) -> Result<(), SinkError> {
        self.inner.on_day(day, result)?;
        self.control.current_day.store(day, Ordering::Relaxed);
        let speed = {
            self.control
                .block
                .lock()
                .expect("control lock poisoned")
                .speed
        };
        thread::sleep(delay_for_speed(speed));
        Ok(())
    }

    fn on_complete(
        &self,
        daily_results: &[DailyResult],
        metrics: &SimulationMetrics,
    ) -> Result<(), SinkError> {
        self.inner.on_complete(daily_results, metrics)
    }

    fn on_stopped(&self, message: &str) -> Result<(), SinkError> {
        self.inner.on_stopped(message)
    }
}
