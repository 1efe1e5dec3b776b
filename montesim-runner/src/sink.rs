//! Channel-backed progress sinks.

use std::sync::mpsc::{sync_channel, Receiver, SyncSender};
use std::sync::Mutex;

use montesim_core::domain::DailyResult;
use montesim_core::metrics::SimulationMetrics;
use montesim_core::progress::{ProgressSink, SinkError};

use crate::events::StreamEvent;

/// Sink that hands each event to a single consumer over a bounded channel.
///
/// With the rendezvous bound (capacity 0) a send blocks until the consumer
/// receives, which is the streaming contract verbatim: one in-flight message,
/// strict ordering, no consumer-side buffering. A dropped receiver turns
/// every further send into [`SinkError::Disconnected`], which tears the run
/// down through the fault path.
pub struct ChannelSink {
    // SyncSender is Send but not Sync; the mutex makes the sink shareable.
    tx: Mutex<SyncSender<StreamEvent>>,
}

impl ChannelSink {
    /// Zero-capacity channel: each send waits for the consumer.
    pub fn rendezvous() -> (Self, Receiver<StreamEvent>) {
        Self::with_capacity(0)
    }

    pub fn with_capacity(bound: usize) -> (Self, Receiver<StreamEvent>) {
        let (tx, rx) = sync_channel(bound);
        (Self { tx: Mutex::new(tx) }, rx)
    }

    fn send(&self, event: StreamEvent) -> Result<(), SinkError> {
        let tx = self
            .tx
            .lock()
            .map_err(|_| SinkError::Other("sink lock poisoned".into()))?;
        tx.send(event).map_err(|_| SinkError::Disconnected)
    }
}

impl ProgressSink for ChannelSink {
    fn on_day(&self, day: u32, result: &DailyResult) -> Result<(), SinkError> {
        self.send(StreamEvent::DailyUpdate {
            day,
            data: result.clone(),
        })
    }

    fn on_complete(
        &self,
        daily_results: &[DailyResult],
        metrics: &SimulationMetrics,
    ) -> Result<(), SinkError> {
        self.send(StreamEvent::SimulationComplete {
            daily_results: daily_results.to_vec(),
            metrics: metrics.clone(),
        })
    }

    fn on_stopped(&self, message: &str) -> Result<(), SinkError> {
        self.send(StreamEvent::SimulationStopped {
            message: message.to_string(),
        })
    }
}

/// Sink that records every event in memory. Tests and diagnostics.
#[derive(Default)]
pub struct CollectingSink {
    events: Mutex<Vec<StreamEvent>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<StreamEvent> {
        self.events.lock().expect("collecting sink poisoned").clone()
    }
}

impl ProgressSink for CollectingSink {
    fn on_day(&self, day: u32, result: &DailyResult) -> Result<(), SinkError> {
        self.events
            .lock()
            .expect("collecting sink poisoned")
            .push(StreamEvent::DailyUpdate {
                day,
                data: result.clone(),
            });
        Ok(())
    }

    fn on_complete(
        &self,
        daily_results: &[DailyResult],
        metrics: &SimulationMetrics,
    ) -> Result<(), SinkError> {
        self.events
            .lock()
            .expect("collecting sink poisoned")
            .push(StreamEvent::SimulationComplete {
                daily_results: daily_results.to_vec(),
                metrics: metrics.clone(),
            });
        Ok(())
    }

    fn on_stopped(&self, message: &str) -> Result<(), SinkError> {
        self.events
            .lock()
            .expect("collecting sink poisoned")
            .push(StreamEvent::SimulationStopped {
                message: message.to_string(),
            });
        Ok(())
    }
}
