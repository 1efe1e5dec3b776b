//! Persistence collaborator — saved simulation records.
//!
//! The core never persists anything itself; the calling layer invokes this
//! interface around the run lifecycle (`create` at start, `save` at
//! completion). `JsonlStore` appends one JSON object per line; reads take the
//! last entry per id, so a save simply supersedes the create line.

use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use montesim_core::domain::{DailyResult, SimulationId, TradeParameters};
use montesim_core::metrics::SimulationMetrics;

/// Everything needed to reproduce and label a run, fixed at registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunDescriptor {
    pub simulation_id: SimulationId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub params: TradeParameters,
    pub seed: u64,
    pub start_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

/// Payload saved when a run completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalResults {
    pub daily_results: Vec<DailyResult>,
    pub metrics: SimulationMetrics,
}

/// One stored simulation: the descriptor plus results once completed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationRecord {
    pub descriptor: RunDescriptor,
    pub completed: bool,
    pub daily_results: Vec<DailyResult>,
    pub metrics: Option<SimulationMetrics>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("store serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("no record for simulation '{0}' — create it before saving results")]
    UnknownSimulation(SimulationId),
}

/// Narrow persistence interface consumed by the calling layer.
pub trait SimulationStore: Send + Sync {
    fn create(&self, descriptor: &RunDescriptor) -> Result<(), StoreError>;
    fn save(&self, id: &SimulationId, results: &FinalResults) -> Result<(), StoreError>;
    fn get(&self, id: &SimulationId) -> Result<Option<SimulationRecord>, StoreError>;
    fn list_all(&self) -> Result<Vec<SimulationRecord>, StoreError>;
}

/// Append-only JSONL store. Each line is an independent JSON object, so the
/// format survives partial writes and streams trivially.
pub struct JsonlStore {
    path: PathBuf,
}

impl JsonlStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&self, record: &SimulationRecord) -> Result<(), StoreError> {
        let json = serde_json::to_string(record)?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{json}")?;
        file.flush()?;
        Ok(())
    }

    /// All records, last entry per id winning. Malformed lines are skipped
    /// with a warning, not treated as fatal.
    fn read_latest(&self) -> Result<Vec<SimulationRecord>, StoreError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let file = fs::File::open(&self.path)?;
        let reader = BufReader::new(file);

        let mut latest: Vec<SimulationRecord> = Vec::new();
        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<SimulationRecord>(&line) {
                Ok(record) => {
                    if let Some(existing) = latest
                        .iter_mut()
                        .find(|r| r.descriptor.simulation_id == record.descriptor.simulation_id)
                    {
                        *existing = record;
                    } else {
                        latest.push(record);
                    }
                }
                Err(e) => {
                    log::warn!(
                        "skipping malformed record at {}:{}: {e}",
                        self.path.display(),
                        line_no + 1
                    );
                }
            }
        }
        Ok(latest)
    }
}

impl SimulationStore for JsonlStore {
    fn create(&self, descriptor: &RunDescriptor) -> Result<(), StoreError> {
        self.append(&SimulationRecord {
            descriptor: descriptor.clone(),
            completed: false,
            daily_results: Vec::new(),
            metrics: None,
            updated_at: descriptor.created_at,
        })
    }

    fn save(&self, id: &SimulationId, results: &FinalResults) -> Result<(), StoreError> {
        let existing = self
            .get(id)?
            .ok_or_else(|| StoreError::UnknownSimulation(id.clone()))?;
        self.append(&SimulationRecord {
            descriptor: existing.descriptor,
            completed: true,
            daily_results: results.daily_results.clone(),
            metrics: Some(results.metrics.clone()),
            updated_at: Utc::now(),
        })
    }

    fn get(&self, id: &SimulationId) -> Result<Option<SimulationRecord>, StoreError> {
        Ok(self
            .read_latest()?
            .into_iter()
            .find(|r| &r.descriptor.simulation_id == id))
    }

    fn list_all(&self) -> Result<Vec<SimulationRecord>, StoreError> {
        let mut records = self.read_latest()?;
        records.sort_by(|a, b| b.descriptor.created_at.cmp(&a.descriptor.created_at));
        Ok(records)
    }
}
