//! Run records and the experiment tracker contract.
//!
//! A run record is built once per training invocation and is read-only
//! afterwards; sinks must never rewrite one.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::error::StuntingResult;

/// Parameter value: text or number.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Int(v) => write!(f, "{v}"),
            ParamValue::Float(v) => write!(f, "{v}"),
            ParamValue::Text(v) => f.write_str(v),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Text(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        ParamValue::Text(v)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v)
    }
}

impl From<usize> for ParamValue {
    fn from(v: usize) -> Self {
        ParamValue::Int(v as i64)
    }
}

impl From<u64> for ParamValue {
    fn from(v: u64) -> Self {
        ParamValue::Int(v as i64)
    }
}

/// The artefact a run produced.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ArtifactRef {
    pub path: PathBuf,
    pub sha256: String,
    pub bytes: usize,
}

/// One tracked training run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    run_id: Uuid,
    experiment: String,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
    params: BTreeMap<String, ParamValue>,
    metrics: BTreeMap<String, f64>,
    artifact: ArtifactRef,
}

impl RunRecord {
    pub fn builder(
        run_id: Uuid,
        experiment: impl Into<String>,
        started_at: DateTime<Utc>,
    ) -> RunRecordBuilder {
        RunRecordBuilder {
            run_id,
            experiment: experiment.into(),
            started_at,
            params: BTreeMap::new(),
            metrics: BTreeMap::new(),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn experiment(&self) -> &str {
        &self.experiment
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn finished_at(&self) -> DateTime<Utc> {
        self.finished_at
    }

    pub fn params(&self) -> &BTreeMap<String, ParamValue> {
        &self.params
    }

    pub fn param(&self, name: &str) -> Option<&ParamValue> {
        self.params.get(name)
    }

    pub fn metrics(&self) -> &BTreeMap<String, f64> {
        &self.metrics
    }

    pub fn metric(&self, name: &str) -> Option<f64> {
        self.metrics.get(name).copied()
    }

    pub fn artifact(&self) -> &ArtifactRef {
        &self.artifact
    }
}

/// Accumulates params and metrics before the record is sealed.
#[derive(Debug)]
pub struct RunRecordBuilder {
    run_id: Uuid,
    experiment: String,
    started_at: DateTime<Utc>,
    params: BTreeMap<String, ParamValue>,
    metrics: BTreeMap<String, f64>,
}

impl RunRecordBuilder {
    pub fn param(mut self, name: &str, value: impl Into<ParamValue>) -> Self {
        self.params.insert(name.to_string(), value.into());
        self
    }

    pub fn metric(mut self, name: &str, value: f64) -> Self {
        self.metrics.insert(name.to_string(), value);
        self
    }

    pub fn finish(self, artifact: ArtifactRef, finished_at: DateTime<Utc>) -> RunRecord {
        RunRecord {
            run_id: self.run_id,
            experiment: self.experiment,
            started_at: self.started_at,
            finished_at,
            params: self.params,
            metrics: self.metrics,
            artifact,
        }
    }
}

/// Sink for run records. Write-only from the trainer's point of view.
pub trait ExperimentTracker {
    /// Record a finished run together with a copy of the artefact bytes it produced.
    fn log_run(&self, record: &RunRecord, artifact: &[u8]) -> StuntingResult<()>;
}

/// Tracker that keeps runs in memory; for embedding and tests.
#[derive(Debug, Default)]
pub struct InMemoryTracker {
    runs: Mutex<Vec<RunRecord>>,
}

impl InMemoryTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn runs(&self) -> Vec<RunRecord> {
        self.runs.lock().clone()
    }
}

impl ExperimentTracker for InMemoryTracker {
    fn log_run(&self, record: &RunRecord, _artifact: &[u8]) -> StuntingResult<()> {
        self.runs.lock().push(record.clone());
        Ok(())
    }
}

/// Directory-safe form of an experiment name.
pub fn experiment_dir(root: &Path, experiment: &str) -> PathBuf {
    let name: String = experiment
        .trim()
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | ':') { '_' } else { c })
        .collect();
    root.join(name)
}
