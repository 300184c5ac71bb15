//! Filesystem experiment tracker.
//!
//! Layout under the tracking root:
//! `<experiment>/runs.jsonl` (append-only index) and
//! `<experiment>/<run_id>/{run.json, artifacts/model.json}`.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::common::error::{StuntingError, StuntingResult};

use super::domain::{experiment_dir, ExperimentTracker, RunRecord};

#[derive(Clone, Debug)]
pub struct FsTracker {
    root: PathBuf,
}

impl FsTracker {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory of one run.
    pub fn run_dir(&self, record: &RunRecord) -> PathBuf {
        experiment_dir(&self.root, record.experiment()).join(record.run_id().to_string())
    }

    /// Read back every run of an experiment from the index, oldest first.
    pub fn list_runs(&self, experiment: &str) -> StuntingResult<Vec<RunRecord>> {
        let index = experiment_dir(&self.root, experiment).join("runs.jsonl");
        let body = match fs::read_to_string(&index) {
            Ok(body) => body,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        body.lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| serde_json::from_str(l).map_err(StuntingError::from))
            .collect()
    }
}

impl ExperimentTracker for FsTracker {
    fn log_run(&self, record: &RunRecord, artifact: &[u8]) -> StuntingResult<()> {
        let run_dir = self.run_dir(record);
        fs::create_dir_all(run_dir.join("artifacts"))?;

        let run_file = run_dir.join("run.json");
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&run_file)
            .map_err(|e| {
                StuntingError::Tracker(format!("cannot create {}: {e}", run_file.display()))
            })?;
        file.write_all(&serde_json::to_vec_pretty(record)?)?;

        fs::write(run_dir.join("artifacts").join("model.json"), artifact)?;

        let index = experiment_dir(&self.root, record.experiment()).join("runs.jsonl");
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&index)?
            .write_all(&line)?;

        info!(
            run_id = %record.run_id(),
            experiment = record.experiment(),
            dir = %run_dir.display(),
            "run recorded"
        );
        Ok(())
    }
}
