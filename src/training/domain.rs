//! Domain types for model training and the persisted artefact.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::config::{Kernel, TrainerConfig};
use crate::common::error::{StuntingError, StuntingResult};
use crate::evaluation::domain::EvalReport;

use super::classifier::ClassifierParams;
use super::pipeline::TrainedPipeline;
use super::split::Split;

/// Bumped whenever the serialized artefact layout changes.
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

/// Parameters of one training invocation.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TrainParams {
    pub kernel: Kernel,
    pub regularization: f64,
    pub seed: u64,
    pub test_size: f64,
}

impl TrainParams {
    pub fn classifier(&self) -> ClassifierParams {
        ClassifierParams {
            kernel: self.kernel,
            regularization: self.regularization,
        }
    }
}

impl Default for TrainParams {
    fn default() -> Self {
        TrainParams::from(&TrainerConfig::default())
    }
}

impl From<&TrainerConfig> for TrainParams {
    fn from(cfg: &TrainerConfig) -> Self {
        Self {
            kernel: cfg.kernel,
            regularization: cfg.regularization,
            seed: cfg.seed,
            test_size: cfg.test_size,
        }
    }
}

/// Fitted pipeline together with its holdout evaluation.
#[derive(Clone, Debug)]
pub struct TrainOutcome {
    pub pipeline: TrainedPipeline,
    pub evaluation: EvalReport,
    pub split: Split,
}

impl TrainOutcome {
    pub fn accuracy(&self) -> f64 {
        self.evaluation.accuracy
    }
}

/// The serialized unit written to the model store.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub format_version: u32,
    pub run_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub data_count: usize,
    pub accuracy: f64,
    pub pipeline: TrainedPipeline,
}

impl ModelArtifact {
    pub fn new(
        run_id: Uuid,
        created_at: DateTime<Utc>,
        data_count: usize,
        accuracy: f64,
        pipeline: TrainedPipeline,
    ) -> Self {
        Self {
            format_version: ARTIFACT_FORMAT_VERSION,
            run_id,
            created_at,
            data_count,
            accuracy,
            pipeline,
        }
    }

    pub fn encode(&self) -> StuntingResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decode artefact bytes read from `path`.
    pub fn decode(bytes: &[u8], path: &Path) -> StuntingResult<Self> {
        let unavailable = |reason: String| StuntingError::ModelUnavailable {
            path: path.to_path_buf(),
            reason,
        };
        let artifact: ModelArtifact =
            serde_json::from_slice(bytes).map_err(|e| unavailable(format!("corrupt artefact: {e}")))?;
        if artifact.format_version != ARTIFACT_FORMAT_VERSION {
            return Err(unavailable(format!(
                "unsupported artefact format {} (expected {})",
                artifact.format_version, ARTIFACT_FORMAT_VERSION
            )));
        }
        Ok(artifact)
    }
}

/// Storage contract for the single current artefact.
///
/// There is no locking: concurrent writers race and the last one wins.
pub trait ModelStore {
    /// Where the artefact lives; recorded in the run record.
    fn location(&self) -> &Path;
    /// Replace the stored artefact with `bytes`.
    fn write(&self, bytes: &[u8]) -> StuntingResult<()>;
    fn read(&self) -> StuntingResult<ModelArtifact>;
}
