//! Retraining pipeline for the stunting classifier: schema reconciliation,
//! data fusion, feature pipeline, training, experiment tracking and model
//! persistence, plus the serving-side model handle.

pub mod api;
pub mod common;
pub mod data;
pub mod evaluation;
pub mod inference;
pub mod tracking;
pub mod training;

pub use common::{ErrorCode, Kernel, StuntingError, StuntingResult, TrainerConfig};
pub use data::{load_and_fuse, Corpus, Features, Record};
pub use inference::{ModelHandle, PredictionOutcome, Predictor};
pub use tracking::{ExperimentTracker, FsTracker, RunRecord};
pub use training::{run, FsModelStore, ModelArtifact, ModelStore, RunSummary};
