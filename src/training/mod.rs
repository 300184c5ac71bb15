//! Training domain: seeded split, jointly fitted feature pipeline and
//! classifier, orchestration and the model store.

pub mod classifier;
pub mod domain;
pub mod pipeline;
pub mod repo_fs;
pub mod service;
pub mod split;

pub use domain::{ModelArtifact, ModelStore, TrainOutcome, TrainParams};
pub use pipeline::TrainedPipeline;
pub use repo_fs::FsModelStore;
pub use service::{run, train, RunSummary};
