//! Experiment tracking: immutable run records with params, metrics and
//! artefact lineage.

pub mod domain;
pub mod repo_fs;

pub use domain::{ArtifactRef, ExperimentTracker, InMemoryTracker, ParamValue, RunRecord};
pub use repo_fs::FsTracker;
