//! Inference support for the serving layer: an explicitly owned artefact
//! handle and a predictor that feeds the operational log.

pub mod domain;
pub mod service;

pub use domain::{PredictRequest, PredictionOutcome};
pub use service::{ModelHandle, Predictor};
