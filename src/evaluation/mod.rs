//! Holdout evaluation: accuracy and the per-class classification report.

pub mod domain;
pub mod service;

pub use domain::{ClassMetrics, EvalReport};
