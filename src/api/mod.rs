//! Command-line entry points for the retraining job and ad-hoc predictions.

pub mod cli;
