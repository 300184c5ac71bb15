//! Serving-side request and outcome types.

use serde::{Deserialize, Serialize};

use crate::data::domain::Features;

/// Prediction request as posted by the serving layer. Accepts both the
/// serving field names and the canonical column names.
pub type PredictRequest = Features;

/// Result of a prediction request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PredictionOutcome {
    Predicted { label: String },
    /// No artefact is loaded; the request was not evaluated.
    ModelUnavailable,
}

impl PredictionOutcome {
    pub fn label(&self) -> Option<&str> {
        match self {
            PredictionOutcome::Predicted { label } => Some(label),
            PredictionOutcome::ModelUnavailable => None,
        }
    }
}
