//! Error handling primitives shared across the core.
//!
//! Every error maps onto a stable [`ErrorCode`]; the CLI uses the code as its
//! process exit status so batch schedulers can tell data problems from fit
//! problems without parsing messages.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Stable error classes. Values are part of the CLI contract.
#[repr(u8)]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ErrorCode {
    /// Success code used as a sentinel.
    Ok = 0,
    /// Historical data missing, unreadable, empty or lacking a required column.
    FatalData = 1,
    /// Classifier fitting failed (degenerate classes, corpus too small, solver error).
    Fit = 2,
    /// No model artefact available to serve predictions.
    ModelUnavailable = 3,
    /// Configuration or request input failed validation.
    InvalidInput = 4,
    /// Catch-all for IO, serialization and tracker failures.
    Internal = 5,
}

impl ErrorCode {
    /// Exit status for the CLI.
    pub fn exit_status(self) -> i32 {
        self as u8 as i32
    }
}

/// Canonical error type for the core.
#[derive(Debug, Error)]
pub enum StuntingError {
    #[error("dataset {path} is unavailable: {source}")]
    DatasetUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("dataset {path} contains no usable rows")]
    EmptyDataset { path: PathBuf },

    #[error("required column '{column}' is missing from {path}")]
    MissingColumn { column: String, path: PathBuf },

    #[error("{path}: row {row} has invalid value '{value}' for column '{column}'")]
    InvalidValue {
        path: PathBuf,
        row: usize,
        column: String,
        value: String,
    },

    #[error("failed to parse {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("model fitting failed: {0}")]
    Fit(String),

    #[error("model artefact {path} is unavailable: {reason}")]
    ModelUnavailable { path: PathBuf, reason: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("experiment tracker error: {0}")]
    Tracker(String),

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result alias used throughout the crate.
pub type StuntingResult<T> = Result<T, StuntingError>;

impl StuntingError {
    /// Classify the error into its stable code.
    pub fn code(&self) -> ErrorCode {
        match self {
            StuntingError::DatasetUnavailable { .. }
            | StuntingError::EmptyDataset { .. }
            | StuntingError::MissingColumn { .. }
            | StuntingError::InvalidValue { .. }
            | StuntingError::Csv { .. } => ErrorCode::FatalData,
            StuntingError::Fit(_) => ErrorCode::Fit,
            StuntingError::ModelUnavailable { .. } => ErrorCode::ModelUnavailable,
            StuntingError::InvalidConfig(_) => ErrorCode::InvalidInput,
            StuntingError::Tracker(_)
            | StuntingError::Io(_)
            | StuntingError::Serialization(_) => ErrorCode::Internal,
        }
    }

    /// Fit helper.
    pub fn fit(msg: impl Into<String>) -> Self {
        StuntingError::Fit(msg.into())
    }

    /// Configuration helper.
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        StuntingError::InvalidConfig(msg.into())
    }

    /// Missing column helper.
    pub fn missing_column(column: &str, path: impl Into<PathBuf>) -> Self {
        StuntingError::MissingColumn {
            column: column.to_string(),
            path: path.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(ErrorCode::Ok as u8, 0);
        assert_eq!(ErrorCode::FatalData as u8, 1);
        assert_eq!(ErrorCode::Fit as u8, 2);
        assert_eq!(ErrorCode::ModelUnavailable as u8, 3);
        assert_eq!(ErrorCode::InvalidInput as u8, 4);
        assert_eq!(ErrorCode::Internal as u8, 5);
    }

    #[test]
    fn missing_column_names_the_column() {
        let err = StuntingError::missing_column("Tinggi Badan (cm)", "data/data_balita.csv");
        assert_eq!(err.code(), ErrorCode::FatalData);
        let msg = err.to_string();
        assert!(msg.contains("Tinggi Badan (cm)"));
        assert!(msg.contains("data/data_balita.csv"));
    }

    #[test]
    fn fit_errors_are_not_data_errors() {
        assert_eq!(StuntingError::fit("one class").code(), ErrorCode::Fit);
        assert_eq!(ErrorCode::Fit.exit_status(), 2);
    }
}
