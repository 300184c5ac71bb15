//! Runtime configuration loaded from the environment, overridden by CLI flags.
//!
//! Every recognised option is an explicit field; there is no string-keyed
//! parameter bag.

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::common::error::{StuntingError, StuntingResult};

pub const DEFAULT_DATA_PATH: &str = "data/data_balita.csv";
pub const DEFAULT_LOG_PATH: &str = "data/prediction_log.csv";
pub const DEFAULT_MODEL_PATH: &str = "models/model_stunting.json";
pub const DEFAULT_TRACKING_DIR: &str = "mlruns";
pub const DEFAULT_EXPERIMENT: &str = "Eksperimen Stunting";
pub const DEFAULT_SEED: u64 = 42;
pub const DEFAULT_TEST_SIZE: f64 = 0.2;

/// Kernel family of the support vector classifier.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kernel {
    Linear,
    #[default]
    Rbf,
    Poly,
}

impl Kernel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Kernel::Linear => "linear",
            Kernel::Rbf => "rbf",
            Kernel::Poly => "poly",
        }
    }
}

impl fmt::Display for Kernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Kernel {
    type Err = StuntingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "linear" => Ok(Kernel::Linear),
            "rbf" | "gaussian" => Ok(Kernel::Rbf),
            "poly" | "polynomial" => Ok(Kernel::Poly),
            // TODO: Add "sigmoid" once linfa-kernel exposes a sigmoid kernel.
            other => Err(StuntingError::invalid_config(format!(
                "unsupported kernel '{other}' (expected linear, rbf or poly)"
            ))),
        }
    }
}

/// Output format of the log subscriber.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = StuntingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(StuntingError::invalid_config(format!(
                "unsupported log format '{other}'"
            ))),
        }
    }
}

/// Snapshot of configuration values consumed by the trainer.
#[derive(Clone, Debug)]
pub struct TrainerConfig {
    pub data_path: PathBuf,
    /// Operational log to fuse; `None` trains on historical data only.
    pub log_path: Option<PathBuf>,
    pub model_path: PathBuf,
    pub kernel: Kernel,
    /// Regularization strength `C`, strictly positive.
    pub regularization: f64,
    pub seed: u64,
    pub test_size: f64,
    pub tracking_dir: PathBuf,
    pub experiment: String,
    pub log_level: String,
    pub log_format: LogFormat,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from(DEFAULT_DATA_PATH),
            log_path: Some(PathBuf::from(DEFAULT_LOG_PATH)),
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            kernel: Kernel::Rbf,
            regularization: 1.0,
            seed: DEFAULT_SEED,
            test_size: DEFAULT_TEST_SIZE,
            tracking_dir: PathBuf::from(DEFAULT_TRACKING_DIR),
            experiment: DEFAULT_EXPERIMENT.to_string(),
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
        }
    }
}

impl TrainerConfig {
    /// Create a configuration snapshot from the process environment.
    pub fn from_env() -> StuntingResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup, falling back to defaults.
    pub fn from_lookup<F>(lookup: F) -> StuntingResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(v) = lookup("STUNTING_DATA_PATH") {
            cfg.data_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("STUNTING_LOG_PATH") {
            // An empty value disables fusion.
            cfg.log_path = (!v.trim().is_empty()).then(|| PathBuf::from(v));
        }
        if let Some(v) = lookup("STUNTING_MODEL_PATH") {
            cfg.model_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("STUNTING_KERNEL") {
            cfg.kernel = v.parse()?;
        }
        if let Some(v) = lookup("STUNTING_C") {
            cfg.regularization = parse_number("STUNTING_C", &v)?;
        }
        if let Some(v) = lookup("STUNTING_SEED") {
            cfg.seed = v.trim().parse().map_err(|_| {
                StuntingError::invalid_config(format!("STUNTING_SEED is not an integer: '{v}'"))
            })?;
        }
        if let Some(v) = lookup("STUNTING_TEST_SIZE") {
            cfg.test_size = parse_number("STUNTING_TEST_SIZE", &v)?;
        }
        if let Some(v) = lookup("STUNTING_TRACKING_DIR") {
            cfg.tracking_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("STUNTING_EXPERIMENT") {
            cfg.experiment = v;
        }
        if let Some(v) = lookup("STUNTING_LOG_LEVEL") {
            cfg.log_level = v;
        }
        if let Some(v) = lookup("STUNTING_LOG_FORMAT") {
            cfg.log_format = v.parse()?;
        }

        Ok(cfg)
    }

    /// Reject values the trainer cannot work with.
    pub fn validate(&self) -> StuntingResult<()> {
        if !self.regularization.is_finite() || self.regularization <= 0.0 {
            return Err(StuntingError::invalid_config(format!(
                "regularization must be a positive number, got {}",
                self.regularization
            )));
        }
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(StuntingError::invalid_config(format!(
                "test size must be within (0, 1), got {}",
                self.test_size
            )));
        }
        if self.experiment.trim().is_empty() {
            return Err(StuntingError::invalid_config("experiment name is empty"));
        }
        Ok(())
    }
}

fn parse_number(key: &str, raw: &str) -> StuntingResult<f64> {
    raw.trim()
        .parse()
        .map_err(|_| StuntingError::invalid_config(format!("{key} is not a number: '{raw}'")))
}
