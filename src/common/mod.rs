//! Shared utilities that glue the different domains together.
pub mod config;
pub mod error;
pub mod fingerprint;
pub mod log;
pub mod time;

pub use config::{Kernel, LogFormat, TrainerConfig};
pub use error::{ErrorCode, StuntingError, StuntingResult};
