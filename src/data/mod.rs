//! Data domain: canonical records, log reconciliation, CSV sources and fusion.

pub mod domain;
pub mod reconcile;
pub mod repo_fs;
pub mod service;

pub use domain::{CanonicalField, Corpus, Features, Record};
pub use repo_fs::ObservationLog;
pub use service::{fuse, load_and_fuse, Fusion};
