//! Filesystem model store: one artefact at a fixed path.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::info;

use crate::common::error::{StuntingError, StuntingResult};

use super::domain::{ModelArtifact, ModelStore};

/// Persist the artefact on the local filesystem.
#[derive(Clone, Debug)]
pub struct FsModelStore {
    path: PathBuf,
}

impl FsModelStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn ensure_dirs(&self) -> io::Result<()> {
        match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => fs::create_dir_all(dir),
            _ => Ok(()),
        }
    }
}

impl ModelStore for FsModelStore {
    fn location(&self) -> &Path {
        &self.path
    }

    fn write(&self, bytes: &[u8]) -> StuntingResult<()> {
        self.ensure_dirs()?;
        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        // Each writer stages in its own file; the rename makes the swap atomic.
        let mut staging = NamedTempFile::new_in(dir)?;
        staging.write_all(bytes)?;
        staging.as_file().sync_all()?;
        staging.persist(&self.path).map_err(|e| e.error)?;
        info!(path = %self.path.display(), bytes = bytes.len(), "model artefact written");
        Ok(())
    }

    fn read(&self) -> StuntingResult<ModelArtifact> {
        let bytes = fs::read(&self.path).map_err(|e| StuntingError::ModelUnavailable {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;
        ModelArtifact::decode(&bytes, &self.path)
    }
}
