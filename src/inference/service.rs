//! Artefact handle and predictor for the serving layer.
//!
//! The handle owns an optional, immutable artefact. Reloading swaps the
//! `Arc`; requests already holding the previous artefact finish with it.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::common::error::StuntingResult;
use crate::common::time;
use crate::data::repo_fs::ObservationLog;
use crate::training::domain::{ModelArtifact, ModelStore};

use super::domain::{PredictRequest, PredictionOutcome};

/// Shared slot holding the artefact currently served, if any.
#[derive(Debug, Default)]
pub struct ModelHandle {
    current: RwLock<Option<Arc<ModelArtifact>>>,
}

impl ModelHandle {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_artifact(artifact: ModelArtifact) -> Self {
        Self {
            current: RwLock::new(Some(Arc::new(artifact))),
        }
    }

    /// Load from `store`; a failed load yields an empty handle, not an error.
    pub fn load(store: &dyn ModelStore) -> Self {
        let handle = Self::empty();
        if let Err(err) = handle.reload(store) {
            warn!(error = %err, "no model loaded; predictions will report the model as unavailable");
        }
        handle
    }

    /// Read the store and swap the new artefact in. On error the current
    /// artefact stays in place.
    pub fn reload(&self, store: &dyn ModelStore) -> StuntingResult<()> {
        let artifact = store.read()?;
        info!(
            path = %store.location().display(),
            run_id = %artifact.run_id,
            accuracy = artifact.accuracy,
            "model loaded"
        );
        self.swap(artifact);
        Ok(())
    }

    /// Replace the served artefact, returning the previous one.
    pub fn swap(&self, artifact: ModelArtifact) -> Option<Arc<ModelArtifact>> {
        self.current.write().replace(Arc::new(artifact))
    }

    pub fn current(&self) -> Option<Arc<ModelArtifact>> {
        self.current.read().clone()
    }

    pub fn is_loaded(&self) -> bool {
        self.current.read().is_some()
    }
}

/// Answers prediction requests and records them for the next retraining.
#[derive(Debug, Clone)]
pub struct Predictor {
    handle: Arc<ModelHandle>,
    log: Option<ObservationLog>,
}

impl Predictor {
    pub fn new(handle: Arc<ModelHandle>) -> Self {
        Self { handle, log: None }
    }

    /// Append every successful prediction to `log`.
    pub fn with_log(mut self, log: ObservationLog) -> Self {
        self.log = Some(log);
        self
    }

    pub fn handle(&self) -> &Arc<ModelHandle> {
        &self.handle
    }

    pub fn predict(&self, request: &PredictRequest) -> PredictionOutcome {
        let Some(artifact) = self.handle.current() else {
            return PredictionOutcome::ModelUnavailable;
        };

        let label = artifact.pipeline.predict_one(request);
        debug!(
            age_months = request.age_months,
            sex = %request.sex,
            height_cm = request.height_cm,
            %label,
            "prediction served"
        );

        if let Some(log) = &self.log {
            // A full disk must not turn into a failed prediction.
            if let Err(err) = log.append(request, &label, time::now()) {
                warn!(path = %log.path().display(), error = %err, "failed to log prediction");
            }
        }
        PredictionOutcome::Predicted { label }
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;
    use uuid::Uuid;

    use super::*;
    use crate::data::domain::{Features, Record};
    use crate::data::repo_fs::read_observations;
    use crate::training::classifier::ClassifierParams;
    use crate::training::pipeline::TrainedPipeline;
    use crate::training::repo_fs::FsModelStore;

    fn artifact(labels: [&str; 2]) -> ModelArtifact {
        let rows: Vec<Record> = (0..12u32)
            .flat_map(|i| {
                [
                    Record::new(i * 4, "Laki-laki", 80.0 + i as f64, labels[0]),
                    Record::new(i * 4, "Perempuan", 50.0 + i as f64, labels[1]),
                ]
            })
            .collect();
        let refs: Vec<&Record> = rows.iter().collect();
        let pipeline = TrainedPipeline::fit(&refs, ClassifierParams::default()).unwrap();
        ModelArtifact::new(Uuid::new_v4(), time::now(), rows.len(), 1.0, pipeline)
    }

    #[test]
    fn empty_handle_reports_model_unavailable() {
        let predictor = Predictor::new(Arc::new(ModelHandle::empty()));
        let outcome = predictor.predict(&Features::new(12, "Laki-laki", 70.0));
        assert_eq!(outcome, PredictionOutcome::ModelUnavailable);
        assert_eq!(outcome.label(), None);
    }

    #[test]
    fn load_from_missing_store_is_not_fatal() {
        let dir = TempDir::new().unwrap();
        let handle = ModelHandle::load(&FsModelStore::new(dir.path().join("absent.json")));
        assert!(!handle.is_loaded());
    }

    #[test]
    fn swap_replaces_without_touching_held_artefact() {
        let handle = Arc::new(ModelHandle::with_artifact(artifact(["Normal", "Pendek"])));
        let held = handle.current().unwrap();

        let previous = handle.swap(artifact(["Tinggi", "Sangat Pendek"])).unwrap();
        assert!(Arc::ptr_eq(&held, &previous));
        assert_eq!(held.pipeline.classes(), &["Normal", "Pendek"]);
        assert_eq!(
            handle.current().unwrap().pipeline.classes(),
            &["Sangat Pendek", "Tinggi"]
        );
    }

    #[test]
    fn predictions_are_logged_for_fusion() {
        let dir = TempDir::new().unwrap();
        let log = ObservationLog::new(dir.path().join("prediction_log.csv"));
        let predictor =
            Predictor::new(Arc::new(ModelHandle::with_artifact(artifact(["Normal", "Pendek"]))))
                .with_log(log.clone());

        let request = Features::new(20, "Laki-laki", 85.0);
        let label = predictor.predict(&request).label().unwrap().to_string();
        assert!(label == "Normal" || label == "Pendek");

        let logged = read_observations(log.path()).unwrap();
        assert_eq!(logged.records(), &[Record::new(20, "Laki-laki", 85.0, label)]);
    }

    #[test]
    fn reload_picks_up_a_new_artefact() {
        let dir = TempDir::new().unwrap();
        let store = FsModelStore::new(dir.path().join("model.json"));
        let handle = ModelHandle::empty();
        assert!(handle.reload(&store).is_err());
        assert!(!handle.is_loaded());

        let bytes = artifact(["Normal", "Pendek"]).encode().unwrap();
        store.write(&bytes).unwrap();
        handle.reload(&store).unwrap();
        assert!(handle.is_loaded());
    }
}
