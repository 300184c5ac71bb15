//! Training orchestration: split, fit, evaluate, then track and persist.
//!
//! Ordering matters in [`run`]: everything that can fail on data or fit runs
//! before any side effect, and the model store write comes last so a failed
//! run leaves the previous artefact in place.

use std::time::Instant;

use chrono::{DateTime, Utc};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::common::config::TrainerConfig;
use crate::common::error::StuntingResult;
use crate::common::fingerprint::sha256_hex;
use crate::common::time;
use crate::data::domain::{Corpus, Features, Record};
use crate::data::service::{load_and_fuse, Fusion};
use crate::evaluation::service::evaluate;
use crate::tracking::domain::{ArtifactRef, ExperimentTracker, RunRecord, RunRecordBuilder};

use super::domain::{ModelArtifact, ModelStore, TrainOutcome, TrainParams};
use super::pipeline::TrainedPipeline;
use super::split::train_test_split;

/// Summary of a completed run.
#[derive(Clone, Debug)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub accuracy: f64,
    pub data_count: usize,
    pub new_rows: usize,
    /// Set when the operational log was present but unusable.
    pub fusion_fallback: Option<String>,
    pub artifact: ArtifactRef,
}

/// Fit the pipeline on the training partition and score it on the holdout.
pub fn train(corpus: &Corpus, params: &TrainParams) -> StuntingResult<TrainOutcome> {
    let split = train_test_split(corpus.len(), params.test_size, params.seed)?;
    let rows = corpus.records();

    let train_rows: Vec<&Record> = split.train.iter().map(|&i| &rows[i]).collect();
    let pipeline = TrainedPipeline::fit(&train_rows, params.classifier())?;

    let holdout_features: Vec<Features> = split.holdout.iter().map(|&i| rows[i].features()).collect();
    let truth: Vec<String> = split
        .holdout
        .iter()
        .map(|&i| rows[i].status_label.clone())
        .collect();
    let predicted = pipeline.predict(&holdout_features);
    let evaluation = evaluate(&truth, &predicted);

    Ok(TrainOutcome {
        pipeline,
        evaluation,
        split,
    })
}

/// Run the whole retraining lifecycle described by `cfg`.
#[instrument(
    skip_all,
    fields(
        data = %cfg.data_path.display(),
        kernel = %cfg.kernel,
        c = cfg.regularization
    )
)]
pub fn run(
    cfg: &TrainerConfig,
    tracker: &dyn ExperimentTracker,
    store: &dyn ModelStore,
) -> StuntingResult<RunSummary> {
    cfg.validate()?;
    let started = Instant::now();
    let started_at = time::now();
    let run_id = Uuid::new_v4();

    let fusion = load_and_fuse(&cfg.data_path, cfg.log_path.as_deref())?;
    info!(
        historical_rows = fusion.historical_rows,
        new_rows = fusion.new_rows,
        data_count = fusion.data_count(),
        "training corpus ready"
    );

    let params = TrainParams::from(cfg);
    let outcome = train(&fusion.corpus, &params)?;
    info!(
        accuracy = outcome.accuracy(),
        holdout_rows = outcome.evaluation.holdout_rows,
        "training finished"
    );
    for line in outcome.evaluation.to_string().lines() {
        info!("{line}");
    }

    let accuracy = outcome.accuracy();
    let record_builder = run_record(run_id, cfg, &params, &fusion, &outcome, started_at);
    let artifact = ModelArtifact::new(
        run_id,
        started_at,
        fusion.data_count(),
        accuracy,
        outcome.pipeline,
    );
    let bytes = artifact.encode()?;
    let artifact_ref = ArtifactRef {
        path: store.location().to_path_buf(),
        sha256: sha256_hex(&bytes),
        bytes: bytes.len(),
    };

    let record = record_builder.finish(artifact_ref.clone(), time::now());
    tracker.log_run(&record, &bytes)?;
    store.write(&bytes)?;

    if let Some(reason) = &fusion.fallback {
        warn!(%reason, "run used historical data only");
    }
    info!(
        %run_id,
        accuracy,
        dur_ms = time::elapsed_ms(started) as u64,
        artifact = %artifact_ref.path.display(),
        "retraining run complete"
    );

    Ok(RunSummary {
        run_id,
        accuracy,
        data_count: fusion.data_count(),
        new_rows: fusion.new_rows,
        fusion_fallback: fusion.fallback,
        artifact: artifact_ref,
    })
}

fn run_record(
    run_id: Uuid,
    cfg: &TrainerConfig,
    params: &TrainParams,
    fusion: &Fusion,
    outcome: &TrainOutcome,
    started_at: DateTime<Utc>,
) -> RunRecordBuilder {
    let mut builder = RunRecord::builder(run_id, cfg.experiment.clone(), started_at)
        .param("kernel", params.kernel.as_str())
        .param("C", params.regularization)
        .param("data_count", fusion.data_count())
        .param("new_rows", fusion.new_rows)
        .param("seed", params.seed)
        .param("test_size", params.test_size)
        .param("corpus_sha256", fusion.corpus.fingerprint())
        .param("kernel_width", outcome.pipeline.classifier().kernel_width())
        .metric("accuracy", outcome.accuracy());

    for class in &outcome.evaluation.per_class {
        let key = class.label.to_lowercase().replace(' ', "_");
        builder = builder
            .metric(&format!("precision_{key}"), class.precision)
            .metric(&format!("recall_{key}"), class.recall)
            .metric(&format!("f1_{key}"), class.f1);
    }
    builder
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use tempfile::TempDir;

    use super::*;
    use crate::common::config::Kernel;
    use crate::common::error::{ErrorCode, StuntingError};
    use crate::tracking::domain::{InMemoryTracker, ParamValue};
    use crate::training::repo_fs::FsModelStore;

    const LABELS: [&str; 3] = ["Normal", "Pendek", "Sangat Pendek"];

    /// Height offset that makes each label separable at a given age.
    fn height_for(age: u32, label: &str, wiggle: f64) -> f64 {
        let base = 50.0 + age as f64 * 0.9;
        match label {
            "Normal" => base + 8.0 + wiggle,
            "Pendek" => base - 6.0 + wiggle,
            _ => base - 20.0 + wiggle,
        }
    }

    fn balanced(n: usize) -> Vec<Record> {
        (0..n)
            .map(|i| {
                let label = LABELS[i % 3];
                let age = (i as u32 * 7) % 60;
                let sex = if i % 2 == 0 { "Laki-laki" } else { "Perempuan" };
                let wiggle = ((i * 13) % 5) as f64 * 0.3;
                Record::new(age, sex, height_for(age, label, wiggle), label)
            })
            .collect()
    }

    fn write_historical(path: &Path, rows: &[Record]) {
        let mut body = String::from("Umur (bulan),Jenis Kelamin,Tinggi Badan (cm),Status Gizi\n");
        for r in rows {
            body.push_str(&format!(
                "{},{},{},{}\n",
                r.age_months, r.sex, r.height_cm, r.status_label
            ));
        }
        fs::write(path, body).unwrap();
    }

    fn config(dir: &TempDir) -> TrainerConfig {
        TrainerConfig {
            data_path: dir.path().join("data_balita.csv"),
            log_path: Some(dir.path().join("prediction_log.csv")),
            model_path: dir.path().join("models").join("model_stunting.json"),
            tracking_dir: dir.path().join("mlruns"),
            ..TrainerConfig::default()
        }
    }

    #[test]
    fn identical_input_gives_identical_split_and_accuracy() {
        let corpus = Corpus::new(balanced(60));
        let params = TrainParams::default();
        let a = train(&corpus, &params).unwrap();
        let b = train(&corpus, &params).unwrap();
        assert_eq!(a.split, b.split);
        assert_eq!(a.accuracy(), b.accuracy());
        assert_eq!(a.evaluation.holdout_rows, 12);
    }

    #[test]
    fn every_kernel_trains() {
        let corpus = Corpus::new(balanced(45));
        for kernel in [Kernel::Linear, Kernel::Rbf, Kernel::Poly] {
            let params = TrainParams {
                kernel,
                ..TrainParams::default()
            };
            let outcome = train(&corpus, &params).unwrap();
            assert!((0.0..=1.0).contains(&outcome.accuracy()));
        }
    }

    #[test]
    fn single_label_corpus_is_a_fit_error() {
        let rows: Vec<Record> = (0..20)
            .map(|i| Record::new(i, "Laki-laki", 60.0 + i as f64, "Normal"))
            .collect();
        let err = train(&Corpus::new(rows), &TrainParams::default()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::Fit);
    }

    #[test]
    fn run_tracks_then_persists() {
        let dir = TempDir::new().unwrap();
        let cfg = config(&dir);
        write_historical(&cfg.data_path, &balanced(60));

        let tracker = InMemoryTracker::new();
        let store = FsModelStore::new(&cfg.model_path);
        let summary = run(&cfg, &tracker, &store).unwrap();

        assert_eq!(summary.data_count, 60);
        assert_eq!(summary.new_rows, 0);
        assert_eq!(summary.fusion_fallback, None);

        let runs = tracker.runs();
        assert_eq!(runs.len(), 1);
        let record = &runs[0];
        assert_eq!(record.param("kernel"), Some(&ParamValue::from("rbf")));
        assert_eq!(record.param("C"), Some(&ParamValue::Float(1.0)));
        assert_eq!(record.param("data_count"), Some(&ParamValue::Int(60)));
        let Some(ParamValue::Float(width)) = record.param("kernel_width") else {
            panic!("kernel_width not recorded");
        };
        assert!(*width > 0.0);
        assert_eq!(record.metric("accuracy"), Some(summary.accuracy));
        assert_eq!(
            record.artifact().sha256,
            sha256_hex(&fs::read(&cfg.model_path).unwrap())
        );

        let artifact = store.read().unwrap();
        assert_eq!(artifact.run_id, summary.run_id);
        assert_eq!(artifact.data_count, 60);
    }

    #[test]
    fn missing_height_column_halts_before_any_side_effect() {
        let dir = TempDir::new().unwrap();
        let cfg = config(&dir);
        fs::write(
            &cfg.data_path,
            "Umur (bulan),Jenis Kelamin,Status Gizi\n0,Laki-laki,Normal\n1,Perempuan,Pendek\n",
        )
        .unwrap();

        let tracker = InMemoryTracker::new();
        let store = FsModelStore::new(&cfg.model_path);
        let err = run(&cfg, &tracker, &store).unwrap_err();

        assert!(matches!(&err, StuntingError::MissingColumn { column, .. } if column == "Tinggi Badan (cm)"));
        assert!(!cfg.model_path.exists());
        assert!(tracker.runs().is_empty());
    }

    #[test]
    fn failed_fit_keeps_previous_artefact() {
        let dir = TempDir::new().unwrap();
        let cfg = config(&dir);
        let store = FsModelStore::new(&cfg.model_path);
        store.write(b"previous").unwrap();

        let rows: Vec<Record> = (0..20)
            .map(|i| Record::new(i, "Perempuan", 60.0 + i as f64, "Pendek"))
            .collect();
        write_historical(&cfg.data_path, &rows);

        let tracker = InMemoryTracker::new();
        let err = run(&cfg, &tracker, &store).unwrap_err();
        assert_eq!(err.code(), ErrorCode::Fit);
        assert_eq!(fs::read(&cfg.model_path).unwrap(), b"previous");
        assert!(tracker.runs().is_empty());
    }

    #[test]
    fn invalid_regularization_is_rejected_up_front() {
        let dir = TempDir::new().unwrap();
        let cfg = TrainerConfig {
            regularization: -1.0,
            ..config(&dir)
        };
        let err = run(&cfg, &InMemoryTracker::new(), &FsModelStore::new(&cfg.model_path)).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidInput);
    }
}
