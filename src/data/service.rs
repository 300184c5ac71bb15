//! Data fusion: the canonical historical corpus followed by newly logged
//! observations.
//!
//! The historical corpus is mandatory; the log is optional and can never
//! abort a run. Failures reading the log are contained here and downgraded to
//! a historical-only corpus.

use std::fs;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::common::error::StuntingResult;

use super::domain::Corpus;
use super::repo_fs;

/// Result of one fusion pass.
#[derive(Clone, Debug, PartialEq)]
pub struct Fusion {
    pub corpus: Corpus,
    pub historical_rows: usize,
    pub new_rows: usize,
    /// Why the log was present but not used, if that happened.
    pub fallback: Option<String>,
}

impl Fusion {
    /// Fused row count, recorded for tracking.
    pub fn data_count(&self) -> usize {
        self.corpus.len()
    }

    fn historical_only(corpus: Corpus, fallback: Option<String>) -> Self {
        Self {
            historical_rows: corpus.len(),
            new_rows: 0,
            corpus,
            fallback,
        }
    }
}

/// Fuse `historical` with the operational log at `new_path`.
///
/// A missing or empty file (or no path) returns the historical corpus unchanged. A log
/// that exists but cannot be loaded or reconciled is reported and skipped.
pub fn fuse(historical: Corpus, new_path: Option<&Path>) -> Fusion {
    let Some(path) = new_path else {
        debug!("no operational log configured, using historical data only");
        return Fusion::historical_only(historical, None);
    };

    match fs::metadata(path) {
        Ok(meta) if meta.is_file() && meta.len() > 0 => {}
        Ok(_) => {
            debug!(path = %path.display(), "operational log is empty, using historical data only");
            return Fusion::historical_only(historical, None);
        }
        Err(_) => {
            debug!(path = %path.display(), "operational log not found, using historical data only");
            return Fusion::historical_only(historical, None);
        }
    }

    match repo_fs::read_observations(path) {
        Ok(new) => {
            let historical_rows = historical.len();
            let new_rows = new.len();
            let mut corpus = historical;
            corpus.extend(new);
            info!(
                path = %path.display(),
                historical_rows,
                new_rows,
                total = corpus.len(),
                "fused operational log into training corpus"
            );
            Fusion {
                corpus,
                historical_rows,
                new_rows,
                fallback: None,
            }
        }
        Err(err) => {
            warn!(
                path = %path.display(),
                error = %err,
                "operational log unusable, falling back to historical data"
            );
            Fusion::historical_only(historical, Some(err.to_string()))
        }
    }
}

/// Load the historical dataset (fatal on failure) and fuse the optional log.
pub fn load_and_fuse(data_path: &Path, log_path: Option<&Path>) -> StuntingResult<Fusion> {
    let historical = repo_fs::read_historical(data_path)?;
    Ok(fuse(historical, log_path))
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use proptest::prelude::*;
    use tempfile::TempDir;

    use super::*;
    use crate::common::error::ErrorCode;
    use crate::data::domain::Record;

    fn historical() -> Corpus {
        Corpus::new(vec![
            Record::new(0, "Laki-laki", 44.6, "Sangat Pendek"),
            Record::new(12, "Perempuan", 74.0, "Normal"),
            Record::new(24, "Laki-laki", 80.2, "Pendek"),
        ])
    }

    fn write_log(dir: &TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("prediction_log.csv");
        fs::write(&path, body).unwrap();
        path
    }

    fn log_body(rows: &[Record]) -> String {
        let mut body = String::from("umur_bulan,jenis_kelamin,tinggi_badan,prediksi,timestamp\n");
        for r in rows {
            body.push_str(&format!(
                "{},{},{},{},2025-06-01T08:00:00Z\n",
                r.age_months, r.sex, r.height_cm, r.status_label
            ));
        }
        body
    }

    #[test]
    fn missing_log_returns_historical_unchanged() {
        let dir = TempDir::new().unwrap();
        let h = historical();
        let fused = fuse(h.clone(), Some(&dir.path().join("absent.csv")));
        assert_eq!(fused.corpus, h);
        assert_eq!(fused.new_rows, 0);
        assert_eq!(fused.fallback, None);

        let fused = fuse(h.clone(), None);
        assert_eq!(fused.corpus, h);
    }

    #[test]
    fn new_rows_are_appended_after_historical() {
        let dir = TempDir::new().unwrap();
        let new = vec![
            Record::new(14, "Laki-laki", 78.5, "Normal"),
            Record::new(30, "Perempuan", 82.0, "Pendek"),
        ];
        let path = write_log(&dir, &log_body(&new));

        let fused = fuse(historical(), Some(&path));
        assert_eq!(fused.data_count(), 5);
        assert_eq!(fused.historical_rows, 3);
        assert_eq!(fused.new_rows, 2);
        assert_eq!(&fused.corpus.records()[..3], historical().records());
        assert_eq!(&fused.corpus.records()[3..], new.as_slice());
    }

    #[test]
    fn empty_log_file_is_treated_as_absent() {
        let dir = TempDir::new().unwrap();
        let path = write_log(&dir, "");
        let fused = fuse(historical(), Some(&path));
        assert_eq!(fused.corpus, historical());
        assert_eq!(fused.new_rows, 0);
        assert_eq!(fused.fallback, None);
    }

    #[test]
    fn subject_vocabulary_log_is_fused() {
        let dir = TempDir::new().unwrap();
        let path = write_log(
            &dir,
            "subject_age,subject_sex,subject_height,predicted_label,observed_at\n\
             14,male,78.5,Normal,2025-06-01T08:00:00Z\n",
        );
        let fused = fuse(historical(), Some(&path));
        assert_eq!(fused.fallback, None);
        assert_eq!(fused.new_rows, 1);
        assert_eq!(fused.corpus.records()[3], Record::new(14, "male", 78.5, "Normal"));
    }

    #[test]
    fn malformed_log_falls_back_with_reason() {
        let dir = TempDir::new().unwrap();
        let path = write_log(
            &dir,
            "umur_bulan,jenis_kelamin,tinggi_badan,prediksi\n14,Laki-laki,tall,Normal\n",
        );
        let fused = fuse(historical(), Some(&path));
        assert_eq!(fused.corpus, historical());
        assert!(fused.fallback.unwrap().contains("tall"));
    }

    #[test]
    fn log_without_mapped_column_falls_back() {
        let dir = TempDir::new().unwrap();
        let path = write_log(&dir, "umur_bulan,jenis_kelamin,tinggi_badan\n14,Laki-laki,78.5\n");
        let fused = fuse(historical(), Some(&path));
        assert_eq!(fused.corpus, historical());
        assert!(fused.fallback.unwrap().contains("prediksi"));
    }

    #[test]
    fn ragged_log_falls_back() {
        let dir = TempDir::new().unwrap();
        let path = write_log(
            &dir,
            "umur_bulan,jenis_kelamin,tinggi_badan,prediksi\n14,Laki-laki\n",
        );
        let fused = fuse(historical(), Some(&path));
        assert_eq!(fused.corpus, historical());
        assert!(fused.fallback.is_some());
    }

    #[test]
    fn missing_historical_is_fatal_even_with_a_good_log() {
        let dir = TempDir::new().unwrap();
        let log = write_log(&dir, &log_body(&historical().records()[..1]));
        let err = load_and_fuse(&dir.path().join("data_balita.csv"), Some(&log)).unwrap_err();
        assert_eq!(err.code(), ErrorCode::FatalData);
    }

    fn arb_record() -> impl Strategy<Value = Record> {
        (
            0u32..60,
            prop_oneof![Just("Laki-laki"), Just("Perempuan")],
            40u32..1200,
            prop_oneof![Just("Normal"), Just("Pendek"), Just("Sangat Pendek"), Just("Tinggi")],
        )
            .prop_map(|(age, sex, tenth_cm, label)| {
                Record::new(age, sex, tenth_cm as f64 / 10.0, label)
            })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn fusion_preserves_order_and_counts(
            h in prop::collection::vec(arb_record(), 1..20),
            m in prop::collection::vec(arb_record(), 0..20),
        ) {
            let dir = TempDir::new().unwrap();
            let path = write_log(&dir, &log_body(&m));
            let fused = fuse(Corpus::new(h.clone()), Some(&path));

            prop_assert_eq!(fused.data_count(), h.len() + m.len());
            prop_assert_eq!(&fused.corpus.records()[..h.len()], h.as_slice());
            prop_assert_eq!(&fused.corpus.records()[h.len()..], m.as_slice());
        }

        #[test]
        fn fusion_with_missing_log_is_identity(h in prop::collection::vec(arb_record(), 0..20)) {
            let dir = TempDir::new().unwrap();
            let fused = fuse(Corpus::new(h.clone()), Some(&dir.path().join("none.csv")));
            prop_assert_eq!(fused.corpus.records(), h.as_slice());
        }
    }
}
