//! Filesystem-backed CSV sources: the historical dataset, the operational
//! prediction log, and the appender that grows that log.

use std::fs::{self, File, OpenOptions};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use csv::{ReaderBuilder, StringRecord, Trim, WriterBuilder};
use tracing::{debug, warn};

use crate::common::error::{StuntingError, StuntingResult};

use super::domain::{CanonicalField, Corpus, Features};
use super::reconcile::{
    self, log_name_for, reconcile_fields, record_from_fields, CanonicalFields, LOG_TIMESTAMPS,
};

fn open_reader(path: &Path) -> StuntingResult<(csv::Reader<BufReader<File>>, StringRecord)> {
    let file = File::open(path).map_err(|source| StuntingError::DatasetUnavailable {
        path: path.to_path_buf(),
        source,
    })?;
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_reader(BufReader::new(file));
    let headers = reader
        .headers()
        .map_err(|source| csv_error(path, source))?
        .clone();
    Ok((reader, headers))
}

fn csv_error(path: &Path, source: csv::Error) -> StuntingError {
    StuntingError::Csv {
        path: path.to_path_buf(),
        source,
    }
}

/// Load the canonical historical dataset.
///
/// Missing file, missing canonical column, malformed value and an empty
/// result are all errors: the historical corpus is mandatory.
pub fn read_historical(path: &Path) -> StuntingResult<Corpus> {
    let (mut reader, headers) = open_reader(path)?;

    let mut columns = Vec::with_capacity(CanonicalField::ALL.len());
    for field in CanonicalField::ALL {
        let idx = headers
            .iter()
            .position(|h| h == field.column())
            .ok_or_else(|| StuntingError::missing_column(field.column(), path))?;
        columns.push((field, idx));
    }

    let mut records = Vec::new();
    let mut dropped = 0usize;
    for (i, row) in reader.records().enumerate() {
        let row = row.map_err(|source| csv_error(path, source))?;
        let fields: CanonicalFields = columns
            .iter()
            .map(|(field, idx)| (*field, row.get(*idx).unwrap_or_default().to_string()))
            .collect();
        match record_from_fields(&fields, path, i + 1)? {
            Some(record) => records.push(record),
            None => dropped += 1,
        }
    }

    if dropped > 0 {
        warn!(path = %path.display(), dropped, "historical rows with empty fields dropped");
    }
    if records.is_empty() {
        return Err(StuntingError::EmptyDataset {
            path: path.to_path_buf(),
        });
    }

    debug!(path = %path.display(), rows = records.len(), "historical dataset loaded");
    Ok(Corpus::new(records))
}

/// Load and reconcile the operational log.
///
/// Any error returned here is recoverable from the trainer's point of view;
/// the caller decides whether to fall back.
pub fn read_observations(path: &Path) -> StuntingResult<Corpus> {
    let (mut reader, headers) = open_reader(path)?;
    reconcile::check_log_header(headers.iter(), path)?;

    let mut records = Vec::new();
    let mut dropped = 0usize;
    for (i, row) in reader.records().enumerate() {
        let row = row.map_err(|source| csv_error(path, source))?;
        let fields = reconcile_fields(headers.iter().zip(row.iter()));
        match record_from_fields(&fields, path, i + 1)? {
            Some(record) => records.push(record),
            None => dropped += 1,
        }
    }

    if dropped > 0 {
        warn!(path = %path.display(), dropped, "log rows with empty fields dropped");
    }
    debug!(path = %path.display(), rows = records.len(), "operational log loaded");
    Ok(Corpus::new(records))
}

/// Append-only writer for the operational prediction log.
#[derive(Clone, Debug)]
pub struct ObservationLog {
    path: PathBuf,
}

impl ObservationLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one served prediction. The header is written when the file is new or empty.
    pub fn append(
        &self,
        features: &Features,
        predicted: &str,
        observed_at: DateTime<Utc>,
    ) -> StuntingResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let needs_header = file.metadata()?.len() == 0;

        let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);
        if needs_header {
            let header = [
                log_name_for(CanonicalField::AgeMonths),
                log_name_for(CanonicalField::Sex),
                log_name_for(CanonicalField::HeightCm),
                log_name_for(CanonicalField::StatusLabel),
                LOG_TIMESTAMPS[0],
            ];
            writer
                .write_record(header)
                .map_err(|source| csv_error(&self.path, source))?;
        }

        let age = features.age_months.to_string();
        let height = features.height_cm.to_string();
        let at = observed_at.to_rfc3339_opts(SecondsFormat::Secs, true);
        writer
            .write_record([age.as_str(), features.sex.as_str(), height.as_str(), predicted, at.as_str()])
            .map_err(|source| csv_error(&self.path, source))?;
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::TempDir;

    use super::*;
    use crate::common::error::ErrorCode;
    use crate::data::domain::Record;

    fn write_file(dir: &TempDir, name: &str, body: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut f = File::create(&path).unwrap();
        f.write_all(body.as_bytes()).unwrap();
        path
    }

    #[test]
    fn reads_historical_rows_in_order() {
        let dir = TempDir::new().unwrap();
        let path = write_file(
            &dir,
            "data_balita.csv",
            "Umur (bulan),Jenis Kelamin,Tinggi Badan (cm),Status Gizi\n\
             0,Laki-laki,44.59,Sangat Pendek\n\
             12,Perempuan,74.0,Normal\n",
        );
        let corpus = read_historical(&path).unwrap();
        assert_eq!(
            corpus.records(),
            &[
                Record::new(0, "Laki-laki", 44.59, "Sangat Pendek"),
                Record::new(12, "Perempuan", 74.0, "Normal"),
            ]
        );
    }

    #[test]
    fn historical_column_order_and_extra_columns_do_not_matter() {
        let dir = TempDir::new().unwrap();
        let path = write_file(
            &dir,
            "data_balita.csv",
            "Status Gizi,id,Tinggi Badan (cm),Jenis Kelamin,Umur (bulan)\n\
             Normal,7,74.0,Perempuan,12\n",
        );
        let corpus = read_historical(&path).unwrap();
        assert_eq!(corpus.records(), &[Record::new(12, "Perempuan", 74.0, "Normal")]);
    }

    #[test]
    fn historical_missing_column_is_named() {
        let dir = TempDir::new().unwrap();
        let path = write_file(
            &dir,
            "data_balita.csv",
            "Umur (bulan),Jenis Kelamin,Status Gizi\n0,Laki-laki,Normal\n",
        );
        let err = read_historical(&path).unwrap_err();
        assert_eq!(err.code(), ErrorCode::FatalData);
        assert!(err.to_string().contains("Tinggi Badan (cm)"));
    }

    #[test]
    fn historical_missing_or_empty_file_is_fatal() {
        let dir = TempDir::new().unwrap();
        let err = read_historical(&dir.path().join("absent.csv")).unwrap_err();
        assert!(matches!(err, StuntingError::DatasetUnavailable { .. }));

        let path = write_file(
            &dir,
            "empty.csv",
            "Umur (bulan),Jenis Kelamin,Tinggi Badan (cm),Status Gizi\n",
        );
        let err = read_historical(&path).unwrap_err();
        assert!(matches!(err, StuntingError::EmptyDataset { .. }));
    }

    #[test]
    fn observations_are_reconciled_and_blank_rows_dropped() {
        let dir = TempDir::new().unwrap();
        let path = write_file(
            &dir,
            "log.csv",
            "umur_bulan,jenis_kelamin,tinggi_badan,prediksi,timestamp\n\
             14,Laki-laki,78.5,Normal,2025-01-01T00:00:00Z\n\
             15,,80.0,Normal,2025-01-02T00:00:00Z\n",
        );
        let corpus = read_observations(&path).unwrap();
        assert_eq!(corpus.records(), &[Record::new(14, "Laki-laki", 78.5, "Normal")]);
    }

    #[test]
    fn observation_log_appends_with_single_header() {
        let dir = TempDir::new().unwrap();
        let log = ObservationLog::new(dir.path().join("logs").join("prediction_log.csv"));
        let at = Utc::now();
        log.append(&Features::new(14, "Laki-laki", 78.5), "Normal", at)
            .unwrap();
        log.append(&Features::new(20, "Perempuan", 70.1), "Pendek", at)
            .unwrap();

        let body = fs::read_to_string(log.path()).unwrap();
        assert_eq!(body.lines().count(), 3);
        assert!(body.starts_with("umur_bulan,jenis_kelamin,tinggi_badan,prediksi,timestamp\n"));

        let corpus = read_observations(log.path()).unwrap();
        assert_eq!(
            corpus.records(),
            &[
                Record::new(14, "Laki-laki", 78.5, "Normal"),
                Record::new(20, "Perempuan", 70.1, "Pendek"),
            ]
        );
    }
}
