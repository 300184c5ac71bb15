//! Schema reconciliation from the operational log vocabulary onto the
//! canonical schema.
//!
//! Reconciliation renames and filters; it never validates ranges. The only
//! coercion performed is what a [`Record`] needs: integer age, real height.

use std::collections::BTreeMap;
use std::path::Path;

use crate::common::error::{StuntingError, StuntingResult};

use super::domain::{CanonicalField, Record};

/// Canonical field fed by each log column. A field may be logged under
/// either vocabulary; the first name is the one the serving side writes.
pub const LOG_FIELD_MAP: [(CanonicalField, &[&str]); 4] = [
    (CanonicalField::AgeMonths, &["umur_bulan", "subject_age"]),
    (CanonicalField::Sex, &["jenis_kelamin", "subject_sex"]),
    (CanonicalField::HeightCm, &["tinggi_badan", "subject_height"]),
    (CanonicalField::StatusLabel, &["prediksi", "predicted_label"]),
];

/// Observation timestamp columns; never used for training.
pub const LOG_TIMESTAMPS: [&str; 2] = ["timestamp", "observed_at"];

/// Reconciled values keyed by canonical field. Holds at most the four fields.
pub type CanonicalFields = BTreeMap<CanonicalField, String>;

/// Canonical counterpart of a log column, if it has one.
pub fn canonical_for_log(name: &str) -> Option<CanonicalField> {
    let name = name.trim();
    LOG_FIELD_MAP
        .iter()
        .find(|(_, names)| names.contains(&name))
        .map(|(field, _)| *field)
}

/// Log column name the serving side writes for a canonical field.
pub fn log_name_for(field: CanonicalField) -> &'static str {
    LOG_FIELD_MAP
        .iter()
        .find(|(f, _)| *f == field)
        .and_then(|(_, names)| names.first().copied())
        .unwrap_or_else(|| field.name())
}

/// Rename log fields to canonical ones; anything without a counterpart
/// (including the [`LOG_TIMESTAMPS`] columns) is dropped silently.
pub fn reconcile_fields<'a, I>(fields: I) -> CanonicalFields
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    fields
        .into_iter()
        .filter_map(|(name, value)| canonical_for_log(name).map(|f| (f, value.trim().to_string())))
        .collect()
}

/// Check that a log header carries a column, under either name, for every
/// canonical field.
pub fn check_log_header<'a, I>(headers: I, path: &Path) -> StuntingResult<()>
where
    I: IntoIterator<Item = &'a str>,
{
    let present: Vec<CanonicalField> = headers.into_iter().filter_map(canonical_for_log).collect();
    for (field, _) in LOG_FIELD_MAP {
        if !present.contains(&field) {
            return Err(StuntingError::missing_column(log_name_for(field), path));
        }
    }
    Ok(())
}

/// Build a record from canonical fields.
///
/// Returns `Ok(None)` when any of the four fields is absent or blank; the row
/// is dropped. A present but unparseable number is an error, reported against
/// `path` and the 1-based data `row`.
pub fn record_from_fields(
    fields: &CanonicalFields,
    path: &Path,
    row: usize,
) -> StuntingResult<Option<Record>> {
    let value = |field: CanonicalField| fields.get(&field).map(String::as_str).filter(|v| !v.is_empty());

    let (Some(age), Some(sex), Some(height), Some(label)) = (
        value(CanonicalField::AgeMonths),
        value(CanonicalField::Sex),
        value(CanonicalField::HeightCm),
        value(CanonicalField::StatusLabel),
    ) else {
        return Ok(None);
    };

    let invalid = |field: CanonicalField, raw: &str| StuntingError::InvalidValue {
        path: path.to_path_buf(),
        row,
        column: field.column().to_string(),
        value: raw.to_string(),
    };

    let age_months = parse_age(age).ok_or_else(|| invalid(CanonicalField::AgeMonths, age))?;
    let height_cm = height
        .parse::<f64>()
        .ok()
        .filter(|h| h.is_finite())
        .ok_or_else(|| invalid(CanonicalField::HeightCm, height))?;

    Ok(Some(Record::new(age_months, sex, height_cm, label)))
}

/// Ages are whole months; CSV writers sometimes emit them as `14.0`.
fn parse_age(raw: &str) -> Option<u32> {
    if let Ok(v) = raw.parse::<u32>() {
        return Some(v);
    }
    let v = raw.parse::<f64>().ok()?;
    (v.is_finite() && v >= 0.0 && v.fract() == 0.0 && v <= u32::MAX as f64).then_some(v as u32)
}
