//! Core record and corpus definitions.
//!
//! The canonical schema is the vocabulary of the historical dataset; the
//! operational log uses its own column names and is reconciled onto this one.

use serde::{Deserialize, Serialize};

use crate::common::fingerprint::Fingerprint;

/// The four canonical fields every training record carries.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum CanonicalField {
    AgeMonths,
    Sex,
    HeightCm,
    StatusLabel,
}

impl CanonicalField {
    /// All fields, in the column order of the historical dataset.
    pub const ALL: [CanonicalField; 4] = [
        CanonicalField::AgeMonths,
        CanonicalField::Sex,
        CanonicalField::HeightCm,
        CanonicalField::StatusLabel,
    ];

    /// Column header used in the historical dataset.
    pub fn column(&self) -> &'static str {
        match self {
            CanonicalField::AgeMonths => "Umur (bulan)",
            CanonicalField::Sex => "Jenis Kelamin",
            CanonicalField::HeightCm => "Tinggi Badan (cm)",
            CanonicalField::StatusLabel => "Status Gizi",
        }
    }

    /// Field name used in code and in reconciled output.
    pub fn name(&self) -> &'static str {
        match self {
            CanonicalField::AgeMonths => "age_months",
            CanonicalField::Sex => "sex",
            CanonicalField::HeightCm => "height_cm",
            CanonicalField::StatusLabel => "status_label",
        }
    }
}

/// The three model inputs, shaped exactly like the canonical feature columns.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Features {
    #[serde(rename = "Umur (bulan)", alias = "umur_bulan", alias = "age_months")]
    pub age_months: u32,
    #[serde(rename = "Jenis Kelamin", alias = "jenis_kelamin", alias = "sex")]
    pub sex: String,
    #[serde(rename = "Tinggi Badan (cm)", alias = "tinggi_badan", alias = "height_cm")]
    pub height_cm: f64,
}

impl Features {
    pub fn new(age_months: u32, sex: impl Into<String>, height_cm: f64) -> Self {
        Self {
            age_months,
            sex: sex.into(),
            height_cm,
        }
    }
}

/// One labelled subject observation in canonical form.
#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    pub age_months: u32,
    pub sex: String,
    pub height_cm: f64,
    pub status_label: String,
}

impl Record {
    pub fn new(
        age_months: u32,
        sex: impl Into<String>,
        height_cm: f64,
        status_label: impl Into<String>,
    ) -> Self {
        Self {
            age_months,
            sex: sex.into(),
            height_cm,
            status_label: status_label.into(),
        }
    }

    /// Borrow the feature part of the record.
    pub fn features(&self) -> Features {
        Features::new(self.age_months, self.sex.clone(), self.height_cm)
    }
}

/// Ordered collection of records; the unit passed into training.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Corpus {
    records: Vec<Record>,
}

impl Corpus {
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Append `other` after the existing rows, keeping both orders intact.
    pub fn extend(&mut self, other: Corpus) {
        self.records.extend(other.records);
    }

    /// Content digest over every row, in order.
    pub fn fingerprint(&self) -> String {
        let mut fp = Fingerprint::new();
        for r in &self.records {
            fp.field(&r.age_months.to_string());
            fp.field(&r.sex);
            fp.field(&r.height_cm.to_string());
            fp.field(&r.status_label);
        }
        fp.finish_hex()
    }
}

impl From<Vec<Record>> for Corpus {
    fn from(records: Vec<Record>) -> Self {
        Corpus::new(records)
    }
}
