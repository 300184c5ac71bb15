//! Feature preprocessing fitted jointly with the classifier.
//!
//! [`TrainedPipeline`] is the only way to fit or apply the preprocessor, so
//! inference always sees exactly the scaling and encoding used in training.
//! Feature layout: `[age_z, height_z, onehot(sex)...]`.

use ndarray::{Array2, ArrayViewMut1};
use serde::{Deserialize, Serialize};

use crate::common::error::StuntingResult;
use crate::data::domain::{Features, Record};

use super::classifier::{ClassifierParams, SvmClassifier};

/// Standardization to zero mean and unit variance.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: f64,
    /// Population standard deviation, or 1 when the column is constant.
    pub scale: f64,
}

impl StandardScaler {
    fn fit(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self {
                mean: 0.0,
                scale: 1.0,
            };
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        let std = var.sqrt();
        Self {
            mean,
            scale: if std > f64::EPSILON { std } else { 1.0 },
        }
    }

    pub fn transform(&self, value: f64) -> f64 {
        (value - self.mean) / self.scale
    }
}

/// One-hot membership encoding over the categories seen during fit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OneHotEncoder {
    /// Sorted, unique.
    pub categories: Vec<String>,
}

impl OneHotEncoder {
    fn fit<'a>(values: impl Iterator<Item = &'a str>) -> Self {
        let mut categories: Vec<String> = values.map(str::to_string).collect();
        categories.sort();
        categories.dedup();
        Self { categories }
    }

    pub fn width(&self) -> usize {
        self.categories.len()
    }

    /// Position of `value`, `None` for a category unseen during fit.
    pub fn index_of(&self, value: &str) -> Option<usize> {
        self.categories
            .binary_search_by(|c| c.as_str().cmp(value))
            .ok()
    }
}

/// Fitted preprocessing stage.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Preprocessor {
    pub age_months: StandardScaler,
    pub height_cm: StandardScaler,
    pub sex: OneHotEncoder,
}

impl Preprocessor {
    fn fit(rows: &[&Record]) -> Self {
        let ages: Vec<f64> = rows.iter().map(|r| r.age_months as f64).collect();
        let heights: Vec<f64> = rows.iter().map(|r| r.height_cm).collect();
        Self {
            age_months: StandardScaler::fit(&ages),
            height_cm: StandardScaler::fit(&heights),
            sex: OneHotEncoder::fit(rows.iter().map(|r| r.sex.as_str())),
        }
    }

    pub fn n_features(&self) -> usize {
        2 + self.sex.width()
    }

    /// Unseen sex values leave the one-hot block all zero.
    fn encode(&self, age_months: u32, sex: &str, height_cm: f64, mut out: ArrayViewMut1<'_, f64>) {
        out[0] = self.age_months.transform(age_months as f64);
        out[1] = self.height_cm.transform(height_cm);
        if let Some(idx) = self.sex.index_of(sex) {
            out[2 + idx] = 1.0;
        }
    }

    fn matrix<'a, I>(&self, rows: I) -> Array2<f64>
    where
        I: ExactSizeIterator<Item = (u32, &'a str, f64)>,
    {
        let mut x = Array2::zeros((rows.len(), self.n_features()));
        for (out, (age, sex, height)) in x.rows_mut().into_iter().zip(rows) {
            self.encode(age, sex, height, out);
        }
        x
    }
}

/// Preprocessor and classifier fitted together; the serialized unit served
/// for inference.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TrainedPipeline {
    preprocessor: Preprocessor,
    classifier: SvmClassifier,
}

impl TrainedPipeline {
    /// Fit both stages on the training partition.
    pub fn fit(rows: &[&Record], params: ClassifierParams) -> StuntingResult<Self> {
        let preprocessor = Preprocessor::fit(rows);
        let x = preprocessor.matrix(
            rows.iter()
                .map(|r| (r.age_months, r.sex.as_str(), r.height_cm)),
        );
        let labels: Vec<String> = rows.iter().map(|r| r.status_label.clone()).collect();
        let classifier = SvmClassifier::fit(&x, &labels, params)?;
        Ok(Self {
            preprocessor,
            classifier,
        })
    }

    /// Predict one label per input row.
    pub fn predict(&self, rows: &[Features]) -> Vec<String> {
        let x = self.preprocessor.matrix(
            rows.iter()
                .map(|f| (f.age_months, f.sex.as_str(), f.height_cm)),
        );
        self.classifier.predict(&x)
    }

    pub fn predict_one(&self, row: &Features) -> String {
        self.predict(std::slice::from_ref(row))
            .pop()
            .unwrap_or_default()
    }

    pub fn classes(&self) -> &[String] {
        self.classifier.classes()
    }

    pub fn classifier(&self) -> &SvmClassifier {
        &self.classifier
    }
}
