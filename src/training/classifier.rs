//! Kernel support vector classifier over string labels.
//!
//! Multiclass problems are decomposed one-vs-one: one binary `linfa-svm`
//! machine per pair of classes, and the class with the most votes wins. Ties
//! go to the class that sorts first.

use linfa::prelude::*;
use linfa_svm::Svm;
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::common::config::Kernel;
use crate::common::error::{StuntingError, StuntingResult};

/// Degree and offset of the polynomial kernel `(<x, y> + c)^d`.
const POLY_CONSTANT: f64 = 1.0;
const POLY_DEGREE: f64 = 3.0;

/// Hyperparameters of the classifier.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClassifierParams {
    pub kernel: Kernel,
    /// Regularization constant `C`, applied to both classes of every machine.
    pub regularization: f64,
}

impl Default for ClassifierParams {
    fn default() -> Self {
        Self {
            kernel: Kernel::Rbf,
            regularization: 1.0,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct PairMachine {
    /// Class index voted for when the machine predicts `true`.
    positive: usize,
    negative: usize,
    svm: Svm<f64, bool>,
}

/// Fitted one-vs-one support vector classifier.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SvmClassifier {
    params: ClassifierParams,
    /// Gaussian kernel width `eps` in `exp(-|x - y|^2 / eps)`.
    kernel_width: f64,
    classes: Vec<String>,
    machines: Vec<PairMachine>,
}

impl SvmClassifier {
    /// Fit on already preprocessed features, one row per label.
    pub fn fit(x: &Array2<f64>, labels: &[String], params: ClassifierParams) -> StuntingResult<Self> {
        if x.nrows() != labels.len() {
            return Err(StuntingError::fit(format!(
                "{} feature rows but {} labels",
                x.nrows(),
                labels.len()
            )));
        }
        if !params.regularization.is_finite() || params.regularization <= 0.0 {
            return Err(StuntingError::fit(format!(
                "regularization must be positive, got {}",
                params.regularization
            )));
        }

        let mut classes: Vec<String> = labels.to_vec();
        classes.sort();
        classes.dedup();
        if classes.len() < 2 {
            return Err(StuntingError::fit(format!(
                "training partition needs at least two classes, found {:?}",
                classes
            )));
        }

        let label_idx: Vec<usize> = labels
            .iter()
            .map(|l| classes.binary_search(l).unwrap_or_default())
            .collect();
        let kernel_width = scale_width(x);

        let mut machines = Vec::with_capacity(classes.len() * (classes.len() - 1) / 2);
        for positive in 0..classes.len() {
            for negative in positive + 1..classes.len() {
                let rows: Vec<usize> = (0..label_idx.len())
                    .filter(|&i| label_idx[i] == positive || label_idx[i] == negative)
                    .collect();
                let records = x.select(Axis(0), &rows);
                let targets: Array1<bool> = rows.iter().map(|&i| label_idx[i] == positive).collect();
                let dataset = Dataset::new(records, targets);

                let c = params.regularization;
                let fitted = match params.kernel {
                    Kernel::Linear => Svm::<_, bool>::params()
                        .pos_neg_weights(c, c)
                        .linear_kernel()
                        .fit(&dataset),
                    Kernel::Rbf => Svm::<_, bool>::params()
                        .pos_neg_weights(c, c)
                        .gaussian_kernel(kernel_width)
                        .fit(&dataset),
                    Kernel::Poly => Svm::<_, bool>::params()
                        .pos_neg_weights(c, c)
                        .polynomial_kernel(POLY_CONSTANT, POLY_DEGREE)
                        .fit(&dataset),
                };
                let svm = fitted.map_err(|e| {
                    StuntingError::fit(format!(
                        "'{}' vs '{}': {e}",
                        classes[positive], classes[negative]
                    ))
                })?;

                debug!(
                    positive = %classes[positive],
                    negative = %classes[negative],
                    rows = rows.len(),
                    "fitted pairwise machine"
                );
                machines.push(PairMachine {
                    positive,
                    negative,
                    svm,
                });
            }
        }

        Ok(Self {
            params,
            kernel_width,
            classes,
            machines,
        })
    }

    /// Predict one label per feature row.
    pub fn predict(&self, x: &Array2<f64>) -> Vec<String> {
        let mut votes = Array2::<usize>::zeros((x.nrows(), self.classes.len()));
        for machine in &self.machines {
            let out: Array1<bool> = machine.svm.predict(x);
            for (row, positive) in out.iter().enumerate() {
                let winner = if *positive {
                    machine.positive
                } else {
                    machine.negative
                };
                votes[[row, winner]] += 1;
            }
        }

        votes
            .rows()
            .into_iter()
            .map(|row| {
                let mut best = 0;
                for (idx, &count) in row.iter().enumerate() {
                    if count > row[best] {
                        best = idx;
                    }
                }
                self.classes[best].clone()
            })
            .collect()
    }

    /// Known labels, sorted.
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn params(&self) -> ClassifierParams {
        self.params
    }

    pub fn kernel_width(&self) -> f64 {
        self.kernel_width
    }
}

/// "scale" heuristic: `eps = n_features * var(X)`, falling back to 1 for
/// constant input.
fn scale_width(x: &Array2<f64>) -> f64 {
    let n = x.len();
    if n == 0 {
        return 1.0;
    }
    let mean = x.sum() / n as f64;
    let var = x.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n as f64;
    let width = x.ncols() as f64 * var;
    if width.is_finite() && width > f64::EPSILON {
        width
    } else {
        1.0
    }
}
