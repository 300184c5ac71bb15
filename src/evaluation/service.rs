//! Metric computation over holdout predictions.

use super::domain::{ClassMetrics, EvalReport};

/// Exact-match accuracy. An empty holdout scores 0.
pub fn accuracy(truth: &[String], predicted: &[String]) -> f64 {
    if truth.is_empty() {
        return 0.0;
    }
    let hits = truth
        .iter()
        .zip(predicted)
        .filter(|(t, p)| t == p)
        .count();
    hits as f64 / truth.len() as f64
}

/// Accuracy plus a per-class report over the union of true and predicted
/// labels. Undefined ratios (no predictions, no support) are reported as 0.
pub fn evaluate(truth: &[String], predicted: &[String]) -> EvalReport {
    let mut labels: Vec<&String> = truth.iter().chain(predicted).collect();
    labels.sort();
    labels.dedup();

    let per_class = labels
        .into_iter()
        .map(|label| {
            let pairs = || truth.iter().zip(predicted);
            let tp = pairs().filter(|(t, p)| *t == label && *p == label).count();
            let predicted_n = predicted.iter().filter(|p| *p == label).count();
            let support = truth.iter().filter(|t| *t == label).count();

            let precision = ratio(tp, predicted_n);
            let recall = ratio(tp, support);
            let f1 = if precision + recall > 0.0 {
                2.0 * precision * recall / (precision + recall)
            } else {
                0.0
            };
            ClassMetrics {
                label: label.clone(),
                precision,
                recall,
                f1,
                support,
            }
        })
        .collect();

    EvalReport {
        accuracy: accuracy(truth, predicted),
        holdout_rows: truth.len(),
        per_class,
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}
