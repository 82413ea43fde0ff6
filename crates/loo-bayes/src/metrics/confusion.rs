//! Confusion matrix over categorical labels.

use std::collections::BTreeSet;

use ndarray::{Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{ClassifyError, Result};

/// Count table of `(true label, predicted label)` pairs.
///
/// Rows are true labels, columns are predicted labels, both in ascending
/// label order: `counts[[t, p]]` is the number of samples whose true label is
/// `labels[t]` and whose prediction is `labels[p]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix<L> {
    labels: Vec<L>,
    counts: Array2<usize>,
}

impl<L: Ord + Clone> ConfusionMatrix<L> {
    /// Tally aligned true and predicted labels.
    ///
    /// The label axis is the sorted set of labels occurring in either input.
    /// For cross-validated predictions every predicted label was seen in
    /// training, so this is the set of labels in `truth`.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifyError::DimensionMismatch`] if the inputs differ in length.
    pub fn from_predictions(truth: &[L], predicted: &[L]) -> Result<Self> {
        if truth.len() != predicted.len() {
            return Err(ClassifyError::DimensionMismatch {
                n_rows: predicted.len(),
                n_labels: truth.len(),
            });
        }

        let labels: Vec<L> = truth
            .iter()
            .chain(predicted)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .cloned()
            .collect();

        let mut counts = Array2::zeros((labels.len(), labels.len()));
        for (t, p) in truth.iter().zip(predicted) {
            // Both labels are in the set by construction.
            if let (Ok(ti), Ok(pi)) = (labels.binary_search(t), labels.binary_search(p)) {
                counts[[ti, pi]] += 1;
            }
        }

        Ok(Self { labels, counts })
    }

    /// Count for a `(true, predicted)` pair; zero for unknown labels.
    pub fn count(&self, truth: &L, predicted: &L) -> usize {
        match (self.index_of(truth), self.index_of(predicted)) {
            (Some(t), Some(p)) => self.counts[[t, p]],
            _ => 0,
        }
    }

    /// Position of `label` on both axes.
    pub fn index_of(&self, label: &L) -> Option<usize> {
        self.labels.binary_search(label).ok()
    }
}

impl<L> ConfusionMatrix<L> {
    /// Labels on both axes, ascending.
    pub fn labels(&self) -> &[L] {
        &self.labels
    }

    /// Raw counts, shape `[n_classes, n_classes]`.
    pub fn counts(&self) -> ArrayView2<'_, usize> {
        self.counts.view()
    }

    pub fn n_classes(&self) -> usize {
        self.labels.len()
    }

    /// Number of tallied samples.
    pub fn total(&self) -> usize {
        self.counts.sum()
    }

    /// Number of correct predictions (the diagonal).
    pub fn correct(&self) -> usize {
        self.counts.diag().sum()
    }

    /// Fraction of correct predictions. Zero for an empty matrix.
    pub fn accuracy(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            0.0
        } else {
            self.correct() as f64 / total as f64
        }
    }

    /// Per-class recall: correct / true count. Zero for classes never seen as truth.
    pub fn recall(&self) -> Vec<f64> {
        self.counts
            .axis_iter(Axis(0))
            .enumerate()
            .map(|(c, row)| ratio(row[c], row.sum()))
            .collect()
    }

    /// Per-class precision: correct / predicted count. Zero for classes never predicted.
    pub fn precision(&self) -> Vec<f64> {
        self.counts
            .axis_iter(Axis(1))
            .enumerate()
            .map(|(c, col)| ratio(col[c], col.sum()))
            .collect()
    }

    /// Counts divided by their row sums. Empty rows stay zero.
    pub fn normalized(&self) -> Array2<f64> {
        let mut out = self.counts.mapv(|c| c as f64);
        for mut row in out.rows_mut() {
            let sum = row.sum();
            if sum > 0.0 {
                row /= sum;
            }
        }
        out
    }
}

#[inline]
fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn tallies_true_against_predicted() {
        let truth = [0, 0, 1, 1, 2];
        let pred = [0, 1, 1, 1, 0];
        let cm = ConfusionMatrix::from_predictions(&truth, &pred).unwrap();

        assert_eq!(cm.labels(), &[0, 1, 2]);
        assert_eq!(cm.counts(), array![[1usize, 1, 0], [0, 2, 0], [1, 0, 0]].view());
        assert_eq!(cm.count(&0, &1), 1);
        assert_eq!(cm.count(&2, &0), 1);
        assert_eq!(cm.count(&9, &0), 0);
        assert_eq!(cm.total(), 5);
        assert_eq!(cm.correct(), 3);
        assert_abs_diff_eq!(cm.accuracy(), 0.6);
    }

    #[test]
    fn recall_and_precision() {
        let truth = ["index", "index", "thumb", "thumb"];
        let pred = ["index", "thumb", "thumb", "thumb"];
        let cm = ConfusionMatrix::from_predictions(&truth, &pred).unwrap();

        assert_eq!(cm.labels(), &["index", "thumb"]);
        let recall = cm.recall();
        assert_abs_diff_eq!(recall[0], 0.5);
        assert_abs_diff_eq!(recall[1], 1.0);
        let precision = cm.precision();
        assert_abs_diff_eq!(precision[0], 1.0);
        assert_abs_diff_eq!(precision[1], 2.0 / 3.0);
    }

    #[test]
    fn normalized_rows_sum_to_one() {
        let truth = [0, 0, 0, 1];
        let pred = [0, 1, 1, 1];
        let cm = ConfusionMatrix::from_predictions(&truth, &pred).unwrap();
        let norm = cm.normalized();
        assert_abs_diff_eq!(norm[[0, 0]], 1.0 / 3.0);
        assert_abs_diff_eq!(norm[[0, 1]], 2.0 / 3.0);
        assert_abs_diff_eq!(norm[[1, 1]], 1.0);
    }

    #[test]
    fn predicted_only_labels_get_a_column() {
        let cm = ConfusionMatrix::from_predictions(&[1, 1], &[1, 3]).unwrap();
        assert_eq!(cm.labels(), &[1, 3]);
        assert_eq!(cm.count(&1, &3), 1);
        // Label 3 never occurs as truth.
        assert_eq!(cm.recall(), vec![0.5, 0.0]);
        assert_eq!(cm.normalized().row(1).sum(), 0.0);
    }

    #[test]
    fn length_mismatch_is_an_error() {
        let err = ConfusionMatrix::from_predictions(&[0, 1], &[0]).unwrap_err();
        assert!(matches!(err, ClassifyError::DimensionMismatch { .. }));
    }

    #[test]
    fn serializes_labels_and_counts() {
        let cm = ConfusionMatrix::from_predictions(&[0, 1], &[0, 0]).unwrap();
        let json = serde_json::to_string(&cm).unwrap();
        let back: ConfusionMatrix<i32> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cm);
    }
}
