//! Classifier capability and the Gaussian Naive Bayes implementation.
//!
//! Cross-validation only needs two operations from a model: fit it on a
//! training partition, then predict one held-out row. [`Classifier`] and
//! [`FittedClassifier`] capture that, so any implementation can be plugged
//! into [`LeaveOneOut`](crate::validation::LeaveOneOut).

mod gaussian_nb;

pub use gaussian_nb::{ClassPrior, DEFAULT_VAR_SMOOTHING, GaussianNb, GaussianNbModel};

use ndarray::{ArrayView1, ArrayView2};

use crate::error::Result;

/// An unfitted classifier configuration.
pub trait Classifier<L> {
    /// Model produced by [`fit`](Self::fit).
    type Fitted: FittedClassifier<L>;

    /// Fit on `features` (shape `[n_samples, n_features]`) and aligned `labels`.
    fn fit(&self, features: ArrayView2<f64>, labels: &[L]) -> Result<Self::Fitted>;
}

/// A fitted classifier that predicts one label per row.
pub trait FittedClassifier<L> {
    /// Predict the label of a single row.
    fn predict_row(&self, row: ArrayView1<f64>) -> L;

    /// Predict every row of `features`.
    fn predict(&self, features: ArrayView2<f64>) -> Vec<L> {
        features.rows().into_iter().map(|r| self.predict_row(r)).collect()
    }
}
