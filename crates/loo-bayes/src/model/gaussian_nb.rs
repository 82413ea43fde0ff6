//! Gaussian Naive Bayes.
//!
//! Each class is modelled by an independent normal distribution per feature.
//! The predicted class maximizes the joint log-likelihood
//!
//! ```text
//! log P(c) + Σ_j log N(x_j; μ_cj, σ²_cj)
//! ```
//!
//! # Variance smoothing
//!
//! A class with a single training row, or a feature that is constant within a
//! class, has zero variance. Every class variance is therefore increased by
//! `epsilon = var_smoothing * max_j Var(X[:, j])`, the largest per-feature
//! variance of the whole training set. If that is not positive (every
//! training feature is constant), `var_smoothing` itself is used, and
//! `f64::MIN_POSITIVE` if smoothing is disabled. Log-likelihoods are then
//! always well defined.
//!
//! # Scale
//!
//! Statistics are computed on the training data divided by a power of two
//! near its largest magnitude, and reported in the original units. Finite
//! inputs of any magnitude give finite class variances and log-likelihoods.
//!
//! # Ties
//!
//! Classes are kept in ascending label order and the first class with the
//! highest score wins, so ties resolve to the smallest label.

use std::collections::BTreeMap;
use std::f64::consts::TAU;

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis, Zip};
use serde::{Deserialize, Serialize};

use super::{Classifier, FittedClassifier};
use crate::error::{ClassifyError, Result};
use crate::utils::pow2_scale;

/// Default variance smoothing factor.
pub const DEFAULT_VAR_SMOOTHING: f64 = 1e-9;

// =============================================================================
// ClassPrior
// =============================================================================

/// Prior over classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassPrior {
    /// Every class present in training is equally likely: `1 / K`.
    #[default]
    Uniform,
    /// Class frequency in the training labels: `n_c / n`.
    Empirical,
}

// =============================================================================
// GaussianNb
// =============================================================================

/// Gaussian Naive Bayes parameters.
///
/// # Example
///
/// ```
/// use loo_bayes::model::{Classifier, FittedClassifier, GaussianNb};
/// use ndarray::array;
///
/// let x = array![[0.0, 0.1], [0.2, 0.0], [5.0, 5.1], [5.2, 4.9]];
/// let y = [0u8, 0, 1, 1];
///
/// let model = GaussianNb::default().fit(x.view(), &y).unwrap();
/// assert_eq!(model.predict_row(array![4.8, 5.0].view()), 1);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaussianNb {
    pub prior: ClassPrior,
    pub var_smoothing: f64,
}

impl Default for GaussianNb {
    fn default() -> Self {
        Self {
            prior: ClassPrior::Uniform,
            var_smoothing: DEFAULT_VAR_SMOOTHING,
        }
    }
}

impl GaussianNb {
    pub fn new(prior: ClassPrior, var_smoothing: f64) -> Self {
        Self {
            prior,
            var_smoothing,
        }
    }

    /// Smoothing for features already divided by `scale`.
    fn epsilon(&self, scaled: ArrayView2<f64>, scale: f64) -> f64 {
        let max_var = scaled
            .var_axis(Axis(0), 0.0)
            .fold(0.0_f64, |acc, &v| acc.max(v));
        let eps = self.var_smoothing * max_var;
        // The absolute fallback is in original units.
        let absolute = self.var_smoothing / scale / scale;
        if eps > 0.0 {
            eps
        } else if absolute > 0.0 {
            absolute
        } else {
            f64::MIN_POSITIVE
        }
    }
}

impl<L: Ord + Clone> Classifier<L> for GaussianNb {
    type Fitted = GaussianNbModel<L>;

    fn fit(&self, features: ArrayView2<f64>, labels: &[L]) -> Result<GaussianNbModel<L>> {
        let (n_samples, n_features) = features.dim();
        if n_samples != labels.len() {
            return Err(ClassifyError::DimensionMismatch {
                n_rows: n_samples,
                n_labels: labels.len(),
            });
        }
        if n_samples == 0 {
            return Err(ClassifyError::EmptyTrainingSet);
        }

        // Row indices grouped by class, in ascending label order.
        let mut groups: BTreeMap<&L, Vec<usize>> = BTreeMap::new();
        for (i, label) in labels.iter().enumerate() {
            groups.entry(label).or_default().push(i);
        }

        let scale = pow2_scale(features.fold(0.0_f64, |acc, &v| acc.max(v.abs())));
        let scaled = features.mapv(|v| v / scale);

        let n_classes = groups.len();
        let epsilon = self.epsilon(scaled.view(), scale);
        let uniform = -(n_classes as f64).ln();

        let mut classes = Vec::with_capacity(n_classes);
        let mut means = Array2::zeros((n_classes, n_features));
        let mut variances = Array2::zeros((n_classes, n_features));
        let mut log_priors = Array1::zeros(n_classes);

        for (c, (label, rows)) in groups.into_iter().enumerate() {
            let members = scaled.select(Axis(0), &rows);
            // Non-empty by construction.
            if let Some(mean) = members.mean_axis(Axis(0)) {
                means.row_mut(c).assign(&mean);
            }
            let var = members.var_axis(Axis(0), 0.0) + epsilon;
            variances.row_mut(c).assign(&var);

            log_priors[c] = match self.prior {
                ClassPrior::Uniform => uniform,
                ClassPrior::Empirical => (rows.len() as f64 / n_samples as f64).ln(),
            };
            classes.push(label.clone());
        }

        Ok(GaussianNbModel {
            classes,
            means,
            variances,
            log_priors,
            epsilon,
            scale,
        })
    }
}

// =============================================================================
// GaussianNbModel
// =============================================================================

/// A fitted Gaussian Naive Bayes model.
///
/// Per-class arrays have shape `[n_classes, n_features]`, rows in the order
/// of [`classes`](Self::classes).
#[derive(Debug, Clone, PartialEq)]
pub struct GaussianNbModel<L> {
    classes: Vec<L>,
    // Means, variances and epsilon are stored divided by `scale` (squared
    // for the variances).
    means: Array2<f64>,
    variances: Array2<f64>,
    log_priors: Array1<f64>,
    epsilon: f64,
    scale: f64,
}

impl<L> GaussianNbModel<L> {
    /// Classes seen in training, ascending.
    pub fn classes(&self) -> &[L] {
        &self.classes
    }

    pub fn n_classes(&self) -> usize {
        self.classes.len()
    }

    pub fn n_features(&self) -> usize {
        self.means.ncols()
    }

    /// Class-conditional feature means.
    pub fn means(&self) -> Array2<f64> {
        &self.means * self.scale
    }

    /// Class-conditional feature variances, smoothing included.
    ///
    /// Entries overflow to infinity when the training data is within a few
    /// orders of magnitude of `f64::MAX`; predictions are unaffected.
    pub fn variances(&self) -> Array2<f64> {
        &self.variances * (self.scale * self.scale)
    }

    pub fn log_priors(&self) -> ArrayView1<'_, f64> {
        self.log_priors.view()
    }

    /// Variance added to every class variance.
    pub fn epsilon(&self) -> f64 {
        self.epsilon * self.scale * self.scale
    }

    /// Power of two the training data was divided by before fitting.
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Joint log-likelihood of `row` under each class.
    ///
    /// # Panics
    ///
    /// Panics if `row` does not have [`n_features`](Self::n_features) values.
    pub fn log_likelihoods(&self, row: ArrayView1<f64>) -> Array1<f64> {
        assert_eq!(
            row.len(),
            self.n_features(),
            "model fitted on {} features, got {}",
            self.n_features(),
            row.len()
        );
        // ln(var) = ln(var / scale²) + 2 ln(scale), once per feature.
        let log_scale = self.n_features() as f64 * self.scale.ln();
        let mut jll = self.log_priors.clone();
        for (c, score) in jll.iter_mut().enumerate() {
            let mut log_pdf = 0.0;
            Zip::from(&row)
                .and(self.means.row(c))
                .and(self.variances.row(c))
                .for_each(|&x, &mu, &var| {
                    let d = x / self.scale - mu;
                    log_pdf += (TAU * var).ln() + d * d / var;
                });
            *score -= 0.5 * log_pdf + log_scale;
        }
        jll
    }

    /// Posterior class probabilities of `row`, normalized with log-sum-exp.
    pub fn predict_proba(&self, row: ArrayView1<f64>) -> Array1<f64> {
        let jll = self.log_likelihoods(row);
        let max = jll.fold(f64::NEG_INFINITY, |acc, &v| acc.max(v));
        if !max.is_finite() {
            // Every class is infinitely unlikely; fall back to the prior.
            return self.log_priors.mapv(f64::exp);
        }
        let shifted = jll.mapv(|v| (v - max).exp());
        let total = shifted.sum();
        shifted / total
    }

    /// Index into [`classes`](Self::classes) of the best-scoring class.
    ///
    /// A NaN score ranks below every other score.
    pub fn predict_index(&self, row: ArrayView1<f64>) -> usize {
        let jll = self.log_likelihoods(row);
        let mut best = 0;
        let mut best_score = f64::NEG_INFINITY;
        for (c, &score) in jll.iter().enumerate() {
            let score = if score.is_nan() { f64::NEG_INFINITY } else { score };
            if score.total_cmp(&best_score).is_gt() {
                best = c;
                best_score = score;
            }
        }
        best
    }
}

impl<L: Clone> FittedClassifier<L> for GaussianNbModel<L> {
    fn predict_row(&self, row: ArrayView1<f64>) -> L {
        self.classes[self.predict_index(row)].clone()
    }
}
