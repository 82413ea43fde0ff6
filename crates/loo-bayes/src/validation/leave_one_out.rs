//! Leave-one-out cross-validation.
//!
//! Every trial is held out once. The model for fold `i` is fitted on all
//! other trials. NaN imputation donors and z-score statistics come from
//! those trials only, so trial `i` never influences its own prediction.
//!
//! Folds share no mutable state. Each one copies its own training partition
//! and yields a single prediction, so the loop runs in parallel without
//! locking and produces the same output as a sequential run.

use ndarray::{Array1, Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::LeaveOneOutConfig;
use crate::error::{ClassifyError, Result};
use crate::metrics::ConfusionMatrix;
use crate::model::{Classifier, FittedClassifier, GaussianNb};
use crate::preprocessing::{Imputer, NanPolicy, Standardizer};
use crate::utils::run_with_threads;

// =============================================================================
// Fold
// =============================================================================

/// One leave-one-out split: a single test index and every other index for training.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fold {
    test: usize,
    n_samples: usize,
}

impl Fold {
    /// Split of `n_samples` holding out `test`, or `None` if `test` is out
    /// of range.
    pub fn new(test: usize, n_samples: usize) -> Option<Self> {
        (test < n_samples).then_some(Self { test, n_samples })
    }

    /// The held-out index.
    pub fn test_index(&self) -> usize {
        self.test
    }

    /// Training indices in ascending order.
    pub fn train_indices(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.n_samples).filter(move |&j| j != self.test)
    }

    pub fn n_train(&self) -> usize {
        self.n_samples - 1
    }

    /// Copy this fold's training rows and labels out of the full data.
    pub fn split<L: Clone>(&self, features: ArrayView2<f64>, labels: &[L]) -> TrainSplit<L> {
        let rows: Vec<usize> = self.train_indices().collect();
        TrainSplit {
            features: features.select(Axis(0), &rows),
            labels: rows.iter().map(|&j| labels[j].clone()).collect(),
            test_row: features.row(self.test).to_owned(),
        }
    }
}

/// Owned data of one fold.
#[derive(Debug, Clone)]
pub struct TrainSplit<L> {
    pub features: Array2<f64>,
    pub labels: Vec<L>,
    pub test_row: Array1<f64>,
}

/// All folds of `n_samples` in test-index order.
pub fn folds(n_samples: usize) -> impl ExactSizeIterator<Item = Fold> {
    (0..n_samples).map(move |test| Fold { test, n_samples })
}

// =============================================================================
// CrossValidation
// =============================================================================

/// Output of a leave-one-out run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossValidation<L> {
    predictions: Vec<L>,
    confusion: ConfusionMatrix<L>,
    degenerate_features: Vec<usize>,
    imputed_rows: Vec<usize>,
}

impl<L> CrossValidation<L> {
    /// Out-of-sample prediction for every trial, in trial order.
    pub fn predictions(&self) -> &[L] {
        &self.predictions
    }

    /// Confusion matrix of true against predicted labels.
    pub fn confusion(&self) -> &ConfusionMatrix<L> {
        &self.confusion
    }

    /// Per fold, how many features had zero training variance under
    /// normalization and were set to zero. All zeros when normalization is off.
    pub fn degenerate_features(&self) -> &[usize] {
        &self.degenerate_features
    }

    /// Per fold, how many rows (training and test) contained NaN and were
    /// imputed. All zeros under [`NanPolicy::Reject`].
    pub fn imputed_rows(&self) -> &[usize] {
        &self.imputed_rows
    }

    pub fn accuracy(&self) -> f64 {
        self.confusion.accuracy()
    }

    pub fn into_parts(self) -> (Vec<L>, ConfusionMatrix<L>) {
        (self.predictions, self.confusion)
    }
}

struct FoldOutcome<L> {
    predicted: L,
    n_degenerate: usize,
    n_imputed: usize,
}

/// Training partition and test row after imputation and normalization.
struct PreparedFold<L> {
    train: Array2<f64>,
    train_labels: Vec<L>,
    test_row: Array1<f64>,
    n_degenerate: usize,
    n_imputed: usize,
}

// =============================================================================
// LeaveOneOut
// =============================================================================

/// Leave-one-out cross-validated classifier.
///
/// # Example
///
/// ```
/// use loo_bayes::validation::{LeaveOneOut, LeaveOneOutConfig};
/// use ndarray::array;
///
/// let x = array![[1.0, 10.0], [1.2, 11.0], [5.0, 10.0], [5.1, 11.0], [0.9, 10.5], [5.2, 10.4]];
/// let y = ["thumb", "thumb", "index", "index", "thumb", "index"];
///
/// let config = LeaveOneOutConfig::builder().normalize(true).build().unwrap();
/// let cv = LeaveOneOut::new(config).classify(x.view(), &y).unwrap();
///
/// assert_eq!(cv.predictions(), &y);
/// assert_eq!(cv.confusion().count(&"index", &"index"), 3);
/// ```
#[derive(Debug, Clone)]
pub struct LeaveOneOut<C = GaussianNb> {
    config: LeaveOneOutConfig,
    classifier: C,
}

impl LeaveOneOut<GaussianNb> {
    /// Gaussian Naive Bayes with the prior and smoothing from `config`.
    pub fn new(config: LeaveOneOutConfig) -> Self {
        let classifier = config.classifier();
        Self { config, classifier }
    }
}

impl Default for LeaveOneOut<GaussianNb> {
    fn default() -> Self {
        Self::new(LeaveOneOutConfig::default())
    }
}

impl<C> LeaveOneOut<C> {
    /// Cross-validate an arbitrary classifier. `config.prior` and
    /// `config.var_smoothing` are ignored.
    pub fn with_classifier(config: LeaveOneOutConfig, classifier: C) -> Self {
        Self { config, classifier }
    }

    pub fn config(&self) -> &LeaveOneOutConfig {
        &self.config
    }

    pub fn classifier(&self) -> &C {
        &self.classifier
    }

    /// Predict every trial of `features` (shape `[n_trials, n_features]`)
    /// with a model fitted on the remaining trials.
    ///
    /// # Errors
    ///
    /// - [`ClassifyError::DimensionMismatch`] if row and label counts differ
    /// - [`ClassifyError::InsufficientData`] for fewer than 2 trials
    /// - [`ClassifyError::NoFeatures`] for zero feature columns
    /// - [`ClassifyError::NonFiniteFeature`] for infinite values, and for NaN
    ///   under [`NanPolicy::Reject`]
    /// - [`ClassifyError::NotEnoughObservedRows`] if a fold has too few
    ///   NaN-free training trials to impute from
    /// - [`ClassifyError::InvalidConfig`] for an invalid configuration
    pub fn classify<L>(&self, features: ArrayView2<f64>, labels: &[L]) -> Result<CrossValidation<L>>
    where
        L: Ord + Clone + Send + Sync,
        C: Classifier<L> + Sync,
    {
        self.config.validate()?;
        validate_inputs(features, labels, self.config.nan_policy)?;

        let n_samples = features.nrows();
        let outcomes = run_with_threads(self.config.n_threads, |parallelism| {
            parallelism.maybe_par_map(folds(n_samples).collect::<Vec<_>>(), |fold| {
                self.run_fold(features, labels, fold)
            })
        })?;

        let mut predictions = Vec::with_capacity(n_samples);
        let mut degenerate_features = Vec::with_capacity(n_samples);
        let mut imputed_rows = Vec::with_capacity(n_samples);
        for outcome in outcomes {
            let outcome = outcome?;
            predictions.push(outcome.predicted);
            degenerate_features.push(outcome.n_degenerate);
            imputed_rows.push(outcome.n_imputed);
        }

        let confusion = ConfusionMatrix::from_predictions(labels, &predictions)?;
        info!(
            n_trials = n_samples,
            n_features = features.ncols(),
            n_classes = confusion.n_classes(),
            normalize = self.config.normalize,
            nan_policy = ?self.config.nan_policy,
            accuracy = confusion.accuracy(),
            "leave-one-out complete"
        );

        Ok(CrossValidation {
            predictions,
            confusion,
            degenerate_features,
            imputed_rows,
        })
    }

    fn run_fold<L>(
        &self,
        features: ArrayView2<f64>,
        labels: &[L],
        fold: Fold,
    ) -> Result<FoldOutcome<L>>
    where
        L: Ord + Clone,
        C: Classifier<L>,
    {
        let PreparedFold {
            train,
            train_labels,
            test_row,
            n_degenerate,
            n_imputed,
        } = self.prepare_fold(features, labels, fold)?;

        let model = self.classifier.fit(train.view(), &train_labels)?;
        let predicted = model.predict_row(test_row.view());
        debug!(
            fold = fold.test_index(),
            n_train = fold.n_train(),
            n_degenerate,
            n_imputed,
            "fold predicted"
        );
        Ok(FoldOutcome {
            predicted,
            n_degenerate,
            n_imputed,
        })
    }

    /// Split, impute and normalize one fold. Only training rows feed the
    /// imputation donors and the z-score statistics.
    fn prepare_fold<L>(
        &self,
        features: ArrayView2<f64>,
        labels: &[L],
        fold: Fold,
    ) -> Result<PreparedFold<L>>
    where
        L: Ord + Clone,
    {
        let TrainSplit {
            features: mut train,
            labels: train_labels,
            mut test_row,
        } = fold.split(features, labels);

        let n_imputed = if self.config.nan_policy.imputes() {
            let mut imputer = Imputer::new(
                self.config.nan_policy,
                self.config.fold_seed(fold.test_index()),
            );
            // The test row draws from observed training rows, before any of
            // them are themselves imputed.
            let test_imputed = imputer.impute_row(&mut test_row, train.view())?;
            imputer.impute_by_class(&mut train, &train_labels)? + usize::from(test_imputed)
        } else {
            0
        };

        let (train, test_row, n_degenerate) = if self.config.normalize {
            let scaler = Standardizer::fit(train.view())?;
            for feature in scaler.degenerate_features() {
                debug!(
                    fold = fold.test_index(),
                    feature, "zero training variance, feature set to 0"
                );
            }
            (
                scaler.transform(train.view()),
                scaler.transform_row(test_row.view()),
                scaler.n_degenerate(),
            )
        } else {
            (train, test_row, 0)
        };

        Ok(PreparedFold {
            train,
            train_labels,
            test_row,
            n_degenerate,
            n_imputed,
        })
    }
}

/// Check the shape and contents of cross-validation inputs. NaN passes
/// when `nan_policy` imputes it; infinities never do.
fn validate_inputs<L>(
    features: ArrayView2<f64>,
    labels: &[L],
    nan_policy: NanPolicy,
) -> Result<()> {
    let (n_rows, n_features) = features.dim();
    if n_rows != labels.len() {
        return Err(ClassifyError::DimensionMismatch {
            n_rows,
            n_labels: labels.len(),
        });
    }
    if n_rows < 2 {
        return Err(ClassifyError::InsufficientData { n_samples: n_rows });
    }
    if n_features == 0 {
        return Err(ClassifyError::NoFeatures);
    }
    let allow_nan = nan_policy.imputes();
    let invalid = |v: f64| v.is_infinite() || (v.is_nan() && !allow_nan);
    if let Some(((row, col), _)) = features.indexed_iter().find(|(_, v)| invalid(**v)) {
        return Err(ClassifyError::NonFiniteFeature { row, col });
    }
    Ok(())
}

/// Leave-one-out Gaussian Naive Bayes with a uniform prior.
///
/// Returns the prediction for every trial and the confusion matrix. See
/// [`LeaveOneOut`] for thread count, prior and smoothing options.
pub fn classify<L>(
    features: ArrayView2<f64>,
    labels: &[L],
    normalize: bool,
) -> Result<(Vec<L>, ConfusionMatrix<L>)>
where
    L: Ord + Clone + Send + Sync,
{
    let config = LeaveOneOutConfig {
        normalize,
        ..Default::default()
    };
    Ok(LeaveOneOut::new(config).classify(features, labels)?.into_parts())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn fold_excludes_its_test_index() {
        let fold = Fold::new(2, 5).unwrap();
        assert_eq!(fold.train_indices().collect::<Vec<_>>(), vec![0, 1, 3, 4]);
        assert_eq!(fold.n_train(), 4);
        assert_eq!(folds(5).len(), 5);
        assert!(folds(5).all(|f| f.train_indices().all(|j| j != f.test_index())));
    }

    #[test]
    fn split_copies_training_rows() {
        let x = array![[0.0, 1.0], [2.0, 3.0], [4.0, 5.0]];
        let y = ['a', 'b', 'c'];
        let split = Fold::new(1, 3).unwrap().split(x.view(), &y);
        assert_eq!(split.features, array![[0.0, 1.0], [4.0, 5.0]]);
        assert_eq!(split.labels, vec!['a', 'c']);
        assert_eq!(split.test_row, array![2.0, 3.0]);
    }

    #[test]
    fn fold_rejects_out_of_range_test_index() {
        assert_eq!(Fold::new(3, 3), None);
        assert_eq!(Fold::new(0, 0), None);
        assert_eq!(Fold::new(2, 3).map(|f| f.test_index()), Some(2));
        assert!(folds(4).eq((0..4).filter_map(|i| Fold::new(i, 4))));
    }

    #[test]
    fn validates_inputs_in_order() {
        let x = array![[1.0], [2.0]];
        assert!(matches!(
            validate_inputs(x.view(), &[0, 1, 2], NanPolicy::Reject),
            Err(ClassifyError::DimensionMismatch {
                n_rows: 2,
                n_labels: 3
            })
        ));

        let one = array![[1.0]];
        assert!(matches!(
            validate_inputs(one.view(), &[0], NanPolicy::Reject),
            Err(ClassifyError::InsufficientData { n_samples: 1 })
        ));

        let empty = Array2::<f64>::zeros((3, 0));
        assert!(matches!(
            validate_inputs(empty.view(), &[0, 1, 2], NanPolicy::Reject),
            Err(ClassifyError::NoFeatures)
        ));

        let nan = array![[1.0, 2.0], [3.0, f64::NAN]];
        assert!(matches!(
            validate_inputs(nan.view(), &[0, 1], NanPolicy::Reject),
            Err(ClassifyError::NonFiniteFeature { row: 1, col: 1 })
        ));
        assert!(validate_inputs(nan.view(), &[0, 1], NanPolicy::Norm).is_ok());

        let inf = array![[1.0, f64::NAN], [f64::NEG_INFINITY, 2.0]];
        assert!(matches!(
            validate_inputs(inf.view(), &[0, 1], NanPolicy::mixup()),
            Err(ClassifyError::NonFiniteFeature { row: 1, col: 0 })
        ));

        assert!(validate_inputs(x.view(), &[0, 1], NanPolicy::Reject).is_ok());
    }

    #[test]
    fn normalization_reports_degenerate_features() {
        // Column 1 is constant everywhere, so it is degenerate in every fold.
        let x = array![[0.0, 3.0], [0.2, 3.0], [0.4, 3.0], [4.0, 3.0], [4.2, 3.0], [4.4, 3.0]];
        let y = [0, 0, 0, 1, 1, 1];
        let config = LeaveOneOutConfig::builder()
            .normalize(true)
            .n_threads(1)
            .build()
            .unwrap();
        let cv = LeaveOneOut::new(config).classify(x.view(), &y).unwrap();
        assert_eq!(cv.degenerate_features(), &[1; 6]);
        assert_eq!(cv.predictions(), &y);
    }

    #[test]
    fn raw_features_report_no_degenerate_features() {
        let x = array![[0.0, 3.0], [0.2, 3.0], [0.4, 3.0], [4.0, 3.0], [4.2, 3.0], [4.4, 3.0]];
        let y = [0, 0, 0, 1, 1, 1];
        let cv = LeaveOneOut::default().classify(x.view(), &y).unwrap();
        assert_eq!(cv.degenerate_features(), &[0; 6]);
        assert_eq!(cv.predictions(), &y);
    }

    fn mixup_config() -> LeaveOneOutConfig {
        LeaveOneOutConfig::builder()
            .nan_policy(NanPolicy::mixup())
            .n_threads(1)
            .build()
            .unwrap()
    }

    #[test]
    fn imputation_draws_only_from_training_rows() {
        // Trial 0 is a far outlier of class 0 and trial 1 is a NaN trial of
        // the same class.
        let x = array![
            [1e6, 1e6],
            [f64::NAN, 1.5],
            [1.0, 1.0],
            [2.0, 2.0],
            [50.0, 50.0],
            [51.0, 51.0],
            [52.0, 52.0]
        ];
        let y = [0, 0, 0, 0, 1, 1, 1];
        let loo = LeaveOneOut::new(mixup_config());

        // Holding out the outlier: trial 1 is rebuilt from trials 2 and 3.
        let fold = Fold::new(0, 7).unwrap();
        let prepared = loo.prepare_fold(x.view(), &y, fold).unwrap();
        assert_eq!(prepared.n_imputed, 1);
        assert!(prepared.train.row(0).iter().all(|v| (1.0..=2.0).contains(v)));

        // The outlier's own row is untouched.
        assert_eq!(prepared.test_row, array![1e6, 1e6]);

        // Holding out the NaN trial: its test row comes from the six
        // training trials, never from itself.
        let fold = Fold::new(1, 7).unwrap();
        let prepared = loo.prepare_fold(x.view(), &y, fold).unwrap();
        assert_eq!(prepared.n_imputed, 1);
        assert!(prepared.test_row.iter().all(|v| (1.0..=1e6).contains(v)));
        assert!(prepared.train.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn held_out_values_never_reach_the_imputed_training_rows() {
        let base = array![
            [0.0, 0.0],
            [f64::NAN, f64::NAN],
            [1.0, 1.0],
            [2.0, 2.0],
            [9.0, 9.0],
            [10.0, 10.0]
        ];
        let y = ['a', 'a', 'a', 'a', 'b', 'b'];
        let loo = LeaveOneOut::new(mixup_config());
        let fold = Fold::new(0, 6).unwrap();

        let mut moved = base.clone();
        moved.row_mut(0).fill(-500.0);

        let a = loo.prepare_fold(base.view(), &y, fold).unwrap();
        let b = loo.prepare_fold(moved.view(), &y, fold).unwrap();
        assert_eq!(a.train, b.train);
    }

    #[test]
    fn imputation_without_enough_complete_rows_fails() {
        let x = array![[f64::NAN], [f64::NAN], [1.0]];
        let err = LeaveOneOut::new(mixup_config())
            .classify(x.view(), &[0, 1, 1])
            .unwrap_err();
        assert!(matches!(err, ClassifyError::NotEnoughObservedRows { needed: 2, .. }));
    }
}
