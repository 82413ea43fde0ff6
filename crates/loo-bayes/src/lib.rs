//! loo-bayes: leave-one-out cross-validated Gaussian Naive Bayes decoding.
//!
//! Decodes categorical labels (for example which finger flexed) from
//! per-trial signal-power features. Every trial is predicted by a model that
//! was fitted, and optionally z-score normalized, without it.
//!
//! # Key Types
//!
//! - [`LeaveOneOut`] / [`LeaveOneOutConfig`] - Cross-validation loop and its settings
//! - [`GaussianNb`] - Gaussian Naive Bayes with a uniform or empirical class prior
//! - [`Standardizer`] - Per-fold z-score normalization
//! - [`NanPolicy`] / [`Imputer`] - Optional per-fold replacement of NaN trials
//! - [`ConfusionMatrix`] - True against predicted label counts
//!
//! # Example
//!
//! ```
//! use loo_bayes::classify;
//! use ndarray::array;
//!
//! let x = array![[1.0, 10.0], [1.0, 11.0], [5.0, 10.0], [5.0, 11.0]];
//! let y = [0, 0, 1, 1];
//!
//! let (predictions, confusion) = classify(x.view(), &y, false).unwrap();
//! assert_eq!(predictions, vec![0, 0, 1, 1]);
//! assert_eq!(confusion.total(), 4);
//! ```

pub mod error;
pub mod metrics;
pub mod model;
pub mod preprocessing;
pub mod testing;
pub mod utils;
pub mod validation;

// =============================================================================
// Convenience Re-exports
// =============================================================================

pub use error::{ClassifyError, Result};
pub use metrics::ConfusionMatrix;
pub use model::{ClassPrior, Classifier, FittedClassifier, GaussianNb, GaussianNbModel};
pub use preprocessing::{Imputer, NanPolicy, Standardizer};
pub use utils::{Parallelism, run_with_threads};
pub use validation::{CrossValidation, Fold, LeaveOneOut, LeaveOneOutConfig, classify};
