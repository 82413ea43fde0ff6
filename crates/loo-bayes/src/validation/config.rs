//! Leave-one-out configuration with builder pattern.
//!
//! # Example
//!
//! ```
//! use loo_bayes::validation::LeaveOneOutConfig;
//! use loo_bayes::model::ClassPrior;
//! use loo_bayes::preprocessing::NanPolicy;
//!
//! // All defaults: raw features, uniform prior, all cores
//! let config = LeaveOneOutConfig::builder().build().unwrap();
//! assert!(!config.normalize);
//!
//! let config = LeaveOneOutConfig::builder()
//!     .normalize(true)
//!     .prior(ClassPrior::Uniform)
//!     .n_threads(1)
//!     .build()
//!     .unwrap();
//!
//! // Impute NaN trials per fold instead of rejecting them
//! let config = LeaveOneOutConfig::builder()
//!     .nan_policy(NanPolicy::mixup())
//!     .seed(7)
//!     .build()
//!     .unwrap();
//! assert!(config.nan_policy.imputes());
//! ```

use bon::Builder;
use serde::{Deserialize, Serialize};

use crate::error::{ClassifyError, Result};
use crate::model::{ClassPrior, DEFAULT_VAR_SMOOTHING, GaussianNb};
use crate::preprocessing::NanPolicy;

/// Default seed for NaN imputation.
pub const DEFAULT_SEED: u64 = 42;

/// Configuration for [`LeaveOneOut`](super::LeaveOneOut).
#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
#[builder(
    derive(Clone, Debug),
    finish_fn(vis = "", name = __build_internal)
)]
pub struct LeaveOneOutConfig {
    /// Z-score features per fold using training-partition statistics. Default: `false`.
    #[builder(default)]
    pub normalize: bool,

    /// Class prior of the Gaussian Naive Bayes model. Default: `Uniform`.
    #[builder(default)]
    pub prior: ClassPrior,

    /// Fraction of the largest feature variance added to every class variance.
    /// Default: `1e-9`.
    #[builder(default = DEFAULT_VAR_SMOOTHING)]
    pub var_smoothing: f64,

    /// Number of threads. `0` = all cores, `1` = sequential. Default: `0`.
    #[builder(default)]
    pub n_threads: usize,

    /// Handling of trials with NaN features. Default: `Reject`.
    #[builder(default)]
    #[serde(default)]
    pub nan_policy: NanPolicy,

    /// Seed for imputation. Each fold derives its own generator from it, so
    /// results do not depend on thread count. Default: `42`.
    #[builder(default = DEFAULT_SEED)]
    #[serde(default = "default_seed")]
    pub seed: u64,
}

fn default_seed() -> u64 {
    DEFAULT_SEED
}

/// Custom finishing function that validates the config.
impl<S: leave_one_out_config_builder::IsComplete> LeaveOneOutConfigBuilder<S> {
    /// Build and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifyError::InvalidConfig`] if `var_smoothing` is negative
    /// or not finite, or if a mixup `alpha` is not finite.
    pub fn build(self) -> Result<LeaveOneOutConfig> {
        let config = self.__build_internal();
        config.validate()?;
        Ok(config)
    }
}

impl Default for LeaveOneOutConfig {
    fn default() -> Self {
        Self {
            normalize: false,
            prior: ClassPrior::Uniform,
            var_smoothing: DEFAULT_VAR_SMOOTHING,
            n_threads: 0,
            nan_policy: NanPolicy::Reject,
            seed: DEFAULT_SEED,
        }
    }
}

impl LeaveOneOutConfig {
    pub(crate) fn validate(&self) -> Result<()> {
        if !self.var_smoothing.is_finite() || self.var_smoothing < 0.0 {
            return Err(ClassifyError::InvalidConfig(format!(
                "var_smoothing must be finite and non-negative, got {}",
                self.var_smoothing
            )));
        }
        if let NanPolicy::Mixup { alpha } = self.nan_policy {
            if !alpha.is_finite() {
                return Err(ClassifyError::InvalidConfig(format!(
                    "mixup alpha must be finite, got {alpha}"
                )));
            }
        }
        Ok(())
    }

    /// Seed of the imputer for the fold holding out `test_index`.
    pub(crate) fn fold_seed(&self, test_index: usize) -> u64 {
        self.seed ^ (test_index as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
    }

    /// The Gaussian Naive Bayes model this configuration describes.
    pub fn classifier(&self) -> GaussianNb {
        GaussianNb::new(self.prior, self.var_smoothing)
    }
}
