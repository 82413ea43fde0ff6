//! Cross-validation of classifiers.
//!
//! - [`LeaveOneOut`]: hold out each trial once, predict it from the rest
//! - [`LeaveOneOutConfig`]: normalization, prior, smoothing, NaN imputation
//!   and threading
//! - [`Fold`], [`folds`]: the splits themselves
//! - [`classify`]: one-call form with default settings

mod config;
mod leave_one_out;

pub use config::{DEFAULT_SEED, LeaveOneOutConfig, LeaveOneOutConfigBuilder};
pub use leave_one_out::{CrossValidation, Fold, LeaveOneOut, TrainSplit, classify, folds};
