//! Evaluation of cross-validated predictions.
//!
//! - [`ConfusionMatrix`]: `(true, predicted)` count table with accuracy,
//!   per-class recall/precision and row normalization.

mod confusion;

pub use confusion::ConfusionMatrix;
