//! Feature preprocessing applied inside each cross-validation fold.
//!
//! - [`Standardizer`]: z-score with training-partition statistics
//! - [`Imputer`]: replacement of NaN trials from complete training trials

mod impute;
mod standardize;

pub use impute::{DEFAULT_MIXUP_ALPHA, Imputer, NanPolicy, complete_rows, is_missing};
pub use standardize::Standardizer;
