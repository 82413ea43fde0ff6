//! Error types for cross-validated classification.

/// Errors that can occur when fitting a classifier or running cross-validation.
///
/// Zero-variance features under normalization are not errors: they are
/// handled per fold (see [`Standardizer`](crate::preprocessing::Standardizer))
/// and reported through
/// [`CrossValidation::degenerate_features`](crate::validation::CrossValidation::degenerate_features).
#[derive(Debug, thiserror::Error)]
pub enum ClassifyError {
    #[error("leave-one-out needs at least 2 samples, got {n_samples}")]
    InsufficientData { n_samples: usize },

    #[error("feature matrix has {n_rows} rows but {n_labels} labels were given")]
    DimensionMismatch { n_rows: usize, n_labels: usize },

    #[error("feature matrix has no columns")]
    NoFeatures,

    #[error("non-finite feature value at row {row}, column {col}")]
    NonFiniteFeature { row: usize, col: usize },

    #[error("imputation needs at least {needed} rows without NaN, found {available}")]
    NotEnoughObservedRows { needed: usize, available: usize },

    #[error("cannot fit on an empty training set")]
    EmptyTrainingSet,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to build thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ClassifyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_sizes() {
        let err = ClassifyError::DimensionMismatch {
            n_rows: 4,
            n_labels: 3,
        };
        assert_eq!(
            err.to_string(),
            "feature matrix has 4 rows but 3 labels were given"
        );

        let err = ClassifyError::InsufficientData { n_samples: 1 };
        assert!(err.to_string().contains("got 1"));
    }
}
