//! Synthetic trial data for tests, examples and benchmarks.

use ndarray::Array2;
use rand::prelude::*;

/// Generate clustered trials: `n_per_class` trials for each of `n_classes`
/// classes, `n_features` features each.
///
/// Class `c` is centred at `c * separation` on every feature, with uniform
/// noise in `[-1, 1]` on top. Rows are interleaved by class (`0, 1, ..., 0, 1, ...`).
///
/// Returns `(features, labels)` with features of shape
/// `[n_classes * n_per_class, n_features]`.
pub fn clustered_trials(
    n_classes: usize,
    n_per_class: usize,
    n_features: usize,
    separation: f64,
    seed: u64,
) -> (Array2<f64>, Vec<u32>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let n_trials = n_classes * n_per_class;

    let labels: Vec<u32> = (0..n_trials).map(|i| (i % n_classes) as u32).collect();
    let features = Array2::from_shape_fn((n_trials, n_features), |(i, _)| {
        let centre = labels[i] as f64 * separation;
        centre + rng.r#gen::<f64>() * 2.0 - 1.0
    });

    (features, labels)
}

/// Apply `x * scale + shift` to column `j` for every `(j, scale, shift)`.
pub fn affine_columns(features: &Array2<f64>, transforms: &[(f64, f64)]) -> Array2<f64> {
    assert_eq!(features.ncols(), transforms.len());
    let mut out = features.clone();
    for (mut col, &(scale, shift)) in out.columns_mut().into_iter().zip(transforms) {
        col.mapv_inplace(|v| v * scale + shift);
    }
    out
}

/// Copy of `features` with every value of the trials in `rows` set to NaN.
pub fn with_missing_trials(features: &Array2<f64>, rows: &[usize]) -> Array2<f64> {
    let mut out = features.clone();
    for &i in rows {
        out.row_mut(i).fill(f64::NAN);
    }
    out
}
