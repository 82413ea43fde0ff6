//! Z-score standardization fitted on a training partition.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis, Zip};

use crate::error::{ClassifyError, Result};
use crate::utils::{max_abs, pow2_scale};

/// Per-feature z-score scaler.
///
/// Statistics are the mean and the **population** standard deviation
/// (divisor `n`) of each feature column of the data passed to [`fit`](Self::fit).
///
/// A feature whose standard deviation is exactly zero cannot be scaled.
/// Such a feature is mapped to `0.0` in every transformed row, training and
/// test alike, so transformed values are always finite.
#[derive(Debug, Clone, PartialEq)]
pub struct Standardizer {
    mean: Array1<f64>,
    std: Array1<f64>,
}

impl Standardizer {
    /// Compute statistics from `features` (shape `[n_samples, n_features]`).
    ///
    /// Each column is divided by a power of two near its largest magnitude
    /// before the variance is taken, so columns with values near `f64::MAX`
    /// still get a finite standard deviation.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifyError::EmptyTrainingSet`] if `features` has no rows.
    pub fn fit(features: ArrayView2<f64>) -> Result<Self> {
        if features.nrows() == 0 {
            return Err(ClassifyError::EmptyTrainingSet);
        }
        let scale = features.map_axis(Axis(0), |col| pow2_scale(max_abs(col)));
        let scaled = &features / &scale;

        let mean = scaled
            .mean_axis(Axis(0))
            .ok_or(ClassifyError::EmptyTrainingSet)?
            * &scale;
        let std = scaled.var_axis(Axis(0), 0.0).mapv_into(f64::sqrt) * &scale;
        Ok(Self { mean, std })
    }

    /// Per-feature means.
    pub fn mean(&self) -> ArrayView1<'_, f64> {
        self.mean.view()
    }

    /// Per-feature population standard deviations.
    pub fn std(&self) -> ArrayView1<'_, f64> {
        self.std.view()
    }

    /// Number of features the scaler was fitted on.
    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    /// Indices of features with zero standard deviation.
    pub fn degenerate_features(&self) -> impl Iterator<Item = usize> + '_ {
        self.std
            .iter()
            .enumerate()
            .filter(|&(_, &s)| s == 0.0)
            .map(|(j, _)| j)
    }

    /// Count of features with zero standard deviation.
    pub fn n_degenerate(&self) -> usize {
        self.degenerate_features().count()
    }

    /// Standardize every row of `features`.
    ///
    /// # Panics
    ///
    /// Panics if `features` does not have [`n_features`](Self::n_features) columns.
    pub fn transform(&self, features: ArrayView2<f64>) -> Array2<f64> {
        assert_eq!(
            features.ncols(),
            self.n_features(),
            "standardizer fitted on {} features, got {}",
            self.n_features(),
            features.ncols()
        );
        let mut out = features.to_owned();
        for mut row in out.rows_mut() {
            self.scale_in_place(row.view_mut());
        }
        out
    }

    /// Standardize a single row.
    ///
    /// # Panics
    ///
    /// Panics if `row` does not have [`n_features`](Self::n_features) values.
    pub fn transform_row(&self, row: ArrayView1<f64>) -> Array1<f64> {
        assert_eq!(
            row.len(),
            self.n_features(),
            "standardizer fitted on {} features, got {}",
            self.n_features(),
            row.len()
        );
        let mut out = row.to_owned();
        self.scale_in_place(out.view_mut());
        out
    }

    #[inline]
    fn scale_in_place(&self, row: ndarray::ArrayViewMut1<f64>) {
        Zip::from(row)
            .and(&self.mean)
            .and(&self.std)
            .for_each(|v, &m, &s| {
                *v = if s == 0.0 { 0.0 } else { (*v - m) / s };
            });
    }
}
