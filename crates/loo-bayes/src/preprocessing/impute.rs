//! Replacement of trials that contain NaN.
//!
//! A trial with any NaN feature is treated as missing as a whole and is
//! replaced by a synthetic trial drawn from complete donor trials. Inside
//! cross-validation only training rows are ever passed as donors.

use std::collections::BTreeMap;

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis, Zip};
use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};
use rand_distr::{Beta, Distribution, StandardNormal};
use serde::{Deserialize, Serialize};

use super::Standardizer;
use crate::error::{ClassifyError, Result};

/// Default Beta shape for [`NanPolicy::Mixup`]; `Beta(1, 1)` is uniform.
pub const DEFAULT_MIXUP_ALPHA: f64 = 1.0;

// =============================================================================
// NanPolicy
// =============================================================================

/// What to do with trials that contain NaN.
///
/// Infinite values are never imputed.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NanPolicy {
    /// NaN is an input error.
    #[default]
    Reject,
    /// Draw every feature from a normal distribution with the mean and
    /// population standard deviation of the donor rows.
    Norm,
    /// `lam * a + (1 - lam) * b` for two distinct donor rows `a` and `b`,
    /// with one `lam ~ Beta(alpha, alpha)` per batch. `alpha <= 0` means
    /// `lam = 1`, a plain copy of `a`.
    Mixup { alpha: f64 },
}

impl NanPolicy {
    /// Mixup with [`DEFAULT_MIXUP_ALPHA`].
    pub fn mixup() -> Self {
        NanPolicy::Mixup {
            alpha: DEFAULT_MIXUP_ALPHA,
        }
    }

    /// Whether NaN trials are imputed rather than rejected.
    pub fn imputes(&self) -> bool {
        !matches!(self, NanPolicy::Reject)
    }

    /// Complete donor rows needed to impute anything.
    pub fn min_donors(&self) -> usize {
        match self {
            NanPolicy::Reject => 0,
            NanPolicy::Norm => 1,
            NanPolicy::Mixup { .. } => 2,
        }
    }
}

/// Whether `row` contains a NaN.
pub fn is_missing(row: ArrayView1<f64>) -> bool {
    row.iter().any(|v| v.is_nan())
}

/// Indices of the rows of `features` without NaN, ascending.
pub fn complete_rows(features: ArrayView2<f64>) -> Vec<usize> {
    features
        .outer_iter()
        .enumerate()
        .filter(|(_, row)| !is_missing(row.view()))
        .map(|(i, _)| i)
        .collect()
}

// =============================================================================
// Imputer
// =============================================================================

/// Seeded NaN-row imputer.
///
/// The same policy, seed and call sequence always produce the same rows.
///
/// # Example
///
/// ```
/// use loo_bayes::preprocessing::{Imputer, NanPolicy};
/// use ndarray::array;
///
/// let mut train = array![[0.0, 1.0], [2.0, 3.0], [f64::NAN, 2.0]];
/// let mut imputer = Imputer::new(NanPolicy::mixup(), 42);
/// assert_eq!(imputer.impute_by_class(&mut train, &[0, 0, 0]).unwrap(), 1);
/// assert!(train.iter().all(|v| v.is_finite()));
/// ```
#[derive(Debug, Clone)]
pub struct Imputer {
    policy: NanPolicy,
    rng: StdRng,
}

impl Imputer {
    pub fn new(policy: NanPolicy, seed: u64) -> Self {
        Self {
            policy,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn policy(&self) -> NanPolicy {
        self.policy
    }

    /// Replace every NaN row of `features` in place. Donors are the complete
    /// rows with the same label, or every complete row when that class has
    /// too few. Returns the number of rows replaced.
    ///
    /// # Errors
    ///
    /// - [`ClassifyError::DimensionMismatch`] if row and label counts differ
    /// - [`ClassifyError::NotEnoughObservedRows`] if even the whole of
    ///   `features` has too few complete rows
    pub fn impute_by_class<L: Ord>(
        &mut self,
        features: &mut Array2<f64>,
        labels: &[L],
    ) -> Result<usize> {
        if features.nrows() != labels.len() {
            return Err(ClassifyError::DimensionMismatch {
                n_rows: features.nrows(),
                n_labels: labels.len(),
            });
        }
        let complete = complete_rows(features.view());
        if complete.len() == features.nrows() {
            return Ok(0);
        }

        // Per class: (complete rows, NaN rows), in ascending label order.
        let mut groups: BTreeMap<&L, (Vec<usize>, Vec<usize>)> = BTreeMap::new();
        let mut next_complete = complete.iter().peekable();
        for (i, label) in labels.iter().enumerate() {
            let (donors, missing) = groups.entry(label).or_default();
            if next_complete.next_if_eq(&&i).is_some() {
                donors.push(i);
            } else {
                missing.push(i);
            }
        }

        let needed = self.policy.min_donors();
        let mut n_imputed = 0;
        for (donors, missing) in groups.values() {
            if missing.is_empty() {
                continue;
            }
            let donors = if donors.len() >= needed { donors } else { &complete };
            let fill = self.draw(features.select(Axis(0), donors).view(), missing.len())?;
            for (&i, row) in missing.iter().zip(fill.rows()) {
                features.row_mut(i).assign(&row);
            }
            n_imputed += missing.len();
        }
        Ok(n_imputed)
    }

    /// Replace `row` if it contains NaN, using the complete rows of `donors`.
    /// Returns whether `row` was replaced.
    ///
    /// # Errors
    ///
    /// [`ClassifyError::NotEnoughObservedRows`] if `donors` has too few
    /// complete rows.
    pub fn impute_row(&mut self, row: &mut Array1<f64>, donors: ArrayView2<f64>) -> Result<bool> {
        if !is_missing(row.view()) {
            return Ok(false);
        }
        let complete = complete_rows(donors);
        let fill = self.draw(donors.select(Axis(0), &complete).view(), 1)?;
        row.assign(&fill.row(0));
        Ok(true)
    }

    /// Draw `n_rows` synthetic rows from `donors`, which must be NaN-free.
    pub fn draw(&mut self, donors: ArrayView2<f64>, n_rows: usize) -> Result<Array2<f64>> {
        let available = donors.nrows();
        let needed = self.policy.min_donors();
        if available < needed {
            return Err(ClassifyError::NotEnoughObservedRows { needed, available });
        }

        match self.policy {
            NanPolicy::Reject => Err(ClassifyError::InvalidConfig(
                "NaN rows cannot be imputed under nan_policy = reject".into(),
            )),
            NanPolicy::Norm => {
                let stats = Standardizer::fit(donors)?;
                let (mean, std) = (stats.mean(), stats.std());
                Ok(Array2::from_shape_fn((n_rows, donors.ncols()), |(_, j)| {
                    let z: f64 = self.rng.sample(StandardNormal);
                    mean[j] + std[j] * z
                }))
            }
            NanPolicy::Mixup { alpha } => {
                let lam = if alpha > 0.0 {
                    Beta::new(alpha, alpha)
                        .map_err(|e| {
                            ClassifyError::InvalidConfig(format!("mixup alpha {alpha}: {e}"))
                        })?
                        .sample(&mut self.rng)
                } else {
                    1.0
                };

                let mut out = Array2::zeros((n_rows, donors.ncols()));
                for row in out.rows_mut() {
                    let pair = index::sample(&mut self.rng, available, 2);
                    Zip::from(row)
                        .and(donors.row(pair.index(0)))
                        .and(donors.row(pair.index(1)))
                        .for_each(|v, &a, &b| *v = lam * a + (1.0 - lam) * b);
                }
                Ok(out)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn complete_rows_skip_any_nan() {
        let x = array![[1.0, 2.0], [f64::NAN, 2.0], [3.0, f64::NAN], [4.0, 5.0]];
        assert_eq!(complete_rows(x.view()), vec![0, 3]);
        assert!(is_missing(x.row(1)));
        assert!(!is_missing(x.row(0)));
    }

    #[test]
    fn norm_follows_donor_statistics() {
        let donors = array![[0.0, 10.0], [2.0, 10.0], [4.0, 10.0], [6.0, 10.0]];
        let mut imputer = Imputer::new(NanPolicy::Norm, 7);
        let drawn = imputer.draw(donors.view(), 4000).unwrap();

        let mean = drawn.mean_axis(Axis(0)).unwrap();
        let std = drawn.std_axis(Axis(0), 0.0);
        assert_abs_diff_eq!(mean[0], 3.0, epsilon = 0.15);
        assert_abs_diff_eq!(std[0], 5.0_f64.sqrt(), epsilon = 0.15);
        // Constant donor feature is reproduced exactly.
        assert!(drawn.column(1).iter().all(|&v| v == 10.0));
    }

    #[test]
    fn mixup_lies_between_two_donors() {
        let donors = array![[0.0, 10.0], [1.0, 20.0]];
        let mut imputer = Imputer::new(NanPolicy::mixup(), 3);
        let drawn = imputer.draw(donors.view(), 5).unwrap();
        for row in drawn.rows() {
            assert!((0.0..=1.0).contains(&row[0]));
            assert_abs_diff_eq!(row[1], 10.0 + 10.0 * row[0], epsilon = 1e-9);
        }
    }

    #[test]
    fn mixup_without_alpha_copies_a_donor() {
        let donors = array![[0.0, 10.0], [1.0, 20.0], [2.0, 30.0]];
        let mut imputer = Imputer::new(NanPolicy::Mixup { alpha: 0.0 }, 3);
        let drawn = imputer.draw(donors.view(), 6).unwrap();
        for row in drawn.rows() {
            assert!(donors.rows().into_iter().any(|d| d == row));
        }
    }

    #[test]
    fn too_few_donors_is_an_error() {
        let one = array![[1.0, 2.0]];
        let err = Imputer::new(NanPolicy::mixup(), 0).draw(one.view(), 1).unwrap_err();
        assert!(matches!(
            err,
            ClassifyError::NotEnoughObservedRows {
                needed: 2,
                available: 1
            }
        ));

        let none = Array2::<f64>::zeros((0, 2));
        let err = Imputer::new(NanPolicy::Norm, 0).draw(none.view(), 1).unwrap_err();
        assert!(matches!(
            err,
            ClassifyError::NotEnoughObservedRows {
                needed: 1,
                available: 0
            }
        ));

        // A single donor is enough for norm: it is copied.
        let drawn = Imputer::new(NanPolicy::Norm, 0).draw(one.view(), 2).unwrap();
        assert_eq!(drawn, array![[1.0, 2.0], [1.0, 2.0]]);
    }

    #[test]
    fn donors_come_from_the_same_class() {
        let mut x = array![
            [0.0, 0.0],
            [1.0, 1.0],
            [f64::NAN, 0.5],
            [100.0, 100.0],
            [101.0, 101.0],
            [f64::NAN, f64::NAN]
        ];
        let y = ['a', 'a', 'a', 'b', 'b', 'b'];
        let mut imputer = Imputer::new(NanPolicy::mixup(), 11);
        assert_eq!(imputer.impute_by_class(&mut x, &y).unwrap(), 2);

        assert!(x.row(2).iter().all(|v| (0.0..=1.0).contains(v)));
        assert!(x.row(5).iter().all(|v| (100.0..=101.0).contains(v)));
    }

    #[test]
    fn sparse_class_borrows_from_every_complete_row() {
        let mut x = array![[0.0], [2.0], [f64::NAN], [f64::NAN]];
        let y = [0, 0, 1, 1];
        let mut imputer = Imputer::new(NanPolicy::mixup(), 5);
        imputer.impute_by_class(&mut x, &y).unwrap();
        assert!(x.column(0).iter().all(|v| (0.0..=2.0).contains(v)));
    }

    #[test]
    fn complete_input_is_untouched() {
        let mut x = array![[1.0], [2.0]];
        let mut imputer = Imputer::new(NanPolicy::Norm, 1);
        assert_eq!(imputer.impute_by_class(&mut x, &[0, 1]).unwrap(), 0);
        assert_eq!(x, array![[1.0], [2.0]]);

        let mut row = array![3.0];
        assert!(!imputer.impute_row(&mut row, x.view()).unwrap());
        assert_eq!(row, array![3.0]);
    }

    #[test]
    fn impute_row_ignores_incomplete_donors() {
        let donors = array![[1.0, 1.0], [f64::NAN, 50.0], [3.0, 3.0]];
        let mut row = array![f64::NAN, 0.0];
        let mut imputer = Imputer::new(NanPolicy::mixup(), 9);
        assert!(imputer.impute_row(&mut row, donors.view()).unwrap());
        assert!(row.iter().all(|v| (1.0..=3.0).contains(v)));
    }

    #[test]
    fn same_seed_same_rows() {
        let donors = array![[0.0, 1.0], [2.0, 5.0], [4.0, -1.0]];
        for policy in [NanPolicy::Norm, NanPolicy::mixup()] {
            let a = Imputer::new(policy, 42).draw(donors.view(), 3).unwrap();
            let b = Imputer::new(policy, 42).draw(donors.view(), 3).unwrap();
            let c = Imputer::new(policy, 43).draw(donors.view(), 3).unwrap();
            assert_eq!(a, b);
            assert_ne!(a, c);
        }
    }
}
