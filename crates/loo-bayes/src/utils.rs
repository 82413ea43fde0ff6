//! Parallelism configuration, thread pool setup and numeric helpers.
//!
//! Cross-validation folds are independent, so the fold loop is written once
//! against [`Parallelism`] and runs either on the current thread or on a
//! `rayon` pool.

use ndarray::ArrayView1;
use rayon::prelude::*;

use crate::error::Result;

// =============================================================================
// Parallelism Configuration
// =============================================================================

/// Whether parallel execution is allowed.
///
/// When `Parallel`, components may use `rayon` parallel iterators.
/// When `Sequential`, components must iterate on the calling thread.
///
/// The thread pool itself is set up by [`run_with_threads`]; components only
/// respect this flag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Parallelism {
    Sequential,
    Parallel,
}

impl Parallelism {
    /// Create from thread count semantics.
    ///
    /// - 0 = auto (parallel if rayon pool has multiple threads, sequential otherwise)
    /// - 1 = sequential
    /// - >1 = parallel
    #[inline]
    pub fn from_threads(n_threads: usize) -> Self {
        if n_threads == 1 || (n_threads == 0 && rayon::current_num_threads() == 1) {
            Parallelism::Sequential
        } else {
            Parallelism::Parallel
        }
    }

    /// Returns `true` if parallel execution is allowed.
    #[inline]
    pub fn is_parallel(self) -> bool {
        matches!(self, Parallelism::Parallel)
    }

    /// Map over `iter`, preserving input order in the output.
    #[inline]
    pub fn maybe_par_map<T, B, I, F>(self, iter: I, f: F) -> Vec<B>
    where
        T: Send,
        B: Send,
        I: IntoIterator<Item = T> + IntoParallelIterator<Item = T>,
        F: Fn(T) -> B + Sync + Send,
    {
        if self.is_parallel() {
            iter.into_par_iter().map(f).collect()
        } else {
            iter.into_iter().map(f).collect()
        }
    }
}

// =============================================================================
// Thread Pool Setup
// =============================================================================

/// Run a closure with the appropriate thread pool.
///
/// Thread count semantics:
/// - `0` = auto (use all available cores)
/// - `1` = sequential (no thread pool)
/// - `n > 1` = use exactly `n` threads
///
/// # Errors
///
/// Returns [`ClassifyError::ThreadPool`](crate::ClassifyError::ThreadPool)
/// if the pool cannot be created.
#[inline]
pub fn run_with_threads<T: Send>(
    n_threads: usize,
    f: impl FnOnce(Parallelism) -> T + Send,
) -> Result<T> {
    match Parallelism::from_threads(n_threads) {
        Parallelism::Sequential => Ok(f(Parallelism::Sequential)),
        Parallelism::Parallel => {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(n_threads)
                .build()?;
            Ok(pool.install(|| f(Parallelism::Parallel)))
        }
    }
}

// =============================================================================
// Numeric Scaling
// =============================================================================

/// Largest absolute value in `values`, ignoring NaN. Zero when empty.
#[inline]
pub fn max_abs(values: ArrayView1<f64>) -> f64 {
    values.fold(0.0_f64, |acc, &v| acc.max(v.abs()))
}

/// Power of two at or just below `magnitude`.
///
/// Dividing by a power of two is exact, so statistics computed on
/// `values / pow2_scale(max_abs(values))` and multiplied back agree bit for
/// bit with the unscaled computation, while squares of the scaled values
/// stay far from overflow. Returns `1.0` for zero or non-finite input.
#[inline]
pub fn pow2_scale(magnitude: f64) -> f64 {
    if magnitude == 0.0 || !magnitude.is_finite() {
        return 1.0;
    }
    let exp = magnitude.log2().floor().clamp(-1022.0, 1023.0) as i32;
    2f64.powi(exp)
}
