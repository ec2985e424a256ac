//! Callbacks answered from a materialized pairwise matrix.
//!
//! Entry `(i, j)` of the cached matrix answers the callback for observations
//! `i` and `j`, so the cache must be built over the observation indices `0..N`.

use super::{distance_matrix, kernel_matrix, DistanceCallback, KernelCallback};
use crate::error::{EmbeddingError, Result};
use ndarray::Array2;

fn check_square(matrix: &Array2<f64>) -> Result<()> {
    if matrix.nrows() != matrix.ncols() {
        return Err(EmbeddingError::DataFormat(format!(
            "precomputed matrix must be square, got {}x{}",
            matrix.nrows(),
            matrix.ncols()
        )));
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct PrecomputedKernel {
    matrix: Array2<f64>,
}

impl PrecomputedKernel {
    pub fn new(matrix: Array2<f64>) -> Result<Self> {
        check_square(&matrix)?;
        Ok(PrecomputedKernel { matrix })
    }

    /// Evaluates `kernel` once for every pair of the observations `0..n`.
    pub fn materialize<K: KernelCallback>(n: usize, kernel: &K) -> Result<Self> {
        let indices: Vec<usize> = (0..n).collect();
        Self::new(kernel_matrix(&indices, kernel)?)
    }

    pub fn matrix(&self) -> &Array2<f64> {
        &self.matrix
    }
}

impl KernelCallback for PrecomputedKernel {
    fn kernel(&self, a: usize, b: usize) -> f64 {
        self.matrix[[a, b]]
    }
}

#[derive(Debug, Clone)]
pub struct PrecomputedDistance {
    matrix: Array2<f64>,
}

impl PrecomputedDistance {
    pub fn new(matrix: Array2<f64>) -> Result<Self> {
        check_square(&matrix)?;
        Ok(PrecomputedDistance { matrix })
    }

    pub fn materialize<D: DistanceCallback>(n: usize, distance: &D) -> Result<Self> {
        let indices: Vec<usize> = (0..n).collect();
        Self::new(distance_matrix(&indices, distance)?)
    }

    pub fn matrix(&self) -> &Array2<f64> {
        &self.matrix
    }
}

impl DistanceCallback for PrecomputedDistance {
    fn distance(&self, a: usize, b: usize) -> f64 {
        self.matrix[[a, b]]
    }
}
