//! # Data access callbacks
//!
//! The engine never touches observation values directly. It only threads
//! observation indices through the pipeline and asks one of three narrow
//! capabilities for values:
//!
//! - [`KernelCallback`]: symmetric similarity between two observations
//! - [`DistanceCallback`]: symmetric, non-negative dissimilarity, zero on the diagonal
//! - [`FeatureVectorCallback`]: the original D-dimensional vector of one observation
//!
//! Any backend satisfies them: a dense in-memory matrix ([`dense`]), a
//! precomputed pairwise cache ([`precomputed`]), or a plain closure.

use crate::error::{EmbeddingError, Result};
use ndarray::{Array1, Array2};
use rayon::prelude::*;

pub mod dense;
pub mod precomputed;

pub use dense::{DenseFeatures, EuclideanDistance, GaussianKernel, LinearKernel};
pub use precomputed::{PrecomputedDistance, PrecomputedKernel};

pub trait KernelCallback: Sync {
    fn kernel(&self, a: usize, b: usize) -> f64;
}

pub trait DistanceCallback: Sync {
    fn distance(&self, a: usize, b: usize) -> f64;
}

pub trait FeatureVectorCallback: Sync {
    fn feature_vector(&self, index: usize) -> Array1<f64>;
}

impl<F> KernelCallback for F
where
    F: Fn(usize, usize) -> f64 + Sync,
{
    fn kernel(&self, a: usize, b: usize) -> f64 {
        self(a, b)
    }
}

impl<F> DistanceCallback for F
where
    F: Fn(usize, usize) -> f64 + Sync,
{
    fn distance(&self, a: usize, b: usize) -> f64 {
        self(a, b)
    }
}

impl<F> FeatureVectorCallback for F
where
    F: Fn(usize) -> Array1<f64> + Sync,
{
    fn feature_vector(&self, index: usize) -> Array1<f64> {
        self(index)
    }
}

/// The three capabilities handed to the engine for one embedding call.
pub struct Callbacks<'a, K, D, F> {
    pub kernel: &'a K,
    pub distance: &'a D,
    pub features: &'a F,
}

impl<'a, K, D, F> Callbacks<'a, K, D, F>
where
    K: KernelCallback,
    D: DistanceCallback,
    F: FeatureVectorCallback,
{
    pub fn new(kernel: &'a K, distance: &'a D, features: &'a F) -> Self {
        Callbacks {
            kernel,
            distance,
            features,
        }
    }
}

/// Evaluates `callback(rows[r], cols[c])` for every cell of the `rows × cols` grid.
///
/// Every ordered pair is evaluated, including the diagonal, so asymmetric callbacks
/// are reproduced faithfully. Rows are evaluated in parallel; each cell is written
/// to its own slot so the result does not depend on scheduling.
pub fn evaluate_grid<T, C>(rows: &[usize], cols: &[usize], callback: C) -> Result<Array2<T>>
where
    T: Send,
    C: Fn(usize, usize) -> T + Sync,
{
    let callback = &callback;
    let values: Vec<T> = rows
        .par_iter()
        .flat_map_iter(|&i| cols.iter().map(move |&j| callback(i, j)))
        .collect();

    Array2::from_shape_vec((rows.len(), cols.len()), values)
        .map_err(|e| EmbeddingError::dimensionality(format!("failed to shape pairwise matrix: {}", e)))
}

/// Dense N×N matrix of `callback` over the data set, in data set order.
pub fn matrix_from_callback<C>(indices: &[usize], callback: C) -> Result<Array2<f64>>
where
    C: Fn(usize, usize) -> f64 + Sync,
{
    evaluate_grid(indices, indices, callback)
}

pub fn kernel_matrix<K: KernelCallback>(indices: &[usize], kernel: &K) -> Result<Array2<f64>> {
    matrix_from_callback(indices, |a, b| kernel.kernel(a, b))
}

pub fn distance_matrix<D: DistanceCallback>(indices: &[usize], distance: &D) -> Result<Array2<f64>> {
    matrix_from_callback(indices, |a, b| distance.distance(a, b))
}

/// Gathers feature vectors into a D×N matrix, column j holding observation `indices[j]`.
pub fn feature_matrix<F: FeatureVectorCallback>(
    indices: &[usize],
    features: &F,
    dimension: usize,
) -> Result<Array2<f64>> {
    let vectors: Vec<Array1<f64>> = indices
        .par_iter()
        .map(|&index| features.feature_vector(index))
        .collect();

    let mut matrix = Array2::zeros((dimension, indices.len()));
    for (j, vector) in vectors.into_iter().enumerate() {
        if vector.len() != dimension {
            return Err(EmbeddingError::DataFormat(format!(
                "feature vector of observation {} has dimension {}, expected {}",
                indices[j],
                vector.len(),
                dimension
            )));
        }
        matrix.column_mut(j).assign(&vector);
    }
    Ok(matrix)
}
