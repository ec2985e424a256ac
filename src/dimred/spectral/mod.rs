//! # Graph spectral embeddings
//!
//! Laplacian Eigenmaps and Locality Preserving Projections share a heat kernel
//! weighted neighbor graph; the Diffusion Map works on the Gaussian kernel over
//! all pairs.

use super::{eigenvector_coordinates, project, with_dense_fallback, Embedding};
use crate::callbacks::{matrix_from_callback, DistanceCallback};
use crate::eigen::{eigen_decompose, generalized_eigen_decompose, EigenRequest, EigenSettings};
use crate::error::Result;
use crate::neighbors::Neighbors;
use crate::progress::ProgressLogger;
use crate::utils::symmetrize;
use ndarray::{Array1, Array2, Axis};

/// Symmetric weight matrix `W[p, q] = exp(−d(p, q)² / width)` over the edges of
/// the neighbor graph, zero elsewhere.
pub fn heat_kernel_weights<D: DistanceCallback>(
    indices: &[usize],
    distance: &D,
    neighbors: &Neighbors,
    width: f64,
) -> Array2<f64> {
    let n = indices.len();
    let mut weights = Array2::zeros((n, n));
    for (p, list) in neighbors.iter().enumerate() {
        for &q in list {
            let d = distance.distance(indices[p], indices[q]);
            let w = (-d * d / width).exp();
            weights[[p, q]] = w;
            weights[[q, p]] = w;
        }
    }
    weights
}

fn degrees(weights: &Array2<f64>) -> Array1<f64> {
    weights.sum_axis(Axis(1))
}

/// Graph Laplacian `L = D − W` and the degree matrix `D`.
fn laplacian(weights: &Array2<f64>) -> (Array2<f64>, Array2<f64>) {
    let degree = Array2::from_diag(&degrees(weights));
    (&degree - weights, degree)
}

/// Laplacian Eigenmaps: the bottom non-trivial solutions of `L y = λ D y`.
///
/// The constant vector solves the problem with `λ = 0` and is skipped. Falls back
/// to the dense solver when the iterative solver does not converge.
pub fn laplacian_eigenmaps(
    weights: &Array2<f64>,
    target_dimension: usize,
    settings: &EigenSettings,
    progress: &dyn ProgressLogger,
) -> Result<Embedding> {
    let (laplacian, degree) = laplacian(weights);
    let request = EigenRequest::smallest(target_dimension).skip(1);

    let decomposition = with_dense_fallback(settings, progress, |settings| {
        generalized_eigen_decompose(&laplacian, &degree, request, settings)
    })?;
    Ok(Embedding::from_decomposition(eigenvector_coordinates(&decomposition), decomposition))
}

/// Locality Preserving Projections: the linear projection `P` minimizing
/// `Pᵀ X L Xᵀ P` subject to `Pᵀ X D Xᵀ P = I`, applied to the centered features.
pub fn locality_preserving_projections(
    features: &Array2<f64>,
    weights: &Array2<f64>,
    target_dimension: usize,
    settings: &EigenSettings,
) -> Result<Embedding> {
    let (laplacian, degree) = laplacian(weights);

    let mut lhs = features.dot(&laplacian).dot(&features.t());
    let mut rhs = features.dot(&degree).dot(&features.t());
    symmetrize(&mut lhs);
    symmetrize(&mut rhs);

    let decomposition = generalized_eigen_decompose(&lhs, &rhs, EigenRequest::smallest(target_dimension), settings)?;
    Ok(Embedding::from_decomposition(project(features, &decomposition), decomposition))
}

/// Diffusion Map.
///
/// The Gaussian kernel `K = exp(−d² / width)` over all pairs is turned into the
/// symmetric conjugate `S = D^{-1/2} K D^{-1/2}` of the Markov matrix `D⁻¹ K`, and
/// `S` is raised to `timesteps`. The leading eigenvector belongs to the stationary
/// distribution and is skipped; the remaining eigenvectors `y` give the diffusion
/// coordinates `ψ = λ · D^{-1/2} y`.
pub fn diffusion_map<D: DistanceCallback>(
    indices: &[usize],
    distance: &D,
    width: f64,
    timesteps: usize,
    target_dimension: usize,
    settings: &EigenSettings,
) -> Result<Embedding> {
    let kernel = matrix_from_callback(indices, |a, b| {
        let d = distance.distance(a, b);
        (-d * d / width).exp()
    })?;
    let inv_sqrt_degree = degrees(&kernel).mapv(|d| if d > 0.0 { 1.0 / d.sqrt() } else { 0.0 });

    let mut conjugate = kernel;
    for ((i, j), value) in conjugate.indexed_iter_mut() {
        *value *= inv_sqrt_degree[i] * inv_sqrt_degree[j];
    }
    symmetrize(&mut conjugate);

    let mut diffused = conjugate.clone();
    for _ in 1..timesteps {
        diffused = diffused.dot(&conjugate);
    }
    symmetrize(&mut diffused);
    log::debug!("Diffusion operator raised to {} timesteps", timesteps);

    let decomposition = eigen_decompose(&diffused, EigenRequest::largest(target_dimension).skip(1), settings)?;
    let (n, d) = decomposition.vectors.dim();
    let coordinates = Array2::from_shape_fn((d, n), |(j, i)| {
        decomposition.values[j] * inv_sqrt_degree[i] * decomposition.vectors[[i, j]]
    });
    Ok(Embedding::from_decomposition(coordinates, decomposition))
}
