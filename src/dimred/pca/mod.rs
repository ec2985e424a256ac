//! # Principal Component Analysis
//!
//! Linear PCA over the gathered feature matrix and its kernel counterpart over a
//! kernel callback.

use super::{project, scaled_coordinates, Embedding};
use crate::callbacks::{kernel_matrix, KernelCallback};
use crate::eigen::{eigen_decompose, EigenRequest, EigenSettings};
use crate::error::Result;
use crate::utils::{double_center, symmetrize};
use ndarray::Array2;

/// Principal component analysis of centered features.
///
/// # Parameters
/// - `features`: D × N matrix with the mean observation already subtracted
/// - `target_dimension`: number of principal axes to project onto
///
/// The sample covariance `X Xᵀ / (N − 1)` is decomposed; the eigenvalues of the
/// result are the variances along the principal axes, and the coordinates are
/// the projections `Pᵀ X`.
pub fn pca(features: &Array2<f64>, target_dimension: usize, settings: &EigenSettings) -> Result<Embedding> {
    let n = features.ncols();
    let mut covariance = features.dot(&features.t()) / (n.max(2) - 1) as f64;
    symmetrize(&mut covariance);
    log::debug!("Covariance matrix of {} features", covariance.nrows());

    let decomposition = eigen_decompose(&covariance, EigenRequest::largest(target_dimension), settings)?;
    Ok(Embedding::from_decomposition(project(features, &decomposition), decomposition))
}

/// Kernel principal component analysis.
///
/// The kernel matrix over all pairs is centered in feature space (`J K J`) and its
/// top eigenvectors are scaled by the square roots of their eigenvalues.
pub fn kernel_pca<K: KernelCallback>(
    indices: &[usize],
    kernel: &K,
    target_dimension: usize,
    settings: &EigenSettings,
) -> Result<Embedding> {
    let mut gram = kernel_matrix(indices, kernel)?;
    double_center(&mut gram);
    symmetrize(&mut gram);

    let decomposition = eigen_decompose(&gram, EigenRequest::largest(target_dimension), settings)?;
    Ok(Embedding::from_decomposition(scaled_coordinates(&decomposition), decomposition))
}
