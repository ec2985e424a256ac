//! # Local alignment embeddings
//!
//! Kernel Locally Linear Embedding and Kernel Local Tangent Space Alignment, and
//! their linear projections Neighborhood Preserving Embedding and Linear Local
//! Tangent Space Alignment.
//!
//! Each neighborhood contributes a small dense block to a sparse alignment
//! matrix `M`; the blocks are computed in parallel and summed as COO triplets.
//! The nonlinear variants take the bottom non-trivial eigenvectors of `M`, the
//! linear variants solve `X M Xᵀ p = λ X Xᵀ p` for a projection.

use super::{eigenvector_coordinates, project, with_dense_fallback, Embedding};
use crate::callbacks::{evaluate_grid, KernelCallback};
use crate::config::ParameterKey;
use crate::eigen::{eigen_decompose, generalized_eigen_decompose, sorted_symmetric_eigen, EigenRequest, EigenSettings, Spectrum};
use crate::error::{EmbeddingError, Result};
use crate::neighbors::Neighbors;
use crate::progress::ProgressLogger;
use crate::utils::{double_center, symmetrize, to_array2, to_dmatrix};
use nalgebra::{DMatrix, DVector};
use nalgebra_sparse::convert::serial::convert_coo_dense;
use nalgebra_sparse::CooMatrix;
use ndarray::Array2;
use rayon::prelude::*;

const RECONSTRUCTION_REGULARIZATION: f64 = 1e-3;

/// Sums per-neighborhood blocks into the dense alignment matrix.
fn assemble(n: usize, blocks: Vec<(Vec<usize>, DMatrix<f64>)>) -> Array2<f64> {
    let mut coo = CooMatrix::new(n, n);
    for (positions, block) in blocks {
        for (a, &row) in positions.iter().enumerate() {
            for (b, &col) in positions.iter().enumerate() {
                let value = block[(a, b)];
                if value != 0.0 {
                    coo.push(row, col, value);
                }
            }
        }
    }
    log::debug!("Assembled alignment matrix from {} triplets", coo.nnz());

    let mut alignment = to_array2(&convert_coo_dense(&coo));
    symmetrize(&mut alignment);
    alignment
}

/// Kernel Gram matrix of the differences between `center` and its neighbors,
/// `G[a, b] = k(a, b) − k(c, a) − k(c, b) + k(c, c)`.
fn difference_gram<K: KernelCallback>(kernel: &K, center: usize, neighbors: &[usize]) -> DMatrix<f64> {
    let self_similarity = kernel.kernel(center, center);
    let to_center: Vec<f64> = neighbors.iter().map(|&a| kernel.kernel(center, a)).collect();
    DMatrix::from_fn(neighbors.len(), neighbors.len(), |a, b| {
        kernel.kernel(neighbors[a], neighbors[b]) - to_center[a] - to_center[b] + self_similarity
    })
}

/// Solves `G w = 1` and normalizes `w` to sum to one.
fn reconstruction_weights(mut gram: DMatrix<f64>, target_dimension: usize) -> Option<DVector<f64>> {
    let k = gram.nrows();
    let trace = gram.trace();
    if k > target_dimension {
        let regularizer = RECONSTRUCTION_REGULARIZATION * trace.max(f64::EPSILON);
        for i in 0..k {
            gram[(i, i)] += regularizer;
        }
    }

    let ones = DVector::from_element(k, 1.0);
    let weights = gram.clone().lu().solve(&ones).or_else(|| {
        // Singular neighborhood, e.g. duplicated observations
        let regularizer = RECONSTRUCTION_REGULARIZATION * trace.max(1.0);
        for i in 0..k {
            gram[(i, i)] += regularizer;
        }
        gram.lu().solve(&ones)
    })?;

    let total = weights.sum();
    if total.abs() <= f64::EPSILON || !total.is_finite() {
        return None;
    }
    Some(weights / total)
}

/// Alignment matrix `M = (I − W)ᵀ (I − W)` of the locally linear reconstruction
/// weights `W`.
pub fn linear_reconstruction_alignment<K: KernelCallback>(
    indices: &[usize],
    kernel: &K,
    neighbors: &Neighbors,
    target_dimension: usize,
) -> Result<Array2<f64>> {
    let n = indices.len();
    let blocks = neighbors
        .par_iter()
        .enumerate()
        .map(|(p, list)| -> Result<(Vec<usize>, DMatrix<f64>)> {
            let members: Vec<usize> = list.iter().map(|&q| indices[q]).collect();
            let gram = difference_gram(kernel, indices[p], &members);
            let weights = reconstruction_weights(gram, target_dimension).ok_or_else(|| {
                EmbeddingError::configuration(
                    ParameterKey::NumberOfNeighbors,
                    format!("reconstruction weights of observation {} are undefined", indices[p]),
                )
            })?;

            // Row p of I − W is e_p − Σ w_a e_a
            let k = list.len();
            let mut positions = Vec::with_capacity(k + 1);
            positions.push(p);
            positions.extend_from_slice(list);
            let mut row = DVector::zeros(k + 1);
            row[0] = 1.0;
            for a in 0..k {
                row[a + 1] = -weights[a];
            }
            Ok((positions, &row * row.transpose()))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(assemble(n, blocks))
}

/// Alignment matrix of local tangent spaces.
///
/// For every neighborhood (the observation and its neighbors) the centered kernel
/// Gram matrix yields the top `target_dimension` eigenvectors `V`; with
/// `G = [1/√(k+1), V]` the block `I − G Gᵀ` is added at the neighborhood's
/// positions.
pub fn tangent_space_alignment<K: KernelCallback>(
    indices: &[usize],
    kernel: &K,
    neighbors: &Neighbors,
    target_dimension: usize,
) -> Result<Array2<f64>> {
    let n = indices.len();
    let blocks = neighbors
        .par_iter()
        .enumerate()
        .map(|(p, list)| -> Result<(Vec<usize>, DMatrix<f64>)> {
            let mut positions = Vec::with_capacity(list.len() + 1);
            positions.push(p);
            positions.extend_from_slice(list);
            let members: Vec<usize> = positions.iter().map(|&q| indices[q]).collect();

            let mut gram = evaluate_grid(&members, &members, |a, b| kernel.kernel(a, b))?;
            double_center(&mut gram);
            symmetrize(&mut gram);
            let (_, local_vectors) = sorted_symmetric_eigen(to_dmatrix(gram.view()), Spectrum::Largest);

            let size = positions.len();
            let constant = 1.0 / (size as f64).sqrt();
            let basis = DMatrix::from_fn(size, target_dimension + 1, |r, c| {
                if c == 0 {
                    constant
                } else {
                    local_vectors[(r, c - 1)]
                }
            });
            let block = DMatrix::identity(size, size) - &basis * basis.transpose();
            Ok((positions, block))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(assemble(n, blocks))
}

fn bottom_eigenvectors(
    alignment: &Array2<f64>,
    target_dimension: usize,
    settings: &EigenSettings,
    progress: &dyn ProgressLogger,
) -> Result<Embedding> {
    let request = EigenRequest::smallest(target_dimension).skip(1);
    let decomposition = with_dense_fallback(settings, progress, |settings| {
        eigen_decompose(alignment, request, settings)
    })?;
    Ok(Embedding::from_decomposition(eigenvector_coordinates(&decomposition), decomposition))
}

fn linear_alignment(
    features: &Array2<f64>,
    alignment: &Array2<f64>,
    target_dimension: usize,
    settings: &EigenSettings,
) -> Result<Embedding> {
    let mut lhs = features.dot(alignment).dot(&features.t());
    let mut rhs = features.dot(&features.t());
    symmetrize(&mut lhs);
    symmetrize(&mut rhs);

    let decomposition = generalized_eigen_decompose(&lhs, &rhs, EigenRequest::smallest(target_dimension), settings)?;
    Ok(Embedding::from_decomposition(project(features, &decomposition), decomposition))
}

/// Kernel Locally Linear Embedding from the reconstruction alignment matrix.
pub fn kernel_locally_linear_embedding(
    alignment: &Array2<f64>,
    target_dimension: usize,
    settings: &EigenSettings,
    progress: &dyn ProgressLogger,
) -> Result<Embedding> {
    bottom_eigenvectors(alignment, target_dimension, settings, progress)
}

/// Kernel Local Tangent Space Alignment from the tangent alignment matrix.
pub fn kernel_local_tangent_space_alignment(
    alignment: &Array2<f64>,
    target_dimension: usize,
    settings: &EigenSettings,
    progress: &dyn ProgressLogger,
) -> Result<Embedding> {
    bottom_eigenvectors(alignment, target_dimension, settings, progress)
}

/// Neighborhood Preserving Embedding: linear projection preserving the locally
/// linear reconstruction weights.
pub fn neighborhood_preserving_embedding(
    features: &Array2<f64>,
    alignment: &Array2<f64>,
    target_dimension: usize,
    settings: &EigenSettings,
) -> Result<Embedding> {
    linear_alignment(features, alignment, target_dimension, settings)
}

/// Linear Local Tangent Space Alignment: linear projection minimizing the tangent
/// alignment cost.
pub fn linear_local_tangent_space_alignment(
    features: &Array2<f64>,
    alignment: &Array2<f64>,
    target_dimension: usize,
    settings: &EigenSettings,
) -> Result<Embedding> {
    linear_alignment(features, alignment, target_dimension, settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callbacks::{EuclideanDistance, LinearKernel};
    use crate::dimred::tests::helix;
    use crate::methods::{EigenMethod, NeighborsMethod};
    use crate::neighbors::find_neighbors;
    use crate::progress::NoProgress;
    use crate::utils::center_observations;
    use approx::assert_abs_diff_eq;

    fn line(n: usize) -> Array2<f64> {
        Array2::from_shape_fn((2, n), |(row, col)| {
            let t = col as f64 * 0.3;
            if row == 0 {
                t
            } else {
                0.5 * t + 0.01 * (col % 3) as f64
            }
        })
    }

    fn setup(data: &Array2<f64>, k: usize) -> (Vec<usize>, Neighbors) {
        let distance = EuclideanDistance::new(data.view());
        let indices: Vec<usize> = (0..data.ncols()).collect();
        let neighbors = find_neighbors(NeighborsMethod::BruteForce, &indices, &distance, k).unwrap();
        (indices, neighbors)
    }

    fn is_monotone(values: ndarray::ArrayView1<f64>) -> bool {
        let increasing = values.windows(2).into_iter().all(|w| w[1] > w[0]);
        let decreasing = values.windows(2).into_iter().all(|w| w[1] < w[0]);
        increasing || decreasing
    }

    #[test]
    fn test_reconstruction_weights_sum_to_one() {
        let data = helix(20, 2);
        let kernel = LinearKernel::new(data.view());
        let (indices, neighbors) = setup(&data, 5);
        for (p, list) in neighbors.iter().enumerate() {
            let gram = difference_gram(&kernel, indices[p], list);
            let weights = reconstruction_weights(gram, 2).unwrap();
            assert_abs_diff_eq!(weights.sum(), 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_duplicate_neighborhood_is_regularized() {
        // Three identical observations: the difference Gram matrix is zero
        let data = Array2::from_shape_fn((2, 4), |(r, c)| if c < 3 { r as f64 } else { 5.0 });
        let kernel = LinearKernel::new(data.view());
        let gram = difference_gram(&kernel, 0, &[1, 2]);
        assert_eq!(gram, DMatrix::zeros(2, 2));
        let weights = reconstruction_weights(gram, 2).unwrap();
        assert_abs_diff_eq!(weights[0], 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(weights[1], 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_alignment_matrices_annihilate_constants() {
        let data = helix(25, 6);
        let kernel = LinearKernel::new(data.view());
        let (indices, neighbors) = setup(&data, 6);

        for alignment in [
            linear_reconstruction_alignment(&indices, &kernel, &neighbors, 2).unwrap(),
            tangent_space_alignment(&indices, &kernel, &neighbors, 2).unwrap(),
        ] {
            assert_eq!(alignment, alignment.t());
            for s in alignment.sum_axis(ndarray::Axis(1)).iter() {
                assert_abs_diff_eq!(*s, 0.0, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn test_kernel_methods_unroll_a_line() {
        let data = line(20);
        let kernel = LinearKernel::new(data.view());
        let (indices, neighbors) = setup(&data, 4);

        let lle = linear_reconstruction_alignment(&indices, &kernel, &neighbors, 1).unwrap();
        let ltsa = tangent_space_alignment(&indices, &kernel, &neighbors, 1).unwrap();
        for method in EigenMethod::ALL {
            let settings = EigenSettings::default().with_method(method);
            let a = kernel_locally_linear_embedding(&lle, 1, &settings, &NoProgress).unwrap();
            let b = kernel_local_tangent_space_alignment(&ltsa, 1, &settings, &NoProgress).unwrap();
            assert!(is_monotone(a.coordinates.row(0)), "klle with {}", method);
            assert!(is_monotone(b.coordinates.row(0)), "kltsa with {}", method);
        }
    }

    #[test]
    fn test_linear_methods_project_along_the_line() {
        let raw = line(20);
        let kernel = LinearKernel::new(raw.view());
        let (indices, neighbors) = setup(&raw, 4);
        let mut features = raw.clone();
        center_observations(&mut features);

        let lle = linear_reconstruction_alignment(&indices, &kernel, &neighbors, 1).unwrap();
        let ltsa = tangent_space_alignment(&indices, &kernel, &neighbors, 1).unwrap();
        let settings = EigenSettings::default();
        let npe = neighborhood_preserving_embedding(&features, &lle, 1, &settings).unwrap();
        let lltsa = linear_local_tangent_space_alignment(&features, &ltsa, 1, &settings).unwrap();

        assert!(is_monotone(npe.coordinates.row(0)));
        assert!(is_monotone(lltsa.coordinates.row(0)));
    }
}
