use super::Spectrum;
use crate::utils::to_dmatrix;
use nalgebra::{DMatrix, SymmetricEigen};
use ndarray::{Array1, Array2};

/// Full symmetric eigendecomposition with eigenpairs ordered by `spectrum`.
///
/// Returns the eigenvalues and the eigenvectors as columns of a matrix with the
/// same order. Equal eigenvalues keep the order reported by the factorization.
pub(crate) fn sorted_symmetric_eigen(matrix: DMatrix<f64>, spectrum: Spectrum) -> (Vec<f64>, DMatrix<f64>) {
    let n = matrix.nrows();
    let eigen = SymmetricEigen::new(matrix);

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| {
        let (va, vb) = (eigen.eigenvalues[a], eigen.eigenvalues[b]);
        let by_value = match spectrum {
            Spectrum::Largest => vb.total_cmp(&va),
            Spectrum::Smallest => va.total_cmp(&vb),
        };
        by_value.then_with(|| a.cmp(&b))
    });

    let values = order.iter().map(|&i| eigen.eigenvalues[i]).collect();
    let vectors = DMatrix::from_fn(n, n, |r, c| eigen.eigenvectors[(r, order[c])]);
    (values, vectors)
}

/// Exact decomposition, `O(n³)`. Returns the first `wanted` eigenpairs in `spectrum` order.
pub(crate) fn decompose(matrix: &Array2<f64>, spectrum: Spectrum, wanted: usize) -> (Array1<f64>, Array2<f64>) {
    let n = matrix.nrows();
    let (values, vectors) = sorted_symmetric_eigen(to_dmatrix(matrix.view()), spectrum);
    let wanted = wanted.min(n);

    let values = Array1::from_iter(values.into_iter().take(wanted));
    let vectors = Array2::from_shape_fn((n, wanted), |(r, c)| vectors[(r, c)]);
    (values, vectors)
}
