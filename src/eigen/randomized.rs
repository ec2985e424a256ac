//! Randomized range finder for symmetric operators.
//!
//! A random test matrix with `wanted + oversampling` columns is pushed through the
//! operator, orthonormalized, refined with power iterations and used to project
//! the operator onto a small subspace, whose exact eigenpairs approximate the
//! largest eigenpairs of the operator.

use super::dense::sorted_symmetric_eigen;
use super::operator::SymmetricOperator;
use super::{EigenSettings, Spectrum};
use crate::utils::{to_array2, to_dmatrix};
use nalgebra::QR;
use ndarray::{Array1, Array2};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

fn orthonormal_basis(y: &Array2<f64>) -> Array2<f64> {
    let qr = QR::new(to_dmatrix(y.view()));
    to_array2(&qr.q())
}

/// Approximate `wanted` largest eigenpairs of `operator`, eigenvalues descending.
pub(crate) fn largest_eigenpairs(
    operator: &dyn SymmetricOperator,
    wanted: usize,
    settings: &EigenSettings,
) -> (Array1<f64>, Array2<f64>) {
    let n = operator.dim();
    let sketch = (wanted + settings.oversampling).min(n).max(wanted);
    let mut rng = ChaCha8Rng::seed_from_u64(settings.seed);

    let omega = Array2::from_shape_fn((n, sketch), |_| rng.random::<f64>() * 2.0 - 1.0);
    let mut q = orthonormal_basis(&operator.apply_block(&omega));
    for _ in 0..settings.power_iterations {
        q = orthonormal_basis(&operator.apply_block(&q));
    }

    let mut projected = q.t().dot(&operator.apply_block(&q));
    crate::utils::symmetrize(&mut projected);

    let (values, small_vectors) = sorted_symmetric_eigen(to_dmatrix(projected.view()), Spectrum::Largest);
    let small_vectors = to_array2(&small_vectors);

    let values = Array1::from_iter(values.into_iter().take(wanted));
    let vectors = q.dot(&small_vectors.slice(ndarray::s![.., ..wanted]));
    log::debug!(
        "Randomized decomposition with sketch size {} and {} power iterations",
        sketch,
        settings.power_iterations
    );
    (values, vectors)
}
