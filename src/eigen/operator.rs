//! Symmetric linear operators used by the iterative and randomized backends.
//!
//! Both backends only ever look for the largest eigenvalues of an operator. A
//! request for the smallest end of a matrix' spectrum is turned into a largest
//! request on a transformed operator, and [`SpectralTransform`] maps the
//! operator's eigenvalues back to the matrix' eigenvalues.

use crate::utils::{to_array1, to_array2, to_dmatrix, to_dvector};
use nalgebra::{Cholesky, DMatrix, Dyn};
use ndarray::{Array1, Array2};

pub(crate) trait SymmetricOperator: Sync {
    fn dim(&self) -> usize;

    fn apply(&self, x: &Array1<f64>) -> Array1<f64>;

    fn apply_block(&self, x: &Array2<f64>) -> Array2<f64> {
        let mut out = Array2::zeros((self.dim(), x.ncols()));
        for (j, column) in x.columns().into_iter().enumerate() {
            out.column_mut(j).assign(&self.apply(&column.to_owned()));
        }
        out
    }
}

pub(crate) struct DenseOperator<'a> {
    matrix: &'a Array2<f64>,
}

impl SymmetricOperator for DenseOperator<'_> {
    fn dim(&self) -> usize {
        self.matrix.nrows()
    }

    fn apply(&self, x: &Array1<f64>) -> Array1<f64> {
        self.matrix.dot(x)
    }

    fn apply_block(&self, x: &Array2<f64>) -> Array2<f64> {
        self.matrix.dot(x)
    }
}

/// `(A + shift·I)⁻¹` through a Cholesky factorization.
pub(crate) struct ShiftInvertOperator {
    factor: Cholesky<f64, Dyn>,
}

impl SymmetricOperator for ShiftInvertOperator {
    fn dim(&self) -> usize {
        self.factor.l_dirty().nrows()
    }

    fn apply(&self, x: &Array1<f64>) -> Array1<f64> {
        to_array1(&self.factor.solve(&to_dvector(x.view())))
    }

    fn apply_block(&self, x: &Array2<f64>) -> Array2<f64> {
        to_array2(&self.factor.solve(&to_dmatrix(x.view())))
    }
}

/// `σ·I - A` with σ bounding the spectrum of `A` from above.
pub(crate) struct FlippedOperator<'a> {
    matrix: &'a Array2<f64>,
    sigma: f64,
}

impl SymmetricOperator for FlippedOperator<'_> {
    fn dim(&self) -> usize {
        self.matrix.nrows()
    }

    fn apply(&self, x: &Array1<f64>) -> Array1<f64> {
        x * self.sigma - self.matrix.dot(x)
    }

    fn apply_block(&self, x: &Array2<f64>) -> Array2<f64> {
        x * self.sigma - self.matrix.dot(x)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum SpectralTransform {
    Identity,
    Inverse { shift: f64 },
    Flip { sigma: f64 },
}

impl SpectralTransform {
    pub(crate) fn eigenvalue(&self, theta: f64) -> f64 {
        match *self {
            SpectralTransform::Identity => theta,
            SpectralTransform::Inverse { shift } => 1.0 / theta - shift,
            SpectralTransform::Flip { sigma } => sigma - theta,
        }
    }
}

/// Upper bound on the eigenvalues of a symmetric matrix from Gershgorin discs.
pub(crate) fn gershgorin_bound(matrix: &Array2<f64>) -> f64 {
    matrix
        .rows()
        .into_iter()
        .enumerate()
        .map(|(i, row)| {
            let off: f64 = row
                .iter()
                .enumerate()
                .filter(|&(j, _)| j != i)
                .map(|(_, v)| v.abs())
                .sum();
            row[i] + off
        })
        .fold(f64::NEG_INFINITY, f64::max)
}

pub(crate) fn largest(matrix: &Array2<f64>) -> (Box<dyn SymmetricOperator + '_>, SpectralTransform) {
    (Box::new(DenseOperator { matrix }), SpectralTransform::Identity)
}

/// Operator whose largest eigenvalues correspond to the smallest of `matrix`.
pub(crate) fn smallest(
    matrix: &Array2<f64>,
    shift: f64,
) -> (Box<dyn SymmetricOperator + '_>, SpectralTransform) {
    let n = matrix.nrows();
    let shifted = to_dmatrix(matrix.view()) + DMatrix::<f64>::identity(n, n) * shift;
    match Cholesky::new(shifted) {
        Some(factor) => (
            Box::new(ShiftInvertOperator { factor }),
            SpectralTransform::Inverse { shift },
        ),
        None => {
            log::debug!("Shifted matrix is not positive definite, using a flipped spectrum instead");
            let sigma = gershgorin_bound(matrix);
            (
                Box::new(FlippedOperator { matrix, sigma }),
                SpectralTransform::Flip { sigma },
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_shift_invert_applies_inverse() {
        let a = array![[4.0, 1.0], [1.0, 3.0]];
        let (op, transform) = smallest(&a, 0.0);
        assert_eq!(transform, SpectralTransform::Inverse { shift: 0.0 });

        let x = array![1.0, 2.0];
        let y = op.apply(&x);
        let back = a.dot(&y);
        assert_abs_diff_eq!(back[0], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(back[1], 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_indefinite_matrix_is_flipped() {
        let a = array![[1.0, 0.0], [0.0, -2.0]];
        let (op, transform) = smallest(&a, 1e-9);
        assert_eq!(transform, SpectralTransform::Flip { sigma: 1.0 });
        let y = op.apply(&array![1.0, 1.0]);
        assert_eq!(y, array![0.0, 3.0]);
        assert_eq!(transform.eigenvalue(3.0), -2.0);
    }

    #[test]
    fn test_block_matches_columns() {
        let a = array![[2.0, 1.0, 0.0], [1.0, 2.0, 1.0], [0.0, 1.0, 2.0]];
        let (op, _) = smallest(&a, 0.5);
        let x = array![[1.0, 0.0], [0.0, 1.0], [1.0, 1.0]];
        let block = op.apply_block(&x);
        for j in 0..2 {
            let single = op.apply(&x.column(j).to_owned());
            for i in 0..3 {
                assert_abs_diff_eq!(block[[i, j]], single[i], epsilon = 1e-12);
            }
        }
    }
}
