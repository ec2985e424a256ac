//! # Eigendecomposition backends
//!
//! Symmetric (and generalized symmetric-definite) eigenproblems solved by one of
//! three interchangeable backends:
//!
//! - **Dense**: exact decomposition of the full matrix
//! - **Iterative**: block Lanczos iteration, fails with
//!   [`EmbeddingError::ConvergenceFailure`] when its iteration budget is spent
//! - **Randomized**: random projection with oversampling and power iterations,
//!   always returns an approximation
//!
//! Every backend returns the requested eigenpairs sorted in the requested
//! direction with a fixed sign convention: the component of largest magnitude of
//! each eigenvector is positive.

use crate::config::{ParameterKey, ParameterType, Parameters};
use crate::error::{EmbeddingError, Result};
use crate::methods::EigenMethod;
use crate::utils::{to_array2, to_dmatrix};
use nalgebra::{Cholesky, DMatrix};
use ndarray::{s, Array1, Array2};

mod dense;
mod lanczos;
mod operator;
mod randomized;

pub(crate) use dense::sorted_symmetric_eigen;

/// End of the spectrum an embedding is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Spectrum {
    Largest,
    Smallest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EigenRequest {
    pub count: usize,
    /// Leading eigenpairs to discard, e.g. the constant vector of a graph Laplacian
    pub skip: usize,
    pub spectrum: Spectrum,
}

impl EigenRequest {
    pub fn largest(count: usize) -> Self {
        EigenRequest {
            count,
            skip: 0,
            spectrum: Spectrum::Largest,
        }
    }

    pub fn smallest(count: usize) -> Self {
        EigenRequest {
            count,
            skip: 0,
            spectrum: Spectrum::Smallest,
        }
    }

    pub fn skip(mut self, skip: usize) -> Self {
        self.skip = skip;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EigenSettings {
    pub method: EigenMethod,
    pub max_iterations: usize,
    pub oversampling: usize,
    pub power_iterations: usize,
    pub seed: u64,
    pub eigenshift: f64,
}

impl Default for EigenSettings {
    fn default() -> Self {
        EigenSettings {
            method: EigenMethod::Dense,
            max_iterations: 1000,
            oversampling: 10,
            power_iterations: 2,
            seed: 42,
            eigenshift: 1e-9,
        }
    }
}

fn backend_parameter<T: ParameterType>(params: &Parameters, key: ParameterKey, unused: T) -> Result<T> {
    if params.contains(key) {
        params.get(key)
    } else {
        Ok(unused)
    }
}

impl EigenSettings {
    /// Reads the backend selection and the keys it needs. Keys the selected
    /// backend never reads may be absent.
    pub fn from_parameters(params: &Parameters) -> Result<Self> {
        let method: EigenMethod = params.get(ParameterKey::EigenMethod)?;
        let (max_iterations, oversampling, power_iterations, seed) = match method {
            EigenMethod::Dense => (
                backend_parameter(params, ParameterKey::EigenMaxIterations, 0usize)?,
                backend_parameter(params, ParameterKey::RandomizedOversampling, 0usize)?,
                backend_parameter(params, ParameterKey::RandomizedPowerIterations, 0usize)?,
                backend_parameter(params, ParameterKey::RandomSeed, 0usize)?,
            ),
            EigenMethod::Iterative => (
                params.get(ParameterKey::EigenMaxIterations)?,
                backend_parameter(params, ParameterKey::RandomizedOversampling, 0usize)?,
                backend_parameter(params, ParameterKey::RandomizedPowerIterations, 0usize)?,
                params.get(ParameterKey::RandomSeed)?,
            ),
            EigenMethod::Randomized => (
                backend_parameter(params, ParameterKey::EigenMaxIterations, 0usize)?,
                params.get(ParameterKey::RandomizedOversampling)?,
                params.get(ParameterKey::RandomizedPowerIterations)?,
                params.get(ParameterKey::RandomSeed)?,
            ),
        };

        Ok(EigenSettings {
            method,
            max_iterations,
            oversampling,
            power_iterations,
            seed: seed as u64,
            eigenshift: backend_parameter(params, ParameterKey::Eigenshift, 0.0)?,
        })
    }

    pub fn with_method(mut self, method: EigenMethod) -> Self {
        self.method = method;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EigenDecomposition {
    pub values: Array1<f64>,
    /// Eigenvectors as columns, in the order of `values`
    pub vectors: Array2<f64>,
}

/// Flips every column so that its component of largest magnitude is positive.
/// The first component wins among equal magnitudes.
pub fn normalize_signs(vectors: &mut Array2<f64>) {
    for mut column in vectors.columns_mut() {
        let mut best = 0;
        for (i, v) in column.iter().enumerate() {
            if v.abs() > column[best].abs() {
                best = i;
            }
        }
        if !column.is_empty() && column[best] < 0.0 {
            column.mapv_inplace(|v| -v);
        }
    }
}

fn check_request(n: usize, request: &EigenRequest) -> Result<()> {
    if request.count == 0 {
        return Err(EmbeddingError::dimensionality("at least one eigenpair must be requested"));
    }
    if request.count + request.skip > n {
        return Err(EmbeddingError::dimensionality(format!(
            "{} eigenpairs (skipping {}) requested from a {}x{} matrix",
            request.count, request.skip, n, n
        )));
    }
    Ok(())
}

/// Eigenpairs of a symmetric matrix according to `request`.
pub fn eigen_decompose(
    matrix: &Array2<f64>,
    request: EigenRequest,
    settings: &EigenSettings,
) -> Result<EigenDecomposition> {
    let n = matrix.nrows();
    if matrix.ncols() != n {
        return Err(EmbeddingError::dimensionality(format!(
            "eigendecomposition needs a square matrix, got {}x{}",
            n,
            matrix.ncols()
        )));
    }
    check_request(n, &request)?;
    let wanted = request.count + request.skip;

    let (values, vectors) = match settings.method {
        EigenMethod::Dense => dense::decompose(matrix, request.spectrum, wanted),
        EigenMethod::Iterative | EigenMethod::Randomized => {
            let (op, transform) = match request.spectrum {
                Spectrum::Largest => operator::largest(matrix),
                Spectrum::Smallest => operator::smallest(matrix, settings.eigenshift),
            };
            let (thetas, vectors) = if settings.method == EigenMethod::Iterative {
                lanczos::largest_eigenpairs(op.as_ref(), wanted, settings)?
            } else {
                randomized::largest_eigenpairs(op.as_ref(), wanted, settings)
            };
            (thetas.mapv(|theta| transform.eigenvalue(theta)), vectors)
        }
    };

    let values = values.slice(s![request.skip..]).to_owned();
    let mut vectors = vectors.slice(s![.., request.skip..]).to_owned();
    normalize_signs(&mut vectors);
    Ok(EigenDecomposition { values, vectors })
}

/// Eigenpairs of `a v = λ b v` for symmetric `a` and symmetric positive definite `b`.
///
/// `b` is regularized with the configured eigenshift on its diagonal and factored
/// as `L Lᵀ`; the standard problem `L⁻¹ a L⁻ᵀ y = λ y` is solved with the selected
/// backend and `v = L⁻ᵀ y` is returned.
pub fn generalized_eigen_decompose(
    a: &Array2<f64>,
    b: &Array2<f64>,
    request: EigenRequest,
    settings: &EigenSettings,
) -> Result<EigenDecomposition> {
    let n = a.nrows();
    if a.dim() != (n, n) || b.dim() != (n, n) {
        return Err(EmbeddingError::dimensionality(format!(
            "generalized eigenproblem needs two square matrices of equal size, got {:?} and {:?}",
            a.dim(),
            b.dim()
        )));
    }

    let regularized = to_dmatrix(b.view()) + DMatrix::<f64>::identity(n, n) * settings.eigenshift;
    let factor = Cholesky::new(regularized).ok_or_else(|| {
        EmbeddingError::configuration(
            ParameterKey::Eigenshift,
            "right-hand matrix of the generalized eigenproblem is not positive definite",
        )
    })?;
    let l = factor.l();

    let not_invertible = || {
        EmbeddingError::configuration(
            ParameterKey::Eigenshift,
            "triangular factor of the right-hand matrix is singular",
        )
    };
    let half = l.solve_lower_triangular(&to_dmatrix(a.view())).ok_or_else(not_invertible)?;
    let reduced = l.solve_lower_triangular(&half.transpose()).ok_or_else(not_invertible)?;
    let mut reduced = to_array2(&reduced);
    crate::utils::symmetrize(&mut reduced);

    let standard = eigen_decompose(&reduced, request, settings)?;
    let back = l
        .transpose()
        .solve_upper_triangular(&to_dmatrix(standard.vectors.view()))
        .ok_or_else(not_invertible)?;

    let mut vectors = to_array2(&back);
    normalize_signs(&mut vectors);
    Ok(EigenDecomposition {
        values: standard.values,
        vectors,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn settings(method: EigenMethod) -> EigenSettings {
        EigenSettings::default().with_method(method)
    }

    fn test_matrix(n: usize) -> Array2<f64> {
        // Diagonally dominant tridiagonal, positive definite without mirror symmetry
        Array2::from_shape_fn((n, n), |(i, j)| {
            if i == j {
                2.0 + 0.1 * i as f64
            } else if i.abs_diff(j) == 1 {
                -1.0
            } else {
                0.0
            }
        })
    }

    fn assert_same_direction(a: ndarray::ArrayView1<f64>, b: ndarray::ArrayView1<f64>, epsilon: f64) {
        assert_abs_diff_eq!(a.dot(&b).abs(), 1.0, epsilon = epsilon);
    }

    #[test]
    fn test_dense_diagonal() {
        let a = Array2::from_diag(&array![3.0, -1.0, 7.0, 0.5]);
        let result = eigen_decompose(&a, EigenRequest::largest(4), &settings(EigenMethod::Dense)).unwrap();

        let expected = [7.0, 3.0, 0.5, -1.0];
        for (v, e) in result.values.iter().zip(expected.iter()) {
            assert_abs_diff_eq!(*v, *e, epsilon = 1e-12);
        }

        let gram = result.vectors.t().dot(&result.vectors);
        for i in 0..4 {
            for j in 0..4 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert_abs_diff_eq!(gram[[i, j]], expected, epsilon = 1e-12);
            }
        }
        // Largest magnitude component is positive
        assert_abs_diff_eq!(result.vectors[[2, 0]], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_smallest_with_skip() {
        let a = Array2::from_diag(&array![3.0, 0.0, 7.0, 0.5]);
        let request = EigenRequest::smallest(2).skip(1);
        let result = eigen_decompose(&a, request, &settings(EigenMethod::Dense)).unwrap();
        assert_eq!(result.values.len(), 2);
        assert_abs_diff_eq!(result.values[0], 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(result.values[1], 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(result.vectors[[3, 0]], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_backends_agree() {
        let n = 30;
        let a = test_matrix(n);
        let dense = eigen_decompose(&a, EigenRequest::largest(3), &settings(EigenMethod::Dense)).unwrap();
        let iterative = eigen_decompose(&a, EigenRequest::largest(3), &settings(EigenMethod::Iterative)).unwrap();

        for k in 0..3 {
            assert_abs_diff_eq!(iterative.values[k], dense.values[k], epsilon = 1e-8);
            assert_same_direction(iterative.vectors.column(k), dense.vectors.column(k), 1e-8);
        }
        assert!(dense.values[0] > dense.values[1] && dense.values[1] > dense.values[2]);

        let mut randomized_settings = settings(EigenMethod::Randomized);
        randomized_settings.oversampling = n;
        let randomized = eigen_decompose(&a, EigenRequest::largest(3), &randomized_settings).unwrap();
        for k in 0..3 {
            assert_abs_diff_eq!(randomized.values[k], dense.values[k], epsilon = 1e-8);
        }
    }

    #[test]
    fn test_smallest_backends_agree() {
        let n = 20;
        let a = test_matrix(n);
        let request = EigenRequest::smallest(2).skip(1);
        let dense = eigen_decompose(&a, request, &settings(EigenMethod::Dense)).unwrap();
        let iterative = eigen_decompose(&a, request, &settings(EigenMethod::Iterative)).unwrap();
        let mut randomized_settings = settings(EigenMethod::Randomized);
        randomized_settings.oversampling = 15;
        let randomized = eigen_decompose(&a, request, &randomized_settings).unwrap();

        for k in 0..2 {
            assert_abs_diff_eq!(iterative.values[k], dense.values[k], epsilon = 1e-7);
            assert_abs_diff_eq!(randomized.values[k], dense.values[k], epsilon = 1e-4);
            assert_same_direction(iterative.vectors.column(k), dense.vectors.column(k), 1e-6);
        }
        assert!(dense.values[0] < dense.values[1]);
    }

    /// Laplacian of two disjoint paths of equal length; every eigenvalue is doubled.
    fn two_paths_laplacian(length: usize) -> Array2<f64> {
        let n = 2 * length;
        let mut l = Array2::zeros((n, n));
        for start in [0, length] {
            for i in start..start + length - 1 {
                l[[i, i + 1]] = -1.0;
                l[[i + 1, i]] = -1.0;
                l[[i, i]] += 1.0;
                l[[i + 1, i + 1]] += 1.0;
            }
        }
        l
    }

    fn assert_eigenpairs(a: &Array2<f64>, result: &EigenDecomposition, epsilon: f64) {
        for (k, &lambda) in result.values.iter().enumerate() {
            let v = result.vectors.column(k);
            let residual = a.dot(&v) - &v * lambda;
            assert_abs_diff_eq!(residual.dot(&residual).sqrt(), 0.0, epsilon = epsilon);
        }
        let gram = result.vectors.t().dot(&result.vectors);
        for i in 0..gram.nrows() {
            for j in 0..gram.ncols() {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert_abs_diff_eq!(gram[[i, j]], expected, epsilon = epsilon);
            }
        }
    }

    #[test]
    fn test_backends_agree_on_repeated_eigenvalues() {
        let a = two_paths_laplacian(5);
        let largest = EigenRequest::largest(2);
        let smallest = EigenRequest::smallest(2).skip(1);

        let dense_largest = eigen_decompose(&a, largest, &settings(EigenMethod::Dense)).unwrap();
        let dense_smallest = eigen_decompose(&a, smallest, &settings(EigenMethod::Dense)).unwrap();
        assert_abs_diff_eq!(dense_largest.values[0], dense_largest.values[1], epsilon = 1e-10);
        assert_abs_diff_eq!(dense_smallest.values[0], 0.0, epsilon = 1e-10);

        for method in [EigenMethod::Iterative, EigenMethod::Randomized] {
            let s = settings(method);
            let result = eigen_decompose(&a, largest, &s).unwrap();
            for k in 0..2 {
                assert_abs_diff_eq!(result.values[k], dense_largest.values[k], epsilon = 1e-6);
            }
            assert_eigenpairs(&a, &result, 1e-6);

            // Shift-invert residuals are bounded relative to the inverted spectrum
            let result = eigen_decompose(&a, smallest, &s).unwrap();
            for k in 0..2 {
                assert_abs_diff_eq!(result.values[k], dense_smallest.values[k], epsilon = 1e-6);
            }
            assert_eigenpairs(&a, &result, 1e-4);
        }
    }

    #[test]
    fn test_iterative_budget_exhausted() {
        let a = test_matrix(50);
        let mut budget = settings(EigenMethod::Iterative);
        budget.max_iterations = 3;
        let err = eigen_decompose(&a, EigenRequest::largest(2), &budget).unwrap_err();
        assert!(matches!(
            err,
            EmbeddingError::ConvergenceFailure { requested: 2, .. }
        ));
    }

    #[test]
    fn test_request_larger_than_matrix() {
        let a = Array2::eye(3);
        let err = eigen_decompose(&a, EigenRequest::smallest(3).skip(1), &settings(EigenMethod::Dense)).unwrap_err();
        assert!(matches!(err, EmbeddingError::Dimensionality(_)));
    }

    #[test]
    fn test_generalized_diagonal() {
        // a v = λ b v with diagonal matrices gives λ = a_ii / b_ii
        let a = Array2::from_diag(&array![2.0, 6.0, 1.0]);
        let b = Array2::from_diag(&array![1.0, 2.0, 4.0]);
        let mut s = settings(EigenMethod::Dense);
        s.eigenshift = 0.0;
        let result = generalized_eigen_decompose(&a, &b, EigenRequest::smallest(3), &s).unwrap();

        let expected = [0.25, 2.0, 3.0];
        for (v, e) in result.values.iter().zip(expected.iter()) {
            assert_abs_diff_eq!(*v, *e, epsilon = 1e-12);
        }
        // b-orthonormal eigenvectors
        let gram = result.vectors.t().dot(&b).dot(&result.vectors);
        for i in 0..3 {
            assert_abs_diff_eq!(gram[[i, i]], 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_generalized_satisfies_equation() {
        let a = test_matrix(6);
        let b = Array2::from_shape_fn((6, 6), |(i, j)| if i == j { 2.0 + i as f64 } else { 0.1 });
        let result = generalized_eigen_decompose(&a, &b, EigenRequest::largest(2), &settings(EigenMethod::Dense)).unwrap();
        for k in 0..2 {
            let v = result.vectors.column(k);
            let lhs = a.dot(&v);
            let rhs = b.dot(&v) * result.values[k];
            for i in 0..6 {
                assert_abs_diff_eq!(lhs[i], rhs[i], epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn test_settings_from_parameters() {
        let params = Parameters::new().with(ParameterKey::EigenMethod, EigenMethod::Dense);
        let s = EigenSettings::from_parameters(&params).unwrap();
        assert_eq!(s.method, EigenMethod::Dense);

        let params = Parameters::new().with(ParameterKey::EigenMethod, EigenMethod::Randomized);
        assert!(EigenSettings::from_parameters(&params).is_err());

        let params = Parameters::with_defaults().with(ParameterKey::EigenMethod, EigenMethod::Randomized);
        let s = EigenSettings::from_parameters(&params).unwrap();
        assert_eq!(s.oversampling, 10);
        assert_eq!(s.seed, 42);
    }
}
