//! Block Lanczos iteration with full reorthogonalization.
//!
//! The Krylov basis grows by one block of `wanted` vectors per iteration, so an
//! eigenvalue repeated up to `wanted` times is reached through as many basis
//! directions. After every iteration the operator is projected onto the basis and
//! each requested Ritz pair is checked against its residual `‖A y - θ y‖`; the
//! iteration stops once all requested pairs satisfy the bound, or fails once the
//! iteration budget is spent.

use super::dense::sorted_symmetric_eigen;
use super::operator::SymmetricOperator;
use super::{EigenSettings, Spectrum};
use crate::error::{EmbeddingError, Result};
use nalgebra::DMatrix;
use ndarray::{Array1, Array2};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

const RESIDUAL_TOLERANCE: f64 = 1e-10;
const BREAKDOWN_TOLERANCE: f64 = 1e-10;

fn orthogonalize(w: &mut Array1<f64>, basis: &[Array1<f64>]) {
    // Two passes of classical Gram-Schmidt keep the basis orthogonal to working precision
    for _ in 0..2 {
        for v in basis {
            let projection = v.dot(w);
            w.scaled_add(-projection, v);
        }
    }
}

/// Orthonormal Krylov basis together with the operator applied to each vector
/// and the projection `Vᵀ A V`.
struct KrylovBasis {
    dim: usize,
    vectors: Vec<Array1<f64>>,
    images: Vec<Array1<f64>>,
    projected: Vec<Vec<f64>>,
}

impl KrylovBasis {
    fn new(dim: usize) -> Self {
        KrylovBasis {
            dim,
            vectors: Vec::new(),
            images: Vec::new(),
            projected: Vec::new(),
        }
    }

    fn len(&self) -> usize {
        self.vectors.len()
    }

    /// `None` when `candidate` lies in the span of the basis.
    fn orthonormalize(&self, mut candidate: Array1<f64>) -> Option<Array1<f64>> {
        let original = candidate.dot(&candidate).sqrt();
        orthogonalize(&mut candidate, &self.vectors);
        let norm = candidate.dot(&candidate).sqrt();
        if norm > BREAKDOWN_TOLERANCE * original && norm > 0.0 {
            Some(candidate / norm)
        } else {
            None
        }
    }

    fn random_direction(&self, rng: &mut ChaCha8Rng) -> Option<Array1<f64>> {
        (0..8).find_map(|_| {
            let v = Array1::from_shape_fn(self.dim, |_| rng.random::<f64>() * 2.0 - 1.0);
            self.orthonormalize(v)
        })
    }

    fn push(&mut self, operator: &dyn SymmetricOperator, v: Array1<f64>) {
        let image = operator.apply(&v);
        let mut row: Vec<f64> = self.images.iter().map(|w| v.dot(w)).collect();
        for (existing, &value) in self.projected.iter_mut().zip(row.iter()) {
            existing.push(value);
        }
        row.push(v.dot(&image));
        self.projected.push(row);
        self.vectors.push(v);
        self.images.push(image);
    }

    /// Adds up to `block_size` new directions, taken from `candidates` first and
    /// from random vectors once those are exhausted or dependent. Returns the
    /// number of vectors added.
    fn extend(
        &mut self,
        operator: &dyn SymmetricOperator,
        candidates: Vec<Array1<f64>>,
        block_size: usize,
        rng: &mut ChaCha8Rng,
    ) -> usize {
        let start = self.len();
        let target = (start + block_size).min(self.dim);
        let mut candidates = candidates.into_iter();

        while self.len() < target {
            let direction = match candidates.next() {
                Some(candidate) => self.orthonormalize(candidate),
                None => match self.random_direction(rng) {
                    Some(v) => Some(v),
                    None => break,
                },
            };
            if let Some(v) = direction {
                self.push(operator, v);
            }
        }
        self.len() - start
    }

    fn ritz_pairs(&self) -> (Vec<f64>, DMatrix<f64>) {
        let m = self.len();
        let h = DMatrix::from_fn(m, m, |i, j| self.projected[i][j]);
        sorted_symmetric_eigen(h, Spectrum::Largest)
    }

    fn combine(columns: &[Array1<f64>], weights: &DMatrix<f64>, c: usize, dim: usize) -> Array1<f64> {
        let mut out = Array1::zeros(dim);
        for (r, v) in columns.iter().enumerate() {
            out.scaled_add(weights[(r, c)], v);
        }
        out
    }

    fn residual_norm(&self, theta: f64, ritz: &DMatrix<f64>, c: usize) -> f64 {
        let y = Self::combine(&self.vectors, ritz, c, self.dim);
        let mut r = Self::combine(&self.images, ritz, c, self.dim);
        r.scaled_add(-theta, &y);
        r.dot(&r).sqrt()
    }
}

/// The `wanted` largest eigenpairs of `operator`, eigenvalues in descending order.
pub(crate) fn largest_eigenpairs(
    operator: &dyn SymmetricOperator,
    wanted: usize,
    settings: &EigenSettings,
) -> Result<(Array1<f64>, Array2<f64>)> {
    let n = operator.dim();
    if n == 0 {
        return Err(EmbeddingError::dimensionality("operator has zero dimension"));
    }
    let mut rng = ChaCha8Rng::seed_from_u64(settings.seed);
    let mut basis = KrylovBasis::new(n);
    let mut candidates = Vec::new();
    let mut converged = 0;
    let mut iterations = 0;

    while iterations < settings.max_iterations {
        iterations += 1;
        let added = basis.extend(operator, candidates, wanted, &mut rng);
        let m = basis.len();
        if added == 0 || m < wanted {
            break;
        }

        let (thetas, ritz) = basis.ritz_pairs();
        let scale = thetas.iter().fold(0.0f64, |acc, t| acc.max(t.abs())).max(f64::MIN_POSITIVE);
        converged = (0..wanted)
            .take_while(|&i| {
                let magnitude = thetas[i].abs().max(scale * 1e-4);
                basis.residual_norm(thetas[i], &ritz, i) <= RESIDUAL_TOLERANCE * magnitude
            })
            .count();

        if converged == wanted || m == n {
            log::debug!("Block Lanczos converged after {} iterations with {} basis vectors", iterations, m);
            let values = Array1::from_iter(thetas.iter().take(wanted).copied());
            let mut vectors = Array2::zeros((n, wanted));
            for (c, mut column) in vectors.columns_mut().into_iter().enumerate() {
                column.assign(&KrylovBasis::combine(&basis.vectors, &ritz, c, n));
            }
            return Ok((values, vectors));
        }

        candidates = basis.images[m - added..].to_vec();
    }

    Err(EmbeddingError::ConvergenceFailure {
        iterations,
        converged,
        requested: wanted,
    })
}
