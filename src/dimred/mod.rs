//! # Dimensionality Reduction
//!
//! The embedding engine. [`embed`] validates the configuration against the data
//! set, builds whatever intermediate structure the selected method needs (a
//! neighbor graph, a pairwise matrix, the gathered feature matrix), assembles the
//! method matrix, asks the eigen backend for the relevant eigenpairs and turns
//! them into a TARGET_DIMENSION × N coordinate matrix.
//!
//! ## Method families
//! - **Linear projections** ([`pca`], [`spectral::locality_preserving_projections`],
//!   [`local::neighborhood_preserving_embedding`],
//!   [`local::linear_local_tangent_space_alignment`]): learn a D × d projection
//!   and apply it to the centered features
//! - **Kernel and distance methods** ([`pca::kernel_pca`], [`mds`]): top
//!   eigenvectors of a double-centered matrix scaled by `√λ`
//! - **Neighbor graph alignment** ([`local`], [`spectral`]): bottom eigenvectors of
//!   a sparse alignment or Laplacian matrix
//! - **Stochastic proximity embedding** ([`spe`]): iterative pair corrections,
//!   no eigendecomposition

use crate::callbacks::{feature_matrix, Callbacks, DistanceCallback, FeatureVectorCallback, KernelCallback};
use crate::config::{ParameterKey, Parameters};
use crate::eigen::{EigenDecomposition, EigenSettings};
use crate::error::{EmbeddingError, Result};
use crate::methods::{EigenMethod, NeighborsMethod, ReductionMethod};
use crate::neighbors::{check_neighbor_count, find_neighbors, Neighbors};
use crate::progress::ProgressLogger;
use crate::utils::center_observations;
use ndarray::{Array1, Array2};

pub mod local;
pub mod mds;
pub mod pca;
pub mod spe;
pub mod spectral;

/// Result of an embedding call.
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding {
    /// TARGET_DIMENSION × N, column `j` is the embedding of observation `indices[j]`
    pub coordinates: Array2<f64>,
    /// Eigenvalues the coordinates were derived from, in coordinate row order
    pub eigenvalues: Option<Array1<f64>>,
}

impl Embedding {
    pub(crate) fn from_decomposition(coordinates: Array2<f64>, decomposition: EigenDecomposition) -> Self {
        Embedding {
            coordinates,
            eigenvalues: Some(decomposition.values),
        }
    }

    pub fn target_dimension(&self) -> usize {
        self.coordinates.nrows()
    }

    pub fn len(&self) -> usize {
        self.coordinates.ncols()
    }

    pub fn is_empty(&self) -> bool {
        self.coordinates.ncols() == 0
    }
}

/// Coordinates `v_j · √λ_j` for eigenpairs of a Gram-like matrix. Eigenvalues that
/// are not positive contribute zero coordinates.
pub(crate) fn scaled_coordinates(decomposition: &EigenDecomposition) -> Array2<f64> {
    let (n, d) = decomposition.vectors.dim();
    Array2::from_shape_fn((d, n), |(j, i)| {
        let lambda = decomposition.values[j];
        if lambda > 0.0 {
            decomposition.vectors[[i, j]] * lambda.sqrt()
        } else {
            0.0
        }
    })
}

/// Eigenvectors as coordinate rows.
pub(crate) fn eigenvector_coordinates(decomposition: &EigenDecomposition) -> Array2<f64> {
    decomposition.vectors.t().to_owned()
}

/// Applies the projection matrix held in the eigenvectors to centered features.
pub(crate) fn project(features: &Array2<f64>, decomposition: &EigenDecomposition) -> Array2<f64> {
    decomposition.vectors.t().dot(features)
}

/// Runs `solve` with the configured backend and retries with the dense backend
/// when the iterative backend runs out of iterations.
pub(crate) fn with_dense_fallback<T>(
    settings: &EigenSettings,
    progress: &dyn ProgressLogger,
    solve: impl Fn(&EigenSettings) -> Result<T>,
) -> Result<T> {
    match solve(settings) {
        Err(EmbeddingError::ConvergenceFailure { iterations, .. }) if settings.method == EigenMethod::Iterative => {
            progress.warning(&format!(
                "Iterative eigensolver did not converge after {} iterations, falling back to the dense solver",
                iterations
            ));
            solve(&settings.clone().with_method(EigenMethod::Dense))
        }
        result => result,
    }
}

fn needs_neighbor_graph(method: ReductionMethod, params: &Parameters) -> Result<bool> {
    if method == ReductionMethod::StochasticProximityEmbedding {
        let global: bool = params.get(ParameterKey::SpeGlobalStrategy)?;
        return Ok(!global);
    }
    Ok(method.needs_neighbors())
}

/// Checks neighbor count and target dimension against the data before any
/// matrix is assembled.
fn check_dimensions(method: ReductionMethod, params: &Parameters, n: usize, target_dimension: usize) -> Result<()> {
    if n < 2 {
        return Err(EmbeddingError::dimensionality(format!(
            "at least two observations are required, got {}",
            n
        )));
    }

    if needs_neighbor_graph(method, params)? {
        let k: usize = params.get(ParameterKey::NumberOfNeighbors)?;
        check_neighbor_count(k, n)?;

        if matches!(
            method,
            ReductionMethod::KernelLocalTangentSpaceAlignment | ReductionMethod::LinearLocalTangentSpaceAlignment
        ) && target_dimension > k
        {
            return Err(EmbeddingError::dimensionality(format!(
                "target dimension ({}) must not exceed the number of neighbors ({}) for tangent space alignment",
                target_dimension, k
            )));
        }
    }

    if method.is_linear() {
        let dimension: usize = params.get(ParameterKey::CurrentDimension)?;
        if target_dimension > dimension {
            return Err(EmbeddingError::dimensionality(format!(
                "target dimension ({}) exceeds the original dimension ({}) of a linear method",
                target_dimension, dimension
            )));
        }
    } else if method.uses_eigensolver() && target_dimension >= n {
        return Err(EmbeddingError::dimensionality(format!(
            "target dimension ({}) must be smaller than the number of observations ({})",
            target_dimension, n
        )));
    }

    Ok(())
}

/// Embeds the observations referenced by `indices` with the method selected in
/// `params`.
///
/// The configuration is validated first; neighbor count and target dimension are
/// checked against the data set before any solver runs. Column `j` of the result
/// belongs to `indices[j]`.
pub fn embed<K, D, F>(
    indices: &[usize],
    callbacks: &Callbacks<'_, K, D, F>,
    params: &Parameters,
    progress: &dyn ProgressLogger,
) -> Result<Embedding>
where
    K: KernelCallback,
    D: DistanceCallback,
    F: FeatureVectorCallback,
{
    let method = params.reduction_method()?;
    params.validate(method)?;

    let n = indices.len();
    let target_dimension: usize = params.get(ParameterKey::TargetDimension)?;
    check_dimensions(method, params, n, target_dimension)?;

    progress.info(&format!(
        "Embedding {} observations into {} dimensions using {}",
        n, target_dimension, method
    ));

    let settings = if method.uses_eigensolver() {
        let settings = EigenSettings::from_parameters(params)?;
        progress.debug(&format!("Using {} eigendecomposition", settings.method));
        settings
    } else {
        EigenSettings::default()
    };

    let neighbor_graph = || -> Result<Neighbors> {
        let k: usize = params.get(ParameterKey::NumberOfNeighbors)?;
        let strategy: NeighborsMethod = params.get(ParameterKey::NeighborsMethod)?;
        progress.info(&format!("Searching {} nearest neighbors using {}", k, strategy));
        find_neighbors(strategy, indices, callbacks.distance, k)
    };

    let centered_features = || -> Result<Array2<f64>> {
        let dimension: usize = params.get(ParameterKey::CurrentDimension)?;
        let mut features = feature_matrix(indices, callbacks.features, dimension)?;
        center_observations(&mut features);
        Ok(features)
    };

    let embedding = match method {
        ReductionMethod::Pca => pca::pca(&centered_features()?, target_dimension, &settings)?,
        ReductionMethod::KernelPca => pca::kernel_pca(indices, callbacks.kernel, target_dimension, &settings)?,
        ReductionMethod::MultidimensionalScaling => {
            mds::multidimensional_scaling(indices, callbacks.distance, target_dimension, &settings)?
        }
        ReductionMethod::LandmarkMultidimensionalScaling => mds::landmark_multidimensional_scaling(
            indices,
            callbacks.distance,
            target_dimension,
            &mds::LandmarkOptions::from_parameters(params)?,
            &settings,
        )?,
        ReductionMethod::Isomap => {
            let neighbors = neighbor_graph()?;
            mds::isomap(indices, callbacks.distance, &neighbors, target_dimension, &settings)?
        }
        ReductionMethod::LandmarkIsomap => {
            let neighbors = neighbor_graph()?;
            mds::landmark_isomap(
                indices,
                callbacks.distance,
                &neighbors,
                target_dimension,
                &mds::LandmarkOptions::from_parameters(params)?,
                &settings,
            )?
        }
        ReductionMethod::DiffusionMap => spectral::diffusion_map(
            indices,
            callbacks.distance,
            params.get(ParameterKey::GaussianKernelWidth)?,
            params.get(ParameterKey::DiffusionMapTimesteps)?,
            target_dimension,
            &settings,
        )?,
        ReductionMethod::LaplacianEigenmaps => {
            let neighbors = neighbor_graph()?;
            let weights = spectral::heat_kernel_weights(
                indices,
                callbacks.distance,
                &neighbors,
                params.get(ParameterKey::GaussianKernelWidth)?,
            );
            spectral::laplacian_eigenmaps(&weights, target_dimension, &settings, progress)?
        }
        ReductionMethod::LocalityPreservingProjections => {
            let neighbors = neighbor_graph()?;
            let weights = spectral::heat_kernel_weights(
                indices,
                callbacks.distance,
                &neighbors,
                params.get(ParameterKey::GaussianKernelWidth)?,
            );
            spectral::locality_preserving_projections(&centered_features()?, &weights, target_dimension, &settings)?
        }
        ReductionMethod::KernelLocallyLinearEmbedding => {
            let neighbors = neighbor_graph()?;
            let alignment = local::linear_reconstruction_alignment(indices, callbacks.kernel, &neighbors, target_dimension)?;
            local::kernel_locally_linear_embedding(&alignment, target_dimension, &settings, progress)?
        }
        ReductionMethod::NeighborhoodPreservingEmbedding => {
            let neighbors = neighbor_graph()?;
            let alignment = local::linear_reconstruction_alignment(indices, callbacks.kernel, &neighbors, target_dimension)?;
            local::neighborhood_preserving_embedding(&centered_features()?, &alignment, target_dimension, &settings)?
        }
        ReductionMethod::KernelLocalTangentSpaceAlignment => {
            let neighbors = neighbor_graph()?;
            let alignment = local::tangent_space_alignment(indices, callbacks.kernel, &neighbors, target_dimension)?;
            local::kernel_local_tangent_space_alignment(&alignment, target_dimension, &settings, progress)?
        }
        ReductionMethod::LinearLocalTangentSpaceAlignment => {
            let neighbors = neighbor_graph()?;
            let alignment = local::tangent_space_alignment(indices, callbacks.kernel, &neighbors, target_dimension)?;
            local::linear_local_tangent_space_alignment(&centered_features()?, &alignment, target_dimension, &settings)?
        }
        ReductionMethod::StochasticProximityEmbedding => {
            let options = spe::SpeOptions::from_parameters(params)?;
            let neighbors = if options.global_strategy {
                None
            } else {
                Some(neighbor_graph()?)
            };
            spe::stochastic_proximity_embedding(
                indices,
                callbacks.distance,
                neighbors.as_ref(),
                target_dimension,
                &options,
                progress,
            )?
        }
    };

    progress.info(&format!(
        "Computed {}x{} embedding",
        embedding.target_dimension(),
        embedding.len()
    ));
    Ok(embedding)
}
