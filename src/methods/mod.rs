//! # Method selectors
//!
//! String tokens accepted on the command line and their enumerated counterparts.
//! Every lookup is total: a token either maps to exactly one variant or yields
//! [`EmbeddingError::UnsupportedMethod`] carrying the token verbatim.

use crate::error::EmbeddingError;
use std::fmt;
use std::str::FromStr;

/// Dimensionality reduction technique.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReductionMethod {
    Pca,
    KernelPca,
    MultidimensionalScaling,
    LandmarkMultidimensionalScaling,
    Isomap,
    LandmarkIsomap,
    DiffusionMap,
    LaplacianEigenmaps,
    LocalityPreservingProjections,
    NeighborhoodPreservingEmbedding,
    KernelLocallyLinearEmbedding,
    KernelLocalTangentSpaceAlignment,
    LinearLocalTangentSpaceAlignment,
    StochasticProximityEmbedding,
}

impl ReductionMethod {
    pub const ALL: [ReductionMethod; 14] = [
        ReductionMethod::Pca,
        ReductionMethod::KernelPca,
        ReductionMethod::MultidimensionalScaling,
        ReductionMethod::LandmarkMultidimensionalScaling,
        ReductionMethod::Isomap,
        ReductionMethod::LandmarkIsomap,
        ReductionMethod::DiffusionMap,
        ReductionMethod::LaplacianEigenmaps,
        ReductionMethod::LocalityPreservingProjections,
        ReductionMethod::NeighborhoodPreservingEmbedding,
        ReductionMethod::KernelLocallyLinearEmbedding,
        ReductionMethod::KernelLocalTangentSpaceAlignment,
        ReductionMethod::LinearLocalTangentSpaceAlignment,
        ReductionMethod::StochasticProximityEmbedding,
    ];

    pub fn token(&self) -> &'static str {
        match self {
            ReductionMethod::Pca => "pca",
            ReductionMethod::KernelPca => "kpca",
            ReductionMethod::MultidimensionalScaling => "mds",
            ReductionMethod::LandmarkMultidimensionalScaling => "lmds",
            ReductionMethod::Isomap => "isomap",
            ReductionMethod::LandmarkIsomap => "lisomap",
            ReductionMethod::DiffusionMap => "diffusion_map",
            ReductionMethod::LaplacianEigenmaps => "laplacian_eigenmaps",
            ReductionMethod::LocalityPreservingProjections => "lpp",
            ReductionMethod::NeighborhoodPreservingEmbedding => "npe",
            ReductionMethod::KernelLocallyLinearEmbedding => "klle",
            ReductionMethod::KernelLocalTangentSpaceAlignment => "kltsa",
            ReductionMethod::LinearLocalTangentSpaceAlignment => "lltsa",
            ReductionMethod::StochasticProximityEmbedding => "spe",
        }
    }

    /// Methods that build a k-nearest-neighbor graph before assembling their matrix.
    /// Stochastic proximity embedding only needs one with the local strategy.
    pub fn needs_neighbors(&self) -> bool {
        matches!(
            self,
            ReductionMethod::Isomap
                | ReductionMethod::LandmarkIsomap
                | ReductionMethod::LaplacianEigenmaps
                | ReductionMethod::LocalityPreservingProjections
                | ReductionMethod::NeighborhoodPreservingEmbedding
                | ReductionMethod::KernelLocallyLinearEmbedding
                | ReductionMethod::KernelLocalTangentSpaceAlignment
                | ReductionMethod::LinearLocalTangentSpaceAlignment
        )
    }

    /// Linear projections whose target dimension is bounded by the original dimension.
    pub fn is_linear(&self) -> bool {
        matches!(
            self,
            ReductionMethod::Pca
                | ReductionMethod::LocalityPreservingProjections
                | ReductionMethod::NeighborhoodPreservingEmbedding
                | ReductionMethod::LinearLocalTangentSpaceAlignment
        )
    }

    pub fn uses_eigensolver(&self) -> bool {
        !matches!(self, ReductionMethod::StochasticProximityEmbedding)
    }

    /// Whether the method asks the backend for the smallest end of the spectrum.
    pub fn uses_smallest_eigenpairs(&self) -> bool {
        matches!(
            self,
            ReductionMethod::LaplacianEigenmaps
                | ReductionMethod::LocalityPreservingProjections
                | ReductionMethod::NeighborhoodPreservingEmbedding
                | ReductionMethod::KernelLocallyLinearEmbedding
                | ReductionMethod::KernelLocalTangentSpaceAlignment
                | ReductionMethod::LinearLocalTangentSpaceAlignment
        )
    }
}

impl FromStr for ReductionMethod {
    type Err = EmbeddingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ReductionMethod::ALL
            .iter()
            .copied()
            .find(|method| method.token() == s)
            .ok_or_else(|| EmbeddingError::UnsupportedMethod {
                kind: "reduction",
                token: s.to_string(),
            })
    }
}

impl fmt::Display for ReductionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Strategy used to find k nearest neighbors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum NeighborsMethod {
    #[default]
    BruteForce,
    CoverTree,
}

impl NeighborsMethod {
    pub const ALL: [NeighborsMethod; 2] = [NeighborsMethod::BruteForce, NeighborsMethod::CoverTree];

    pub fn token(&self) -> &'static str {
        match self {
            NeighborsMethod::BruteForce => "brute",
            NeighborsMethod::CoverTree => "covertree",
        }
    }
}

impl FromStr for NeighborsMethod {
    type Err = EmbeddingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NeighborsMethod::ALL
            .iter()
            .copied()
            .find(|method| method.token() == s)
            .ok_or_else(|| EmbeddingError::UnsupportedMethod {
                kind: "neighbors",
                token: s.to_string(),
            })
    }
}

impl fmt::Display for NeighborsMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Backend used for symmetric eigendecomposition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EigenMethod {
    #[default]
    Dense,
    /// Krylov subspace (Lanczos) iteration
    Iterative,
    Randomized,
}

impl EigenMethod {
    pub const ALL: [EigenMethod; 3] = [EigenMethod::Dense, EigenMethod::Iterative, EigenMethod::Randomized];

    pub fn token(&self) -> &'static str {
        match self {
            EigenMethod::Dense => "dense",
            EigenMethod::Iterative => "arpack",
            EigenMethod::Randomized => "randomized",
        }
    }
}

impl FromStr for EigenMethod {
    type Err = EmbeddingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EigenMethod::ALL
            .iter()
            .copied()
            .find(|method| method.token() == s)
            .ok_or_else(|| EmbeddingError::UnsupportedMethod {
                kind: "eigen",
                token: s.to_string(),
            })
    }
}

impl fmt::Display for EigenMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reduction_tokens_round_trip() {
        for method in ReductionMethod::ALL {
            let parsed: ReductionMethod = method.token().parse().unwrap();
            assert_eq!(parsed, method);
            // Parsing twice gives the same answer
            assert_eq!(method.token().parse::<ReductionMethod>().unwrap(), parsed);
        }
    }

    #[test]
    fn test_neighbor_and_eigen_tokens() {
        assert_eq!("brute".parse::<NeighborsMethod>().unwrap(), NeighborsMethod::BruteForce);
        assert_eq!("covertree".parse::<NeighborsMethod>().unwrap(), NeighborsMethod::CoverTree);
        assert_eq!("dense".parse::<EigenMethod>().unwrap(), EigenMethod::Dense);
        assert_eq!("arpack".parse::<EigenMethod>().unwrap(), EigenMethod::Iterative);
        assert_eq!("randomized".parse::<EigenMethod>().unwrap(), EigenMethod::Randomized);
    }

    #[test]
    fn test_unknown_token_is_named() {
        let err = "tsne".parse::<ReductionMethod>().unwrap_err();
        assert_eq!(
            err,
            EmbeddingError::UnsupportedMethod {
                kind: "reduction",
                token: "tsne".to_string()
            }
        );
        assert!(err.to_string().contains("'tsne'"));

        let err = "kdtree".parse::<NeighborsMethod>().unwrap_err();
        assert!(matches!(err, EmbeddingError::UnsupportedMethod { token, .. } if token == "kdtree"));

        let err = "Dense".parse::<EigenMethod>().unwrap_err();
        assert!(matches!(err, EmbeddingError::UnsupportedMethod { token, .. } if token == "Dense"));
    }

    #[test]
    fn test_method_families() {
        assert!(ReductionMethod::Pca.is_linear());
        assert!(!ReductionMethod::KernelPca.is_linear());
        assert!(ReductionMethod::Isomap.needs_neighbors());
        assert!(!ReductionMethod::MultidimensionalScaling.needs_neighbors());
        assert!(!ReductionMethod::StochasticProximityEmbedding.uses_eigensolver());
        assert!(ReductionMethod::KernelLocallyLinearEmbedding.uses_smallest_eigenpairs());
    }
}
