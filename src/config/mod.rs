//! # Configuration store
//!
//! Parameters are stored as a mapping from a fixed set of [`ParameterKey`]s to
//! heterogeneous scalar values. Nothing is filled in implicitly: a caller either
//! sets every key the selected method needs, or opts into
//! [`Parameters::with_defaults`] which pre-populates the fixed values used by the
//! command line tool.

use crate::error::{EmbeddingError, Result};
use crate::methods::{EigenMethod, NeighborsMethod, ReductionMethod};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ParameterKey {
    ReductionMethod,
    NeighborsMethod,
    EigenMethod,
    NumberOfNeighbors,
    TargetDimension,
    /// Original dimension of the observations
    CurrentDimension,
    DiffusionMapTimesteps,
    GaussianKernelWidth,
    SpeGlobalStrategy,
    SpeTolerance,
    SpeNumUpdates,
    LandmarkRatio,
    /// Diagonal regularization for shift-inverted and generalized eigenproblems
    Eigenshift,
    EigenMaxIterations,
    RandomizedOversampling,
    RandomizedPowerIterations,
    RandomSeed,
}

impl ParameterKey {
    pub fn name(&self) -> &'static str {
        match self {
            ParameterKey::ReductionMethod => "REDUCTION_METHOD",
            ParameterKey::NeighborsMethod => "NEIGHBORS_METHOD",
            ParameterKey::EigenMethod => "EIGEN_EMBEDDING_METHOD",
            ParameterKey::NumberOfNeighbors => "NUMBER_OF_NEIGHBORS",
            ParameterKey::TargetDimension => "TARGET_DIMENSION",
            ParameterKey::CurrentDimension => "CURRENT_DIMENSION",
            ParameterKey::DiffusionMapTimesteps => "DIFFUSION_MAP_TIMESTEPS",
            ParameterKey::GaussianKernelWidth => "GAUSSIAN_KERNEL_WIDTH",
            ParameterKey::SpeGlobalStrategy => "SPE_GLOBAL_STRATEGY",
            ParameterKey::SpeTolerance => "SPE_TOLERANCE",
            ParameterKey::SpeNumUpdates => "SPE_NUM_UPDATES",
            ParameterKey::LandmarkRatio => "LANDMARK_RATIO",
            ParameterKey::Eigenshift => "EIGENSHIFT",
            ParameterKey::EigenMaxIterations => "EIGEN_MAX_ITERATIONS",
            ParameterKey::RandomizedOversampling => "RANDOMIZED_OVERSAMPLING",
            ParameterKey::RandomizedPowerIterations => "RANDOMIZED_POWER_ITERATIONS",
            ParameterKey::RandomSeed => "RANDOM_SEED",
        }
    }
}

impl fmt::Display for ParameterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParameterValue {
    Unsigned(usize),
    Float(f64),
    Bool(bool),
    Reduction(ReductionMethod),
    Neighbors(NeighborsMethod),
    Eigen(EigenMethod),
}

/// Types that can be stored in and read back from [`Parameters`].
pub trait ParameterType: Sized + Copy {
    const TYPE_NAME: &'static str;

    fn from_value(value: &ParameterValue) -> Option<Self>;

    fn into_value(self) -> ParameterValue;
}

macro_rules! parameter_type {
    ($ty:ty, $variant:ident, $name:expr) => {
        impl ParameterType for $ty {
            const TYPE_NAME: &'static str = $name;

            fn from_value(value: &ParameterValue) -> Option<Self> {
                match value {
                    ParameterValue::$variant(v) => Some(*v),
                    _ => None,
                }
            }

            fn into_value(self) -> ParameterValue {
                ParameterValue::$variant(self)
            }
        }
    };
}

parameter_type!(usize, Unsigned, "unsigned integer");
parameter_type!(f64, Float, "floating point");
parameter_type!(bool, Bool, "boolean");
parameter_type!(ReductionMethod, Reduction, "reduction method");
parameter_type!(NeighborsMethod, Neighbors, "neighbors method");
parameter_type!(EigenMethod, Eigen, "eigen method");

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Parameters {
    entries: HashMap<ParameterKey, ParameterValue>,
}

impl Parameters {
    pub fn new() -> Self {
        Parameters {
            entries: HashMap::new(),
        }
    }

    /// Store pre-populated with the fixed values the command line tool uses for
    /// every key that is not selected per invocation.
    pub fn with_defaults() -> Self {
        Parameters::new()
            .with(ParameterKey::DiffusionMapTimesteps, 3usize)
            .with(ParameterKey::GaussianKernelWidth, 1000.0)
            .with(ParameterKey::SpeGlobalStrategy, true)
            .with(ParameterKey::SpeTolerance, 1e-5)
            .with(ParameterKey::SpeNumUpdates, 100usize)
            .with(ParameterKey::LandmarkRatio, 0.2)
            .with(ParameterKey::Eigenshift, 1e-9)
            .with(ParameterKey::EigenMaxIterations, 1000usize)
            .with(ParameterKey::RandomizedOversampling, 10usize)
            .with(ParameterKey::RandomizedPowerIterations, 2usize)
            .with(ParameterKey::RandomSeed, 42usize)
    }

    pub fn with<T: ParameterType>(mut self, key: ParameterKey, value: T) -> Self {
        self.set(key, value);
        self
    }

    pub fn set<T: ParameterType>(&mut self, key: ParameterKey, value: T) -> &mut Self {
        self.entries.insert(key, value.into_value());
        self
    }

    pub fn contains(&self, key: ParameterKey) -> bool {
        self.entries.contains_key(&key)
    }

    pub fn get<T: ParameterType>(&self, key: ParameterKey) -> Result<T> {
        let value = self
            .entries
            .get(&key)
            .ok_or_else(|| EmbeddingError::configuration(key, "parameter is not set"))?;
        T::from_value(value).ok_or_else(|| {
            EmbeddingError::configuration(
                key,
                format!("expected a {} value, found {:?}", T::TYPE_NAME, value),
            )
        })
    }

    pub fn reduction_method(&self) -> Result<ReductionMethod> {
        self.get(ParameterKey::ReductionMethod)
    }

    fn require_at_least(&self, key: ParameterKey, min: usize) -> Result<usize> {
        let value: usize = self.get(key)?;
        if value < min {
            return Err(EmbeddingError::configuration(
                key,
                format!("must be at least {}, got {}", min, value),
            ));
        }
        Ok(value)
    }

    fn require_positive(&self, key: ParameterKey) -> Result<f64> {
        let value: f64 = self.get(key)?;
        if !(value.is_finite() && value > 0.0) {
            return Err(EmbeddingError::configuration(
                key,
                format!("must be a positive finite number, got {}", value),
            ));
        }
        Ok(value)
    }

    /// Checks that every key required by `method` is present and within its domain.
    pub fn validate(&self, method: ReductionMethod) -> Result<()> {
        self.require_at_least(ParameterKey::TargetDimension, 1)?;

        let spe_local = method == ReductionMethod::StochasticProximityEmbedding && {
            let global: bool = self.get(ParameterKey::SpeGlobalStrategy)?;
            !global
        };
        if method.needs_neighbors() || spe_local {
            self.require_at_least(ParameterKey::NumberOfNeighbors, 1)?;
            self.get::<NeighborsMethod>(ParameterKey::NeighborsMethod)?;
        }

        if method.is_linear() {
            self.require_at_least(ParameterKey::CurrentDimension, 1)?;
        }

        if method.uses_eigensolver() {
            match self.get::<EigenMethod>(ParameterKey::EigenMethod)? {
                EigenMethod::Dense => {}
                EigenMethod::Iterative => {
                    self.require_at_least(ParameterKey::EigenMaxIterations, 1)?;
                    self.get::<usize>(ParameterKey::RandomSeed)?;
                }
                EigenMethod::Randomized => {
                    self.get::<usize>(ParameterKey::RandomizedOversampling)?;
                    self.get::<usize>(ParameterKey::RandomizedPowerIterations)?;
                    self.get::<usize>(ParameterKey::RandomSeed)?;
                }
            }
        }

        if method.uses_smallest_eigenpairs() {
            self.require_positive(ParameterKey::Eigenshift)?;
        }

        match method {
            ReductionMethod::LaplacianEigenmaps | ReductionMethod::LocalityPreservingProjections => {
                self.require_positive(ParameterKey::GaussianKernelWidth)?;
            }
            ReductionMethod::DiffusionMap => {
                self.require_positive(ParameterKey::GaussianKernelWidth)?;
                self.require_at_least(ParameterKey::DiffusionMapTimesteps, 1)?;
            }
            ReductionMethod::LandmarkMultidimensionalScaling | ReductionMethod::LandmarkIsomap => {
                let ratio: f64 = self.get(ParameterKey::LandmarkRatio)?;
                if !(ratio > 0.0 && ratio <= 1.0) {
                    return Err(EmbeddingError::configuration(
                        ParameterKey::LandmarkRatio,
                        format!("must lie in (0, 1], got {}", ratio),
                    ));
                }
                self.get::<usize>(ParameterKey::RandomSeed)?;
            }
            ReductionMethod::StochasticProximityEmbedding => {
                self.require_positive(ParameterKey::SpeTolerance)?;
                self.get::<usize>(ParameterKey::SpeNumUpdates)?;
                self.get::<usize>(ParameterKey::RandomSeed)?;
            }
            _ => {}
        }

        Ok(())
    }
}
