//! # Stochastic Proximity Embedding
//!
//! Coordinates start uniformly at random in the unit cube. Every round applies
//! `N / 2` pair corrections that move both points of a pair along their
//! difference so that their embedded distance approaches their original
//! distance, scaled by a learning rate that decays geometrically over the rounds.
//!
//! With the global strategy a round pairs the observations of a random
//! permutation; with the local strategy every sampled observation is paired with
//! one of its nearest neighbors.

use super::Embedding;
use crate::callbacks::DistanceCallback;
use crate::config::{ParameterKey, Parameters};
use crate::error::Result;
use crate::neighbors::Neighbors;
use crate::progress::ProgressLogger;
use ndarray::Array2;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Guards the correction against coincident embedded points.
const DISTANCE_EPSILON: f64 = 1e-10;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeOptions {
    pub global_strategy: bool,
    /// Average per-round coordinate change below which the optimization stops
    pub tolerance: f64,
    pub num_updates: usize,
    pub seed: u64,
}

impl SpeOptions {
    pub fn from_parameters(params: &Parameters) -> Result<Self> {
        let seed: usize = params.get(ParameterKey::RandomSeed)?;
        Ok(SpeOptions {
            global_strategy: params.get(ParameterKey::SpeGlobalStrategy)?,
            tolerance: params.get(ParameterKey::SpeTolerance)?,
            num_updates: params.get(ParameterKey::SpeNumUpdates)?,
            seed: seed as u64,
        })
    }
}

fn draw_initial(rng: &mut ChaCha8Rng, target_dimension: usize, n: usize) -> Array2<f64> {
    Array2::from_shape_fn((target_dimension, n), |_| rng.random::<f64>())
}

/// Seed coordinates the optimization starts from for the given seed.
pub fn initial_coordinates(target_dimension: usize, n: usize, seed: u64) -> Array2<f64> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    draw_initial(&mut rng, target_dimension, n)
}

/// Moves `a` and `b` towards the target distance. Returns the length of the
/// displacement applied to each point.
fn correct_pair(coordinates: &mut Array2<f64>, a: usize, b: usize, target: f64, rate: f64) -> f64 {
    let difference = &coordinates.column(a) - &coordinates.column(b);
    let current = difference.dot(&difference).sqrt();
    let scale = rate * 0.5 * (target - current) / (current + DISTANCE_EPSILON);

    coordinates.column_mut(a).scaled_add(scale, &difference);
    coordinates.column_mut(b).scaled_add(-scale, &difference);
    scale.abs() * current
}

/// Pairs for one round as positions into the data set.
fn sample_pairs(rng: &mut ChaCha8Rng, n: usize, neighbors: Option<&Neighbors>) -> Vec<(usize, usize)> {
    let mut order: Vec<usize> = (0..n).collect();
    order.shuffle(rng);
    let half = n / 2;

    match neighbors {
        None => (0..half).map(|i| (order[i], order[half + i])).collect(),
        Some(neighbors) => order[..half]
            .iter()
            .map(|&p| {
                let list = &neighbors[p];
                (p, list[rng.random_range(0..list.len())])
            })
            .collect(),
    }
}

/// Stochastic proximity embedding of the observations in `indices`.
///
/// `neighbors` must be given for the local strategy and is ignored by the global
/// one. Zero update rounds return [`initial_coordinates`] unchanged.
pub fn stochastic_proximity_embedding<D: DistanceCallback>(
    indices: &[usize],
    distance: &D,
    neighbors: Option<&Neighbors>,
    target_dimension: usize,
    options: &SpeOptions,
    progress: &dyn ProgressLogger,
) -> Result<Embedding> {
    let n = indices.len();
    let mut rng = ChaCha8Rng::seed_from_u64(options.seed);
    let mut coordinates = draw_initial(&mut rng, target_dimension, n);
    let neighbors = if options.global_strategy { None } else { neighbors };

    let mut rate = 1.0;
    for round in 0..options.num_updates {
        let pairs = sample_pairs(&mut rng, n, neighbors);
        if pairs.is_empty() {
            break;
        }

        let mut total_change = 0.0;
        for &(a, b) in &pairs {
            let target = distance.distance(indices[a], indices[b]);
            total_change += correct_pair(&mut coordinates, a, b, target, rate);
        }
        rate -= rate / options.num_updates as f64;

        let average_change = total_change / pairs.len() as f64;
        log::trace!("SPE round {}: average change {:.3e}", round, average_change);
        if average_change < options.tolerance {
            progress.info(&format!(
                "Stochastic proximity embedding converged after {} rounds",
                round + 1
            ));
            break;
        }
    }

    Ok(Embedding {
        coordinates,
        eigenvalues: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callbacks::EuclideanDistance;
    use crate::dimred::tests::{helix, parameters, run};
    use crate::methods::{NeighborsMethod, ReductionMethod};
    use crate::neighbors::find_neighbors;
    use crate::progress::NoProgress;

    fn options(num_updates: usize) -> SpeOptions {
        SpeOptions {
            global_strategy: true,
            tolerance: 1e-9,
            num_updates,
            seed: 17,
        }
    }

    fn stress(coordinates: &Array2<f64>, data: &Array2<f64>) -> f64 {
        let n = data.ncols();
        let mut total = 0.0;
        for i in 0..n {
            for j in (i + 1)..n {
                let de = &coordinates.column(i) - &coordinates.column(j);
                let dd = &data.column(i) - &data.column(j);
                total += (de.dot(&de).sqrt() - dd.dot(&dd).sqrt()).powi(2);
            }
        }
        total
    }

    #[test]
    fn test_zero_updates_return_seed_coordinates() {
        let data = helix(15, 1);
        let distance = EuclideanDistance::new(data.view());
        let indices: Vec<usize> = (0..15).collect();
        let embedding =
            stochastic_proximity_embedding(&indices, &distance, None, 2, &options(0), &NoProgress).unwrap();
        assert_eq!(embedding.coordinates, initial_coordinates(2, 15, 17));
    }

    #[test]
    fn test_zero_updates_through_engine() {
        let data = helix(15, 1);
        let params = parameters(ReductionMethod::StochasticProximityEmbedding, 3, 2, 3)
            .with(ParameterKey::SpeNumUpdates, 0usize)
            .with(ParameterKey::RandomSeed, 5usize);
        let embedding = run(&data, &params).unwrap();
        assert_eq!(embedding.coordinates, initial_coordinates(2, 15, 5));
    }

    #[test]
    fn test_updates_reduce_stress() {
        let data = helix(30, 2);
        let distance = EuclideanDistance::new(data.view());
        let indices: Vec<usize> = (0..30).collect();

        let initial = initial_coordinates(2, 30, 17);
        let global = stochastic_proximity_embedding(&indices, &distance, None, 2, &options(200), &NoProgress).unwrap();
        assert!(stress(&global.coordinates, &data) < 0.5 * stress(&initial, &data));

        let neighbors = find_neighbors(NeighborsMethod::BruteForce, &indices, &distance, 5).unwrap();
        let mut local_options = options(200);
        local_options.global_strategy = false;
        let local =
            stochastic_proximity_embedding(&indices, &distance, Some(&neighbors), 2, &local_options, &NoProgress)
                .unwrap();
        assert_ne!(local.coordinates, global.coordinates);
        assert!(local.coordinates.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_tolerance_stops_early() {
        let data = helix(10, 3);
        let distance = EuclideanDistance::new(data.view());
        let indices: Vec<usize> = (0..10).collect();
        let mut loose = options(50);
        loose.tolerance = 1e6;

        let progress = crate::progress::tests::RecordingProgress::default();
        let early = stochastic_proximity_embedding(&indices, &distance, None, 2, &loose, &progress).unwrap();
        let mut one_round = loose;
        one_round.num_updates = 1;
        let single = stochastic_proximity_embedding(&indices, &distance, None, 2, &one_round, &NoProgress).unwrap();

        assert_eq!(
            progress.messages.borrow().as_slice(),
            ["Stochastic proximity embedding converged after 1 rounds"]
        );
        assert_eq!(early.coordinates, single.coordinates);
        assert_ne!(early.coordinates, initial_coordinates(2, 10, 17));
    }
}
