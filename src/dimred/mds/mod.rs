//! # Multidimensional scaling
//!
//! Classical scaling of a distance matrix, its landmark approximation, and the
//! geodesic variants (Isomap, Landmark Isomap) that replace plain distances by
//! shortest-path distances over the neighbor graph.

use super::{scaled_coordinates, Embedding};
use crate::callbacks::{distance_matrix, evaluate_grid, DistanceCallback};
use crate::config::{ParameterKey, Parameters};
use crate::eigen::{eigen_decompose, EigenDecomposition, EigenRequest, EigenSettings};
use crate::error::{EmbeddingError, Result};
use crate::neighbors::Neighbors;
use crate::utils::{double_center, symmetrize};
use ndarray::{Array1, Array2, Axis};
use petgraph::graph::{NodeIndex, UnGraph};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

/// Landmark selection for the landmark variants.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LandmarkOptions {
    /// Fraction of observations used as landmarks, in (0, 1]
    pub ratio: f64,
    pub seed: u64,
}

impl LandmarkOptions {
    pub fn from_parameters(params: &Parameters) -> Result<Self> {
        let seed: usize = params.get(ParameterKey::RandomSeed)?;
        Ok(LandmarkOptions {
            ratio: params.get(ParameterKey::LandmarkRatio)?,
            seed: seed as u64,
        })
    }
}

/// Eigenpairs of `B = −½ J (Δ∘Δ) J` for a matrix of plain distances `Δ`.
fn classical_scaling(distances: &Array2<f64>, target_dimension: usize, settings: &EigenSettings) -> Result<EigenDecomposition> {
    let mut b = distances.mapv(|d| -0.5 * d * d);
    double_center(&mut b);
    symmetrize(&mut b);
    eigen_decompose(&b, EigenRequest::largest(target_dimension), settings)
}

/// Classical (Torgerson) multidimensional scaling over all pairwise distances.
pub fn multidimensional_scaling<D: DistanceCallback>(
    indices: &[usize],
    distance: &D,
    target_dimension: usize,
    settings: &EigenSettings,
) -> Result<Embedding> {
    let distances = distance_matrix(indices, distance)?;
    let decomposition = classical_scaling(&distances, target_dimension, settings)?;
    Ok(Embedding::from_decomposition(scaled_coordinates(&decomposition), decomposition))
}

/// Undirected neighbor graph weighted by the distance between neighbors.
pub(crate) fn neighbor_graph<D: DistanceCallback>(indices: &[usize], distance: &D, neighbors: &Neighbors) -> UnGraph<(), f64> {
    let n = indices.len();
    let edge_count: usize = neighbors.iter().map(Vec::len).sum();
    let mut graph = UnGraph::with_capacity(n, edge_count);
    for _ in 0..n {
        graph.add_node(());
    }

    for (p, list) in neighbors.iter().enumerate() {
        for &q in list {
            // A mutual pair is listed twice; keep one edge
            if p < q || !neighbors[q].contains(&p) {
                let weight = distance.distance(indices[p], indices[q]);
                graph.add_edge(NodeIndex::new(p), NodeIndex::new(q), weight);
            }
        }
    }
    graph
}

/// Shortest-path distances from every source to every node, one row per source.
///
/// A node unreachable from some source means the neighbor graph is
/// disconnected, which is reported against the neighbor count.
pub(crate) fn geodesic_distances(graph: &UnGraph<(), f64>, sources: &[usize]) -> Result<Array2<f64>> {
    let n = graph.node_count();
    let rows: Vec<Vec<f64>> = sources
        .par_iter()
        .map(|&source| {
            let reached = petgraph::algo::dijkstra(graph, NodeIndex::new(source), None, |edge| *edge.weight());
            let mut row = vec![f64::INFINITY; n];
            for (node, d) in reached {
                row[node.index()] = d;
            }
            row
        })
        .collect();

    let mut geodesics = Array2::zeros((sources.len(), n));
    for (r, row) in rows.into_iter().enumerate() {
        if row.iter().any(|d| !d.is_finite()) {
            return Err(EmbeddingError::configuration(
                ParameterKey::NumberOfNeighbors,
                "neighbor graph is disconnected, increase the number of neighbors",
            ));
        }
        geodesics.row_mut(r).assign(&Array1::from(row));
    }
    log::debug!("Computed geodesic distances from {} sources", sources.len());
    Ok(geodesics)
}

/// Isomap: classical scaling of geodesic distances over the neighbor graph.
pub fn isomap<D: DistanceCallback>(
    indices: &[usize],
    distance: &D,
    neighbors: &Neighbors,
    target_dimension: usize,
    settings: &EigenSettings,
) -> Result<Embedding> {
    let graph = neighbor_graph(indices, distance, neighbors);
    let sources: Vec<usize> = (0..indices.len()).collect();
    let mut geodesics = geodesic_distances(&graph, &sources)?;
    symmetrize(&mut geodesics);

    let decomposition = classical_scaling(&geodesics, target_dimension, settings)?;
    Ok(Embedding::from_decomposition(scaled_coordinates(&decomposition), decomposition))
}

/// Sorted landmark positions: `ceil(ratio · n)` of them, at least one more than
/// the target dimension and at most `n`.
pub(crate) fn select_landmarks(n: usize, target_dimension: usize, options: &LandmarkOptions) -> Vec<usize> {
    let count = ((options.ratio * n as f64).ceil() as usize).max(target_dimension + 1).min(n);
    if count == n {
        return (0..n).collect();
    }

    let mut rng = ChaCha8Rng::seed_from_u64(options.seed);
    let mut landmarks = rand::seq::index::sample(&mut rng, n, count).into_vec();
    landmarks.sort_unstable();
    landmarks
}

/// Landmark embedding with distance-based triangulation.
///
/// `distances` holds one row per landmark with its distances to every
/// observation. Classical scaling of the landmark block gives the landmark
/// coordinates `L = V Λ^{1/2}`; every other observation `a` is placed at
/// `x_a = −½ L♯ (δ_a − δ̄)`, where `δ_a` are its squared distances to the
/// landmarks, `δ̄` the mean squared distance of each landmark to the others and
/// `L♯ = Λ^{-1/2} Vᵀ`.
fn triangulate(
    distances: &Array2<f64>,
    landmarks: &[usize],
    target_dimension: usize,
    settings: &EigenSettings,
) -> Result<Embedding> {
    let l = landmarks.len();
    let n = distances.ncols();
    let mut landmark_block = distances.select(Axis(1), landmarks);
    symmetrize(&mut landmark_block);

    let decomposition = classical_scaling(&landmark_block, target_dimension, settings)?;
    let landmark_coordinates = scaled_coordinates(&decomposition);

    let squared = distances.mapv(|d| d * d);
    let mean_squared = landmark_block.mapv(|d| d * d).sum_axis(Axis(1)) / l as f64;

    let pseudo_inverse = Array2::from_shape_fn((target_dimension, l), |(j, r)| {
        let lambda = decomposition.values[j];
        if lambda > 0.0 {
            decomposition.vectors[[r, j]] / lambda.sqrt()
        } else {
            0.0
        }
    });

    let mut centered = squared;
    for mut column in centered.columns_mut() {
        column -= &mean_squared;
    }
    let mut coordinates = pseudo_inverse.dot(&centered) * -0.5;
    for (c, &position) in landmarks.iter().enumerate() {
        coordinates.column_mut(position).assign(&landmark_coordinates.column(c));
    }

    log::debug!("Triangulated {} observations from {} landmarks", n - l, l);
    Ok(Embedding::from_decomposition(coordinates, decomposition))
}

/// Landmark MDS: classical scaling restricted to a random landmark subset,
/// extended to all observations by triangulation.
pub fn landmark_multidimensional_scaling<D: DistanceCallback>(
    indices: &[usize],
    distance: &D,
    target_dimension: usize,
    options: &LandmarkOptions,
    settings: &EigenSettings,
) -> Result<Embedding> {
    let landmarks = select_landmarks(indices.len(), target_dimension, options);
    let landmark_indices: Vec<usize> = landmarks.iter().map(|&p| indices[p]).collect();
    let distances = evaluate_grid(&landmark_indices, indices, |a, b| distance.distance(a, b))?;
    triangulate(&distances, &landmarks, target_dimension, settings)
}

/// Landmark Isomap: geodesic distances from the landmarks only, then landmark
/// triangulation.
pub fn landmark_isomap<D: DistanceCallback>(
    indices: &[usize],
    distance: &D,
    neighbors: &Neighbors,
    target_dimension: usize,
    options: &LandmarkOptions,
    settings: &EigenSettings,
) -> Result<Embedding> {
    let landmarks = select_landmarks(indices.len(), target_dimension, options);
    let graph = neighbor_graph(indices, distance, neighbors);
    let geodesics = geodesic_distances(&graph, &landmarks)?;
    triangulate(&geodesics, &landmarks, target_dimension, settings)
}
