//! # Neighbor graph construction
//!
//! For every observation of the data set the `k` nearest other observations are
//! found according to a [`DistanceCallback`]. Neighbors are reported as positions
//! into the data set (not as raw observation indices), ordered by increasing
//! distance; equal distances are ordered by the smaller position.
//!
//! Two strategies are available and return identical neighbor lists for exact
//! distances:
//! - [`brute`]: scan every other observation with a bounded max-heap
//! - [`cover_tree`]: hierarchical metric index with branch-and-bound queries

use crate::callbacks::DistanceCallback;
use crate::error::{EmbeddingError, Result};
use crate::methods::NeighborsMethod;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

pub mod brute;
pub mod cover_tree;

pub use cover_tree::CoverTree;

/// `neighbors[i]` lists the positions of the k nearest neighbors of position `i`.
pub type Neighbors = Vec<Vec<usize>>;

/// A neighbor candidate ordered by distance, then by position.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Candidate {
    pub(crate) distance: f64,
    pub(crate) position: usize,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then_with(|| self.position.cmp(&other.position))
    }
}

/// Keeps the `k` smallest candidates seen so far.
pub(crate) struct KnnHeap {
    k: usize,
    heap: BinaryHeap<Candidate>,
}

impl KnnHeap {
    pub(crate) fn new(k: usize) -> Self {
        KnnHeap {
            k,
            heap: BinaryHeap::with_capacity(k + 1),
        }
    }

    pub(crate) fn push(&mut self, candidate: Candidate) {
        if self.heap.len() < self.k {
            self.heap.push(candidate);
        } else if let Some(worst) = self.heap.peek() {
            if candidate < *worst {
                self.heap.pop();
                self.heap.push(candidate);
            }
        }
    }

    /// Distance of the current k-th candidate, once k candidates were collected.
    pub(crate) fn worst_distance(&self) -> Option<f64> {
        if self.heap.len() < self.k {
            None
        } else {
            self.heap.peek().map(|c| c.distance)
        }
    }

    pub(crate) fn into_positions(self) -> Vec<usize> {
        self.heap
            .into_sorted_vec()
            .into_iter()
            .map(|c| c.position)
            .collect()
    }
}

pub(crate) fn check_neighbor_count(k: usize, n: usize) -> Result<()> {
    if k == 0 {
        return Err(EmbeddingError::dimensionality(
            "number of neighbors must be at least 1",
        ));
    }
    if k >= n {
        return Err(EmbeddingError::dimensionality(format!(
            "number of neighbors ({}) must be smaller than the number of observations ({})",
            k, n
        )));
    }
    Ok(())
}

/// Finds the `k` nearest neighbors of every observation in `indices`.
pub fn find_neighbors<D: DistanceCallback>(
    method: NeighborsMethod,
    indices: &[usize],
    distance: &D,
    k: usize,
) -> Result<Neighbors> {
    check_neighbor_count(k, indices.len())?;
    log::debug!(
        "Searching {} nearest neighbors of {} observations using {}",
        k,
        indices.len(),
        method
    );

    let neighbors = match method {
        NeighborsMethod::BruteForce => brute::find_neighbors(indices, distance, k),
        NeighborsMethod::CoverTree => CoverTree::build(indices, distance).find_neighbors(k),
    };
    Ok(neighbors)
}
