use super::{Candidate, KnnHeap, Neighbors};
use crate::callbacks::DistanceCallback;
use rayon::prelude::*;

/// Exhaustive k-nearest-neighbor search, `O(N² log k)` distance evaluations.
pub fn find_neighbors<D: DistanceCallback>(indices: &[usize], distance: &D, k: usize) -> Neighbors {
    (0..indices.len())
        .into_par_iter()
        .map(|i| {
            let mut heap = KnnHeap::new(k);
            for (j, &index) in indices.iter().enumerate() {
                if j == i {
                    continue;
                }
                heap.push(Candidate {
                    distance: distance.distance(indices[i], index),
                    position: j,
                });
            }
            heap.into_positions()
        })
        .collect()
}
