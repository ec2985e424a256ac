//! Simplified cover tree over a metric given by a [`DistanceCallback`].
//!
//! Every observation is stored in exactly one node. A node at level `l` covers its
//! children within radius `2^l`, and each child sits one level below its parent.
//! Nodes additionally record the largest distance to any descendant, which makes
//! the k-nearest-neighbor query exact through branch-and-bound pruning whatever
//! the shape of the tree.

use super::{Candidate, KnnHeap, Neighbors};
use crate::callbacks::DistanceCallback;
use rayon::prelude::*;

// Relative slack applied to pruning bounds so rounding in the triangle
// inequality never discards a subtree holding a tied candidate.
const PRUNE_SLACK: f64 = 1e-9;

#[derive(Debug, Clone)]
struct Node {
    position: usize,
    level: i32,
    max_distance: f64,
    children: Vec<usize>,
}

pub struct CoverTree<'a, D> {
    nodes: Vec<Node>,
    root: Option<usize>,
    indices: &'a [usize],
    distance: &'a D,
}

fn covering_radius(level: i32) -> f64 {
    2f64.powi(level)
}

impl<'a, D: DistanceCallback> CoverTree<'a, D> {
    /// Inserts the observations in data set order.
    pub fn build(indices: &'a [usize], distance: &'a D) -> Self {
        let mut tree = CoverTree {
            nodes: Vec::with_capacity(indices.len()),
            root: None,
            indices,
            distance,
        };
        for position in 0..indices.len() {
            tree.insert(position);
        }
        log::trace!(
            "Cover tree built with {} nodes, root level {:?}",
            tree.nodes.len(),
            tree.root.map(|r| tree.nodes[r].level)
        );
        tree
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn distance_between(&self, a: usize, b: usize) -> f64 {
        self.distance.distance(self.indices[a], self.indices[b])
    }

    fn insert(&mut self, position: usize) {
        let root = match self.root {
            None => {
                self.nodes.push(Node {
                    position,
                    level: 0,
                    max_distance: 0.0,
                    children: Vec::new(),
                });
                self.root = Some(0);
                return;
            }
            Some(root) => root,
        };

        let d_root = self.distance_between(self.nodes[root].position, position);
        if d_root > covering_radius(self.nodes[root].level) {
            // Raise the root until it covers the new point
            let needed = d_root.log2().ceil();
            self.nodes[root].level = if needed >= i32::MAX as f64 {
                i32::MAX
            } else {
                (needed as i32).max(self.nodes[root].level)
            };
        }

        let mut current = root;
        let mut d_current = d_root;
        loop {
            let node = &mut self.nodes[current];
            node.max_distance = node.max_distance.max(d_current);

            let mut next = None;
            for &child in &self.nodes[current].children {
                let d_child = self.distance_between(self.nodes[child].position, position);
                if d_child <= covering_radius(self.nodes[child].level) {
                    next = Some((child, d_child));
                    break;
                }
            }

            match next {
                Some((child, d_child)) => {
                    current = child;
                    d_current = d_child;
                }
                None => {
                    let level = self.nodes[current].level.saturating_sub(1);
                    let id = self.nodes.len();
                    self.nodes.push(Node {
                        position,
                        level,
                        max_distance: 0.0,
                        children: Vec::new(),
                    });
                    self.nodes[current].children.push(id);
                    return;
                }
            }
        }
    }

    fn prunable(heap: &KnnHeap, lower_bound: f64) -> bool {
        match heap.worst_distance() {
            Some(worst) => lower_bound > worst + PRUNE_SLACK * worst.abs().max(1.0),
            None => false,
        }
    }

    /// The `k` nearest other observations of the observation at `query`.
    pub fn query(&self, query: usize, k: usize) -> Vec<usize> {
        let mut heap = KnnHeap::new(k);
        let root = match self.root {
            Some(root) => root,
            None => return Vec::new(),
        };

        let mut stack = vec![(root, self.distance_between(self.nodes[root].position, query))];
        while let Some((id, d_node)) = stack.pop() {
            let node = &self.nodes[id];
            if Self::prunable(&heap, d_node - node.max_distance) {
                continue;
            }
            if node.position != query {
                heap.push(Candidate {
                    distance: d_node,
                    position: node.position,
                });
            }

            let mut children: Vec<(usize, f64)> = node
                .children
                .iter()
                .map(|&child| (child, self.distance_between(self.nodes[child].position, query)))
                .collect();
            // Farthest first so the nearest child is explored next
            children.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| b.0.cmp(&a.0)));
            for (child, d_child) in children {
                if !Self::prunable(&heap, d_child - self.nodes[child].max_distance) {
                    stack.push((child, d_child));
                }
            }
        }

        heap.into_positions()
    }

    pub fn find_neighbors(&self, k: usize) -> Neighbors {
        (0..self.indices.len())
            .into_par_iter()
            .map(|position| self.query(position, k))
            .collect()
    }
}
