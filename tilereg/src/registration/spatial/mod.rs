//! Spatial index for nearest-landmark queries.
//!
//! A 2D k-d tree built once over the moving landmarks and queried once per
//! fixed landmark during correspondence matching.

use glam::DVec2;

#[cfg(test)]
mod tests;

/// Result of a nearest-neighbour query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Index into the point slice the tree was built from.
    pub index: usize,
    /// Squared Euclidean distance to the query.
    pub dist_sq: f64,
}

/// A 2D k-d tree over landmark positions.
#[derive(Debug)]
pub struct KdTree {
    nodes: Vec<KdNode>,
    points: Vec<DVec2>,
}

#[derive(Debug, Clone)]
struct KdNode {
    /// Index into the points array
    point_idx: usize,
    left: Option<usize>,
    right: Option<usize>,
    /// Split dimension (0 = x, 1 = y)
    split_dim: usize,
}

impl KdTree {
    /// Build a balanced tree using median splits.
    ///
    /// Returns `None` for an empty point set.
    pub fn build(points: &[DVec2]) -> Option<Self> {
        if points.is_empty() {
            return None;
        }

        let points = points.to_vec();
        let mut indices: Vec<usize> = (0..points.len()).collect();
        let mut nodes = Vec::with_capacity(points.len());

        Self::build_recursive(&points, &mut indices, 0, &mut nodes);

        Some(Self { nodes, points })
    }

    fn build_recursive(
        points: &[DVec2],
        indices: &mut [usize],
        depth: usize,
        nodes: &mut Vec<KdNode>,
    ) -> Option<usize> {
        if indices.is_empty() {
            return None;
        }

        let split_dim = depth % 2;
        let median = indices.len() / 2;
        indices.select_nth_unstable_by(median, |&a, &b| {
            axis(points[a], split_dim).total_cmp(&axis(points[b], split_dim))
        });
        let point_idx = indices[median];

        let node_idx = nodes.len();
        nodes.push(KdNode {
            point_idx,
            left: None,
            right: None,
            split_dim,
        });

        let (left_indices, right_part) = indices.split_at_mut(median);
        let right_indices = &mut right_part[1..];

        let left = Self::build_recursive(points, left_indices, depth + 1, nodes);
        let right = Self::build_recursive(points, right_indices, depth + 1, nodes);

        nodes[node_idx].left = left;
        nodes[node_idx].right = right;

        Some(node_idx)
    }

    /// Find the closest point to `query`.
    ///
    /// Ties are broken towards the lower point index so results do not depend
    /// on tree layout.
    pub fn nearest(&self, query: DVec2) -> Option<Neighbor> {
        if self.nodes.is_empty() {
            return None;
        }
        let mut best = Neighbor {
            index: usize::MAX,
            dist_sq: f64::INFINITY,
        };
        self.nearest_recursive(0, query, &mut best);
        Some(best)
    }

    fn nearest_recursive(&self, node_idx: usize, query: DVec2, best: &mut Neighbor) {
        let node = &self.nodes[node_idx];
        let point = self.points[node.point_idx];

        let dist_sq = query.distance_squared(point);
        if dist_sq < best.dist_sq || (dist_sq == best.dist_sq && node.point_idx < best.index) {
            *best = Neighbor {
                index: node.point_idx,
                dist_sq,
            };
        }

        let diff = axis(query, node.split_dim) - axis(point, node.split_dim);
        let (first, second) = if diff < 0.0 {
            (node.left, node.right)
        } else {
            (node.right, node.left)
        };

        if let Some(first_idx) = first {
            self.nearest_recursive(first_idx, query, best);
        }

        // The far side can only hold a closer (or tied) point if the split
        // plane is within the current best radius.
        if let Some(second_idx) = second {
            if diff * diff <= best.dist_sq {
                self.nearest_recursive(second_idx, query, best);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

#[inline]
fn axis(p: DVec2, dim: usize) -> f64 {
    if dim == 0 { p.x } else { p.y }
}
