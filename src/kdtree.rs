//! Static 2-D k-d tree over gazetteer coordinates.
//!
//! The tree stores only (latitude, longitude) keys and the row position each
//! key came from. Row `i` of the gazetteer table is always referred to as `i`
//! here; record content lives in the table alone.
//!
//! Levels split alternately on latitude and longitude at the median, so the
//! tree is balanced and construction is O(n log n). Queries keep a bounded
//! max-heap of the best `k` candidates and prune subtrees whose splitting plane
//! lies farther away than the current worst candidate.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use tracing::debug;

use crate::error::{Error, Result};

/// Maximum number of points held by a leaf before it is split.
const LEAF_SIZE: usize = 8;

/// A row of the gazetteer found by a query, with its planar distance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Position of the record in the gazetteer table
    pub row: usize,
    /// Euclidean distance on the raw (latitude, longitude) degrees
    pub distance: f64,
}

/// Nodes live in a flat vector and refer to each other by position.
#[derive(Debug, Clone)]
enum Node {
    Split {
        dim: usize,
        value: f64,
        left: usize,
        right: usize,
    },
    /// Range `[start..end)` into `points` / `rows`.
    Leaf { start: usize, end: usize },
}

/// Immutable k-nearest-neighbor index.
///
/// Safe to share between threads once built: queries take `&self` and
/// allocate only their own candidate heap.
///
/// # Examples
///
/// ```
/// use geocity::SpatialIndex;
///
/// let index = SpatialIndex::build(&[[0.0, 0.0], [1.0, 1.0], [5.0, 5.0]]).unwrap();
/// let found = index.nearest([0.9, 0.8], 2);
/// assert_eq!(found.iter().map(|n| n.row).collect::<Vec<_>>(), vec![1, 0]);
/// ```
#[derive(Debug, Clone)]
pub struct SpatialIndex {
    nodes: Vec<Node>,
    points: Vec<[f64; 2]>,
    rows: Vec<usize>,
}

impl SpatialIndex {
    /// Builds the tree over `points`, where `points[i]` is the coordinate of row `i`.
    ///
    /// # Errors
    ///
    /// [`Error::Construction`] if `points` is empty or holds a non-finite value.
    pub fn build(points: &[[f64; 2]]) -> Result<Self> {
        if points.is_empty() {
            return Err(Error::Construction("no points to index".to_string()));
        }
        if let Some(row) = points
            .iter()
            .position(|p| !p[0].is_finite() || !p[1].is_finite())
        {
            return Err(Error::Construction(format!(
                "row {} has a non-finite coordinate",
                row
            )));
        }

        let n = points.len();
        let mut tree = SpatialIndex {
            nodes: Vec::with_capacity(2 * n / LEAF_SIZE + 1),
            points: points.to_vec(),
            rows: Vec::new(),
        };

        let mut order: Vec<usize> = (0..n).collect();
        tree.build_recursive(&mut order, 0, n, 0);

        let reordered: Vec<[f64; 2]> = order.iter().map(|&row| points[row]).collect();
        tree.points = reordered;
        tree.rows = order;

        debug!(points = n, nodes = tree.nodes.len(), "built spatial index");
        Ok(tree)
    }

    fn build_recursive(
        &mut self,
        order: &mut [usize],
        start: usize,
        end: usize,
        depth: usize,
    ) -> usize {
        let count = end - start;

        if count <= LEAF_SIZE {
            let node_idx = self.nodes.len();
            self.nodes.push(Node::Leaf { start, end });
            return node_idx;
        }

        let dim = depth % 2;
        let half = count / 2;
        let points = &self.points;
        // Rows break ties so the layout does not depend on the selection algorithm.
        order[start..end].select_nth_unstable_by(half, |&a, &b| {
            points[a][dim]
                .total_cmp(&points[b][dim])
                .then_with(|| a.cmp(&b))
        });
        let median = start + half;
        let value = points[order[median]][dim];

        let node_idx = self.nodes.len();
        self.nodes.push(Node::Leaf { start: 0, end: 0 });

        let left = self.build_recursive(order, start, median, depth + 1);
        let right = self.build_recursive(order, median, end, depth + 1);

        self.nodes[node_idx] = Node::Split {
            dim,
            value,
            left,
            right,
        };

        node_idx
    }

    /// Number of indexed points, equal to the number of table rows.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Always `false`; an index cannot be built over an empty table.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Finds the `min(k, len)` rows closest to `point`.
    ///
    /// Results are sorted by ascending distance; equidistant rows come out in
    /// ascending row order. `k == 0` yields an empty list.
    pub fn nearest(&self, point: [f64; 2], k: usize) -> Vec<Neighbor> {
        let k = k.min(self.len());
        if k == 0 {
            return Vec::new();
        }

        let mut best = BinaryHeap::with_capacity(k + 1);
        self.nearest_recursive(0, &point, k, &mut best);

        best.into_sorted_vec()
            .into_iter()
            .map(|c| Neighbor {
                row: c.row,
                distance: c.dist_sq.sqrt(),
            })
            .collect()
    }

    fn nearest_recursive(
        &self,
        node_idx: usize,
        query: &[f64; 2],
        k: usize,
        best: &mut BinaryHeap<Candidate>,
    ) {
        match self.nodes[node_idx] {
            Node::Leaf { start, end } => {
                for i in start..end {
                    let candidate = Candidate {
                        dist_sq: squared_distance(query, &self.points[i]),
                        row: self.rows[i],
                    };
                    if best.len() < k {
                        best.push(candidate);
                    } else if best.peek().is_some_and(|worst| candidate < *worst) {
                        best.pop();
                        best.push(candidate);
                    }
                }
            }
            Node::Split {
                dim,
                value,
                left,
                right,
            } => {
                let diff = query[dim] - value;
                let diff_sq = diff * diff;

                let (near, far) = if query[dim] <= value {
                    (left, right)
                } else {
                    (right, left)
                };

                self.nearest_recursive(near, query, k, best);

                // Equal distances must still be visited: a lower row may be waiting there.
                let visit_far = best.len() < k
                    || best.peek().is_some_and(|worst| diff_sq <= worst.dist_sq);
                if visit_far {
                    self.nearest_recursive(far, query, k, best);
                }
            }
        }
    }
}

/// Heap entry ordered by distance, then row, so the heap top is the worst match.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    dist_sq: f64,
    row: usize,
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
        self.dist_sq
            .total_cmp(&other.dist_sq)
            .then_with(|| self.row.cmp(&other.row))
    }
}

#[inline]
fn squared_distance(a: &[f64; 2], b: &[f64; 2]) -> f64 {
    let dlat = a[0] - b[0];
    let dlon = a[1] - b[1];
    dlat * dlat + dlon * dlon
}
