// Static 3D kd-tree over mesh node coordinates, built once and queried with
// axis-aligned boxes.
use std::cmp::Ordering;

use crate::bounding_box::BoundingBox;
use crate::mesh::NodeHandle;

/// Subtrees at or below this size are scanned linearly
const LEAF_SIZE: usize = 8;

#[derive(Debug, Clone)]
pub struct KdTree {
    points: Vec<[f64; 3]>,
    handles: Vec<NodeHandle>,
    /// Permutation of point indices; each subtree `[lo, hi)` stores its
    /// splitting point at `(lo + hi) / 2`.
    order: Vec<usize>,
    /// Split axis for the subtree whose median sits at this position
    axes: Vec<u8>,
}

impl KdTree {
    /// Build a tree from parallel slices of handles and coordinates.
    ///
    /// Returns `None` if any coordinate is not finite.
    pub fn build(handles: &[NodeHandle], points: &[[f64; 3]]) -> Option<Self> {
        if handles.len() != points.len() {
            return None;
        }
        if points.iter().any(|p| p.iter().any(|c| !c.is_finite())) {
            return None;
        }
        let mut tree = KdTree {
            points: points.to_vec(),
            handles: handles.to_vec(),
            order: (0..points.len()).collect(),
            axes: vec![0; points.len()],
        };
        tree.build_range(0, points.len());
        Some(tree)
    }

    fn build_range(&mut self, lo: usize, hi: usize) {
        if hi - lo <= LEAF_SIZE {
            return;
        }

        // split along the axis with the widest spread
        let mut min = [f64::INFINITY; 3];
        let mut max = [f64::NEG_INFINITY; 3];
        for &idx in &self.order[lo..hi] {
            let p = self.points[idx];
            for axis in 0..3 {
                min[axis] = min[axis].min(p[axis]);
                max[axis] = max[axis].max(p[axis]);
            }
        }
        let axis = (0..3)
            .max_by(|&a, &b| {
                (max[a] - min[a])
                    .partial_cmp(&(max[b] - min[b]))
                    .unwrap_or(Ordering::Equal)
            })
            .unwrap_or(0);

        let mid = (lo + hi) / 2;
        let points = &self.points;
        self.order[lo..hi].select_nth_unstable_by(mid - lo, |&a, &b| {
            points[a][axis].total_cmp(&points[b][axis])
        });
        self.axes[mid] = axis as u8;

        self.build_range(lo, mid);
        self.build_range(mid + 1, hi);
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// All handles whose point lies inside `region`, widened by `tolerance`
    /// on every face. Order is unspecified.
    pub fn points_in_box(&self, region: &BoundingBox, tolerance: f64) -> Vec<NodeHandle> {
        let mut found = Vec::new();
        self.query_range(0, self.points.len(), region, tolerance, &mut found);
        found
    }

    fn query_range(
        &self,
        lo: usize,
        hi: usize,
        region: &BoundingBox,
        tolerance: f64,
        found: &mut Vec<NodeHandle>,
    ) {
        if hi <= lo {
            return;
        }
        if hi - lo <= LEAF_SIZE {
            for &idx in &self.order[lo..hi] {
                if region.contains_within(&self.points[idx], tolerance) {
                    found.push(self.handles[idx]);
                }
            }
            return;
        }

        let mid = (lo + hi) / 2;
        let idx = self.order[mid];
        let axis = self.axes[mid] as usize;
        let split = self.points[idx][axis];

        if region.contains_within(&self.points[idx], tolerance) {
            found.push(self.handles[idx]);
        }
        if region.lower_left[axis] - tolerance <= split {
            self.query_range(lo, mid, region, tolerance, found);
        }
        if region.upper_right[axis] + tolerance >= split {
            self.query_range(mid + 1, hi, region, tolerance, found);
        }
    }
}
