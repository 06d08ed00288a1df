use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::bounding_box::BoundingBox;
use crate::error::{KdeError, Result};
use crate::kd_tree::KdTree;

/// Opaque handle identifying a mesh node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeHandle(pub usize);

impl fmt::Display for NodeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Static spatial index over the mesh nodes.
pub trait SpatialIndex {
    /// Build the index from the currently loaded nodes
    fn build_index(&mut self) -> Result<()>;

    /// False until [`SpatialIndex::build_index`] has succeeded on a mesh with nodes
    fn is_indexed(&self) -> bool;

    /// All indexed nodes inside `region`, widened by `tolerance` on every face.
    /// Handles may be returned in any order.
    fn nodes_in_box(&self, region: &BoundingBox, tolerance: f64) -> Result<Vec<NodeHandle>>;
}

/// Mesh backend the tally reads coordinates from and writes results to.
///
/// Attributes are keyed by name and hold a fixed-length `f64` vector per
/// node (or per run for run-level attributes).
pub trait MeshBackend: SpatialIndex {
    fn nodes(&self) -> Vec<NodeHandle>;

    fn coords(&self, node: NodeHandle) -> Result<[f64; 3]>;

    fn has_node_attribute(&self, name: &str) -> bool;

    fn node_attribute(&self, name: &str, node: NodeHandle) -> Option<&[f64]>;

    fn set_node_attribute(&mut self, name: &str, node: NodeHandle, values: &[f64]) -> Result<()>;

    fn run_attribute(&self, name: &str) -> Option<&[f64]>;

    fn set_run_attribute(&mut self, name: &str, values: &[f64]) -> Result<()>;
}

/// In-memory point mesh with a kd-tree index and attribute storage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PointMesh {
    points: Vec<[f64; 3]>,
    node_attributes: BTreeMap<String, HashMap<NodeHandle, Vec<f64>>>,
    run_attributes: BTreeMap<String, Vec<f64>>,
    #[serde(skip)]
    index: Option<KdTree>,
}

impl PointMesh {
    /// Create a mesh from node coordinates; node `i` gets handle `NodeHandle(i)`.
    /// The spatial index is not built yet.
    pub fn new(points: Vec<[f64; 3]>) -> Self {
        Self {
            points,
            ..Default::default()
        }
    }

    /// Regular grid of `counts[i]` nodes per axis spanning `domain` (inclusive).
    pub fn regular_grid(domain: &BoundingBox, counts: [usize; 3]) -> Self {
        let step = |axis: usize| {
            if counts[axis] > 1 {
                domain.width[axis] / (counts[axis] - 1) as f64
            } else {
                0.0
            }
        };
        let (dx, dy, dz) = (step(0), step(1), step(2));
        let mut points = Vec::with_capacity(counts[0] * counts[1] * counts[2]);
        for i in 0..counts[0] {
            for j in 0..counts[1] {
                for k in 0..counts[2] {
                    points.push([
                        domain.lower_left[0] + i as f64 * dx,
                        domain.lower_left[1] + j as f64 * dy,
                        domain.lower_left[2] + k as f64 * dz,
                    ]);
                }
            }
        }
        Self::new(points)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Names of all node attributes currently stored
    pub fn node_attribute_names(&self) -> Vec<&str> {
        self.node_attributes.keys().map(String::as_str).collect()
    }

    fn check_node(&self, node: NodeHandle) -> Result<()> {
        if node.0 < self.points.len() {
            Ok(())
        } else {
            Err(KdeError::MissingNode(node))
        }
    }
}

impl SpatialIndex for PointMesh {
    fn build_index(&mut self) -> Result<()> {
        if self.points.is_empty() {
            self.index = None;
            return Ok(());
        }
        let handles: Vec<NodeHandle> = (0..self.points.len()).map(NodeHandle).collect();
        match KdTree::build(&handles, &self.points) {
            Some(tree) => {
                self.index = Some(tree);
                Ok(())
            }
            None => Err(KdeError::backend(
                "building kd-tree",
                "mesh contains non-finite node coordinates",
            )),
        }
    }

    fn is_indexed(&self) -> bool {
        self.index.is_some()
    }

    fn nodes_in_box(&self, region: &BoundingBox, tolerance: f64) -> Result<Vec<NodeHandle>> {
        Ok(self
            .index
            .as_ref()
            .map(|tree| tree.points_in_box(region, tolerance))
            .unwrap_or_default())
    }
}

impl MeshBackend for PointMesh {
    fn nodes(&self) -> Vec<NodeHandle> {
        (0..self.points.len()).map(NodeHandle).collect()
    }

    fn coords(&self, node: NodeHandle) -> Result<[f64; 3]> {
        self.points
            .get(node.0)
            .copied()
            .ok_or(KdeError::MissingNode(node))
    }

    fn has_node_attribute(&self, name: &str) -> bool {
        self.node_attributes.contains_key(name)
    }

    fn node_attribute(&self, name: &str, node: NodeHandle) -> Option<&[f64]> {
        self.node_attributes
            .get(name)
            .and_then(|values| values.get(&node))
            .map(Vec::as_slice)
    }

    fn set_node_attribute(&mut self, name: &str, node: NodeHandle, values: &[f64]) -> Result<()> {
        self.check_node(node)?;
        let attribute = self.node_attributes.entry(name.to_string()).or_default();
        if let Some(existing) = attribute.values().next() {
            if existing.len() != values.len() {
                return Err(KdeError::backend(
                    format!("writing attribute {}", name),
                    format!(
                        "expected {} values per node, got {}",
                        existing.len(),
                        values.len()
                    ),
                ));
            }
        }
        attribute.insert(node, values.to_vec());
        Ok(())
    }

    fn run_attribute(&self, name: &str) -> Option<&[f64]> {
        self.run_attributes.get(name).map(Vec::as_slice)
    }

    fn set_run_attribute(&mut self, name: &str, values: &[f64]) -> Result<()> {
        self.run_attributes.insert(name.to_string(), values.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regular_grid_layout() {
        let domain = BoundingBox::new([0.0; 3], [1.0, 2.0, 0.0]);
        let mesh = PointMesh::regular_grid(&domain, [3, 5, 1]);
        assert_eq!(mesh.len(), 15);
        assert_eq!(mesh.coords(NodeHandle(0)).unwrap(), [0.0, 0.0, 0.0]);
        assert_eq!(mesh.coords(NodeHandle(14)).unwrap(), [1.0, 2.0, 0.0]);
    }

    #[test]
    fn test_index_not_built_until_requested() {
        let mut mesh = PointMesh::new(vec![[0.0; 3]]);
        let region = BoundingBox::new([-1.0; 3], [1.0; 3]);
        assert!(!mesh.is_indexed());
        assert!(mesh.nodes_in_box(&region, 1e-12).unwrap().is_empty());

        mesh.build_index().unwrap();
        assert!(mesh.is_indexed());
        assert_eq!(mesh.nodes_in_box(&region, 1e-12).unwrap(), vec![NodeHandle(0)]);
    }

    #[test]
    fn test_empty_mesh_stays_unindexed() {
        let mut mesh = PointMesh::new(Vec::new());
        mesh.build_index().unwrap();
        assert!(!mesh.is_indexed());
    }

    #[test]
    fn test_build_fails_on_nan() {
        let mut mesh = PointMesh::new(vec![[f64::NAN, 0.0, 0.0]]);
        assert!(matches!(mesh.build_index(), Err(KdeError::Backend { .. })));
    }

    #[test]
    fn test_missing_node() {
        let mesh = PointMesh::new(vec![[0.0; 3]]);
        assert!(matches!(
            mesh.coords(NodeHandle(3)),
            Err(KdeError::MissingNode(NodeHandle(3)))
        ));
    }

    #[test]
    fn test_node_attributes() {
        let mut mesh = PointMesh::new(vec![[0.0; 3], [1.0; 3]]);
        assert!(!mesh.has_node_attribute("FLUX"));
        mesh.set_node_attribute("FLUX", NodeHandle(1), &[2.5]).unwrap();
        assert!(mesh.has_node_attribute("FLUX"));
        assert_eq!(mesh.node_attribute("FLUX", NodeHandle(1)), Some(&[2.5][..]));
        assert_eq!(mesh.node_attribute("FLUX", NodeHandle(0)), None);

        // component count is fixed per attribute
        assert!(mesh.set_node_attribute("FLUX", NodeHandle(0), &[1.0, 2.0]).is_err());
        assert!(mesh.set_node_attribute("FLUX", NodeHandle(9), &[1.0]).is_err());
    }

    #[test]
    fn test_run_attributes() {
        let mut mesh = PointMesh::new(vec![[0.0; 3]]);
        mesh.set_run_attribute("BANDWIDTH_TAG", &[0.1, 0.2, 0.3]).unwrap();
        assert_eq!(mesh.run_attribute("BANDWIDTH_TAG"), Some(&[0.1, 0.2, 0.3][..]));
    }
}
