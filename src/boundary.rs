// Boundary bookkeeping for KDE tallies.
//
// Nodes within one bandwidth of an external boundary carry two attributes:
// BOUNDARY (per axis: -1 none, 0 lower, 1 upper) and DISTANCE_TO_BOUNDARY
// (per axis distance, -1 when not near a boundary).
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::bounding_box::BoundingBox;
use crate::error::Result;
use crate::mesh::{MeshBackend, NodeHandle};

pub const BOUNDARY_TAG: &str = "BOUNDARY";
pub const DISTANCE_TAG: &str = "DISTANCE_TO_BOUNDARY";

/// Which side of each axis a node is close to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoundarySide {
    None,
    Lower,
    Upper,
}

impl BoundarySide {
    pub fn flag(&self) -> i8 {
        match self {
            BoundarySide::None => -1,
            BoundarySide::Lower => 0,
            BoundarySide::Upper => 1,
        }
    }

    pub fn from_flag(flag: f64) -> Self {
        if flag == 0.0 {
            BoundarySide::Lower
        } else if flag == 1.0 {
            BoundarySide::Upper
        } else {
            BoundarySide::None
        }
    }
}

/// Boundary data for a single mesh node
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundaryInfo {
    pub side: [BoundarySide; 3],
    pub distance: [f64; 3],
}

impl BoundaryInfo {
    /// Read the boundary attributes of `node`, if both are present
    pub fn from_mesh<M: MeshBackend + ?Sized>(mesh: &M, node: NodeHandle) -> Option<Self> {
        let flags = mesh.node_attribute(BOUNDARY_TAG, node)?;
        let distance = mesh.node_attribute(DISTANCE_TAG, node)?;
        if flags.len() != 3 || distance.len() != 3 {
            return None;
        }
        Some(Self {
            side: [
                BoundarySide::from_flag(flags[0]),
                BoundarySide::from_flag(flags[1]),
                BoundarySide::from_flag(flags[2]),
            ],
            distance: [distance[0], distance[1], distance[2]],
        })
    }

    pub fn is_boundary_point(&self) -> bool {
        self.side.iter().any(|s| *s != BoundarySide::None)
    }

    fn write<M: MeshBackend + ?Sized>(&self, mesh: &mut M, node: NodeHandle) -> Result<()> {
        let flags = [
            self.side[0].flag() as f64,
            self.side[1].flag() as f64,
            self.side[2].flag() as f64,
        ];
        mesh.set_node_attribute(BOUNDARY_TAG, node, &flags)?;
        mesh.set_node_attribute(DISTANCE_TAG, node, &self.distance)
    }
}

/// True if the mesh carries both boundary attributes
pub fn has_boundary_attributes<M: MeshBackend + ?Sized>(mesh: &M) -> bool {
    mesh.has_node_attribute(BOUNDARY_TAG) && mesh.has_node_attribute(DISTANCE_TAG)
}

/// Boundary data for a point inside an axis-aligned domain.
///
/// Each axis checks the upper face first, then the lower one, so a node is
/// only ever assigned to one side per axis. Returns None for points outside
/// the domain.
pub fn node_near_boundary(coords: &[f64; 3], domain: &BoundingBox, bandwidth: &[f64; 3]) -> Option<BoundaryInfo> {
    if !domain.contains_within(coords, 0.0) {
        return None;
    }
    let mut info = BoundaryInfo {
        side: [BoundarySide::None; 3],
        distance: [-1.0; 3],
    };
    for i in 0..3 {
        let to_upper = domain.upper_right[i] - coords[i];
        let to_lower = coords[i] - domain.lower_left[i];
        if to_upper <= bandwidth[i] {
            info.side[i] = BoundarySide::Upper;
            info.distance[i] = to_upper;
        } else if to_lower <= bandwidth[i] {
            info.side[i] = BoundarySide::Lower;
            info.distance[i] = to_lower;
        }
    }
    Some(info)
}

/// Tag every mesh node lying within one bandwidth of a face of `domain`.
///
/// Nodes away from the boundary are left untagged. Returns the number of
/// boundary points written.
pub fn tag_box_boundaries<M: MeshBackend + ?Sized>(
    mesh: &mut M,
    domain: &BoundingBox,
    bandwidth: &[f64; 3],
) -> Result<usize> {
    let mut tagged = 0;
    let mut outside = 0;
    for node in mesh.nodes() {
        let coords = mesh.coords(node)?;
        match node_near_boundary(&coords, domain, bandwidth) {
            Some(info) if info.is_boundary_point() => {
                info.write(mesh, node)?;
                tagged += 1;
            }
            Some(_) => {}
            None => outside += 1,
        }
    }
    if outside > 0 {
        warn!(nodes = outside, "mesh nodes lie outside the boundary domain and were not tagged");
    }
    info!(boundary_points = tagged, "tagged mesh nodes near the domain boundary");
    Ok(tagged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::PointMesh;

    fn unit_domain() -> BoundingBox {
        BoundingBox::new([0.0; 3], [1.0; 3])
    }

    #[test]
    fn test_interior_point() {
        let info = node_near_boundary(&[0.5; 3], &unit_domain(), &[0.1; 3]).unwrap();
        assert!(!info.is_boundary_point());
        assert_eq!(info.distance, [-1.0; 3]);
    }

    #[test]
    fn test_upper_checked_before_lower() {
        // within one bandwidth of both faces on x
        let info = node_near_boundary(&[0.4, 0.05, 0.97], &unit_domain(), &[0.7, 0.1, 0.1]).unwrap();
        assert_eq!(info.side, [BoundarySide::Upper, BoundarySide::Lower, BoundarySide::Upper]);
        assert!((info.distance[0] - 0.6).abs() < 1e-15);
        assert!((info.distance[1] - 0.05).abs() < 1e-15);
        assert!((info.distance[2] - 0.03).abs() < 1e-15);
    }

    #[test]
    fn test_outside_domain() {
        assert!(node_near_boundary(&[1.5, 0.5, 0.5], &unit_domain(), &[0.1; 3]).is_none());
    }

    #[test]
    fn test_tag_and_read_back() {
        let mut mesh = PointMesh::new(vec![[0.5; 3], [0.95, 0.5, 0.5], [2.0, 2.0, 2.0]]);
        assert!(!has_boundary_attributes(&mesh));

        let tagged = tag_box_boundaries(&mut mesh, &unit_domain(), &[0.1; 3]).unwrap();
        assert_eq!(tagged, 1);
        assert!(has_boundary_attributes(&mesh));

        assert!(BoundaryInfo::from_mesh(&mesh, NodeHandle(0)).is_none());
        let info = BoundaryInfo::from_mesh(&mesh, NodeHandle(1)).unwrap();
        assert_eq!(info.side[0], BoundarySide::Upper);
        assert_eq!(info.side[1], BoundarySide::None);
        assert!((info.distance[0] - 0.05).abs() < 1e-12);
        assert_eq!(info.distance[1], -1.0);
    }

    #[test]
    fn test_flag_round_trip() {
        for side in [BoundarySide::None, BoundarySide::Lower, BoundarySide::Upper] {
            assert_eq!(BoundarySide::from_flag(side.flag() as f64), side);
        }
    }
}
