use std::collections::BTreeSet;

use nalgebra::Vector3;

use crate::bounding_box::{BoundingBox, BOX_TOLERANCE};
use crate::error::Result;
use crate::event::{EventKind, TallyEvent};
use crate::mesh::{NodeHandle, SpatialIndex};

/// Region of space in which the kernel can give a non-trivial result for a
/// single tally event.
///
/// For collision events the region is exact: every node it returns can
/// receive a score. For track events the region is the bounding box of the
/// whole segment grown by one bandwidth, which also picks up nodes that end
/// up with no score. Those are filtered by the scoring itself; the box is
/// deliberately not tightened by the cylinder test.
#[derive(Debug, Clone)]
pub struct Neighborhood<'a> {
    region: BoundingBox,
    /// Cylinder radius around a track segment, zero for collisions
    radius: f64,
    event: &'a TallyEvent,
}

impl<'a> Neighborhood<'a> {
    pub fn new(event: &'a TallyEvent, bandwidth: &[f64; 3]) -> Self {
        match &event.kind {
            EventKind::Collision(collision) => Self {
                region: BoundingBox::around(collision.position, *bandwidth),
                radius: 0.0,
                event,
            },
            EventKind::Track(track) => {
                let end = event.position_at(track.track_length);
                let region = BoundingBox::from_points(track.start, end).expanded(*bandwidth);
                let radius = bandwidth[0].max(bandwidth[1]).max(bandwidth[2]);
                Self { region, radius, event }
            }
        }
    }

    pub fn region(&self) -> &BoundingBox {
        &self.region
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Unique calculation points inside the region, in handle order.
    ///
    /// An index that was never built (no nodes loaded) yields an empty set.
    pub fn candidates<I: SpatialIndex + ?Sized>(&self, index: &I) -> Result<Vec<NodeHandle>> {
        if !index.is_indexed() {
            return Ok(Vec::new());
        }
        let unique: BTreeSet<NodeHandle> = index
            .nodes_in_box(&self.region, BOX_TOLERANCE)?
            .into_iter()
            .collect();
        Ok(unique.into_iter().collect())
    }

    /// Inclusive test against the rectangular region
    pub fn point_in_region(&self, coords: &[f64; 3]) -> bool {
        self.region.contains(coords)
    }

    /// True if `point` lies within the cylinder radius of the track line.
    /// Always false for collision events.
    pub fn point_within_max_radius(&self, point: &[f64; 3]) -> bool {
        match &self.event.kind {
            EventKind::Collision(_) => false,
            EventKind::Track(track) => {
                let offset = Vector3::from(*point) - Vector3::from(track.start);
                let direction = Vector3::from(track.direction);
                offset.cross(&direction).norm() <= self.radius
            }
        }
    }
}
