// Kernel density estimator mesh tallies for Monte Carlo particle transport.
// Import the modules and re-export the main types for Rust usage
mod boundary;
mod bounding_box;
mod card;
mod config;
mod error;
mod estimator;
mod event;
mod kd_tree;
mod kernel;
mod mesh;
mod neighborhood;
mod output;
mod sampler;
mod stats;

pub mod host;
pub mod tallies;

pub use boundary::{
    has_boundary_attributes, node_near_boundary, tag_box_boundaries, BoundaryInfo, BoundarySide,
    BOUNDARY_TAG, DISTANCE_TAG,
};
pub use bounding_box::{BoundingBox, BOX_TOLERANCE};
pub use card::{parse_fc_card, parse_tally_card};
pub use config::{KdeSettings, TallyInput, TallyOptions, DEFAULT_BANDWIDTH};
pub use error::{KdeError, Result};
pub use estimator::{
    choose_points, evaluate_kernel, integral_limits, integral_track_score, subtrack_score,
    Estimator, DEFAULT_SUBTRACKS,
};
pub use event::{CollisionData, EventKind, TallyEvent, TrackData};
pub use kd_tree::KdTree;
pub use kernel::{Kernel, KernelFactory, KernelRegistry, PolynomialKernel, DEFAULT_KERNEL};
pub use mesh::{MeshBackend, NodeHandle, PointMesh, SpatialIndex};
pub use neighborhood::Neighborhood;
pub use output::{read_json, write_json, NodeResult, TallyResults};
pub use sampler::{
    ensure_shared_seeded, seed_shared_sampler, shared_sampler, FastRng, SampleSource,
    SharedSampler,
};
pub use stats::RunningStats;
pub use tallies::{
    error_tag_name, tally_tag_name, EnergyFilter, HistoryAccumulator, KdeMeshTally, BANDWIDTH_TAG,
};
