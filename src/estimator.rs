// KDE estimator scoring functions
use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::event::TrackData;
use crate::kernel::Kernel;

/// Abscissae of the 4-point Gauss-Legendre rule on [-1, 1]
pub const QUAD_POINTS: [f64; 4] = [0.339981043585, -0.339981043585, 0.861136311594, -0.861136311594];

/// Weights of the 4-point Gauss-Legendre rule
pub const QUAD_WEIGHTS: [f64; 4] = [0.652145154863, 0.652145154863, 0.347854845137, 0.347854845137];

/// Direction components smaller than this are treated as parallel to the axis
const PARALLEL_TOLERANCE: f64 = 1e-12;

/// Default number of sub-tracks for the sub-track estimator
pub const DEFAULT_SUBTRACKS: usize = 3;

/// KDE estimator type, fixed when a tally is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Estimator {
    /// Scores collision events at the collision point
    Collision,
    /// Integrates the kernel along each track with Gauss-Legendre quadrature
    IntegralTrack,
    /// Averages the kernel over random points on equal sub-tracks
    SubTrack,
}

impl Estimator {
    pub fn name(&self) -> &'static str {
        match self {
            Estimator::Collision => "collision",
            Estimator::IntegralTrack => "integral-track",
            Estimator::SubTrack => "sub-track",
        }
    }

    /// Parse an estimator from a tally type string, returning None for invalid strings
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "collision" | "kde_coll" => Some(Estimator::Collision),
            "integral-track" | "integral_track" | "kde_track" => Some(Estimator::IntegralTrack),
            "sub-track" | "sub_track" | "kde_subtrack" => Some(Estimator::SubTrack),
            _ => None,
        }
    }

    /// True for estimators that consume track events
    pub fn uses_tracks(&self) -> bool {
        !matches!(self, Estimator::Collision)
    }
}

impl fmt::Display for Estimator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Separable 3D kernel at a calculation point:
/// `prod_i K((coords_i - point_i) / h_i) / h_i`.
#[inline]
pub fn evaluate_kernel(
    kernel: &dyn Kernel,
    bandwidth: &[f64; 3],
    coords: &[f64; 3],
    point: &[f64; 3],
) -> f64 {
    let mut value = 1.0;
    for i in 0..3 {
        let u = (coords[i] - point[i]) / bandwidth[i];
        value *= kernel.evaluate(u) / bandwidth[i];
        if value == 0.0 {
            break;
        }
    }
    value
}

/// Path-length interval `[s_min, s_max]` within `[0, L]` over which the
/// calculation point stays within one bandwidth of the track on every axis.
///
/// Returns None if that interval is empty.
pub fn integral_limits(track: &TrackData, coords: &[f64; 3], bandwidth: &[f64; 3]) -> Option<(f64, f64)> {
    let mut lower = 0.0_f64;
    let mut upper = track.track_length;

    for i in 0..3 {
        let offset = coords[i] - track.start[i];
        let u = track.direction[i];

        if u.abs() < PARALLEL_TOLERANCE {
            // the distance on this axis never changes along the track
            if offset.abs() > bandwidth[i] {
                return None;
            }
            continue;
        }

        let (path_min, path_max) = if u > 0.0 {
            ((offset - bandwidth[i]) / u, (offset + bandwidth[i]) / u)
        } else {
            ((offset + bandwidth[i]) / u, (offset - bandwidth[i]) / u)
        };

        lower = lower.max(path_min);
        upper = upper.min(path_max);
    }

    if lower < upper {
        Some((lower, upper))
    } else {
        None
    }
}

/// Integral of the 3D kernel along the track for a single calculation point,
/// using 4-point Gauss-Legendre quadrature over the valid path-length interval.
pub fn integral_track_score(
    kernel: &dyn Kernel,
    bandwidth: &[f64; 3],
    coords: &[f64; 3],
    track: &TrackData,
) -> f64 {
    let (lower, upper) = match integral_limits(track, coords, bandwidth) {
        Some(limits) => limits,
        None => return 0.0,
    };

    let half_width = 0.5 * (upper - lower);
    let midpoint = 0.5 * (upper + lower);

    let sum: f64 = QUAD_POINTS
        .iter()
        .zip(QUAD_WEIGHTS.iter())
        .map(|(&x, &w)| {
            let s = half_width * x + midpoint;
            let observation = [
                track.start[0] + s * track.direction[0],
                track.start[1] + s * track.direction[1],
                track.start[2] + s * track.direction[2],
            ];
            w * evaluate_kernel(kernel, bandwidth, coords, &observation)
        })
        .sum();

    half_width * sum
}

/// Mean of the 3D kernel over a set of sub-track points
pub fn subtrack_score(
    kernel: &dyn Kernel,
    bandwidth: &[f64; 3],
    coords: &[f64; 3],
    points: &[[f64; 3]],
) -> f64 {
    if points.is_empty() {
        return 0.0;
    }
    let sum: f64 = points
        .iter()
        .map(|p| evaluate_kernel(kernel, bandwidth, coords, p))
        .sum();
    sum / points.len() as f64
}

/// Split the track into `num_subtracks` equal pieces and pick one uniformly
/// random point on each.
pub fn choose_points<R: Rng + ?Sized>(track: &TrackData, num_subtracks: usize, rng: &mut R) -> Vec<[f64; 3]> {
    let num_subtracks = num_subtracks.max(1);
    let sub_length = track.track_length / num_subtracks as f64;

    (0..num_subtracks)
        .map(|i| {
            let s = (i as f64 + rng.gen::<f64>()) * sub_length;
            [
                track.start[0] + s * track.direction[0],
                track.start[1] + s * track.direction[1],
                track.start[2] + s * track.direction[2],
            ]
        })
        .collect()
}
