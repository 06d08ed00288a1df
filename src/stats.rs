use tracing::warn;

/// Scale factor of the optimal bandwidth rule for 3D Epanechnikov kernels
const OPTIMAL_BANDWIDTH_FACTOR: f64 = 0.968625;

/// Running mean and variance of collision positions (Welford's algorithm),
/// used to report a data-driven optimal bandwidth at the end of a run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunningStats {
    count: u64,
    mean: [f64; 3],
    /// Sum of squared deviations from the running mean, per axis
    sum_sq_dev: [f64; 3],
    saturated: bool,
}

impl RunningStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a collision point.
    ///
    /// Once the count reaches `u64::MAX` further points are ignored and a
    /// warning is issued the first time that happens. Returns whether the
    /// point was absorbed.
    pub fn update(&mut self, point: &[f64; 3]) -> bool {
        if self.count == u64::MAX {
            if !self.saturated {
                warn!(
                    collisions = self.count,
                    "number of collisions exceeds maximum, optimal bandwidth will be based on the collisions recorded so far"
                );
                self.saturated = true;
            }
            return false;
        }

        self.count += 1;
        if self.count == 1 {
            self.mean = *point;
        } else {
            let n = self.count as f64;
            for i in 0..3 {
                let delta = point[i] - self.mean[i];
                self.mean[i] += delta / n;
                self.sum_sq_dev[i] += delta * (point[i] - self.mean[i]);
            }
        }
        true
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> [f64; 3] {
        self.mean
    }

    pub fn is_saturated(&self) -> bool {
        self.saturated
    }

    /// Unbiased sample variance per axis, `None` below two samples
    pub fn variance(&self) -> Option<[f64; 3]> {
        if self.count < 2 {
            return None;
        }
        let denom = (self.count - 1) as f64;
        Some([
            self.sum_sq_dev[0] / denom,
            self.sum_sq_dev[1] / denom,
            self.sum_sq_dev[2] / denom,
        ])
    }

    /// `h_i = 0.968625 * sigma_i * n^(-1/7)`, `None` below two samples
    pub fn optimal_bandwidth(&self) -> Option<[f64; 3]> {
        let variance = self.variance()?;
        let scale = OPTIMAL_BANDWIDTH_FACTOR * (self.count as f64).powf(-1.0 / 7.0);
        Some([
            scale * variance[0].sqrt(),
            scale * variance[1].sqrt(),
            scale * variance[2].sqrt(),
        ])
    }
}
