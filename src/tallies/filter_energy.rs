use crate::error::{KdeError, Result};

/// Energy bins shared by every calculation point of a tally.
/// Bin edges [E0, E1, ..., En] create bins [E0, E1), [E1, E2), ..., [En-1, En).
#[derive(Debug, Clone, PartialEq)]
pub struct EnergyFilter {
    /// Energy bin boundaries in ascending order
    pub bins: Vec<f64>,
}

impl EnergyFilter {
    /// Create a new EnergyFilter from bin boundaries.
    ///
    /// Fails if there are fewer than 2 boundaries or they are not strictly
    /// ascending.
    pub fn new(bins: Vec<f64>) -> Result<Self> {
        if bins.len() < 2 {
            return Err(KdeError::InvalidEnergyBins(
                "at least 2 bin boundaries are required (to create at least 1 bin)".to_string(),
            ));
        }

        if bins.windows(2).any(|pair| !(pair[1] > pair[0])) {
            return Err(KdeError::InvalidEnergyBins(
                "energy bins must be in strictly ascending order".to_string(),
            ));
        }

        Ok(Self { bins })
    }

    /// Bin index for `energy`, or None if it falls outside the filter range
    pub fn get_bin(&self, energy: f64) -> Option<usize> {
        let last = *self.bins.last()?;
        if !(energy >= self.bins[0] && energy < last) {
            return None;
        }

        // number of edges <= energy, minus one
        let upper = self.bins.partition_point(|&edge| edge <= energy);
        Some(upper - 1)
    }

    pub fn matches(&self, energy: f64) -> bool {
        self.get_bin(energy).is_some()
    }

    pub fn num_bins(&self) -> usize {
        self.bins.len() - 1
    }
}
