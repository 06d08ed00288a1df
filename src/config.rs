// Tally input options and the KDE settings parsed from them
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::estimator::{Estimator, DEFAULT_SUBTRACKS};
use crate::kernel::{KernelRegistry, DEFAULT_KERNEL};

/// Default bandwidth on every axis
pub const DEFAULT_BANDWIDTH: f64 = 0.01;

/// Ordered key/value options for a tally. Keys may repeat; options are
/// processed in order, so a later value for the same key wins.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TallyOptions {
    entries: Vec<(String, String)>,
}

impl TallyOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: &str, value: &str) {
        self.entries.push((key.to_string(), value.to_string()));
    }

    /// Builder-style insert
    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.insert(key, value);
        self
    }

    /// First value stored for `key`
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn count(&self, key: &str) -> usize {
        self.entries.iter().filter(|(k, _)| k == key).count()
    }

    /// Remove every entry for `key`, returning the removed values in order
    pub fn remove_all(&mut self, key: &str) -> Vec<String> {
        let mut removed = Vec::new();
        self.entries.retain(|(k, v)| {
            if k == key {
                removed.push(v.clone());
                false
            } else {
                true
            }
        });
        removed
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for TallyOptions {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

/// Host-provided description of a single KDE mesh tally
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TallyInput {
    pub tally_id: u32,
    pub options: TallyOptions,
    /// Energy bin boundaries shared by all tally points, ascending
    pub energy_bin_bounds: Vec<f64>,
    /// Add an extra bin that tallies all energies
    pub total_energy_bin: bool,
}

impl TallyInput {
    /// Single energy bin covering every non-negative energy, no total bin
    pub fn new(tally_id: u32, options: TallyOptions) -> Self {
        Self {
            tally_id,
            options,
            energy_bin_bounds: vec![0.0, f64::MAX],
            total_energy_bin: false,
        }
    }

    pub fn with_energy_bins(mut self, bounds: Vec<f64>, total_energy_bin: bool) -> Self {
        self.energy_bin_bounds = bounds;
        self.total_energy_bin = total_energy_bin;
        self
    }
}

/// Settings of a KDE mesh tally after option parsing.
///
/// Invalid values never abort: each one is reported with a warning and the
/// documented default is kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KdeSettings {
    pub bandwidth: [f64; 3],
    pub kernel_name: String,
    pub boundary_requested: bool,
    /// Seed override for the shared sub-track sampler
    pub seed: Option<u64>,
    pub num_subtracks: usize,
}

impl Default for KdeSettings {
    fn default() -> Self {
        Self {
            bandwidth: [DEFAULT_BANDWIDTH; 3],
            kernel_name: DEFAULT_KERNEL.to_string(),
            boundary_requested: false,
            seed: None,
            num_subtracks: DEFAULT_SUBTRACKS,
        }
    }
}

impl KdeSettings {
    pub fn from_options(
        tally_id: u32,
        estimator: Estimator,
        options: &TallyOptions,
        registry: &KernelRegistry,
    ) -> Self {
        let mut settings = Self::default();

        for (key, value) in options.iter() {
            match key {
                "hx" => settings.set_bandwidth_value(key, value, 0),
                "hy" => settings.set_bandwidth_value(key, value, 1),
                "hz" => settings.set_bandwidth_value(key, value, 2),
                "kernel" => {
                    if registry.contains(value) {
                        settings.kernel_name = value.to_lowercase();
                    } else {
                        warn!(
                            tally_id,
                            kernel = value,
                            fallback = DEFAULT_KERNEL,
                            "unknown kernel type, using default"
                        );
                        settings.kernel_name = DEFAULT_KERNEL.to_string();
                    }
                }
                "boundary" if value == "default" => settings.boundary_requested = true,
                "seed" if estimator == Estimator::SubTrack => match value.trim().parse::<u64>() {
                    Ok(seed) => {
                        info!(tally_id, seed, "overriding random seed for sub-track points");
                        settings.seed = Some(seed);
                    }
                    Err(_) => warn!(tally_id, value, "invalid random seed, ignoring"),
                },
                "subtracks" if estimator == Estimator::SubTrack => {
                    settings.num_subtracks = match value.trim().parse::<i64>() {
                        Ok(n) if n > 0 => n as usize,
                        _ => {
                            warn!(
                                tally_id,
                                value,
                                default = DEFAULT_SUBTRACKS,
                                "invalid value for the number of subtracks, using default"
                            );
                            DEFAULT_SUBTRACKS
                        }
                    };
                }
                _ => warn!(tally_id, key, "input data for KDE mesh tally has unknown key"),
            }
        }

        settings
    }

    fn set_bandwidth_value(&mut self, key: &str, value: &str, axis: usize) {
        match value.trim().parse::<f64>() {
            Ok(h) if h > 0.0 && h.is_finite() => self.bandwidth[axis] = h,
            _ => warn!(
                key,
                value,
                default = self.bandwidth[axis],
                "invalid bandwidth value, using default"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(estimator: Estimator, options: TallyOptions) -> KdeSettings {
        KdeSettings::from_options(1, estimator, &options, &KernelRegistry::default())
    }

    #[test]
    fn test_defaults() {
        let settings = parse(Estimator::Collision, TallyOptions::new());
        assert_eq!(settings, KdeSettings::default());
        assert_eq!(settings.bandwidth, [0.01; 3]);
        assert_eq!(settings.kernel_name, "epanechnikov");
        assert_eq!(settings.num_subtracks, 3);
    }

    #[test]
    fn test_bandwidth_overrides() {
        let options = TallyOptions::new()
            .with("hx", "0.5")
            .with("hy", "2")
            .with("hz", "1e-3");
        let settings = parse(Estimator::Collision, options);
        assert_eq!(settings.bandwidth, [0.5, 2.0, 1e-3]);
    }

    #[test]
    fn test_invalid_bandwidth_keeps_default() {
        let options = TallyOptions::new()
            .with("hx", "-1.0")
            .with("hy", "abc")
            .with("hz", "0");
        let settings = parse(Estimator::Collision, options);
        assert_eq!(settings.bandwidth, [0.01; 3]);
    }

    #[test]
    fn test_later_option_wins() {
        let options = TallyOptions::new().with("hx", "0.2").with("hx", "0.3");
        assert_eq!(parse(Estimator::Collision, options).bandwidth[0], 0.3);
    }

    #[test]
    fn test_kernel_selection() {
        let settings = parse(Estimator::Collision, TallyOptions::new().with("kernel", "Biweight"));
        assert_eq!(settings.kernel_name, "biweight");

        let settings = parse(Estimator::Collision, TallyOptions::new().with("kernel", "gaussian"));
        assert_eq!(settings.kernel_name, "epanechnikov");
    }

    #[test]
    fn test_boundary_only_for_default_value() {
        let settings = parse(Estimator::Collision, TallyOptions::new().with("boundary", "default"));
        assert!(settings.boundary_requested);
        let settings = parse(Estimator::Collision, TallyOptions::new().with("boundary", "other"));
        assert!(!settings.boundary_requested);
    }

    #[test]
    fn test_subtrack_options() {
        let options = TallyOptions::new().with("subtracks", "5").with("seed", "1234");
        let settings = parse(Estimator::SubTrack, options);
        assert_eq!(settings.num_subtracks, 5);
        assert_eq!(settings.seed, Some(1234));
    }

    #[test]
    fn test_invalid_subtracks_falls_back() {
        for bad in ["0", "-2", "many"] {
            let options = TallyOptions::new().with("subtracks", "7").with("subtracks", bad);
            assert_eq!(parse(Estimator::SubTrack, options).num_subtracks, 3);
        }
    }

    #[test]
    fn test_subtrack_keys_ignored_for_other_estimators() {
        let options = TallyOptions::new().with("subtracks", "5").with("seed", "1234");
        let settings = parse(Estimator::IntegralTrack, options);
        assert_eq!(settings.num_subtracks, 3);
        assert_eq!(settings.seed, None);
    }

    #[test]
    fn test_unknown_key_ignored() {
        let settings = parse(Estimator::Collision, TallyOptions::new().with("colour", "blue"));
        assert_eq!(settings, KdeSettings::default());
    }

    #[test]
    fn test_options_multimap() {
        let mut options: TallyOptions = vec![("type", "kde_coll"), ("hx", "1"), ("type", "kde_track")]
            .into_iter()
            .collect();
        assert_eq!(options.count("type"), 2);
        assert_eq!(options.get("type"), Some("kde_coll"));
        assert_eq!(options.remove_all("type"), vec!["kde_coll", "kde_track"]);
        assert_eq!(options.len(), 1);
        assert_eq!(options.get("hx"), Some("1"));
    }
}
