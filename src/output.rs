// Serializable tally results
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::boundary::BoundaryInfo;
use crate::error::Result;
use crate::estimator::Estimator;
use crate::mesh::NodeHandle;

/// Final results at a single calculation point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeResult {
    pub node: NodeHandle,
    pub coords: [f64; 3],
    /// Normalized tally per energy bin (total bin last, if present)
    pub values: Vec<f64>,
    /// Relative error per energy bin
    pub rel_errors: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boundary: Option<BoundaryInfo>,
}

/// Results of a KDE mesh tally, as written at the end of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TallyResults {
    pub tally_id: u32,
    pub estimator: Estimator,
    pub kernel: String,
    pub bandwidth: [f64; 3],
    pub num_particles: f64,
    pub multiplier: f64,
    pub energy_bin_bounds: Vec<f64>,
    pub total_energy_bin: bool,
    /// Collisions recorded by the running statistics (collision estimator)
    pub num_collisions: u64,
    pub optimal_bandwidth: Option<[f64; 3]>,
    pub nodes: Vec<NodeResult>,
}

impl TallyResults {
    /// Result for a single node, if present
    pub fn node(&self, node: NodeHandle) -> Option<&NodeResult> {
        self.nodes.iter().find(|r| r.node == node)
    }

    /// Sum of the normalized values in `bin` over all nodes
    pub fn bin_sum(&self, bin: usize) -> f64 {
        self.nodes.iter().filter_map(|r| r.values.get(bin)).sum()
    }
}

/// Write results as pretty-printed JSON
pub fn write_json<P: AsRef<Path>>(path: P, results: &TallyResults) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, results)?;
    writer.flush()?;
    Ok(())
}

/// Read results written by [`write_json`]
pub fn read_json<P: AsRef<Path>>(path: P) -> Result<TallyResults> {
    let file = File::open(path)?;
    Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_results() -> TallyResults {
        TallyResults {
            tally_id: 4,
            estimator: Estimator::IntegralTrack,
            kernel: "epanechnikov".to_string(),
            bandwidth: [0.1, 0.2, 0.3],
            num_particles: 100.0,
            multiplier: 1.0,
            energy_bin_bounds: vec![0.0, 20e6],
            total_energy_bin: false,
            num_collisions: 0,
            optimal_bandwidth: None,
            nodes: vec![
                NodeResult {
                    node: NodeHandle(0),
                    coords: [0.0; 3],
                    values: vec![1.5],
                    rel_errors: vec![0.1],
                    boundary: None,
                },
                NodeResult {
                    node: NodeHandle(1),
                    coords: [1.0; 3],
                    values: vec![0.5],
                    rel_errors: vec![0.3],
                    boundary: None,
                },
            ],
        }
    }

    #[test]
    fn test_estimator_serialized_as_name() {
        let json = serde_json::to_string(&sample_results()).unwrap();
        assert!(json.contains("\"estimator\":\"integral-track\""));
        assert!(!json.contains("boundary"));
    }

    #[test]
    fn test_write_and_read_json() {
        let results = sample_results();
        let path = std::env::temp_dir().join(format!("kde_results_{}.json", std::process::id()));
        write_json(&path, &results).unwrap();
        let loaded = read_json(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(loaded, results);
    }

    #[test]
    fn test_lookup_helpers() {
        let results = sample_results();
        assert_eq!(results.node(NodeHandle(1)).unwrap().values, vec![0.5]);
        assert!(results.node(NodeHandle(7)).is_none());
        assert_eq!(results.bin_sum(0), 2.0);
    }
}
