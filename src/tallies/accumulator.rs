use std::collections::{BTreeSet, HashMap};

use tracing::debug;

use crate::mesh::NodeHandle;

/// Per-node storage, one entry per energy bin
#[derive(Debug, Clone, PartialEq)]
struct NodeData {
    /// Running sum for the current history
    temp: Vec<f64>,
    /// Sum over completed histories
    tally: Vec<f64>,
    /// Sum of squared history scores
    error: Vec<f64>,
}

impl NodeData {
    fn new(num_bins: usize) -> Self {
        Self {
            temp: vec![0.0; num_bins],
            tally: vec![0.0; num_bins],
            error: vec![0.0; num_bins],
        }
    }
}

/// Accumulates scores per (node, energy bin) across particle histories.
///
/// Scores go into a per-history buffer first; [`HistoryAccumulator::end_history`]
/// folds the buffer of every node touched in that history into the running
/// sum and sum of squares. Node entries are created the first time a node
/// is scored.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryAccumulator {
    num_bins: usize,
    nodes: HashMap<NodeHandle, NodeData>,
    visited: BTreeSet<NodeHandle>,
}

impl HistoryAccumulator {
    pub fn new(num_bins: usize) -> Self {
        Self {
            num_bins,
            nodes: HashMap::new(),
            visited: BTreeSet::new(),
        }
    }

    pub fn num_bins(&self) -> usize {
        self.num_bins
    }

    /// Add `score` to the current history of `node` in `bin`, and also to
    /// `total_bin` if one is given.
    ///
    /// # Panics
    /// Panics if a bin index is out of range.
    pub fn add_score(&mut self, node: NodeHandle, bin: usize, score: f64, total_bin: Option<usize>) {
        let num_bins = self.num_bins;
        let data = self.nodes.entry(node).or_insert_with(|| NodeData::new(num_bins));
        data.temp[bin] += score;
        if let Some(total) = total_bin {
            data.temp[total] += score;
        }
        self.visited.insert(node);
    }

    /// Fold the current history into the totals and reset the history buffers.
    /// With no node visited this is a no-op.
    pub fn end_history(&mut self) {
        for node in &self.visited {
            if let Some(data) = self.nodes.get_mut(node) {
                for bin in 0..self.num_bins {
                    let history_score = data.temp[bin];
                    data.tally[bin] += history_score;
                    data.error[bin] += history_score * history_score;
                    data.temp[bin] = 0.0;
                }
            }
        }
        if !self.visited.is_empty() {
            debug!(nodes = self.visited.len(), "flushed history scores");
        }
        self.visited.clear();
    }

    /// Nodes scored in the current history
    pub fn visited(&self) -> &BTreeSet<NodeHandle> {
        &self.visited
    }

    /// Score of the current, unfinished history
    pub fn history_score(&self, node: NodeHandle, bin: usize) -> f64 {
        self.nodes.get(&node).map_or(0.0, |data| data.temp[bin])
    }

    /// Sum of history scores
    pub fn tally(&self, node: NodeHandle, bin: usize) -> f64 {
        self.nodes.get(&node).map_or(0.0, |data| data.tally[bin])
    }

    /// Sum of squared history scores
    pub fn error(&self, node: NodeHandle, bin: usize) -> f64 {
        self.nodes.get(&node).map_or(0.0, |data| data.error[bin])
    }

    /// Relative statistical error of the mean over `num_particles` histories:
    /// `sqrt(error / tally^2 - 1 / N)`, or 0 when nothing was scored.
    pub fn relative_error(&self, node: NodeHandle, bin: usize, num_particles: f64) -> f64 {
        let tally = self.tally(node, bin);
        let error = self.error(node, bin);
        if error == 0.0 {
            return 0.0;
        }
        // round-off can push a single-history result slightly below zero
        (error / (tally * tally) - 1.0 / num_particles).max(0.0).sqrt()
    }

    /// Number of nodes that have ever been scored
    pub fn scored_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Reset every total; the current history buffers are kept.
    pub fn zero(&mut self) {
        for data in self.nodes.values_mut() {
            data.tally.iter_mut().for_each(|v| *v = 0.0);
            data.error.iter_mut().for_each(|v| *v = 0.0);
        }
    }
}
