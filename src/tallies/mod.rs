// Tallies module: energy binning, per-history accumulation and the KDE mesh tally
pub mod filter_energy;
pub mod accumulator;
pub mod kde_tally;

// Re-export main types for convenience
pub use filter_energy::EnergyFilter;
pub use accumulator::HistoryAccumulator;
pub use kde_tally::{error_tag_name, tally_tag_name, KdeMeshTally, BANDWIDTH_TAG};
