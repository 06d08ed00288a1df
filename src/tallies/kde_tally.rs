use tracing::{debug, info, warn};

use crate::boundary::{has_boundary_attributes, BoundaryInfo};
use crate::config::{KdeSettings, TallyInput};
use crate::error::{KdeError, Result};
use crate::estimator::{
    choose_points, evaluate_kernel, integral_track_score, subtrack_score, Estimator,
};
use crate::event::{EventKind, TallyEvent};
use crate::kernel::{Kernel, KernelRegistry};
use crate::mesh::{MeshBackend, NodeHandle};
use crate::neighborhood::Neighborhood;
use crate::output::{NodeResult, TallyResults};
use crate::sampler::{ensure_shared_seeded, seed_shared_sampler, FastRng, SampleSource};
use crate::stats::RunningStats;
use crate::tallies::{EnergyFilter, HistoryAccumulator};

/// Run-level attribute holding the bandwidth vector used by the tally
pub const BANDWIDTH_TAG: &str = "BANDWIDTH_TAG";

/// Name of the node attribute holding the tally value for an energy bin
pub fn tally_tag_name(bin: usize, is_total_bin: bool) -> String {
    format!("KDE_TALLY_{}", bin_label(bin, is_total_bin))
}

/// Name of the node attribute holding the relative error for an energy bin
pub fn error_tag_name(bin: usize, is_total_bin: bool) -> String {
    format!("KDE_ERROR_{}", bin_label(bin, is_total_bin))
}

fn bin_label(bin: usize, is_total_bin: bool) -> String {
    if is_total_bin {
        "TOTAL".to_string()
    } else {
        bin.to_string()
    }
}

/// KDE mesh tally over the nodes of an unstructured mesh.
///
/// The host calls [`KdeMeshTally::compute_score`] (or
/// [`KdeMeshTally::score_event`]) once per event,
/// [`KdeMeshTally::end_history`] once per finished particle history, and
/// [`KdeMeshTally::write_results`] at the end of the run. Calls must not
/// overlap; the tally does no locking of its own.
#[derive(Debug)]
pub struct KdeMeshTally<M: MeshBackend> {
    input: TallyInput,
    estimator: Estimator,
    settings: KdeSettings,
    kernel: Box<dyn Kernel>,
    mesh: M,
    energy_filter: EnergyFilter,
    num_energy_bins: usize,
    accumulator: HistoryAccumulator,
    running_stats: RunningStats,
    sampler: SampleSource,
    use_boundary_correction: bool,
}

impl<M: MeshBackend> KdeMeshTally<M> {
    /// Create a tally using the built-in kernels
    pub fn new(input: TallyInput, estimator: Estimator, mesh: M) -> Result<Self> {
        Self::with_registry(input, estimator, mesh, &KernelRegistry::default())
    }

    /// Create a tally, looking kernels up in `registry`.
    ///
    /// Builds the spatial index of `mesh`; sub-track tallies seed the shared
    /// sampler here (from the `seed` option, or from the clock if nothing
    /// seeded it yet).
    pub fn with_registry(
        input: TallyInput,
        estimator: Estimator,
        mut mesh: M,
        registry: &KernelRegistry,
    ) -> Result<Self> {
        let tally_id = input.tally_id;
        info!(tally_id, estimator = %estimator, "creating KDE mesh tally");

        let settings = KdeSettings::from_options(tally_id, estimator, &input.options, registry);
        let kernel = registry.create_or_default(&settings.kernel_name);
        info!(
            tally_id,
            kernel = kernel.name(),
            bandwidth = ?settings.bandwidth,
            "using kernel and bandwidth"
        );

        let energy_filter = EnergyFilter::new(input.energy_bin_bounds.clone())?;
        let num_energy_bins = energy_filter.num_bins() + usize::from(input.total_energy_bin);

        if estimator == Estimator::SubTrack {
            info!(
                tally_id,
                subtracks = settings.num_subtracks,
                "splitting full tracks into sub-tracks"
            );
            match settings.seed {
                Some(seed) => seed_shared_sampler(seed),
                None => ensure_shared_seeded(),
            }
        }

        mesh.build_index().map_err(|err| {
            KdeError::backend(
                format!("loading mesh data for KDE mesh tally {}", tally_id),
                err.to_string(),
            )
        })?;

        let mut use_boundary_correction = settings.boundary_requested;
        if use_boundary_correction && !has_boundary_attributes(&mesh) {
            warn!(tally_id, "no valid boundary tags were found, ignoring request for boundary correction");
            use_boundary_correction = false;
        }

        Ok(Self {
            input,
            estimator,
            settings,
            kernel,
            mesh,
            energy_filter,
            num_energy_bins,
            accumulator: HistoryAccumulator::new(num_energy_bins),
            running_stats: RunningStats::new(),
            sampler: SampleSource::Shared,
            use_boundary_correction,
        })
    }

    /// Draw sub-track points from a generator owned by this tally instead of
    /// the shared one
    pub fn with_sampler(mut self, rng: FastRng) -> Self {
        self.sampler = SampleSource::Owned(rng);
        self
    }

    /// Score `event` into energy bin `ebin` for the current history.
    ///
    /// Fails if the event kind does not match the estimator, if `ebin` is out
    /// of range, or if the mesh backend fails.
    pub fn compute_score(&mut self, event: &TallyEvent, ebin: usize) -> Result<()> {
        if ebin >= self.energy_filter.num_bins() {
            return Err(KdeError::InvalidEvent(format!(
                "energy bin {} out of range for tally {} with {} bins",
                ebin,
                self.input.tally_id,
                self.energy_filter.num_bins()
            )));
        }

        let mut weight = event.weighting_factor();
        let mut subtrack_points = Vec::new();

        match (self.estimator, &event.kind) {
            (Estimator::Collision, EventKind::Collision(collision)) => {
                weight /= collision.total_cross_section;
                self.running_stats.update(&collision.position);
            }
            (Estimator::IntegralTrack, EventKind::Track(_)) => {}
            (Estimator::SubTrack, EventKind::Track(track)) => {
                weight *= track.track_length;
                let num_subtracks = self.settings.num_subtracks;
                subtrack_points = self
                    .sampler
                    .with_rng(|rng| choose_points(track, num_subtracks, rng));
            }
            _ => {
                return Err(KdeError::EventMismatch {
                    tally_id: self.input.tally_id,
                    estimator: self.estimator.name(),
                    event: event.kind.name(),
                })
            }
        }

        let neighborhood = Neighborhood::new(event, &self.settings.bandwidth);
        let calculation_points = neighborhood.candidates(&self.mesh)?;
        let total_bin = self.total_bin();
        let bandwidth = self.settings.bandwidth;

        // boundary points are scored with the normal kernel as well
        for node in calculation_points {
            let coords = self.mesh.coords(node)?;
            let kernel_value = match &event.kind {
                EventKind::Collision(collision) => {
                    evaluate_kernel(self.kernel.as_ref(), &bandwidth, &coords, &collision.position)
                }
                EventKind::Track(track) => match self.estimator {
                    Estimator::IntegralTrack => {
                        integral_track_score(self.kernel.as_ref(), &bandwidth, &coords, track)
                    }
                    _ => subtrack_score(self.kernel.as_ref(), &bandwidth, &coords, &subtrack_points),
                },
            };
            self.accumulator
                .add_score(node, ebin, weight * kernel_value, total_bin);
        }

        Ok(())
    }

    /// Score `event` into the energy bin matching its particle energy.
    ///
    /// Returns false (and scores nothing) if the energy is outside every bin.
    pub fn score_event(&mut self, event: &TallyEvent) -> Result<bool> {
        match self.energy_filter.get_bin(event.particle_energy) {
            Some(ebin) => {
                self.compute_score(event, ebin)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Fold the scores of the finished history into the running totals
    pub fn end_history(&mut self) {
        self.accumulator.end_history();
    }

    /// Normalize the results by `num_particles` and `multiplier`, write them
    /// to the mesh as node attributes together with the run-level bandwidth,
    /// and return them.
    pub fn write_results(&mut self, num_particles: f64, multiplier: f64) -> Result<TallyResults> {
        if !(num_particles > 0.0) {
            return Err(KdeError::InvalidNormalization(num_particles));
        }

        let optimal_bandwidth = self.optimal_bandwidth();
        if self.estimator == Estimator::Collision {
            match optimal_bandwidth {
                Some(h) => info!(
                    tally_id = self.input.tally_id,
                    collisions = self.running_stats.count(),
                    optimal_bandwidth = ?h,
                    "optimal bandwidth"
                ),
                None => debug!(
                    tally_id = self.input.tally_id,
                    collisions = self.running_stats.count(),
                    "too few collisions to estimate an optimal bandwidth"
                ),
            }
        }

        let total_bin = self.total_bin();
        let mut nodes = Vec::new();

        for node in self.mesh.nodes() {
            let mut values = Vec::with_capacity(self.num_energy_bins);
            let mut rel_errors = Vec::with_capacity(self.num_energy_bins);

            for bin in 0..self.num_energy_bins {
                let is_total = total_bin == Some(bin);
                let rel_error = self.accumulator.relative_error(node, bin, num_particles);
                let value = self.accumulator.tally(node, bin) / num_particles * multiplier;

                self.mesh
                    .set_node_attribute(&tally_tag_name(bin, is_total), node, &[value])?;
                self.mesh
                    .set_node_attribute(&error_tag_name(bin, is_total), node, &[rel_error])?;

                values.push(value);
                rel_errors.push(rel_error);
            }

            let boundary = if self.use_boundary_correction {
                BoundaryInfo::from_mesh(&self.mesh, node)
            } else {
                None
            };

            nodes.push(NodeResult {
                node,
                coords: self.mesh.coords(node)?,
                values,
                rel_errors,
                boundary,
            });
        }

        self.mesh
            .set_run_attribute(BANDWIDTH_TAG, &self.settings.bandwidth)?;

        Ok(TallyResults {
            tally_id: self.input.tally_id,
            estimator: self.estimator,
            kernel: self.kernel.name().to_string(),
            bandwidth: self.settings.bandwidth,
            num_particles,
            multiplier,
            energy_bin_bounds: self.energy_filter.bins.clone(),
            total_energy_bin: self.input.total_energy_bin,
            num_collisions: self.running_stats.count(),
            optimal_bandwidth,
            nodes,
        })
    }

    fn total_bin(&self) -> Option<usize> {
        self.input
            .total_energy_bin
            .then(|| self.num_energy_bins - 1)
    }

    pub fn tally_id(&self) -> u32 {
        self.input.tally_id
    }

    pub fn estimator(&self) -> Estimator {
        self.estimator
    }

    pub fn settings(&self) -> &KdeSettings {
        &self.settings
    }

    pub fn bandwidth(&self) -> [f64; 3] {
        self.settings.bandwidth
    }

    pub fn kernel_name(&self) -> &str {
        self.kernel.name()
    }

    pub fn num_energy_bins(&self) -> usize {
        self.num_energy_bins
    }

    pub fn uses_boundary_correction(&self) -> bool {
        self.use_boundary_correction
    }

    /// Sum of history scores at `node` in `bin` (not normalized)
    pub fn tally_value(&self, node: NodeHandle, bin: usize) -> f64 {
        self.accumulator.tally(node, bin)
    }

    /// Sum of squared history scores at `node` in `bin`
    pub fn error_value(&self, node: NodeHandle, bin: usize) -> f64 {
        self.accumulator.error(node, bin)
    }

    /// Score of the history in progress at `node` in `bin`
    pub fn history_score(&self, node: NodeHandle, bin: usize) -> f64 {
        self.accumulator.history_score(node, bin)
    }

    /// Reset the accumulated tally and error sums
    pub fn zero_tally_data(&mut self) {
        self.accumulator.zero();
    }

    /// Collisions absorbed by the running statistics
    pub fn num_collisions(&self) -> u64 {
        self.running_stats.count()
    }

    pub fn running_stats(&self) -> &RunningStats {
        &self.running_stats
    }

    /// Data-driven bandwidth for collision tallies with at least two collisions
    pub fn optimal_bandwidth(&self) -> Option<[f64; 3]> {
        match self.estimator {
            Estimator::Collision => self.running_stats.optimal_bandwidth(),
            _ => None,
        }
    }

    pub fn mesh(&self) -> &M {
        &self.mesh
    }

    pub fn into_mesh(self) -> M {
        self.mesh
    }
}
