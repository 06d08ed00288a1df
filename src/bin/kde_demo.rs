//! Analog random walk from an isotropic point source, scored by one KDE mesh
//! tally per estimator on a regular grid of calculation points.
//!
//! Usage: `kde_demo [histories] [output_dir]`. Set `RUST_LOG` to change the
//! log level (default `info`).
use std::f64::consts::PI;
use std::path::PathBuf;

use kde_mesh_tally::host::exit_on_fatal;
use kde_mesh_tally::{
    parse_tally_card, tag_box_boundaries, write_json, BoundingBox, Estimator, FastRng,
    KdeError, KdeMeshTally, PointMesh, Result, TallyEvent, TallyInput,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const HALF_WIDTH: f64 = 5.0;
const TOTAL_CROSS_SECTION: f64 = 0.5;
const ABSORPTION_PROBABILITY: f64 = 0.3;
const SOURCE_ENERGY: f64 = 14.1e6;
const DEFAULT_HISTORIES: usize = 2000;

const CARDS: [(u32, &str); 3] = [
    (14, "dagmc type=kde_coll hx=0.8 hy=0.8 hz=0.8 kernel=epanechnikov boundary=default -dagmc"),
    (24, "dagmc type=kde_track hx=0.8 hy=0.8 hz=0.8 kernel=biweight -dagmc"),
    (34, "dagmc type=kde_subtrack hx=0.8 hy=0.8 hz=0.8 subtracks=5 seed=12345 -dagmc"),
];

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    exit_on_fatal(run());
}

fn run() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let histories = match args.next() {
        Some(raw) => raw.parse::<usize>().unwrap_or_else(|_| {
            warn!(value = %raw, default = DEFAULT_HISTORIES, "invalid number of histories, using default");
            DEFAULT_HISTORIES
        }),
        None => DEFAULT_HISTORIES,
    };
    let output_dir = args.next().map(PathBuf::from).unwrap_or_else(std::env::temp_dir);

    let domain = BoundingBox::new([-HALF_WIDTH; 3], [HALF_WIDTH; 3]);
    let mut tallies = Vec::with_capacity(CARDS.len());

    for (tally_id, card) in CARDS {
        let (kind, options) = parse_tally_card(card, tally_id)?;
        let estimator = kind
            .as_deref()
            .and_then(Estimator::from_name)
            .ok_or_else(|| KdeError::Card {
                tally_id,
                message: format!("unsupported tally type {:?}", kind),
            })?;

        let mut mesh = PointMesh::regular_grid(&domain, [11, 11, 11]);
        tag_box_boundaries(&mut mesh, &domain, &[0.8; 3])?;

        let input = TallyInput::new(tally_id, options).with_energy_bins(vec![0.0, 1e6, 20e6], true);
        tallies.push(KdeMeshTally::new(input, estimator, mesh)?);
    }

    let mut rng = FastRng::new(42);
    let mut num_tracks = 0usize;
    let mut num_collisions = 0usize;

    for _ in 0..histories {
        let mut position = [0.0; 3];
        let mut energy = SOURCE_ENERGY;

        loop {
            let direction = isotropic_direction(&mut rng);
            let distance = -(1.0 - rng.random()).ln() / TOTAL_CROSS_SECTION;
            let end = [
                position[0] + distance * direction[0],
                position[1] + distance * direction[1],
                position[2] + distance * direction[2],
            ];

            let track = TallyEvent::track(position, direction, distance, energy, 1.0)?;
            num_tracks += 1;
            for tally in tallies.iter_mut().filter(|t| t.estimator().uses_tracks()) {
                tally.score_event(&track)?;
            }

            if !domain.contains(&end) {
                break;
            }

            let collision = TallyEvent::collision(end, TOTAL_CROSS_SECTION, energy, 1.0)?;
            num_collisions += 1;
            for tally in tallies.iter_mut().filter(|t| !t.estimator().uses_tracks()) {
                tally.score_event(&collision)?;
            }

            if rng.random() < ABSORPTION_PROBABILITY {
                break;
            }
            position = end;
            energy *= 0.5 + 0.5 * rng.random();
        }

        for tally in tallies.iter_mut() {
            tally.end_history();
        }
    }

    info!(histories, tracks = num_tracks, collisions = num_collisions, "transport finished");

    for tally in tallies.iter_mut() {
        let results = tally.write_results(histories as f64, 1.0)?;
        let path = output_dir.join(format!("kde_tally_{}.json", results.tally_id));
        write_json(&path, &results)?;

        let center = results
            .nodes
            .iter()
            .find(|r| r.coords == [0.0; 3])
            .map(|r| r.values[r.values.len() - 1])
            .unwrap_or(0.0);
        println!(
            "tally {:>3} {:<15} kernel {:<13} flux at origin {:.5e}  -> {}",
            results.tally_id,
            results.estimator.name(),
            results.kernel,
            center,
            path.display()
        );
        if let Some(h) = results.optimal_bandwidth {
            println!("          optimal bandwidth ({:.4}, {:.4}, {:.4})", h[0], h[1], h[2]);
        }
    }

    Ok(())
}

fn isotropic_direction(rng: &mut FastRng) -> [f64; 3] {
    let mu = 2.0 * rng.random() - 1.0;
    let phi = 2.0 * PI * rng.random();
    let sin_theta = (1.0 - mu * mu).max(0.0).sqrt();
    [sin_theta * phi.cos(), sin_theta * phi.sin(), mu]
}
