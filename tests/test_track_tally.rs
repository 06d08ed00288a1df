// End-to-end tests of the integral-track and sub-track estimators
use approx::assert_abs_diff_eq;
use kde_mesh_tally::{
    Estimator, FastRng, KdeMeshTally, NodeHandle, PointMesh, TallyEvent, TallyInput,
    TallyOptions,
};

fn unit_options() -> TallyOptions {
    TallyOptions::new()
        .with("hx", "1")
        .with("hy", "1")
        .with("hz", "1")
}

fn through_origin() -> TallyEvent {
    TallyEvent::track([-2.0, 0.0, 0.0], [1.0, 0.0, 0.0], 4.0, 1.0e6, 1.0).unwrap()
}

#[test]
fn test_integral_track_through_node() {
    let mesh = PointMesh::new(vec![[0.0; 3]]);
    let mut tally =
        KdeMeshTally::new(TallyInput::new(24, unit_options()), Estimator::IntegralTrack, mesh)
            .unwrap();

    tally.compute_score(&through_origin(), 0).unwrap();
    tally.end_history();

    // int K(x) dx * K(0)^2 over the full kernel support
    assert_abs_diff_eq!(tally.tally_value(NodeHandle(0), 0), 0.5625, epsilon = 1e-9);
}

#[test]
fn test_integral_track_misses_distant_nodes() {
    let mesh = PointMesh::new(vec![[0.0, 0.0, 0.0], [0.0, 0.5, 0.0], [0.0, 1.5, 0.0], [3.5, 0.0, 0.0]]);
    let mut tally =
        KdeMeshTally::new(TallyInput::new(25, unit_options()), Estimator::IntegralTrack, mesh)
            .unwrap();

    tally.compute_score(&through_origin(), 0).unwrap();
    tally.end_history();

    let on_axis = tally.tally_value(NodeHandle(0), 0);
    let off_axis = tally.tally_value(NodeHandle(1), 0);
    assert!(off_axis > 0.0 && off_axis < on_axis);
    // K(0.5) * K(0) for the transverse axes
    assert_abs_diff_eq!(off_axis, 0.5625 * 0.75, epsilon = 1e-9);
    assert_eq!(tally.tally_value(NodeHandle(2), 0), 0.0);
    assert_eq!(tally.tally_value(NodeHandle(3), 0), 0.0);
}

#[test]
fn test_integral_track_partial_overlap() {
    // track ends at the node, so only half of the kernel support is crossed
    let mesh = PointMesh::new(vec![[0.0; 3]]);
    let mut tally =
        KdeMeshTally::new(TallyInput::new(26, unit_options()), Estimator::IntegralTrack, mesh)
            .unwrap();
    let event = TallyEvent::track([-2.0, 0.0, 0.0], [1.0, 0.0, 0.0], 2.0, 1.0e6, 1.0).unwrap();
    tally.compute_score(&event, 0).unwrap();
    tally.end_history();
    assert_abs_diff_eq!(tally.tally_value(NodeHandle(0), 0), 0.28125, epsilon = 1e-9);
}

#[test]
fn test_subtrack_with_injected_sampler() {
    let options = unit_options().with("subtracks", "4");
    let build = || {
        KdeMeshTally::new(
            TallyInput::new(34, options.clone()),
            Estimator::SubTrack,
            PointMesh::new(vec![[0.0; 3], [0.25, 0.25, 0.0]]),
        )
        .unwrap()
        .with_sampler(FastRng::new(2024))
    };

    let mut first = build();
    let mut second = build();
    assert_eq!(first.settings().num_subtracks, 4);

    for tally in [&mut first, &mut second] {
        tally.compute_score(&through_origin(), 0).unwrap();
        tally.end_history();
    }

    let score = first.tally_value(NodeHandle(0), 0);
    assert!(score > 0.0);
    assert_eq!(score, second.tally_value(NodeHandle(0), 0));
    assert_eq!(first.tally_value(NodeHandle(1), 0), second.tally_value(NodeHandle(1), 0));

    // at most two of the four points fall within the kernel support
    // each contributing at most K(0)^3, scaled by L / 4
    assert!(score <= 4.0 * 2.0 * 0.421875 / 4.0);
}

#[test]
fn test_collision_event_rejected_by_track_tally() {
    let mut tally = KdeMeshTally::new(
        TallyInput::new(27, unit_options()),
        Estimator::IntegralTrack,
        PointMesh::new(vec![[0.0; 3]]),
    )
    .unwrap();
    let collision = TallyEvent::collision([0.0; 3], 1.0, 1.0e6, 1.0).unwrap();
    assert!(tally.compute_score(&collision, 0).is_err());
}
