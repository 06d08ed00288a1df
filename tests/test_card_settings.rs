// Card parsing, option validation and result output
use approx::assert_abs_diff_eq;
use kde_mesh_tally::{
    parse_tally_card, read_json, tag_box_boundaries, write_json, BoundarySide, BoundingBox,
    Estimator, KdeMeshTally, MeshBackend, NodeHandle, PointMesh, TallyEvent, TallyInput,
    BANDWIDTH_TAG, DEFAULT_BANDWIDTH, DEFAULT_SUBTRACKS,
};

#[test]
fn test_card_to_settings() {
    let card = "fc14 flux dagmc type=kde_track hx=0.5 hy=0.25 hz=-1 kernel=Triweight boundary=default -dagmc";
    let (kind, options) = parse_tally_card(card, 14).unwrap();
    assert_eq!(kind.as_deref(), Some("kde_track"));
    let estimator = Estimator::from_name(kind.as_deref().unwrap()).unwrap();

    let tally = KdeMeshTally::new(
        TallyInput::new(14, options),
        estimator,
        PointMesh::new(vec![[0.0; 3]]),
    )
    .unwrap();

    let settings = tally.settings();
    assert_eq!(settings.bandwidth, [0.5, 0.25, DEFAULT_BANDWIDTH]);
    assert_eq!(tally.kernel_name(), "triweight");
    assert!(settings.boundary_requested);
    // no boundary attributes on the mesh
    assert!(!tally.uses_boundary_correction());
}

#[test]
fn test_invalid_options_fall_back() {
    let card = "dagmc type=kde_subtrack kernel=gaussian subtracks=0 color=blue";
    let (_, options) = parse_tally_card(card, 7).unwrap();
    let tally = KdeMeshTally::new(
        TallyInput::new(7, options),
        Estimator::SubTrack,
        PointMesh::new(vec![[0.0; 3]]),
    )
    .unwrap();
    assert_eq!(tally.kernel_name(), "epanechnikov");
    assert_eq!(tally.settings().num_subtracks, DEFAULT_SUBTRACKS);
    assert_eq!(tally.bandwidth(), [DEFAULT_BANDWIDTH; 3]);
}

#[test]
fn test_results_with_boundary_info() {
    let domain = BoundingBox::new([-1.0; 3], [1.0; 3]);
    let mut mesh = PointMesh::regular_grid(&domain, [3, 3, 3]);
    tag_box_boundaries(&mut mesh, &domain, &[0.5; 3]).unwrap();

    let (_, options) = parse_tally_card("dagmc hx=0.5 hy=0.5 hz=0.5 boundary=default", 44).unwrap();
    let mut tally = KdeMeshTally::new(TallyInput::new(44, options), Estimator::Collision, mesh).unwrap();
    assert!(tally.uses_boundary_correction());

    let event = TallyEvent::collision([0.1, 0.0, 0.0], 2.0, 1.0e6, 1.0).unwrap();
    tally.compute_score(&event, 0).unwrap();
    tally.end_history();

    let results = tally.write_results(10.0, 3.0).unwrap();
    assert_eq!(results.nodes.len(), 27);

    // the grid center is the only interior node
    let center = results.nodes.iter().find(|r| r.coords == [0.0; 3]).unwrap();
    assert!(center.boundary.is_none());
    assert!(center.values[0] > 0.0);

    let corner = results.node(NodeHandle(0)).unwrap();
    assert_eq!(corner.coords, [-1.0; 3]);
    let info = corner.boundary.unwrap();
    assert_eq!(info.side, [BoundarySide::Lower; 3]);
    assert_eq!(info.distance, [0.0; 3]);

    assert_eq!(tally.mesh().run_attribute(BANDWIDTH_TAG), Some(&[0.5, 0.5, 0.5][..]));

    let path = std::env::temp_dir().join(format!("kde_card_results_{}.json", std::process::id()));
    write_json(&path, &results).unwrap();
    let loaded = read_json(&path).unwrap();
    std::fs::remove_file(&path).ok();
    assert_eq!(loaded.tally_id, 44);
    assert_eq!(loaded.nodes.len(), results.nodes.len());
    assert_eq!(loaded.nodes[0].boundary, results.nodes[0].boundary);
    assert_abs_diff_eq!(loaded.bin_sum(0), results.bin_sum(0), epsilon = 1e-12);
}
