use beagle_engine::GeneticMap;

#[test]
fn interpolates_linearly_between_tabulated_points() {
    let mut map = GeneticMap::new();
    map.add_chrom(0, vec![(0, 0.0), (1_000_000, 1.0), (2_000_000, 3.0)]);

    assert_eq!(map.gen_pos(0, 0), 0.0);
    assert_eq!(map.gen_pos(0, 1_000_000), 1.0);
    assert!((map.gen_pos(0, 500_000) - 0.5).abs() < 1e-9);
    assert!((map.gen_pos(0, 1_500_000) - 2.0).abs() < 1e-9);
}

#[test]
fn extrapolates_beyond_the_tabulated_range() {
    let mut map = GeneticMap::new();
    map.add_chrom(0, vec![(1_000_000, 1.0), (2_000_000, 2.0)]);

    // Below the first point: extrapolate using the first segment's slope.
    assert!((map.gen_pos(0, 0) - 0.0).abs() < 1e-9);
    // Above the last point: extrapolate using the last segment's slope.
    assert!((map.gen_pos(0, 3_000_000) - 3.0).abs() < 1e-9);
}

#[test]
fn untabulated_chromosome_falls_back_to_one_cm_per_mb() {
    let map = GeneticMap::new();
    assert!((map.gen_pos(5, 2_000_000) - 2.0).abs() < 1e-9);
}

#[test]
fn base_pos_is_the_inverse_of_gen_pos() {
    let mut map = GeneticMap::new();
    map.add_chrom(0, vec![(0, 0.0), (1_000_000, 1.0), (3_000_000, 2.0)]);
    for bp in [0, 250_000, 1_000_000, 2_000_000, 3_000_000] {
        let cm = map.gen_pos(0, bp);
        let round_trip = map.base_pos(0, cm);
        assert!((round_trip - bp).abs() <= 1, "bp={bp} round_trip={round_trip}");
    }
}

#[test]
fn single_point_map_is_flat() {
    let mut map = GeneticMap::new();
    map.add_chrom(0, vec![(1_000_000, 5.0)]);
    assert_eq!(map.gen_pos(0, 0), 5.0);
    assert_eq!(map.gen_pos(0, 10_000_000), 5.0);
}
