use beagle_engine::data::CurrentData;
use beagle_engine::genetic_map::GeneticMap;
use beagle_engine::marker::Marker;
use beagle_engine::records::{MarkerRecord, RefGt};
use beagle_engine::ref_hap_hash::RefHapHash;
use beagle_engine::window::Window;

fn window_with_ref_haps(per_marker_minor_carriers: Vec<Vec<Vec<u32>>>) -> Window {
    let rec_list = per_marker_minor_carriers
        .into_iter()
        .enumerate()
        .map(|(i, minor_carriers)| MarkerRecord {
            marker: Marker::new(0, (i as i64 + 1) * 100, vec!["0".into(), "1".into()]),
            reference: RefGt::AlleleCoded {
                n_haps: 4,
                minor_carriers,
            },
            target: None,
        })
        .collect();
    Window {
        rec_list,
        overlap_end: 0,
        overlap_start: 0,
        last_window_on_chrom: true,
        last_window: true,
    }
}

#[test]
fn identical_haplotypes_collide_and_distinct_ones_do_not() {
    // Haps 0 and 1 carry the minor allele at every marker (identical);
    // haps 2 and 3 never do (also identical to each other, but distinct
    // from 0/1).
    let window = window_with_ref_haps(vec![vec![vec![0, 1]], vec![vec![0, 1]], vec![vec![0, 1]]]);
    let data = CurrentData::from_window(window, &GeneticMap::new(), 0);
    let table = RefHapHash::build(&data, 42);

    assert_eq!(table.hash_of(0), table.hash_of(1));
    assert_eq!(table.hash_of(2), table.hash_of(3));
    assert_ne!(table.hash_of(0), table.hash_of(2));

    let bucket = table.haps_with_hash(table.hash_of(0));
    assert_eq!(bucket.len(), 2);
    assert!(bucket.contains(&0));
    assert!(bucket.contains(&1));
}

#[test]
fn set_allele_moves_a_haplotype_between_buckets() {
    let window = window_with_ref_haps(vec![vec![vec![0]], vec![vec![0]]]);
    let data = CurrentData::from_window(window, &GeneticMap::new(), 0);
    let mut table = RefHapHash::build(&data, 7);

    let original_hash = table.hash_of(0);
    assert!(table.haps_with_hash(original_hash).contains(&0));

    table.set_allele(0, 0, 1, 0);
    let new_hash = table.hash_of(0);
    assert_ne!(original_hash, new_hash);
    assert!(!table.haps_with_hash(original_hash).contains(&0));
    assert!(table.haps_with_hash(new_hash).contains(&0));
}
