use beagle_engine::marker::{Marker, Markers, PackedHaplotype};

fn labels(n: usize) -> Vec<String> {
    (0..n).map(|i| i.to_string()).collect()
}

#[test]
fn bits_per_allele_matches_ceil_log2() {
    let biallelic = Marker::new(0, 100, labels(2));
    assert_eq!(biallelic.bits_per_allele(), 1);

    let triallelic = Marker::new(0, 200, labels(3));
    assert_eq!(triallelic.bits_per_allele(), 2);

    let five_allele = Marker::new(0, 300, labels(5));
    assert_eq!(five_allele.bits_per_allele(), 3);

    let monomorphic = Marker::new(0, 400, labels(1));
    assert_eq!(monomorphic.bits_per_allele(), 1);
}

#[test]
fn packed_haplotype_round_trips_across_a_word_boundary() {
    // 70 markers at 1 bit each spans more than one 64-bit word.
    let markers: Vec<Marker> = (0..70)
        .map(|i| Marker::new(0, i as i64 * 10, labels(2)))
        .collect();
    let markers = Markers::new(markers);

    let alleles: Vec<u8> = (0..70).map(|i| (i % 2) as u8).collect();
    let packed = PackedHaplotype::from_alleles(&markers, &alleles);

    for (i, &expected) in alleles.iter().enumerate() {
        assert_eq!(packed.allele(&markers, i), expected, "marker {i}");
    }
}

#[test]
fn packed_haplotype_round_trips_multiallelic_markers() {
    let markers: Vec<Marker> = vec![
        Marker::new(0, 1, labels(5)),
        Marker::new(0, 2, labels(3)),
        Marker::new(0, 3, labels(9)),
    ];
    let markers = Markers::new(markers);
    let alleles = vec![4u8, 2u8, 7u8];
    let packed = PackedHaplotype::from_alleles(&markers, &alleles);
    assert_eq!(packed.allele(&markers, 0), 4);
    assert_eq!(packed.allele(&markers, 1), 2);
    assert_eq!(packed.allele(&markers, 2), 7);
}

#[test]
fn set_allele_overwrites_in_place() {
    let markers = Markers::new(vec![Marker::new(0, 1, labels(4)), Marker::new(0, 2, labels(4))]);
    let mut packed = PackedHaplotype::from_alleles(&markers, &[0, 0]);
    packed.set_allele(&markers, 1, 3);
    assert_eq!(packed.allele(&markers, 0), 0);
    assert_eq!(packed.allele(&markers, 1), 3);
}

#[test]
fn sum_hap_bits_is_a_prefix_sum() {
    let markers = Markers::new(vec![
        Marker::new(0, 1, labels(2)),
        Marker::new(0, 2, labels(4)),
        Marker::new(0, 3, labels(2)),
    ]);
    assert_eq!(markers.sum_hap_bits(0), 0);
    assert_eq!(markers.sum_hap_bits(1), 1);
    assert_eq!(markers.sum_hap_bits(2), 3);
    assert_eq!(markers.sum_hap_bits(3), 4);
    assert_eq!(markers.total_bits(), 4);
}
