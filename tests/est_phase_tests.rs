use beagle_engine::data::CurrentData;
use beagle_engine::est_phase::{EstPhase, SpliceCarry};
use beagle_engine::genetic_map::GeneticMap;
use beagle_engine::marker::Marker;
use beagle_engine::records::{MarkerRecord, RefGt, TargetGt, TargetSampleGt};
use beagle_engine::window::Window;

fn biallelic_window(samples: Vec<Vec<TargetSampleGt>>) -> Window {
    let n_markers = samples[0].len();
    let rec_list = (0..n_markers)
        .map(|m| MarkerRecord {
            marker: Marker::new(0, (m as i64 + 1) * 100, vec!["0".into(), "1".into()]),
            reference: RefGt::AlleleCoded {
                n_haps: 2,
                minor_carriers: vec![vec![]],
            },
            target: Some(TargetGt::new(samples.iter().map(|s| s[m]).collect())),
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

fn het(phased: bool) -> TargetSampleGt {
    TargetSampleGt {
        allele1: Some(0),
        allele2: Some(1),
        is_phased: phased,
    }
}

fn hom(a: u8) -> TargetSampleGt {
    TargetSampleGt {
        allele1: Some(a),
        allele2: Some(a),
        is_phased: true,
    }
}

#[test]
fn seeds_homozygous_calls_directly() {
    let window = biallelic_window(vec![vec![hom(0), hom(1), hom(0)]]);
    let data = CurrentData::from_window(window, &GeneticMap::new(), 1);
    let est = EstPhase::seed(&data, &SpliceCarry::empty());

    assert_eq!(est.allele_pair(0, 0), (0, 0));
    assert_eq!(est.allele_pair(0, 1), (1, 1));
    assert_eq!(est.sample(0).unphased_hets.len(), 0);
    assert_eq!(est.sample(0).imputed_steps.len(), 0);
}

#[test]
fn records_unphased_heterozygotes_for_resolution() {
    let window = biallelic_window(vec![vec![het(false), hom(0)]]);
    let data = CurrentData::from_window(window, &GeneticMap::new(), 1);
    let est = EstPhase::seed(&data, &SpliceCarry::empty());

    assert_eq!(est.sample(0).unphased_hets, vec![0]);
    assert_eq!(est.allele_pair(0, 0), (0, 1));
}

#[test]
fn already_phased_heterozygotes_are_not_flagged_for_resolution() {
    let window = biallelic_window(vec![vec![het(true)]]);
    let data = CurrentData::from_window(window, &GeneticMap::new(), 1);
    let est = EstPhase::seed(&data, &SpliceCarry::empty());
    assert!(est.sample(0).unphased_hets.is_empty());
}

#[test]
fn missing_calls_are_recorded_for_imputation() {
    let missing = TargetSampleGt::missing();
    let window = biallelic_window(vec![vec![missing, hom(1)]]);
    let data = CurrentData::from_window(window, &GeneticMap::new(), 1);
    let est = EstPhase::seed(&data, &SpliceCarry::empty());
    assert_eq!(est.sample(0).imputed_steps, vec![0]);
}

#[test]
fn set_alleles_overwrites_a_single_step() {
    let window = biallelic_window(vec![vec![het(false)]]);
    let data = CurrentData::from_window(window, &GeneticMap::new(), 1);
    let mut est = EstPhase::seed(&data, &SpliceCarry::empty());
    est.set_alleles(0, 0, 1, 0);
    assert_eq!(est.allele_pair(0, 0), (1, 0));
}
