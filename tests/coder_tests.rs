use beagle_engine::coder::{AlleleSource, HaplotypeCoder};

/// A fixed matrix of target/reference alleles over a handful of markers,
/// used to exercise `code_step` without any genotype-record plumbing.
struct Toy {
    target: Vec<Vec<Option<u8>>>, // [hap][marker]
    reference: Vec<Vec<u8>>,      // [hap][marker]
    n_alleles: Vec<usize>,
}

impl AlleleSource for Toy {
    fn n_target_haps(&self) -> usize {
        self.target.len()
    }

    fn n_ref_haps(&self) -> usize {
        self.reference.len()
    }

    fn n_steps(&self) -> usize {
        self.n_alleles.len()
    }

    fn n_alleles(&self, marker: usize) -> usize {
        self.n_alleles[marker]
    }

    fn target_allele(&self, hap: usize, marker: usize) -> Option<u8> {
        self.target[hap][marker]
    }

    fn ref_allele(&self, hap: usize, marker: usize) -> u8 {
        self.reference[hap][marker]
    }

    fn gen_dist(&self, step: usize) -> f64 {
        step as f64
    }
}

#[test]
fn identical_sequences_share_a_code() {
    // Four target haplotypes over three biallelic markers: hap 0 and hap 1
    // are identical, hap 2 and hap 3 diverge at marker 1.
    let toy = Toy {
        target: vec![
            vec![Some(0), Some(1), Some(0)],
            vec![Some(0), Some(1), Some(0)],
            vec![Some(0), Some(0), Some(0)],
            vec![Some(0), Some(1), Some(1)],
        ],
        reference: vec![vec![0, 1, 0], vec![1, 1, 1]],
        n_alleles: vec![2, 2, 2],
    };

    let coded = HaplotypeCoder::code_step(&toy, 0, 3);
    assert_eq!(coded.target_codes[0], coded.target_codes[1]);
    assert_ne!(coded.target_codes[0], coded.target_codes[2]);
    assert_ne!(coded.target_codes[0], coded.target_codes[3]);
    assert_ne!(coded.target_codes[2], coded.target_codes[3]);

    // Reference hap 0 matches target haps 0/1 exactly, so it shares their code.
    assert_eq!(coded.ref_codes[0], coded.target_codes[0]);
    // Reference hap 1 matches no target haplotype over this range.
    assert_eq!(coded.ref_codes[1], 0);
}

#[test]
fn missing_target_allele_is_its_own_class() {
    let toy = Toy {
        target: vec![vec![Some(0)], vec![None]],
        reference: vec![vec![0]],
        n_alleles: vec![2],
    };
    let coded = HaplotypeCoder::code_step(&toy, 0, 1);
    assert_ne!(coded.target_codes[0], coded.target_codes[1]);
}

#[test]
fn empty_range_assigns_the_initial_class_to_everyone() {
    let toy = Toy {
        target: vec![vec![Some(0)], vec![Some(1)]],
        reference: vec![vec![0]],
        n_alleles: vec![2],
    };
    let coded = HaplotypeCoder::code_step(&toy, 0, 0);
    assert_eq!(coded.target_codes[0], coded.target_codes[1]);
    assert_eq!(coded.ref_codes[0], coded.target_codes[0]);
}
