//! Aggregates per-haplotype imputation state probabilities into the final
//! per-marker, per-sample output: posterior genotype probabilities, dosage,
//! and cohort-level allele-frequency / DR2 summaries.

use std::cell::RefCell;
use std::collections::HashMap;

use crate::data::{CurrentData, ImpAlleleSource};
use crate::imp_baum::StateProbs;
use crate::ref_hap_hash::RefHapHash;

/// Cohort-level summary statistics for one marker, computed across all
/// target samples' dosages.
#[derive(Debug, Clone, Copy)]
pub struct CohortSummary {
    pub allele_freq: f64,
    /// Empirical dosage R-squared: `Var(dosage) / (2*p*(1-p))`, the
    /// ratio of observed dosage variance to the variance expected under
    /// Hardy-Weinberg at the estimated allele frequency `p`. `1.0` when `p`
    /// is monomorphic (no variance to explain, so nothing is lost).
    pub dr2: f64,
}

/// One marker's aggregated output across every target sample.
#[derive(Debug, Clone)]
pub struct MarkerOutput {
    /// `dosage[s]` = expected dosage of the minor (allele `1`) allele for
    /// sample `s`, in `[0, 2]` for biallelic markers.
    pub dosage: Vec<f32>,
    /// `allele1_probs[s][a]` / `allele2_probs[s][a]` = posterior probability
    /// sample `s`'s first/second haplotype carries allele `a`.
    pub allele1_probs: Vec<Vec<f32>>,
    pub allele2_probs: Vec<Vec<f32>>,
    pub cohort: CohortSummary,
}

/// Builds per-marker output. Reference donors sharing a `RefHapHash` bucket
/// carry identical alleles by construction over the whole window, so the
/// allele lookup for a reference donor is resolved once per hash bucket seen
/// within a marker and reused for the rest of the bucket's members instead of
/// being re-derived per donor.
pub struct OutputBuilder<'a> {
    data: &'a CurrentData,
    ref_hap_hash: &'a RefHapHash,
}

impl<'a> OutputBuilder<'a> {
    pub fn new(data: &'a CurrentData, ref_hap_hash: &'a RefHapHash) -> Self {
        OutputBuilder { data, ref_hap_hash }
    }

    /// Builds the aggregated output for marker `marker`, given every target
    /// haplotype's `StateProbs` column at that marker (`hap_states[h]`, `h`
    /// in haplotype order `0, 1, 2, ...`).
    pub fn build(&self, marker: usize, source: &ImpAlleleSource, hap_states: &[StateProbs]) -> MarkerOutput {
        let n_samples = self.data.n_target_samples();
        let n_alleles = self.data.markers.get(marker).n_alleles();
        let n_target_haps = n_samples * 2;

        let mut dosage = vec![0.0f32; n_samples];
        let mut allele1_probs = Vec::with_capacity(n_samples);
        let mut allele2_probs = Vec::with_capacity(n_samples);

        let bucket_cache: RefCell<HashMap<u32, u8>> = RefCell::new(HashMap::new());
        let resolve = |donor: u32| -> u8 {
            if (donor as usize) < n_target_haps {
                return source.resolved_allele(donor, marker);
            }
            let ref_hap = donor as usize - n_target_haps;
            let hash = self.ref_hap_hash.hash_of(ref_hap);
            if let Some(&a) = bucket_cache.borrow().get(&hash) {
                return a;
            }
            let a = source.resolved_allele(donor, marker);
            bucket_cache.borrow_mut().insert(hash, a);
            a
        };

        for s in 0..n_samples {
            let sp1 = &hap_states[2 * s];
            let sp2 = &hap_states[2 * s + 1];

            let p1: Vec<f32> = (0..n_alleles)
                .map(|a| {
                    if sp1.is_empty() {
                        if a == 0 {
                            1.0
                        } else {
                            0.0
                        }
                    } else {
                        sp1.prob_allele(&resolve, a as u8)
                    }
                })
                .collect();
            let p2: Vec<f32> = (0..n_alleles)
                .map(|a| {
                    if sp2.is_empty() {
                        if a == 0 {
                            1.0
                        } else {
                            0.0
                        }
                    } else {
                        sp2.prob_allele(&resolve, a as u8)
                    }
                })
                .collect();

            let minor_mass1: f32 = p1.iter().skip(1).sum();
            let minor_mass2: f32 = p2.iter().skip(1).sum();
            dosage[s] = minor_mass1 + minor_mass2;

            allele1_probs.push(p1);
            allele2_probs.push(p2);
        }

        let mean: f64 = dosage.iter().map(|&d| d as f64).sum::<f64>() / (n_samples.max(1) as f64);
        let allele_freq = (mean / 2.0).clamp(0.0, 1.0);
        let variance: f64 = if n_samples > 0 {
            dosage
                .iter()
                .map(|&d| {
                    let diff = d as f64 - mean;
                    diff * diff
                })
                .sum::<f64>()
                / n_samples as f64
        } else {
            0.0
        };
        let expected_variance = 2.0 * allele_freq * (1.0 - allele_freq);
        let dr2 = if expected_variance > 1e-12 {
            (variance / expected_variance).min(1.0)
        } else {
            1.0
        };

        MarkerOutput {
            dosage,
            allele1_probs,
            allele2_probs,
            cohort: CohortSummary { allele_freq, dr2 },
        }
    }
}
