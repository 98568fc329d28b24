//! Top-level orchestration: sliding-window iteration, iterative phasing,
//! imputation, and output splicing across window boundaries.

use log::{debug, info};
use rayon::prelude::*;

use crate::config::Params;
use crate::data::{CurrentData, ImpAlleleSource};
use crate::error::Result;
use crate::est_phase::{EstPhase, SpliceCarry};
use crate::genetic_map::GeneticMap;
use crate::imp_baum::ImpLSBaum;
use crate::output::{MarkerOutput, OutputBuilder};
use crate::phase_baum::{IterationContext, PhaseBaum1};
use crate::records::GtRecIterator;
use crate::ref_hap_hash::RefHapHash;
use crate::regress::Regress;
use crate::window::WindowIter;

/// One marker's final output, tagged with its position so callers can merge
/// windows without re-deriving genomic coordinates.
pub struct EngineRecord {
    pub chrom_index: usize,
    pub base_pos: i64,
    pub output: MarkerOutput,
}

pub struct Engine {
    params: Params,
    genetic_map: GeneticMap,
}

impl Engine {
    pub fn new(params: Params, genetic_map: GeneticMap) -> Result<Self> {
        params.validate()?;
        Ok(Engine { params, genetic_map })
    }

    /// Runs the full phasing + imputation pipeline over every window in
    /// `source`, returning one `EngineRecord` per reference marker, with
    /// window overlaps spliced so each marker appears exactly once.
    ///
    /// A window's phased calls over the region it shares with the next
    /// window are carried forward as hard constraints on that next window's
    /// seed, so a heterozygote resolved near a window boundary is not
    /// re-litigated from scratch once the sliding window moves past it.
    pub fn run<I: GtRecIterator>(&self, source: I, n_target_samples: usize) -> Result<Vec<EngineRecord>> {
        let mut window_iter = WindowIter::new(source, self.genetic_map.clone(), self.params.window_cm, self.params.overlap_cm)?;
        let mut out = Vec::new();
        let mut window_index = 0usize;
        let mut carry = SpliceCarry::empty();

        while let Some(window) = window_iter.next_window()? {
            debug!("window {}: {} records", window_index, window.len());
            let overlap_end = window.overlap_end;
            let overlap_start = window.overlap_start;
            let last_window_on_chrom = window.last_window_on_chrom;

            let data = CurrentData::from_window(window, &self.genetic_map, n_target_samples);
            let (window_records, next_carry) = self.process_window(&data, &carry)?;
            carry = next_carry;

            let emit_start = if window_index == 0 { 0 } else { overlap_end };
            let emit_end = if last_window_on_chrom {
                window_records.len()
            } else {
                overlap_start
            };
            out.extend(window_records.into_iter().skip(emit_start).take(emit_end.saturating_sub(emit_start)));

            window_index += 1;
        }

        info!("processed {} windows, {} markers", window_index, out.len());
        Ok(out)
    }

    fn process_window(&self, data: &CurrentData, carry: &SpliceCarry) -> Result<(Vec<EngineRecord>, SpliceCarry)> {
        if data.target_marker_indices().is_empty() {
            return Err(crate::error::EngineError::EmptyWindow(
                "window has no typed target markers".to_string(),
            ));
        }

        let mut phased = EstPhase::seed(data, carry);
        let regress = Regress::new();
        let phaser = PhaseBaum1::new(data, &self.params);

        let total_iterations = self.params.burnin + self.params.iterations;
        for iter in 0..total_iterations {
            debug!("phasing iteration {iter}");
            let is_burnin = iter < self.params.burnin;
            let accumulate_regression = is_burnin && (self.params.burnin - iter) <= 3;
            let iterations_remaining = if is_burnin { 0 } else { total_iterations - iter };
            let ctx = IterationContext {
                is_burnin,
                accumulate_regression,
                iterations_remaining,
            };
            phaser.run(&mut phased, &regress, &ctx);
        }

        let next_carry = SpliceCarry::from_phase(data, &phased);

        let chrom = data.markers.get(0).chrom_index;
        let records: Vec<EngineRecord> = if self.params.impute {
            let n_haps = data.n_target_samples() * 2;
            let imputer = ImpLSBaum::new(data, &self.params);

            let hap_columns: Vec<Vec<crate::imp_baum::StateProbs>> = (0..n_haps)
                .into_par_iter()
                .map(|h| imputer.run_haplotype(h as u32, &phased))
                .collect();

            let source = ImpAlleleSource::new(data, &phased);
            let ref_hash = RefHapHash::build(data, self.params.derive_seed(&[0x5EED]));
            let builder = OutputBuilder::new(data, &ref_hash);

            (0..data.n_markers())
                .map(|m| {
                    let hap_states: Vec<crate::imp_baum::StateProbs> =
                        (0..n_haps).map(|h| hap_columns[h][m].clone()).collect();
                    let output = builder.build(m, &source, &hap_states);
                    EngineRecord {
                        chrom_index: chrom,
                        base_pos: data.markers.get(m).base_pos,
                        output,
                    }
                })
                .collect()
        } else {
            (0..data.n_markers())
                .map(|m| EngineRecord {
                    chrom_index: chrom,
                    base_pos: data.markers.get(m).base_pos,
                    output: phased_only_output(data, &phased, m),
                })
                .collect()
        };

        Ok((records, next_carry))
    }
}

/// When imputation is disabled, dosage/allele posteriors come directly from
/// the phased haplotypes (probability 1 on the called allele, or a uniform
/// split if the call is still missing after phasing -- which only happens
/// for samples with no informative donors at all).
fn phased_only_output(data: &CurrentData, phased: &EstPhase, marker: usize) -> MarkerOutput {
    use crate::output::CohortSummary;

    let target_indices = data.target_marker_indices();
    let step = target_indices.iter().position(|&m| m == marker);
    let n_samples = data.n_target_samples();
    let n_alleles = data.markers.get(marker).n_alleles();

    let mut dosage = vec![0.0f32; n_samples];
    let mut allele1_probs = Vec::with_capacity(n_samples);
    let mut allele2_probs = Vec::with_capacity(n_samples);

    for s in 0..n_samples {
        let (a1, a2) = match step {
            Some(step) => phased.allele_pair(s, step),
            None => (0, 0),
        };
        let mut p1 = vec![0.0f32; n_alleles];
        let mut p2 = vec![0.0f32; n_alleles];
        p1[a1 as usize] = 1.0;
        p2[a2 as usize] = 1.0;
        dosage[s] = (a1 != 0) as u8 as f32 + (a2 != 0) as u8 as f32;
        allele1_probs.push(p1);
        allele2_probs.push(p2);
    }

    let mean: f64 = dosage.iter().map(|&d| d as f64).sum::<f64>() / (n_samples.max(1) as f64);
    let allele_freq = (mean / 2.0).clamp(0.0, 1.0);

    MarkerOutput {
        dosage,
        allele1_probs,
        allele2_probs,
        cohort: CohortSummary { allele_freq, dr2: 1.0 },
    }
}
