//! Per-sample estimated-phase state: the two haplotypes built up over
//! successive phasing iterations, plus the bookkeeping needed to know which
//! markers still need resolving.

use std::collections::HashMap;

use crate::data::CurrentData;
use crate::marker::{Markers, PackedHaplotype};

/// Current best-guess haplotype pair for one target sample, addressed over
/// the window's typed-marker steps (not raw marker indices).
pub struct SampleEstPhase {
    pub hap1: PackedHaplotype,
    pub hap2: PackedHaplotype,
    /// Steps where the sample is heterozygous and the two alleles have not
    /// yet been assigned to a haplotype with confidence.
    pub unphased_hets: Vec<usize>,
    /// Steps where at least one allele was missing in the input.
    pub imputed_steps: Vec<usize>,
    /// Most recently recorded likelihood-ratio confidence (`max(LR, 1/LR)`)
    /// for each step still in (or just pruned from) `unphased_hets`.
    pub het_lr: HashMap<usize, f32>,
}

/// Estimated phase for every target sample in the current window, indexed by
/// the window's typed-marker step numbering (`0..n_target_markers`).
pub struct EstPhase {
    step_markers: Markers,
    samples: Vec<SampleEstPhase>,
}

/// Phased alleles carried forward from the previous window's overlap region.
/// SPEC_FULL's window-splicing rule: a window's phased calls over the
/// overlap it shares with the next window become hard constraints on that
/// next window's seed, rather than letting the next window re-resolve them
/// from scratch.
#[derive(Default, Clone)]
pub struct SpliceCarry {
    /// `(base_pos, per-sample (allele1, allele2))`, sorted by `base_pos`.
    entries: Vec<(i64, Vec<(u8, u8)>)>,
}

impl SpliceCarry {
    pub fn empty() -> Self {
        SpliceCarry { entries: Vec::new() }
    }

    /// Collects every typed marker in `data`'s overlap-with-the-next-window
    /// region, carrying `phased`'s current per-sample allele pair at each.
    pub fn from_phase(data: &CurrentData, phased: &EstPhase) -> Self {
        let mut entries = Vec::new();
        for (step, &marker) in data.target_marker_indices().iter().enumerate() {
            if marker < data.overlap_start {
                continue;
            }
            let base_pos = data.markers.get(marker).base_pos;
            let pairs: Vec<(u8, u8)> = (0..phased.n_samples()).map(|s| phased.allele_pair(s, step)).collect();
            entries.push((base_pos, pairs));
        }
        SpliceCarry { entries }
    }

    fn lookup(&self, base_pos: i64, sample: usize) -> Option<(u8, u8)> {
        self.entries
            .iter()
            .find(|(bp, _)| *bp == base_pos)
            .and_then(|(_, pairs)| pairs.get(sample).copied())
    }
}

impl EstPhase {
    /// Seeds phase state from the input genotypes, with `carry`'s splice
    /// constraints taking precedence over the raw record at any marker they
    /// cover: homozygous and already-phased calls are taken as-is, missing
    /// alleles are seeded with allele `0` and recorded in `imputed_steps`,
    /// and unresolved heterozygotes are seeded in input order and recorded
    /// in `unphased_hets` for the HMM to resolve.
    pub fn seed(data: &CurrentData, carry: &SpliceCarry) -> Self {
        let target_indices = data.target_marker_indices();
        let step_markers = Markers::new(
            target_indices
                .iter()
                .map(|&m| data.markers.get(m).clone())
                .collect(),
        );
        let n_steps = target_indices.len();
        let n_samples = data.n_target_samples();

        let mut samples = Vec::with_capacity(n_samples);
        for s in 0..n_samples {
            let mut a1 = vec![0u8; n_steps];
            let mut a2 = vec![0u8; n_steps];
            let mut unphased_hets = Vec::new();
            let mut imputed_steps = Vec::new();

            for (step, &marker) in target_indices.iter().enumerate() {
                let gt = data.target(marker).expect("typed marker must carry a target record");
                let sample_gt = gt.samples[s];
                let base_pos = data.markers.get(marker).base_pos;

                let (allele1, allele2, is_phased) = match carry.lookup(base_pos, s) {
                    Some((x, y)) => (Some(x), Some(y), true),
                    None => (sample_gt.allele1, sample_gt.allele2, sample_gt.is_phased),
                };

                match (allele1, allele2) {
                    (Some(x), Some(y)) => {
                        a1[step] = x;
                        a2[step] = y;
                        if x != y && !is_phased {
                            unphased_hets.push(step);
                        }
                    }
                    _ => {
                        imputed_steps.push(step);
                    }
                }
            }

            samples.push(SampleEstPhase {
                hap1: PackedHaplotype::from_alleles(&step_markers, &a1),
                hap2: PackedHaplotype::from_alleles(&step_markers, &a2),
                unphased_hets,
                imputed_steps,
                het_lr: HashMap::new(),
            });
        }

        EstPhase {
            step_markers,
            samples,
        }
    }

    pub fn n_steps(&self) -> usize {
        self.step_markers.len()
    }

    pub fn n_samples(&self) -> usize {
        self.samples.len()
    }

    pub fn sample(&self, s: usize) -> &SampleEstPhase {
        &self.samples[s]
    }

    pub fn step_markers(&self) -> &Markers {
        &self.step_markers
    }

    /// Applies a swap-or-keep decision at `step` for sample `s`: a single
    /// writer per sample, matching the design's update discipline.
    pub fn set_alleles(&mut self, s: usize, step: usize, a1: u8, a2: u8) {
        let sample = &mut self.samples[s];
        sample.hap1.set_allele(&self.step_markers, step, a1);
        sample.hap2.set_allele(&self.step_markers, step, a2);
    }

    pub fn allele_pair(&self, s: usize, step: usize) -> (u8, u8) {
        let sample = &self.samples[s];
        (
            sample.hap1.allele(&self.step_markers, step),
            sample.hap2.allele(&self.step_markers, step),
        )
    }

    /// Records the most recent phase-confidence LR (`max(LR, 1/LR)`) for
    /// `step` in sample `s`'s burn-in stabilization history.
    pub fn record_lr(&mut self, s: usize, step: usize, lr: f32) {
        self.samples[s].het_lr.insert(step, lr);
    }

    /// Burn-in-stabilization confidence filter: removes hets from
    /// `unphased_hets` whose most recently recorded LR exceeds the threshold
    /// implied by `iterations_remaining` (including the iteration just run),
    /// the `floor(lra.length * (1/H)^(1/R) + 0.5)`-th smallest LR, where
    /// `H = len(unphased) + 1`. As `R` shrinks toward the end of the run the
    /// threshold drops toward the smallest recorded LR, so confidently
    /// resolved hets are locked in and removed from further consideration.
    pub fn prune_resolved_hets(&mut self, s: usize, iterations_remaining: usize) {
        let sample = &mut self.samples[s];
        let n = sample.unphased_hets.len();
        if n == 0 {
            return;
        }
        let h = (n + 1) as f64;
        let r = iterations_remaining.max(1) as f64;

        let mut lrs: Vec<f32> = sample
            .unphased_hets
            .iter()
            .map(|step| *sample.het_lr.get(step).unwrap_or(&1.0))
            .collect();
        lrs.sort_by(|a, b| a.partial_cmp(b).unwrap());

        let idx = ((n as f64) * (1.0 / h).powf(1.0 / r) + 0.5).floor() as usize;
        let idx = idx.min(n - 1);
        let threshold = lrs[idx];

        sample.unphased_hets.retain(|step| {
            let lr = *sample.het_lr.get(step).unwrap_or(&1.0);
            lr <= threshold
        });
    }
}
