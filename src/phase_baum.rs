//! The phasing-stage Li & Stephens haploid HMM: forward-backward over a
//! target haplotype's candidate reference/target donor states, used to
//! resolve ambiguous heterozygote phase and fill missing alleles.
//!
//! Probabilities are tracked in `f32` and rescaled to sum to 1 after every
//! step, matching the precision/rescaling discipline the design calls out
//! for numerical stability over long marker ranges.

use crate::config::Params;
use crate::data::{CurrentData, PhaseAlleleSource};
use crate::est_phase::EstPhase;
use crate::ibs::{phase_bounds, PhaseIbs};
use crate::regress::Regress;
use crate::states::PhaseStates;

/// Burn-in/post-burn-in context for one phasing iteration, threaded down
/// from `engine.rs` so the HMM can gate the recombination-regression feed
/// and the burn-in-stabilization het-pruning pass.
pub struct IterationContext {
    pub is_burnin: bool,
    /// Only the last three burn-in iterations feed the regression.
    pub accumulate_regression: bool,
    /// Iterations left including this one; `0` during burn-in (unused then).
    pub iterations_remaining: usize,
}

/// Forward-backward state-probability matrix for one haplotype copy over the
/// window's typed-marker steps, with a handle back to which donor states
/// columns correspond to.
struct Columns {
    states: Vec<Vec<u32>>,
    fwd: Vec<Vec<f32>>,
    bwd: Vec<Vec<f32>>,
    /// Pre-emission, post-transition forward values at each step -- the
    /// `fwd[k]` term the recombination-intensity regression statistic reads.
    trans: Vec<Vec<f32>>,
}

pub struct PhaseBaum1<'a> {
    data: &'a CurrentData,
    params: &'a Params,
}

impl<'a> PhaseBaum1<'a> {
    pub fn new(data: &'a CurrentData, params: &'a Params) -> Self {
        PhaseBaum1 { data, params }
    }

    /// Recombination probability between two steps separated by `cm`
    /// centiMorgans. Before the regression has 100 samples the scale is the
    /// `0.04*Ne/(2*nAllSamples)` intensity prior; afterward it is the fitted
    /// slope, clipped into `(0, 0.04*max(Ne,5e7)/(2*nAllSamples)]`.
    fn recomb_prob(&self, cm: f64, regress: &Regress) -> f32 {
        let n_all_samples = self.data.n_all_samples().max(1) as f64;
        let intensity = self.data.intensity(self.params.ne);
        let max_scale = (0.04 * self.params.ne.max(5.0e7) / (2.0 * n_all_samples)).max(1e-12);
        let scale = if regress.count() >= 100 {
            regress.slope().unwrap_or(intensity).clamp(1e-12, max_scale)
        } else {
            intensity
        };
        let p = 1.0 - (-cm.max(0.0) * scale).exp();
        p.clamp(1e-6, 1.0 - 1e-6) as f32
    }

    fn emission_prob(&self, match_allele: bool, n_alleles: usize) -> f32 {
        let err = self.params.err as f32;
        if match_allele {
            1.0 - err
        } else {
            err / (n_alleles.saturating_sub(1).max(1) as f32)
        }
    }

    fn build_columns(&self, hap: u32, ibs: &PhaseIbs) -> Columns {
        let source = PhaseAlleleSource::new(self.data);
        let n_steps = self.data.target_marker_indices().len();
        let phase_states = PhaseStates::build(&source, hap, ibs, self.params);
        let states: Vec<Vec<u32>> = (0..n_steps).map(|step| phase_states.states(step).to_vec()).collect();
        Columns {
            states,
            fwd: Vec::with_capacity(n_steps),
            bwd: Vec::with_capacity(n_steps),
            trans: Vec::with_capacity(n_steps),
        }
    }

    fn donor_allele(&self, donor: u32, marker: usize) -> u8 {
        let n_target_haps = self.data.n_target_samples() * 2;
        if (donor as usize) < n_target_haps {
            let sample = donor as usize / 2;
            let gt = self
                .data
                .target(marker)
                .expect("typed marker must carry a target record");
            let sample_gt = gt.samples[sample];
            let allele = if donor % 2 == 0 {
                sample_gt.allele1
            } else {
                sample_gt.allele2
            };
            allele.unwrap_or(0)
        } else {
            self.data.reference(marker).allele(donor as usize - n_target_haps)
        }
    }

    fn run_forward_backward(&self, cols: &mut Columns, observed: &[Option<u8>], regress: &Regress) {
        let n_steps = cols.states.len();
        let target_indices = self.data.target_marker_indices();

        let mut fwd_prev: Vec<f32> = Vec::new();
        for step in 0..n_steps {
            let marker = target_indices[step];
            let n_alleles = self.data.markers.get(marker).n_alleles();
            let n_states = cols.states[step].len().max(1);
            let mut col = vec![1.0f32 / n_states as f32; cols.states[step].len()];

            if step > 0 {
                let cm = self.data.gen_dist_between(target_indices[step - 1], marker);
                let p_recomb = self.recomb_prob(cm, regress);
                let prev_states = &cols.states[step - 1];
                let prev_sum: f32 = fwd_prev.iter().sum();
                let uniform = p_recomb / prev_states.len().max(1) as f32;
                for (i, &donor) in cols.states[step].iter().enumerate() {
                    let carry = match prev_states.iter().position(|&d| d == donor) {
                        Some(j) => fwd_prev[j] * (1.0 - p_recomb) + prev_sum * uniform,
                        None => prev_sum * uniform,
                    };
                    col[i] = carry.max(1e-20);
                }
            }

            cols.trans.push(col.clone());

            if let Some(allele) = observed[step] {
                for (i, &donor) in cols.states[step].iter().enumerate() {
                    let donor_a = self.donor_allele(donor, marker);
                    col[i] *= self.emission_prob(donor_a == allele, n_alleles);
                }
            }

            let sum: f32 = col.iter().sum();
            if sum > 0.0 {
                for v in col.iter_mut() {
                    *v /= sum;
                }
            }
            cols.fwd.push(col.clone());
            fwd_prev = col;
        }

        let mut bwd_next: Vec<f32> = Vec::new();
        for step in (0..n_steps).rev() {
            let n_states = cols.states[step].len();
            let mut col = vec![1.0f32; n_states];

            if step + 1 < n_steps {
                let marker_next = target_indices[step + 1];
                let n_alleles_next = self.data.markers.get(marker_next).n_alleles();
                let cm = self.data.gen_dist_between(target_indices[step], marker_next);
                let p_recomb = self.recomb_prob(cm, regress);
                let next_states = &cols.states[step + 1];
                let mut weighted_next = vec![0.0f32; next_states.len()];
                if let Some(allele) = observed[step + 1] {
                    for (j, &donor) in next_states.iter().enumerate() {
                        let donor_a = self.donor_allele(donor, marker_next);
                        weighted_next[j] = bwd_next[j] * self.emission_prob(donor_a == allele, n_alleles_next);
                    }
                } else {
                    for (j, &w) in bwd_next.iter().enumerate() {
                        weighted_next[j] = w;
                    }
                }
                let sum_weighted: f32 = weighted_next.iter().sum();
                let uniform = p_recomb * sum_weighted / next_states.len().max(1) as f32;
                for (i, &donor) in cols.states[step].iter().enumerate() {
                    let stay = match next_states.iter().position(|&d| d == donor) {
                        Some(j) => weighted_next[j] * (1.0 - p_recomb),
                        None => 0.0,
                    };
                    col[i] = (stay + uniform).max(1e-20);
                }
            }

            let sum: f32 = col.iter().sum();
            if sum > 0.0 {
                for v in col.iter_mut() {
                    *v /= sum;
                }
            }
            bwd_next = col.clone();
            cols.bwd.push(col);
        }
        cols.bwd.reverse();
    }

    /// Feeds the recombination-intensity regression from one fully-resolved
    /// column pair's switch-posterior-mass statistic: `factor * (num/den)`,
    /// `factor = nStates/(nStates-1)`, summed over states `k` at each step
    /// `m` with `lastSum = sum_k trans[m][k]` and `shift = nStates`. Only
    /// called for the last three burn-in iterations, per the design.
    fn accumulate_regression(&self, cols: &Columns, observed: &[Option<u8>], regress: &Regress) {
        let target_indices = self.data.target_marker_indices();
        for step in 1..cols.states.len() {
            let marker = target_indices[step];
            let n_alleles = self.data.markers.get(marker).n_alleles();
            let n_states = cols.states[step].len();
            if n_states < 2 {
                continue;
            }
            let trans = &cols.trans[step];
            let last_sum: f32 = trans.iter().sum::<f32>().max(1e-20);
            let shift = n_states as f32;
            let factor = n_states as f64 / (n_states as f64 - 1.0);

            let mut num = 0.0f64;
            let mut den = 0.0f64;
            for (i, &donor) in cols.states[step].iter().enumerate() {
                let em = match observed[step] {
                    Some(allele) => {
                        let donor_a = self.donor_allele(donor, marker);
                        self.emission_prob(donor_a == allele, n_alleles) as f64
                    }
                    None => 1.0,
                };
                let bwd_ik = cols.bwd[step][i] as f64;
                num += ((last_sum - trans[i]) / (last_sum / shift)) as f64 * em * bwd_ik;
                den += cols.fwd[step][i] as f64 * bwd_ik;
            }

            if den.abs() > 1e-12 {
                let cm = self.data.gen_dist_between(target_indices[step - 1], marker);
                regress.add(cm, factor * (num / den));
            }
        }
    }

    /// Total posterior mass (`fwd * bwd`, summed over states) placed on
    /// donor states that carry `allele` at `marker`, the term the
    /// heterozygote-phase likelihood-ratio test compares between the
    /// "keep" and "swap" hypotheses.
    fn posterior_mass(&self, cols: &Columns, step: usize, marker: usize, allele: u8) -> f32 {
        cols.states[step]
            .iter()
            .enumerate()
            .filter(|(_, &donor)| self.donor_allele(donor, marker) == allele)
            .map(|(i, _)| cols.fwd[step][i] * cols.bwd[step][i])
            .sum::<f32>()
            .max(1e-20)
    }

    /// Posterior-weighted consensus allele at `step` from a haplotype's
    /// state-probability column.
    fn consensus_allele(&self, cols: &Columns, step: usize, marker: usize) -> u8 {
        let mut weights: Vec<(u8, f32)> = Vec::new();
        for (i, &donor) in cols.states[step].iter().enumerate() {
            let a = self.donor_allele(donor, marker);
            let w = cols.fwd[step][i] * cols.bwd[step][i];
            match weights.iter_mut().find(|(allele, _)| *allele == a) {
                Some((_, acc)) => *acc += w,
                None => weights.push((a, w)),
            }
        }
        weights
            .into_iter()
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap())
            .map(|(a, _)| a)
            .unwrap_or(0)
    }

    /// Runs one phasing iteration over every target sample: resolves
    /// unphased heterozygotes by comparing the two haplotype assignments'
    /// posterior support (a likelihood-ratio test between "keep" and
    /// "swap"), records each test's confidence for burn-in stabilization,
    /// and fills missing alleles with the posterior-weighted consensus.
    /// IBS partitioning is computed once for the whole window/iteration and
    /// shared across every sample, instead of being rebuilt per sample.
    pub fn run(&self, est: &mut EstPhase, regress: &Regress, ctx: &IterationContext) {
        let n_samples = est.n_samples();
        let target_indices = self.data.target_marker_indices().to_vec();

        let source = PhaseAlleleSource::new(self.data);
        let bounds = phase_bounds(self.params, ctx.is_burnin);
        let ibs = PhaseIbs::build(&source, self.params, &bounds);

        for s in 0..n_samples {
            let hap1 = (2 * s) as u32;
            let hap2 = (2 * s + 1) as u32;

            let observed1: Vec<Option<u8>> = (0..target_indices.len())
                .map(|step| Some(est.allele_pair(s, step).0))
                .collect();
            let observed2: Vec<Option<u8>> = (0..target_indices.len())
                .map(|step| Some(est.allele_pair(s, step).1))
                .collect();

            let mut cols1 = self.build_columns(hap1, &ibs);
            self.run_forward_backward(&mut cols1, &observed1, regress);
            let mut cols2 = self.build_columns(hap2, &ibs);
            self.run_forward_backward(&mut cols2, &observed2, regress);

            if ctx.accumulate_regression {
                self.accumulate_regression(&cols1, &observed1, regress);
                self.accumulate_regression(&cols2, &observed2, regress);
            }

            let sample = est.sample(s);
            let unphased: Vec<usize> = sample.unphased_hets.clone();
            let imputed: Vec<usize> = sample.imputed_steps.clone();

            for step in unphased {
                let marker = target_indices[step];
                let (a1, a2) = est.allele_pair(s, step);
                let p11 = self.posterior_mass(&cols1, step, marker, a1);
                let p22 = self.posterior_mass(&cols2, step, marker, a2);
                let p12 = self.posterior_mass(&cols1, step, marker, a2);
                let p21 = self.posterior_mass(&cols2, step, marker, a1);

                let denom = (p12 as f64) * (p21 as f64);
                let numer = (p11 as f64) * (p22 as f64);
                let lr = if denom > 1e-20 { numer / denom } else { f64::INFINITY };
                let confidence = if lr.is_finite() { lr.max(1.0 / lr) as f32 } else { f32::MAX };
                est.record_lr(s, step, confidence);

                if lr < 1.0 {
                    est.set_alleles(s, step, a2, a1);
                }
            }

            if !ctx.is_burnin {
                est.prune_resolved_hets(s, ctx.iterations_remaining);
            }

            for step in imputed {
                let marker = target_indices[step];
                let a1 = self.consensus_allele(&cols1, step, marker);
                let a2 = self.consensus_allele(&cols2, step, marker);
                est.set_alleles(s, step, a1, a2);
            }
        }
    }
}
