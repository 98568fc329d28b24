//! The imputation-stage Li & Stephens HMM. Forward-backward runs only at
//! typed-marker "clusters" (adjacent typed markers sharing a reference
//! partition, merged into one transition unit); state probabilities at the
//! reference markers in between are produced by linear interpolation between
//! the two flanking clusters, and kept sparse (only entries above a
//! per-window threshold survive), per the design's sparse-storage/
//! interpolation scheme.

use std::collections::HashMap;

use crate::cluster::{build_clusters, Cluster};
use crate::coder::AlleleSource;
use crate::config::Params;
use crate::data::{CurrentData, ImpAlleleSource};
use crate::est_phase::EstPhase;
use crate::ibs::{imp_bounds, ImpIbs};
use crate::states::ImpStates;

/// Sparse donor-hap -> posterior-probability column. Entries below the
/// factory's threshold are dropped and the remainder renormalized, so a
/// `StateProbs` never sums to exactly 1 when mass was pruned -- callers
/// treat it as "best estimate", not an exact posterior.
#[derive(Debug, Clone, Default)]
pub struct StateProbs {
    entries: Vec<(u32, f32)>,
}

impl StateProbs {
    pub fn prob_allele(&self, donor_allele: impl Fn(u32) -> u8, allele: u8) -> f32 {
        self.entries
            .iter()
            .filter(|(donor, _)| donor_allele(*donor) == allele)
            .map(|(_, p)| *p)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[(u32, f32)] {
        &self.entries
    }
}

/// Builds thresholded `StateProbs` columns. `T = min(0.005, 0.9999 / n_states)`
/// keeps dense columns safe (threshold shrinks as more states compete) while
/// never admitting a near-1.0 cumulative-mass state to be pruned in a
/// lightly-populated column.
pub struct StateProbsFactory {
    threshold: f32,
}

impl StateProbsFactory {
    pub fn new(n_states: usize) -> Self {
        let t = (0.005f64).min(0.9999 / n_states.max(1) as f64);
        StateProbsFactory { threshold: t as f32 }
    }

    fn build(&self, states: &[u32], probs: &[f32]) -> StateProbs {
        let mut entries: Vec<(u32, f32)> = states
            .iter()
            .zip(probs.iter())
            .filter(|(_, &p)| p >= self.threshold)
            .map(|(&s, &p)| (s, p))
            .collect();
        let sum: f32 = entries.iter().map(|(_, p)| p).sum();
        if sum > 0.0 {
            for (_, p) in entries.iter_mut() {
                *p /= sum;
            }
        }
        entries.sort_unstable_by_key(|(s, _)| *s);
        StateProbs { entries }
    }
}

pub struct ImpLSBaum<'a> {
    data: &'a CurrentData,
    params: &'a Params,
}

impl<'a> ImpLSBaum<'a> {
    pub fn new(data: &'a CurrentData, params: &'a Params) -> Self {
        ImpLSBaum { data, params }
    }

    fn emission_prob(&self, cluster: &Cluster, match_allele: bool, n_alleles: usize) -> f32 {
        let err = cluster.err_prob as f32;
        if match_allele {
            1.0 - err
        } else {
            err / (n_alleles.saturating_sub(1).max(1) as f32)
        }
    }

    /// Runs forward-backward for one target haplotype over the window's
    /// target-marker clusters, returning one sparse `StateProbs` per
    /// cluster's representative (first) marker. Transition probabilities are
    /// the cluster's closed-form `pRecomb[c]`, not a fitted regression --
    /// imputation has no per-step recombination-intensity estimate to fit.
    fn run_clusters(&self, hap: u32, phased: &EstPhase) -> Vec<(usize, StateProbs)> {
        let source = ImpAlleleSource::new(self.data, phased);
        let clusters = build_clusters(self.data, self.params);
        if clusters.is_empty() {
            return Vec::new();
        }
        let anchors: Vec<usize> = clusters.iter().map(Cluster::start).collect();
        let bounds = imp_bounds(self.params);
        let ibs = ImpIbs::build(&source, &anchors, self.params, &bounds);
        let imp_states = ImpStates::build(&source, hap, &ibs, self.params, clusters.len());

        let n_clusters = clusters.len();
        let states: Vec<Vec<u32>> = (0..n_clusters).map(|c| imp_states.states(c).to_vec()).collect();
        let factory = StateProbsFactory::new(self.params.imp_states);

        let mut fwd: Vec<Vec<f32>> = Vec::with_capacity(n_clusters);
        let mut fwd_prev: Vec<f32> = Vec::new();
        for c in 0..n_clusters {
            let cluster = &clusters[c];
            let marker = cluster.start();
            let n_alleles = self.data.markers.get(marker).n_alleles();
            let n_states = states[c].len().max(1);
            let mut col = vec![1.0f32 / n_states as f32; states[c].len()];

            if c > 0 {
                let p_recomb = cluster.p_recomb as f32;
                let prev_states = &states[c - 1];
                let prev_sum: f32 = fwd_prev.iter().sum();
                let uniform = p_recomb * prev_sum / prev_states.len().max(1) as f32;
                for (i, &donor) in states[c].iter().enumerate() {
                    let carry = match prev_states.iter().position(|&d| d == donor) {
                        Some(j) => fwd_prev[j] * (1.0 - p_recomb) + uniform,
                        None => uniform,
                    };
                    col[i] = carry.max(1e-20);
                }
            }

            if let Some(allele) = source.target_allele(hap as usize, marker) {
                for (i, &donor) in states[c].iter().enumerate() {
                    let donor_a = source.resolved_allele(donor, marker);
                    col[i] *= self.emission_prob(cluster, donor_a == allele, n_alleles);
                }
            }

            let sum: f32 = col.iter().sum();
            if sum > 0.0 {
                for v in col.iter_mut() {
                    *v /= sum;
                }
            }
            fwd.push(col.clone());
            fwd_prev = col;
        }

        let mut bwd: Vec<Vec<f32>> = vec![Vec::new(); n_clusters];
        let mut bwd_next: Vec<f32> = Vec::new();
        for c in (0..n_clusters).rev() {
            let mut col = vec![1.0f32; states[c].len()];
            if c + 1 < n_clusters {
                let next_cluster = &clusters[c + 1];
                let marker_next = next_cluster.start();
                let n_alleles_next = self.data.markers.get(marker_next).n_alleles();
                let p_recomb = next_cluster.p_recomb as f32;
                let next_states = &states[c + 1];
                let mut weighted_next = vec![0.0f32; next_states.len()];
                if let Some(allele) = source.target_allele(hap as usize, marker_next) {
                    for (j, &donor) in next_states.iter().enumerate() {
                        let donor_a = source.resolved_allele(donor, marker_next);
                        weighted_next[j] = bwd_next[j] * self.emission_prob(next_cluster, donor_a == allele, n_alleles_next);
                    }
                } else {
                    weighted_next.copy_from_slice(&bwd_next);
                }
                let sum_weighted: f32 = weighted_next.iter().sum();
                let uniform = p_recomb * sum_weighted / next_states.len().max(1) as f32;
                for (i, &donor) in states[c].iter().enumerate() {
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
            bwd[c] = col;
        }

        let mut out = Vec::with_capacity(n_clusters);
        for c in 0..n_clusters {
            let probs: Vec<f32> = fwd[c]
                .iter()
                .zip(bwd[c].iter())
                .map(|(f, b)| f * b)
                .collect();
            let sum: f32 = probs.iter().sum();
            let normalized: Vec<f32> = if sum > 0.0 {
                probs.iter().map(|p| p / sum).collect()
            } else {
                probs
            };
            out.push((clusters[c].start(), factory.build(&states[c], &normalized)));
        }
        out
    }

    /// Runs imputation for one target haplotype across the whole window,
    /// returning a sparse `StateProbs` column for every marker: exact at
    /// cluster anchors, linearly interpolated between them elsewhere, and
    /// held flat at the nearest cluster before the first / after the last.
    pub fn run_haplotype(&self, hap: u32, phased: &EstPhase) -> Vec<StateProbs> {
        let clusters = self.run_clusters(hap, phased);
        let n_markers = self.data.n_markers();
        let mut out = vec![StateProbs::default(); n_markers];

        if clusters.is_empty() {
            return out;
        }

        for (marker, sp) in &clusters {
            out[*marker] = sp.clone();
        }

        for w in clusters.windows(2) {
            let (m0, sp0) = &w[0];
            let (m1, sp1) = &w[1];
            if m1 - m0 <= 1 {
                continue;
            }
            let cm0 = self.data.gen_dist(*m0);
            let cm1 = self.data.gen_dist(*m1);
            let span = (cm1 - cm0).max(1e-9);
            for m in (m0 + 1)..*m1 {
                let t = ((self.data.gen_dist(m) - cm0) / span).clamp(0.0, 1.0) as f32;
                out[m] = interpolate(sp0, sp1, t);
            }
        }

        let (first_m, first_sp) = &clusters[0];
        for m in 0..*first_m {
            out[m] = first_sp.clone();
        }
        let (last_m, last_sp) = clusters.last().unwrap();
        for m in (*last_m + 1)..n_markers {
            out[m] = last_sp.clone();
        }

        out
    }
}

fn interpolate(a: &StateProbs, b: &StateProbs, t: f32) -> StateProbs {
    let mut merged: HashMap<u32, f32> = HashMap::new();
    for (donor, p) in a.entries() {
        *merged.entry(*donor).or_insert(0.0) += p * (1.0 - t);
    }
    for (donor, p) in b.entries() {
        *merged.entry(*donor).or_insert(0.0) += p * t;
    }
    let mut entries: Vec<(u32, f32)> = merged.into_iter().collect();
    entries.sort_unstable_by_key(|(d, _)| *d);
    StateProbs { entries }
}
