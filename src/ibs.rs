//! Identity-by-state (IBS) partitioning: groups haplotypes that carry
//! identical alleles over a marker range, refining the range outward only
//! for groups still larger than the target size. Refinement proceeds in
//! `step_cm`-sized centiMorgan increments, capped at `nsteps` rounds, and is
//! recomputed independently at every step (typed-marker step for phasing,
//! cluster for imputation) rather than once for the whole window. Shared by
//! the phasing (`PhaseIbs`) and imputation (`ImpIbs`) stages, which differ
//! only in which `AlleleSource` and state-budget constants they plug in.

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::coder::{AlleleSource, HaplotypeCoder};
use crate::config::Params;

/// Per-step group-size target and post-burn-in pruning threshold, derived
/// from the state budget and the cM segment it is meant to cover.
#[derive(Debug, Clone, Copy)]
pub struct IbsBounds {
    pub n_haps_per_step: usize,
    pub threshold: usize,
}

/// `nHapsPerStep = (phase_states / (phase_segment_cm/step_cm)) / 2`;
/// threshold is `20 * nHapsPerStep` during burn-in (wide net while phase is
/// still unstable) or `nHapsPerStep + 2` afterward.
pub fn phase_bounds(params: &Params, is_burnin: bool) -> IbsBounds {
    let steps_per_segment = (params.phase_segment_cm / params.step_cm).max(1.0);
    let n_haps_per_step = ((params.phase_states as f64 / steps_per_segment) / 2.0).max(1.0) as usize;
    let threshold = if is_burnin {
        20 * n_haps_per_step
    } else {
        n_haps_per_step + 2
    };
    IbsBounds {
        n_haps_per_step: n_haps_per_step.max(1),
        threshold: threshold.max(1),
    }
}

/// `nHapsPerStep = imp_states / (imp_segment_cm/step_cm)`; threshold equals
/// `nHapsPerStep`.
pub fn imp_bounds(params: &Params) -> IbsBounds {
    let steps_per_segment = (params.imp_segment_cm / params.step_cm).max(1.0);
    let n_haps_per_step = (params.imp_states as f64 / steps_per_segment).max(1.0) as usize;
    IbsBounds {
        n_haps_per_step: n_haps_per_step.max(1),
        threshold: n_haps_per_step.max(1),
    }
}

fn expand_left<S: AlleleSource>(source: &S, mut idx: usize, min_cm: f64) -> usize {
    while idx > 0 && source.gen_dist(idx - 1) >= min_cm {
        idx -= 1;
    }
    idx
}

fn expand_right<S: AlleleSource>(source: &S, mut idx: usize, max_cm: f64) -> usize {
    let n = source.n_steps();
    while idx < n && source.gen_dist(idx) <= max_cm {
        idx += 1;
    }
    idx
}

/// Recursively refines `members` anchored at `anchor`, widening the coded
/// range by one `step_cm` increment per round (up to `params.nsteps` rounds)
/// until every resulting group is at or below `threshold`.
#[allow(clippy::too_many_arguments)]
fn refine<S: AlleleSource>(
    source: &S,
    members: Vec<u32>,
    anchor: usize,
    round: usize,
    left: usize,
    right: usize,
    params: &Params,
    threshold: usize,
    n_target_haps: usize,
) -> Vec<Vec<u32>> {
    let anchor_cm = source.gen_dist(anchor);
    let full_right = source.n_steps();

    if members.len() <= threshold || round >= params.nsteps || (left == 0 && right >= full_right) {
        return vec![members];
    }

    let grown_cm = params.step_cm * (round + 1) as f64;
    let new_left = expand_left(source, left, anchor_cm - grown_cm);
    let new_right = expand_right(source, right, anchor_cm + grown_cm);

    if new_left == left && new_right == right {
        return vec![members];
    }

    let coded = HaplotypeCoder::code_step(source, new_left, new_right);
    let mut groups: HashMap<u32, Vec<u32>> = HashMap::new();
    for h in members {
        let code = if (h as usize) < n_target_haps {
            coded.target_codes[h as usize]
        } else {
            coded.ref_codes[h as usize - n_target_haps]
        };
        groups.entry(code).or_default().push(h);
    }

    groups
        .into_values()
        .flat_map(|g| refine(source, g, anchor, round + 1, new_left, new_right, params, threshold, n_target_haps))
        .collect()
}

/// Partitions every target and reference haplotype into IBS groups
/// independently at each entry of `steps` (a step index for phasing, a
/// cluster's representative marker for imputation).
pub fn partition_all_steps<S: AlleleSource>(
    source: &S,
    steps: &[usize],
    params: &Params,
    bounds: &IbsBounds,
) -> Vec<Vec<Vec<u32>>> {
    let n_target = source.n_target_haps();
    let n_ref = source.n_ref_haps();
    let all: Vec<u32> = (0..(n_target + n_ref) as u32).collect();

    steps
        .iter()
        .map(|&anchor| {
            refine(
                source,
                all.clone(),
                anchor,
                0,
                anchor,
                anchor + 1,
                params,
                bounds.threshold,
                n_target,
            )
        })
        .collect()
}

/// Common donor-selection logic: find `hap`'s IBS group within `groups` and
/// draw up to `n_states` other members from it with a seed derived
/// deterministically from `(window_seed, step, hap)`.
fn select_donors(groups: &[Vec<u32>], hap: u32, n_states: usize, params: &Params, step: usize) -> Vec<u32> {
    let group = match groups.iter().find(|g| g.contains(&hap)) {
        Some(g) => g,
        None => return Vec::new(),
    };
    let mut candidates: Vec<u32> = group.iter().copied().filter(|&h| h != hap).collect();
    if candidates.len() <= n_states {
        return candidates;
    }
    let seed = params.derive_seed(&[step as i64, hap as i64]);
    let mut rng = StdRng::seed_from_u64(seed);
    candidates.shuffle(&mut rng);
    candidates.truncate(n_states);
    candidates.sort_unstable();
    candidates
}

/// Per-step IBS partitioning for the phasing HMM.
pub struct PhaseIbs {
    groups: Vec<Vec<Vec<u32>>>,
    n_states: usize,
}

impl PhaseIbs {
    pub fn build<S: AlleleSource>(source: &S, params: &Params, bounds: &IbsBounds) -> Self {
        let steps: Vec<usize> = (0..source.n_steps()).collect();
        let groups = partition_all_steps(source, &steps, params, bounds);
        PhaseIbs {
            groups,
            n_states: bounds.n_haps_per_step,
        }
    }

    pub fn donors(&self, hap: u32, step: usize, params: &Params) -> Vec<u32> {
        select_donors(&self.groups[step], hap, self.n_states, params, step)
    }
}

/// Per-cluster IBS partitioning for the imputation HMM: `cluster_markers[c]`
/// is the representative (first) marker of cluster `c`.
pub struct ImpIbs {
    groups: Vec<Vec<Vec<u32>>>,
    n_states: usize,
}

impl ImpIbs {
    pub fn build<S: AlleleSource>(source: &S, cluster_markers: &[usize], params: &Params, bounds: &IbsBounds) -> Self {
        let groups = partition_all_steps(source, cluster_markers, params, bounds);
        ImpIbs {
            groups,
            n_states: bounds.n_haps_per_step,
        }
    }

    pub fn donors(&self, hap: u32, cluster: usize, params: &Params) -> Vec<u32> {
        select_donors(&self.groups[cluster], hap, self.n_states, params, cluster)
    }
}
