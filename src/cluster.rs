//! Target-marker clustering: groups adjacent typed markers into the
//! imputation HMM's actual transition units. Two consecutive typed markers
//! merge into the same cluster when they fall within `cluster_cm`
//! centiMorgans of one another *and* the reference panel represents both
//! through the same `SeqCoded` partition -- otherwise a cluster boundary is
//! forced, since the reference panel genuinely distinguishes the two
//! markers' haplotype structure.

use std::sync::Arc;

use crate::config::Params;
use crate::data::CurrentData;

/// One cluster of adjacent typed markers sharing a reference partition, with
/// its emission error probability and transition probability from the
/// previous cluster.
#[derive(Debug, Clone)]
pub struct Cluster {
    /// Raw marker indices belonging to this cluster, in ascending order.
    pub markers: Vec<usize>,
    /// `errProb[c] = min(0.5, err * clusterSpanCm)`.
    pub err_prob: f64,
    /// `pRecomb[c] = 1 - exp(-4*Ne/nHaps * deltaCm)`; `0` for the first
    /// cluster in a window.
    pub p_recomb: f64,
}

impl Cluster {
    pub fn start(&self) -> usize {
        *self.markers.first().unwrap()
    }

    pub fn end(&self) -> usize {
        *self.markers.last().unwrap()
    }
}

fn same_partition(data: &CurrentData, a: usize, b: usize) -> bool {
    match (data.reference(a).shared_partition(), data.reference(b).shared_partition()) {
        (Some(x), Some(y)) => Arc::ptr_eq(x, y),
        _ => false,
    }
}

/// Builds target-marker clusters for one window.
pub fn build_clusters(data: &CurrentData, params: &Params) -> Vec<Cluster> {
    let target_indices = data.target_marker_indices();
    let mut groups: Vec<Vec<usize>> = Vec::new();

    for &marker in target_indices {
        let extends_last = match groups.last() {
            Some(g) => {
                let prev = *g.last().unwrap();
                data.gen_dist_between(prev, marker) <= params.cluster_cm && same_partition(data, prev, marker)
            }
            None => false,
        };
        if extends_last {
            groups.last_mut().unwrap().push(marker);
        } else {
            groups.push(vec![marker]);
        }
    }

    let n_haps = data.n_ref_haps().max(1) as f64;
    let mut clusters = Vec::with_capacity(groups.len());
    let mut prev_end: Option<usize> = None;
    for markers in groups {
        let start = *markers.first().unwrap();
        let end = *markers.last().unwrap();
        let span_cm = data.gen_dist_between(start, end).max(0.0);
        let err_prob = (params.err * span_cm).min(0.5);
        let p_recomb = match prev_end {
            None => 0.0,
            Some(pe) => {
                let delta = data.gen_dist_between(pe, start).max(0.0);
                1.0 - (-4.0 * params.ne / n_haps * delta).exp()
            }
        };
        prev_end = Some(end);
        clusters.push(Cluster {
            markers,
            err_prob,
            p_recomb,
        });
    }
    clusters
}
