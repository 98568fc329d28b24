//! `CurrentData`: aligns one `Window`'s records into the index spaces the HMM
//! stages need (target marker subset, per-marker genetic distance, splice
//! points with the previous/next window) and exposes them as a flat
//! `AlleleSource` for `coder.rs`/`ibs.rs`.

use crate::coder::AlleleSource;
use crate::est_phase::EstPhase;
use crate::genetic_map::GeneticMap;
use crate::marker::Markers;
use crate::records::{MarkerRecord, RefGt, TargetGt};
use crate::window::Window;

/// One window's records reshaped into the coordinate systems the phasing and
/// imputation stages consume.
pub struct CurrentData {
    pub markers: Markers,
    reference: Vec<RefGt>,
    target: Vec<Option<TargetGt>>,
    /// Genetic distance in cM from the first marker, one entry per marker.
    gen_dist: Vec<f64>,
    /// Indices into `markers`/`reference`/`target` that carry target
    /// genotypes (the subset the phasing HMM conditions on).
    target_marker_indices: Vec<usize>,
    n_target_samples: usize,
    /// First marker index that belongs to the non-overlap portion of this
    /// window (records before it were already emitted by the previous window).
    pub overlap_end: usize,
    /// First marker index that belongs to the overlap with the next window.
    pub overlap_start: usize,
    pub last_window_on_chrom: bool,
    pub last_window: bool,
}

impl CurrentData {
    pub fn from_window(window: Window, genetic_map: &GeneticMap, n_target_samples: usize) -> Self {
        let chrom = window.rec_list[0].marker.chrom_index;
        let gen_dist = window
            .rec_list
            .iter()
            .map(|r| genetic_map.gen_pos(chrom, r.marker.base_pos))
            .collect();

        let mut markers = Vec::with_capacity(window.rec_list.len());
        let mut reference = Vec::with_capacity(window.rec_list.len());
        let mut target = Vec::with_capacity(window.rec_list.len());
        let mut target_marker_indices = Vec::new();

        for (i, rec) in window.rec_list.into_iter().enumerate() {
            let MarkerRecord {
                marker,
                reference: rgt,
                target: tgt,
            } = rec;
            if tgt.is_some() {
                target_marker_indices.push(i);
            }
            markers.push(marker);
            reference.push(rgt);
            target.push(tgt);
        }

        CurrentData {
            markers: Markers::new(markers),
            reference,
            target,
            gen_dist,
            target_marker_indices,
            n_target_samples,
            overlap_end: window.overlap_end,
            overlap_start: window.overlap_start,
            last_window_on_chrom: window.last_window_on_chrom,
            last_window: window.last_window,
        }
    }

    pub fn n_markers(&self) -> usize {
        self.markers.len()
    }

    pub fn n_ref_haps(&self) -> usize {
        self.reference.first().map(RefGt::n_haps).unwrap_or(0)
    }

    pub fn n_target_samples(&self) -> usize {
        self.n_target_samples
    }

    pub fn target_marker_indices(&self) -> &[usize] {
        &self.target_marker_indices
    }

    pub fn gen_dist(&self, marker: usize) -> f64 {
        self.gen_dist[marker]
    }

    /// Genetic distance between two consecutive markers, used by the HMM's
    /// recombination-probability term.
    pub fn gen_dist_between(&self, from: usize, to: usize) -> f64 {
        self.gen_dist[to] - self.gen_dist[from]
    }

    pub fn reference(&self, marker: usize) -> &RefGt {
        &self.reference[marker]
    }

    pub fn target(&self, marker: usize) -> Option<&TargetGt> {
        self.target[marker].as_ref()
    }

    /// Total number of samples (reference + target) backing this window,
    /// the `nAllSamples` term in the phasing HMM's recombination-intensity
    /// prior. Reference haplotypes are assumed diploid, so reference sample
    /// count is half the reference haplotype count.
    pub fn n_all_samples(&self) -> usize {
        self.n_ref_haps() / 2 + self.n_target_samples
    }

    /// `intensity = 0.04 * Ne / (2 * nAllSamples)`: the phasing HMM's
    /// recombination-factor prior/fallback, used before the regression has
    /// enough samples to replace it with a fitted slope.
    pub fn intensity(&self, ne: f64) -> f64 {
        let n_all = self.n_all_samples().max(1) as f64;
        0.04 * ne / (2.0 * n_all)
    }
}

/// Adapts `CurrentData` restricted to the target-typed marker subset into the
/// flat `hap -> allele` view `HaplotypeCoder::code_step` and the IBS
/// partitioner expect, for the phasing stage (which only ever conditions on
/// typed markers).
pub struct PhaseAlleleSource<'a> {
    data: &'a CurrentData,
}

impl<'a> PhaseAlleleSource<'a> {
    pub fn new(data: &'a CurrentData) -> Self {
        PhaseAlleleSource { data }
    }

    fn marker_at(&self, step: usize) -> usize {
        self.data.target_marker_indices[step]
    }
}

impl<'a> AlleleSource for PhaseAlleleSource<'a> {
    fn n_target_haps(&self) -> usize {
        self.data.n_target_samples * 2
    }

    fn n_ref_haps(&self) -> usize {
        self.data.n_ref_haps()
    }

    fn n_steps(&self) -> usize {
        self.data.target_marker_indices().len()
    }

    fn n_alleles(&self, step: usize) -> usize {
        self.data.markers.get(self.marker_at(step)).n_alleles()
    }

    fn target_allele(&self, hap: usize, step: usize) -> Option<u8> {
        let marker = self.marker_at(step);
        let sample = hap / 2;
        let gt = self.data.target(marker)?;
        let sample_gt = gt.samples[sample];
        if hap % 2 == 0 {
            sample_gt.allele1
        } else {
            sample_gt.allele2
        }
    }

    fn ref_allele(&self, hap: usize, step: usize) -> u8 {
        self.data.reference(self.marker_at(step)).allele(hap)
    }

    fn gen_dist(&self, step: usize) -> f64 {
        self.data.gen_dist(self.marker_at(step))
    }
}

/// Full-marker-resolution view used by the imputation stage: target
/// haplotype alleles come from the phasing stage's output at typed markers
/// (`None` elsewhere, where imputation fills them in), reference haplotype
/// alleles are read directly at every marker.
pub struct ImpAlleleSource<'a> {
    data: &'a CurrentData,
    phased: &'a EstPhase,
    /// `marker -> typed step`, or `None` if `marker` is not typed in the target.
    marker_to_step: Vec<Option<usize>>,
}

impl<'a> ImpAlleleSource<'a> {
    pub fn new(data: &'a CurrentData, phased: &'a EstPhase) -> Self {
        let mut marker_to_step = vec![None; data.n_markers()];
        for (step, &marker) in data.target_marker_indices().iter().enumerate() {
            marker_to_step[marker] = Some(step);
        }
        ImpAlleleSource {
            data,
            phased,
            marker_to_step,
        }
    }
}

impl<'a> AlleleSource for ImpAlleleSource<'a> {
    fn n_target_haps(&self) -> usize {
        self.data.n_target_samples() * 2
    }

    fn n_ref_haps(&self) -> usize {
        self.data.n_ref_haps()
    }

    fn n_steps(&self) -> usize {
        self.data.n_markers()
    }

    fn n_alleles(&self, marker: usize) -> usize {
        self.data.markers.get(marker).n_alleles()
    }

    fn target_allele(&self, hap: usize, marker: usize) -> Option<u8> {
        let step = self.marker_to_step[marker]?;
        let sample = hap / 2;
        let (a1, a2) = self.phased.allele_pair(sample, step);
        Some(if hap % 2 == 0 { a1 } else { a2 })
    }

    fn ref_allele(&self, hap: usize, marker: usize) -> u8 {
        self.data.reference(marker).allele(hap)
    }

    fn gen_dist(&self, step: usize) -> f64 {
        self.data.gen_dist(step)
    }
}

impl<'a> ImpAlleleSource<'a> {
    /// Resolves a donor haplotype id (target or reference, in the combined
    /// `AlleleSource` numbering) to its allele at `marker`.
    pub fn resolved_allele(&self, donor: u32, marker: usize) -> u8 {
        let n_target_haps = self.n_target_haps();
        if (donor as usize) < n_target_haps {
            self.target_allele(donor as usize, marker).unwrap_or(0)
        } else {
            self.ref_allele(donor as usize - n_target_haps, marker)
        }
    }
}
