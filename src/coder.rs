//! Haplotype / sequence coding: collapses identical allele sequences over a
//! marker range into small dense integer codes (`codeStep`), the basis for
//! IBS partitioning (`ibs.rs`).

/// A flat, densely-indexed lookup table used as `codeStep`'s transient
/// `seqMap`. Entries default to `0`, the sentinel Beagle reserves for
/// "key not yet assigned a code".
pub struct IndexArray {
    slots: Vec<u32>,
}

impl IndexArray {
    pub fn new(capacity: usize) -> Self {
        IndexArray {
            slots: vec![0u32; capacity],
        }
    }

    #[inline]
    pub fn get(&self, key: usize) -> u32 {
        self.slots[key]
    }

    #[inline]
    pub fn set(&mut self, key: usize, value: u32) {
        self.slots[key] = value;
    }
}

/// Anything that can supply per-marker, per-haplotype alleles over a window.
/// Target haplotypes are addressed `0..2*n_target_samples` (hap `2s`/`2s+1`
/// for sample `s`); reference haplotypes are addressed `0..n_ref_haps`
/// independently. `-1` denotes a missing target allele.
pub trait AlleleSource {
    fn n_target_haps(&self) -> usize;
    fn n_ref_haps(&self) -> usize;
    /// Number of marker steps this source covers; callers index `0..n_steps()`.
    fn n_steps(&self) -> usize;
    fn n_alleles(&self, marker: usize) -> usize;
    /// Allele carried by target haplotype `hap` at `marker`, or `None` if missing.
    fn target_allele(&self, hap: usize, marker: usize) -> Option<u8>;
    fn ref_allele(&self, hap: usize, marker: usize) -> u8;
    /// Genetic distance (cM) of this step's marker, used by IBS partitioning
    /// to bound how far a refinement round may grow.
    fn gen_dist(&self, step: usize) -> f64;
}

/// Result of `code_step`: a dense `hap -> seq` code for target and reference
/// haplotypes over one marker range, plus the number of live codes
/// (code `0` is reserved and always "live" as a bucket, even if empty).
#[derive(Debug, Clone)]
pub struct CodedStep {
    pub target_codes: Vec<u32>,
    pub ref_codes: Vec<u32>,
    pub seq_cnt: u32,
}

pub struct HaplotypeCoder;

impl HaplotypeCoder {
    /// Assigns every haplotype (target first, then reference) a code in
    /// `[0, seq_cnt)` such that two haplotypes share a code iff they carry
    /// identical alleles at every marker in `[start, end)`. Code `0` means
    /// "this exact sequence over `[start,end)` is not carried by any target
    /// haplotype" -- reference-only sequences collapse onto it so IBS can
    /// prune them cheaply.
    ///
    /// Missing target alleles are treated as their own distinguished value so
    /// that two haplotypes with missing data at the same marker are not
    /// spuriously treated as identical (a conservative choice documented in
    /// DESIGN.md).
    pub fn code_step<S: AlleleSource>(source: &S, start: usize, end: usize) -> CodedStep {
        let n_target = source.n_target_haps();
        let n_ref = source.n_ref_haps();

        let mut target_codes = vec![1u32; n_target];
        let mut ref_codes = vec![1u32; n_ref];
        let mut next_seq: u32 = 2; // 0 reserved, 1 is the initial "all identical so far" class

        for m in start..end {
            let n_alleles = source.n_alleles(m).max(1) as u32;
            // +1 extra allele slot reserves a distinguished code for "missing".
            let key_width = n_alleles + 1;
            let mut seq_map = IndexArray::new((next_seq as usize) * (key_width as usize));

            for h in 0..n_target {
                let old_seq = target_codes[h];
                if old_seq == 0 {
                    continue;
                }
                let allele_slot = match source.target_allele(h, m) {
                    Some(a) => a as u32,
                    None => n_alleles, // distinguished "missing" slot
                };
                let key = old_seq as usize * key_width as usize + allele_slot as usize;
                let mut code = seq_map.get(key);
                if code == 0 {
                    code = next_seq;
                    next_seq += 1;
                    seq_map.set(key, code);
                }
                target_codes[h] = code;
            }

            for h in 0..n_ref {
                let old_seq = ref_codes[h];
                if old_seq == 0 {
                    continue;
                }
                let allele_slot = source.ref_allele(h, m) as u32;
                let key = old_seq as usize * key_width as usize + allele_slot as usize;
                let code = seq_map.get(key);
                // Reference haplotypes never mint new codes: an allele
                // combination no target haplotype carries maps to 0.
                ref_codes[h] = code;
            }
        }

        CodedStep {
            target_codes,
            ref_codes,
            seq_cnt: next_seq,
        }
    }
}
