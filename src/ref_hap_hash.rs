//! Rolling hash over reference haplotypes: each `(marker, allele)` pair gets
//! a random 32-bit tag, and a haplotype's hash is the XOR of its per-marker
//! tags. Identical reference haplotypes (already the common case, since
//! reference haplotypes dramatically outnumber distinct sequences) collide,
//! letting the imputation stage group them in O(1) per hap instead of a full
//! `code_step` re-walk when only a hash-based bucket, not an exact
//! partition, is needed.

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;

use crate::data::CurrentData;

pub struct RefHapHash {
    /// `tags[marker][allele]`, one random tag per distinct allele at each
    /// marker.
    tags: Vec<Vec<u32>>,
    hash_of_hap: Vec<u32>,
    buckets: HashMap<u32, Vec<u32>>,
}

impl RefHapHash {
    pub fn build(data: &CurrentData, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let n_markers = data.n_markers();
        let mut tags: Vec<Vec<u32>> = Vec::with_capacity(n_markers);
        for m in 0..n_markers {
            let n_alleles = data.markers.get(m).n_alleles();
            tags.push((0..n_alleles).map(|_| rng.gen::<u32>()).collect());
        }

        let n_ref = data.n_ref_haps();
        let mut hash_of_hap = vec![0u32; n_ref];
        for h in 0..n_ref {
            let mut acc = 0u32;
            for m in 0..n_markers {
                let a = data.reference(m).allele(h) as usize;
                acc ^= tags[m][a];
            }
            hash_of_hap[h] = acc;
        }

        let mut buckets: HashMap<u32, Vec<u32>> = HashMap::new();
        for (h, &hash) in hash_of_hap.iter().enumerate() {
            buckets.entry(hash).or_default().push(h as u32);
        }

        RefHapHash {
            tags,
            hash_of_hap,
            buckets,
        }
    }

    pub fn hash_of(&self, hap: usize) -> u32 {
        self.hash_of_hap[hap]
    }

    pub fn haps_with_hash(&self, hash: u32) -> &[u32] {
        self.buckets.get(&hash).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Recomputes one haplotype's hash after an allele change at `marker`,
    /// moving it between buckets. Used when a reference record is corrected
    /// in place rather than rebuilding the whole table.
    pub fn set_allele(&mut self, hap: usize, marker: usize, old_allele: u8, new_allele: u8) {
        if old_allele == new_allele {
            return;
        }
        let old_hash = self.hash_of_hap[hap];
        if let Some(bucket) = self.buckets.get_mut(&old_hash) {
            bucket.retain(|&h| h as usize != hap);
        }
        let new_hash = old_hash ^ self.tags[marker][old_allele as usize] ^ self.tags[marker][new_allele as usize];
        self.hash_of_hap[hap] = new_hash;
        self.buckets.entry(new_hash).or_default().push(hap as u32);
    }
}
