//! Marker model and packed-haplotype storage.
//!
//! A `Marker` is a genomic site with a base-pair coordinate and a list of
//! allele labels; `Markers` is the ordered sequence of them used as the
//! coordinate system for one window. `PackedHaplotype` bit-packs one
//! haplotype's alleles over a `Markers` sequence into 64-bit words, per the
//! design's "packed into a sequence of 64-bit words" invariant.

use std::cmp::Ordering;

pub const MISSING_ALLELE: i32 = -1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Marker {
    pub chrom_index: usize,
    pub base_pos: i64,
    pub allele_labels: Vec<String>,
}

impl Marker {
    pub fn new(chrom_index: usize, base_pos: i64, allele_labels: Vec<String>) -> Self {
        assert!(!allele_labels.is_empty(), "marker must carry >= 1 allele");
        Marker {
            chrom_index,
            base_pos,
            allele_labels,
        }
    }

    pub fn n_alleles(&self) -> usize {
        self.allele_labels.len()
    }

    /// Number of bits needed to encode one allele at this marker: `ceil(log2(A))`,
    /// with a floor of 1 bit (a monomorphic marker still needs a slot for its
    /// single allele index, namely 0).
    pub fn bits_per_allele(&self) -> u32 {
        let a = self.n_alleles() as u32;
        if a <= 1 {
            1
        } else {
            32 - (a - 1).leading_zeros()
        }
    }
}

impl Ord for Marker {
    fn cmp(&self, other: &Self) -> Ordering {
        self.chrom_index
            .cmp(&other.chrom_index)
            .then_with(|| self.base_pos.cmp(&other.base_pos))
            .then_with(|| self.allele_labels.cmp(&other.allele_labels))
    }
}

impl PartialOrd for Marker {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// An ordered, window-scoped sequence of markers with O(1) index lookup and a
/// precomputed bit-offset prefix sum for haplotype packing.
#[derive(Debug, Clone)]
pub struct Markers {
    markers: Vec<Marker>,
    /// `sum_hap_bits[i]` = total bits required to encode one allele at each
    /// of the first `i` markers; `sum_hap_bits[n]` is the total haplotype
    /// width in bits.
    sum_hap_bits: Vec<u64>,
}

impl Markers {
    pub fn new(markers: Vec<Marker>) -> Self {
        debug_assert!(
            markers.windows(2).all(|w| w[0].chrom_index == w[1].chrom_index),
            "all markers in a window must share one chromosome"
        );
        let mut sum_hap_bits = Vec::with_capacity(markers.len() + 1);
        sum_hap_bits.push(0u64);
        let mut acc = 0u64;
        for m in &markers {
            acc += m.bits_per_allele() as u64;
            sum_hap_bits.push(acc);
        }
        Markers {
            markers,
            sum_hap_bits,
        }
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    pub fn get(&self, index: usize) -> &Marker {
        &self.markers[index]
    }

    pub fn as_slice(&self) -> &[Marker] {
        &self.markers
    }

    /// Sum of per-marker allele bit-widths over the first `i` markers.
    pub fn sum_hap_bits(&self, i: usize) -> u64 {
        self.sum_hap_bits[i]
    }

    pub fn total_bits(&self) -> u64 {
        *self.sum_hap_bits.last().unwrap_or(&0)
    }
}

/// One haplotype's alleles over a `Markers` sequence, bit-packed into `u64`
/// words at the per-marker bit offsets given by `Markers::sum_hap_bits`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackedHaplotype {
    words: Vec<u64>,
}

impl PackedHaplotype {
    pub fn from_alleles(markers: &Markers, alleles: &[u8]) -> Self {
        assert_eq!(alleles.len(), markers.len());
        let total_bits = markers.total_bits();
        let n_words = ((total_bits + 63) / 64).max(1) as usize;
        let mut words = vec![0u64; n_words];
        for (i, &a) in alleles.iter().enumerate() {
            let bits = markers.get(i).bits_per_allele();
            let offset = markers.sum_hap_bits(i);
            set_bits(&mut words, offset, bits, a as u64);
        }
        PackedHaplotype { words }
    }

    pub fn allele(&self, markers: &Markers, marker_index: usize) -> u8 {
        let bits = markers.get(marker_index).bits_per_allele();
        let offset = markers.sum_hap_bits(marker_index);
        get_bits(&self.words, offset, bits) as u8
    }

    pub fn set_allele(&mut self, markers: &Markers, marker_index: usize, allele: u8) {
        let bits = markers.get(marker_index).bits_per_allele();
        let offset = markers.sum_hap_bits(marker_index);
        set_bits(&mut self.words, offset, bits, allele as u64);
    }
}

fn set_bits(words: &mut [u64], bit_offset: u64, n_bits: u32, value: u64) {
    let word_idx = (bit_offset / 64) as usize;
    let bit_in_word = bit_offset % 64;
    let mask = ((1u128 << n_bits) - 1) as u64;
    let value = value & mask;

    words[word_idx] &= !(mask << bit_in_word);
    words[word_idx] |= value << bit_in_word;

    let bits_written_in_first_word = 64 - bit_in_word;
    if bits_written_in_first_word < n_bits as u64 {
        let remaining = n_bits as u64 - bits_written_in_first_word;
        let overflow_mask = ((1u128 << remaining) - 1) as u64;
        let overflow_value = value >> bits_written_in_first_word;
        words[word_idx + 1] &= !overflow_mask;
        words[word_idx + 1] |= overflow_value & overflow_mask;
    }
}

fn get_bits(words: &[u64], bit_offset: u64, n_bits: u32) -> u64 {
    let word_idx = (bit_offset / 64) as usize;
    let bit_in_word = bit_offset % 64;
    let mask = ((1u128 << n_bits) - 1) as u64;

    let mut value = (words[word_idx] >> bit_in_word) & mask;

    let bits_read_from_first_word = 64 - bit_in_word;
    if bits_read_from_first_word < n_bits as u64 {
        let remaining = n_bits as u64 - bits_read_from_first_word;
        let overflow_mask = ((1u128 << remaining) - 1) as u64;
        let overflow = words[word_idx + 1] & overflow_mask;
        value |= overflow << bits_read_from_first_word;
    }

    value & mask
}
