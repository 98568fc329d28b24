//! Genotype record storage: reference records (always phased, non-missing,
//! two orthogonal encodings) and target records (may be unphased / missing).

use std::sync::Arc;

/// Reference genotype record at one marker. Reference data is always phased
/// and non-missing; it is modeled as a tagged variant with exactly the two
/// cases the design calls out, rather than hidden behind a trait object, so
/// every call site must handle both explicitly.
#[derive(Debug, Clone)]
pub enum RefGt {
    /// Major allele implicit (allele 0 by convention); for each minor allele
    /// a sorted list of haplotype indices that carry it.
    AlleleCoded {
        n_haps: usize,
        /// `minor_carriers[a-1]` = sorted haplotype indices carrying allele `a` (a >= 1).
        minor_carriers: Vec<Vec<u32>>,
    },
    /// A shared `hap -> seq` partition (possibly shared across several
    /// consecutive markers) plus, for this marker, a `seq -> allele` table.
    SeqCoded {
        hap_to_seq: Arc<Vec<u32>>,
        seq_to_allele: Vec<u8>,
    },
}

impl RefGt {
    pub fn n_haps(&self) -> usize {
        match self {
            RefGt::AlleleCoded { n_haps, .. } => *n_haps,
            RefGt::SeqCoded { hap_to_seq, .. } => hap_to_seq.len(),
        }
    }

    pub fn allele(&self, hap: usize) -> u8 {
        match self {
            RefGt::AlleleCoded { minor_carriers, .. } => {
                for (i, carriers) in minor_carriers.iter().enumerate() {
                    if carriers.binary_search(&(hap as u32)).is_ok() {
                        return (i + 1) as u8;
                    }
                }
                0
            }
            RefGt::SeqCoded {
                hap_to_seq,
                seq_to_allele,
            } => {
                let seq = hap_to_seq[hap] as usize;
                seq_to_allele[seq]
            }
        }
    }

    /// Shared partition identity for the sequence-coded fast path (§4.3): two
    /// markers can share a single per-sequence table iff their `hap_to_seq`
    /// `Arc`s point at the same allocation.
    pub fn shared_partition(&self) -> Option<&Arc<Vec<u32>>> {
        match self {
            RefGt::SeqCoded { hap_to_seq, .. } => Some(hap_to_seq),
            RefGt::AlleleCoded { .. } => None,
        }
    }
}

/// Per-sample target genotype at one marker: up to two alleles (`None` =
/// missing) and whether the pair is phased.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetSampleGt {
    pub allele1: Option<u8>,
    pub allele2: Option<u8>,
    pub is_phased: bool,
}

impl TargetSampleGt {
    pub fn missing() -> Self {
        TargetSampleGt {
            allele1: None,
            allele2: None,
            is_phased: false,
        }
    }

    pub fn is_missing(&self) -> bool {
        self.allele1.is_none() || self.allele2.is_none()
    }

    pub fn is_het(&self) -> bool {
        matches!((self.allele1, self.allele2), (Some(a), Some(b)) if a != b)
    }
}

/// Target genotype record at one marker, one entry per target sample.
#[derive(Debug, Clone)]
pub struct TargetGt {
    pub samples: Vec<TargetSampleGt>,
}

impl TargetGt {
    pub fn new(samples: Vec<TargetSampleGt>) -> Self {
        TargetGt { samples }
    }

    pub fn n_samples(&self) -> usize {
        self.samples.len()
    }
}

/// One marker's worth of data as produced by a record iterator: the marker
/// itself, the reference panel's record, and (if this marker is typed in the
/// target) the target record.
#[derive(Debug, Clone)]
pub struct MarkerRecord {
    pub marker: crate::marker::Marker,
    pub reference: RefGt,
    pub target: Option<TargetGt>,
}

/// Abstract, restartable iterator over position-ordered per-chromosome
/// records. VCF/BGZF tokenizing, tabix range reads, and so on are explicitly
/// out of scope; a caller supplies any type that can yield `MarkerRecord`s in
/// order. The crate provides `VecGtRecIterator` as an in-memory
/// implementation for tests and simple embedders.
pub trait GtRecIterator {
    fn next_rec(&mut self) -> crate::error::Result<Option<MarkerRecord>>;
}

pub struct VecGtRecIterator {
    records: std::vec::IntoIter<MarkerRecord>,
}

impl VecGtRecIterator {
    pub fn new(records: Vec<MarkerRecord>) -> Self {
        VecGtRecIterator {
            records: records.into_iter(),
        }
    }
}

impl GtRecIterator for VecGtRecIterator {
    fn next_rec(&mut self) -> crate::error::Result<Option<MarkerRecord>> {
        Ok(self.records.next())
    }
}
