//! Piecewise-linear base-pair <-> centiMorgan mapping.

use std::collections::HashMap;

/// One chromosome's tabulated `(base_pos, cM)` map, strictly increasing in
/// both columns.
#[derive(Debug, Clone)]
struct ChromMap {
    base_pos: Vec<i64>,
    cm: Vec<f64>,
}

impl ChromMap {
    fn gen_pos(&self, base_pos: i64) -> f64 {
        let bp = &self.base_pos;
        if bp.is_empty() {
            return 0.0;
        }
        if base_pos <= bp[0] {
            // extrapolate below the first point using the first segment's slope,
            // falling back to the first tabulated cM when there is only one point.
            if bp.len() == 1 {
                return self.cm[0];
            }
            let slope = (self.cm[1] - self.cm[0]) / (bp[1] - bp[0]) as f64;
            return self.cm[0] + slope * (base_pos - bp[0]) as f64;
        }
        if base_pos >= *bp.last().unwrap() {
            let n = bp.len();
            if n == 1 {
                return self.cm[0];
            }
            let slope = (self.cm[n - 1] - self.cm[n - 2]) / (bp[n - 1] - bp[n - 2]) as f64;
            return self.cm[n - 1] + slope * (base_pos - bp[n - 1]) as f64;
        }
        let idx = match bp.binary_search(&base_pos) {
            Ok(i) => return self.cm[i],
            Err(i) => i,
        };
        let (lo, hi) = (idx - 1, idx);
        let frac = (base_pos - bp[lo]) as f64 / (bp[hi] - bp[lo]) as f64;
        self.cm[lo] + frac * (self.cm[hi] - self.cm[lo])
    }

    fn base_pos_at(&self, cm: f64) -> i64 {
        let table = &self.cm;
        if table.is_empty() {
            return 0;
        }
        if cm <= table[0] {
            if table.len() == 1 {
                return self.base_pos[0];
            }
            let slope = (self.base_pos[1] - self.base_pos[0]) as f64 / (table[1] - table[0]);
            return self.base_pos[0] + (slope * (cm - table[0])).round() as i64;
        }
        if cm >= *table.last().unwrap() {
            let n = table.len();
            if n == 1 {
                return self.base_pos[0];
            }
            let slope = (self.base_pos[n - 1] - self.base_pos[n - 2]) as f64
                / (table[n - 1] - table[n - 2]);
            return self.base_pos[n - 1] + (slope * (cm - table[n - 1])).round() as i64;
        }
        let idx = match table
            .binary_search_by(|probe| probe.partial_cmp(&cm).unwrap())
        {
            Ok(i) => return self.base_pos[i],
            Err(i) => i,
        };
        let (lo, hi) = (idx - 1, idx);
        let frac = (cm - table[lo]) / (table[hi] - table[lo]);
        self.base_pos[lo] + (frac * (self.base_pos[hi] - self.base_pos[lo]) as f64).round() as i64
    }
}

/// Maps `(chrom, base_pos)` to genetic distance in centiMorgans and back,
/// piecewise-linear over a tabulated map per chromosome.
#[derive(Debug, Clone, Default)]
pub struct GeneticMap {
    chroms: HashMap<usize, ChromMap>,
}

impl GeneticMap {
    pub fn new() -> Self {
        GeneticMap {
            chroms: HashMap::new(),
        }
    }

    /// Adds one chromosome's map. `points` must be sorted ascending by
    /// base position; `cM` values must be non-decreasing (monotone map).
    pub fn add_chrom(&mut self, chrom_index: usize, points: Vec<(i64, f64)>) {
        let mut base_pos = Vec::with_capacity(points.len());
        let mut cm = Vec::with_capacity(points.len());
        for (bp, c) in points {
            base_pos.push(bp);
            cm.push(c);
        }
        self.chroms.insert(chrom_index, ChromMap { base_pos, cm });
    }

    /// `genPos`: genetic position in cM for a base-pair position. Chromosomes
    /// with no tabulated map default to a flat 0 cM/bp ratio below the
    /// identity scale of 1 cM per Mb, matching Beagle's fallback when no
    /// genetic map is supplied for a contig.
    pub fn gen_pos(&self, chrom: usize, base_pos: i64) -> f64 {
        match self.chroms.get(&chrom) {
            Some(m) => m.gen_pos(base_pos),
            None => base_pos as f64 / 1_000_000.0,
        }
    }

    /// `basePos`: inverse of `gen_pos`.
    pub fn base_pos(&self, chrom: usize, cm: f64) -> i64 {
        match self.chroms.get(&chrom) {
            Some(m) => m.base_pos_at(cm),
            None => (cm * 1_000_000.0).round() as i64,
        }
    }
}
