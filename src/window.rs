//! Sliding cM windows with overlap (`WindowIter`) and the resulting `Window`
//! value each iteration step produces.

use crate::error::{EngineError, Result};
use crate::genetic_map::GeneticMap;
use crate::records::{GtRecIterator, MarkerRecord};

/// One window's worth of records plus the bookkeeping needed to splice this
/// window's output with its neighbors.
#[derive(Debug, Clone)]
pub struct Window {
    pub rec_list: Vec<MarkerRecord>,
    /// First record index past the overlap with the previous window (0 for
    /// the first window on a chromosome).
    pub overlap_end: usize,
    /// First record index inside the overlap with the next window (equals
    /// `rec_list.len()` if there is no next window or the chromosome ends).
    pub overlap_start: usize,
    pub last_window_on_chrom: bool,
    pub last_window: bool,
}

impl Window {
    pub fn len(&self) -> usize {
        self.rec_list.len()
    }
}

/// Iterator over `Window`s for a (possibly multi-chromosome) stream of
/// position-ordered records, implemented as an ordinary cursor-style
/// iterator (no coroutine semantics, per the design).
pub struct WindowIter<I: GtRecIterator> {
    source: I,
    genetic_map: GeneticMap,
    window_cm: f64,
    overlap_cm: f64,
    /// Records read from `source` but not yet handed out in a `Window`. At
    /// the start of each `next_window` call this holds exactly the overlap
    /// tail carried over from the previous window (or a single fresh record
    /// when starting a new chromosome / the very first window).
    buffer: Vec<MarkerRecord>,
    /// How many of the leading records in `buffer` are carried-over overlap
    /// from the previous window, as opposed to a fresh chromosome start.
    carried_overlap_len: usize,
    /// One record read ahead of `buffer` to detect the window/chromosome
    /// boundary without consuming it prematurely.
    peeked: Option<MarkerRecord>,
    exhausted: bool,
}

impl<I: GtRecIterator> WindowIter<I> {
    pub fn new(source: I, genetic_map: GeneticMap, window_cm: f64, overlap_cm: f64) -> Result<Self> {
        if !(1.1 * overlap_cm < window_cm) {
            return Err(EngineError::InvalidConfig(format!(
                "overlap_cm ({overlap_cm}) must satisfy 1.1 * overlap_cm < window_cm ({window_cm})"
            )));
        }
        Ok(WindowIter {
            source,
            genetic_map,
            window_cm,
            overlap_cm,
            buffer: Vec::new(),
            carried_overlap_len: 0,
            peeked: None,
            exhausted: false,
        })
    }

    fn peek(&mut self) -> Result<Option<&MarkerRecord>> {
        if self.peeked.is_none() && !self.exhausted {
            self.peeked = self.source.next_rec()?;
            if self.peeked.is_none() {
                self.exhausted = true;
            }
        }
        Ok(self.peeked.as_ref())
    }

    /// Produces the next window, or `None` once the record stream is
    /// exhausted.
    pub fn next_window(&mut self) -> Result<Option<Window>> {
        let overlap_end = if self.buffer.is_empty() {
            match self.peek()? {
                None => return Ok(None),
                Some(_) => {
                    let rec = self.peeked.take().unwrap();
                    self.buffer.push(rec);
                }
            }
            0
        } else {
            self.carried_overlap_len
        };

        let chrom = self.buffer[0].marker.chrom_index;
        let cm_start = self
            .genetic_map
            .gen_pos(chrom, self.buffer[0].marker.base_pos);
        let threshold = cm_start + self.window_cm;

        let mut last_window_on_chrom = false;
        loop {
            let peeked = match self.peek()? {
                None => None,
                Some(rec) => Some((rec.marker.chrom_index, rec.marker.base_pos)),
            };
            let stop = match peeked {
                None => {
                    last_window_on_chrom = true;
                    true
                }
                Some((peek_chrom, base_pos)) => {
                    if peek_chrom != chrom {
                        last_window_on_chrom = true;
                        true
                    } else {
                        let cm = self.genetic_map.gen_pos(chrom, base_pos);
                        cm > threshold
                    }
                }
            };
            if stop {
                break;
            }
            let rec = self.peeked.take().unwrap();
            self.buffer.push(rec);
        }

        if self.buffer.is_empty() {
            return Err(EngineError::EmptyWindow(format!(
                "no records found starting at chrom {chrom}"
            )));
        }

        let rec_list = std::mem::take(&mut self.buffer);
        let cm_end = self
            .genetic_map
            .gen_pos(chrom, rec_list.last().unwrap().marker.base_pos);

        let overlap_start = if last_window_on_chrom {
            rec_list.len()
        } else {
            let target = cm_end - self.overlap_cm;
            let mut idx = rec_list.len();
            for (i, rec) in rec_list.iter().enumerate() {
                let cm = self.genetic_map.gen_pos(chrom, rec.marker.base_pos);
                if cm >= target {
                    idx = i;
                    break;
                }
            }
            // Ties by base_pos collapse downward to the first record at that position.
            if idx < rec_list.len() {
                let bp = rec_list[idx].marker.base_pos;
                while idx > 0 && rec_list[idx - 1].marker.base_pos == bp {
                    idx -= 1;
                }
            }
            idx
        };

        let last_window = last_window_on_chrom && self.peek()?.is_none();

        // Carry the overlap tail into the buffer for the next window.
        self.buffer = rec_list[overlap_start..].to_vec();
        self.carried_overlap_len = if last_window_on_chrom { 0 } else { self.buffer.len() };

        Ok(Some(Window {
            rec_list,
            overlap_end,
            overlap_start,
            last_window_on_chrom,
            last_window,
        }))
    }
}
