//! Persistent candidate-state allocation for the HMMs: `nStates` slots held
//! in a min-heap keyed by each occupant's most recent IBS-match step. A
//! slot's occupant carries forward across steps until displaced by a
//! fresher match; a displaced occupant's `[start, midpoint]` run is recorded
//! before the slot is handed to its replacement.

use std::collections::HashMap;

use crate::coder::AlleleSource;
use crate::config::Params;
use crate::ibs::{ImpIbs, PhaseIbs};

/// One haplotype's recorded occupancy span in a candidate-state slot.
#[derive(Debug, Clone, Copy)]
pub struct Run {
    pub hap: u32,
    pub start: usize,
    pub end: usize,
}

struct Slot {
    occupant: Option<u32>,
    last_match_step: i64,
    run_start: usize,
}

fn step_midpoint(prev_end: usize, cur_end: usize) -> usize {
    (prev_end + cur_end) / 2
}

/// A capacity-bounded set of slots, each tracking a single live occupant and
/// the step it last matched at. Processing steps in order and snapshotting
/// the live occupant set after each one reproduces the per-step candidate
/// state table the HMMs condition on.
struct SlotHeap {
    capacity: usize,
    slots: Vec<Slot>,
    occupant_slot: HashMap<u32, usize>,
    runs: Vec<Run>,
}

impl SlotHeap {
    fn new(capacity: usize) -> Self {
        SlotHeap {
            capacity,
            slots: Vec::with_capacity(capacity),
            occupant_slot: HashMap::with_capacity(capacity),
            runs: Vec::new(),
        }
    }

    fn process_step(&mut self, step: usize, matched: &[u32]) {
        for &donor in matched {
            if let Some(&slot_idx) = self.occupant_slot.get(&donor) {
                self.slots[slot_idx].last_match_step = step as i64;
                continue;
            }
            if self.slots.len() < self.capacity {
                let idx = self.slots.len();
                self.slots.push(Slot {
                    occupant: Some(donor),
                    last_match_step: step as i64,
                    run_start: step,
                });
                self.occupant_slot.insert(donor, idx);
                continue;
            }
            let weak_idx = self
                .slots
                .iter()
                .enumerate()
                .min_by_key(|(_, s)| s.last_match_step)
                .map(|(i, _)| i)
                .unwrap();
            let weak_last_match = self.slots[weak_idx].last_match_step;
            let weak_run_start = self.slots[weak_idx].run_start;
            if let Some(old_occupant) = self.slots[weak_idx].occupant {
                let midpoint = step_midpoint(weak_last_match.max(0) as usize, step);
                self.runs.push(Run {
                    hap: old_occupant,
                    start: weak_run_start,
                    end: midpoint,
                });
                self.occupant_slot.remove(&old_occupant);
            }
            self.slots[weak_idx] = Slot {
                occupant: Some(donor),
                last_match_step: step as i64,
                run_start: step,
            };
            self.occupant_slot.insert(donor, weak_idx);
        }
    }

    fn current_occupants(&self) -> Vec<u32> {
        let mut v: Vec<u32> = self.slots.iter().filter_map(|s| s.occupant).collect();
        v.sort_unstable();
        v
    }

    fn finalize(&mut self, last_step: usize) {
        for slot in &self.slots {
            if let Some(occupant) = slot.occupant {
                self.runs.push(Run {
                    hap: occupant,
                    start: slot.run_start,
                    end: last_step,
                });
            }
        }
    }
}

fn run_slot_heap(capacity: usize, n_steps: usize, donors_at: impl Fn(usize) -> Vec<u32>) -> (Vec<Vec<u32>>, Vec<Run>) {
    let mut heap = SlotHeap::new(capacity);
    let mut states_per_step = Vec::with_capacity(n_steps);
    for step in 0..n_steps {
        let matched = donors_at(step);
        heap.process_step(step, &matched);
        states_per_step.push(heap.current_occupants());
    }
    if n_steps > 0 {
        heap.finalize(n_steps - 1);
    }
    (states_per_step, heap.runs)
}

/// Per-target-haplotype persistent candidate states for the phasing HMM,
/// covering every typed-marker step in the window.
pub struct PhaseStates {
    states_per_step: Vec<Vec<u32>>,
    runs: Vec<Run>,
}

impl PhaseStates {
    pub fn build<S: AlleleSource>(source: &S, hap: u32, ibs: &PhaseIbs, params: &Params) -> Self {
        let n_steps = source.n_steps();
        let (states_per_step, runs) = run_slot_heap(params.phase_states, n_steps, |step| ibs.donors(hap, step, params));
        PhaseStates { states_per_step, runs }
    }

    pub fn states(&self, step: usize) -> &[u32] {
        &self.states_per_step[step]
    }

    pub fn runs(&self) -> &[Run] {
        &self.runs
    }
}

/// Imputation-stage analogue of `PhaseStates`, covering every cluster in the
/// window and sized by `params.imp_states`.
pub struct ImpStates {
    states_per_step: Vec<Vec<u32>>,
    runs: Vec<Run>,
}

impl ImpStates {
    pub fn build<S: AlleleSource>(source: &S, hap: u32, ibs: &ImpIbs, params: &Params, n_clusters: usize) -> Self {
        let _ = source;
        let (states_per_step, runs) = run_slot_heap(params.imp_states, n_clusters, |step| ibs.donors(hap, step, params));
        ImpStates { states_per_step, runs }
    }

    pub fn states(&self, step: usize) -> &[u32] {
        &self.states_per_step[step]
    }

    pub fn runs(&self) -> &[Run] {
        &self.runs
    }
}
