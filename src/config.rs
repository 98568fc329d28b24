use crate::error::{EngineError, Result};

/// Tunable parameters for a phasing / imputation run.
///
/// Field names and defaults follow the configuration record named in the
/// design (`burnin`, `phase_states`, `imp_states`, ...). There is no CLI or
/// config-file parsing here -- that is left to the embedding binary, per the
/// crate's non-goals.
#[derive(Debug, Clone, PartialEq)]
pub struct Params {
    pub burnin: usize,
    pub iterations: usize,
    pub phase_states: usize,
    pub phase_segment_cm: f64,
    pub impute: bool,
    pub imp_states: usize,
    pub imp_segment_cm: f64,
    pub cluster_cm: f64,
    pub ap: bool,
    pub gp: bool,
    pub ne: f64,
    pub err: f64,
    pub window_cm: f64,
    pub overlap_cm: f64,
    pub seed: i64,
    pub nthreads: usize,
    pub step_cm: f64,
    pub nsteps: usize,
}

impl Default for Params {
    fn default() -> Self {
        Params {
            burnin: 6,
            iterations: 12,
            phase_states: 280,
            phase_segment_cm: 4.0,
            impute: true,
            imp_states: 1600,
            imp_segment_cm: 6.0,
            cluster_cm: 0.005,
            ap: false,
            gp: false,
            ne: 1e6,
            err: 1e-4,
            window_cm: 40.0,
            overlap_cm: 4.0,
            seed: -99999,
            nthreads: 1,
            step_cm: 0.1,
            nsteps: 7,
        }
    }
}

impl Params {
    /// Validates the cross-field constraints the design calls out explicitly.
    /// Single-field range checks (e.g. `err` in `[0,1)`) are included because
    /// a malformed config is meant to fail fast, before any window runs.
    pub fn validate(&self) -> Result<()> {
        if !(1.1 * self.overlap_cm < self.window_cm) {
            return Err(EngineError::InvalidConfig(format!(
                "overlap_cm ({}) must satisfy 1.1 * overlap_cm < window_cm ({})",
                self.overlap_cm, self.window_cm
            )));
        }
        if self.window_cm <= 0.0 || self.overlap_cm < 0.0 {
            return Err(EngineError::InvalidConfig(
                "window_cm must be > 0 and overlap_cm must be >= 0".to_string(),
            ));
        }
        if self.step_cm <= 0.0 {
            return Err(EngineError::InvalidConfig(
                "step_cm must be > 0".to_string(),
            ));
        }
        if self.nsteps == 0 {
            return Err(EngineError::InvalidConfig(
                "nsteps must be >= 1".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&self.err) {
            return Err(EngineError::InvalidConfig(format!(
                "err ({}) must be in [0, 1)",
                self.err
            )));
        }
        if self.cluster_cm < 0.0 {
            return Err(EngineError::InvalidConfig(
                "cluster_cm must be >= 0".to_string(),
            ));
        }
        if self.phase_states == 0 || self.imp_states == 0 {
            return Err(EngineError::InvalidConfig(
                "phase_states and imp_states must be >= 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Deterministic 64-bit seed expression: combines the global seed with a
    /// caller-supplied set of local indices (step, haplotype, parent id, ...).
    /// Every stochastic decision in the engine must route through this so
    /// that two runs with the same seed produce byte-identical output
    /// regardless of thread scheduling (see the design's concurrency model).
    pub fn derive_seed(&self, salt: &[i64]) -> u64 {
        let mut h: u64 = (self.seed as i128 & 0xFFFF_FFFF_FFFF_FFFF) as u64;
        // Fowler/Noll/Vo-style mixing: cheap, stable across platforms, and
        // does not require pulling in an extra hashing dependency.
        for &s in salt {
            h ^= s as u64;
            h = h.wrapping_mul(0x100000001b3);
            h ^= h >> 33;
        }
        h
    }
}
