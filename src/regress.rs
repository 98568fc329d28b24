//! Lock-free running least-squares accumulator for the recombination-
//! intensity regression used by both the phasing and imputation HMMs:
//! `recombProb(cM) = max(minProb, slope * cM)` fit by ordinary least squares
//! over `(genDist, -log(transitionProb))` samples contributed concurrently by
//! worker threads.

use std::sync::atomic::{AtomicU64, Ordering};

fn load_f64(a: &AtomicU64) -> f64 {
    f64::from_bits(a.load(Ordering::Relaxed))
}

fn add_f64(a: &AtomicU64, delta: f64) {
    let mut cur = a.load(Ordering::Relaxed);
    loop {
        let new = f64::from_bits(cur) + delta;
        match a.compare_exchange_weak(cur, new.to_bits(), Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => return,
            Err(actual) => cur = actual,
        }
    }
}

/// Accumulates `Sum(x)`, `Sum(y)`, `Sum(xy)`, `Sum(xx)`, and `n` across
/// threads without locking, then reduces to a slope/intercept pair on
/// demand. Shared by the phasing HMM (per-window recombination-intensity
/// estimate) and the imputation HMM (per-cluster estimate) so the fitting
/// logic is written once.
pub struct Regress {
    n: AtomicU64,
    sum_x: AtomicU64,
    sum_y: AtomicU64,
    sum_xy: AtomicU64,
    sum_xx: AtomicU64,
}

impl Default for Regress {
    fn default() -> Self {
        Regress::new()
    }
}

impl Regress {
    pub fn new() -> Self {
        Regress {
            n: AtomicU64::new(0),
            sum_x: AtomicU64::new(0f64.to_bits()),
            sum_y: AtomicU64::new(0f64.to_bits()),
            sum_xy: AtomicU64::new(0f64.to_bits()),
            sum_xx: AtomicU64::new(0f64.to_bits()),
        }
    }

    /// Adds one `(x, y)` observation. Safe to call concurrently from any
    /// number of worker threads.
    pub fn add(&self, x: f64, y: f64) {
        self.n.fetch_add(1, Ordering::Relaxed);
        add_f64(&self.sum_x, x);
        add_f64(&self.sum_y, y);
        add_f64(&self.sum_xy, x * y);
        add_f64(&self.sum_xx, x * x);
    }

    pub fn count(&self) -> u64 {
        self.n.load(Ordering::Relaxed)
    }

    /// Ordinary-least-squares slope through the origin-free fit
    /// `beta = (n*Sxy - Sx*Sy) / (n*Sxx - Sx^2)`. Returns `None` if fewer
    /// than two observations were recorded or the denominator underflows to
    /// zero (a degenerate, all-identical-x sample).
    pub fn slope(&self) -> Option<f64> {
        let n = self.count();
        if n < 2 {
            return None;
        }
        let n = n as f64;
        let sx = load_f64(&self.sum_x);
        let sy = load_f64(&self.sum_y);
        let sxy = load_f64(&self.sum_xy);
        let sxx = load_f64(&self.sum_xx);
        let denom = n * sxx - sx * sx;
        if denom.abs() < f64::EPSILON {
            return None;
        }
        Some((n * sxy - sx * sy) / denom)
    }
}
