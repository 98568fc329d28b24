//! Haplotype phasing and genotype-imputation engine: a sliding-window,
//! reference-panel Li & Stephens HMM pipeline in the style of Beagle 5.0.
//!
//! The public entry point is [`Engine`]; construct one with [`Params`] and a
//! [`GeneticMap`], then feed it a [`GtRecIterator`] of position-ordered
//! [`MarkerRecord`]s.

pub mod cluster;
pub mod coder;
pub mod config;
pub mod data;
pub mod engine;
pub mod error;
pub mod est_phase;
pub mod genetic_map;
pub mod ibs;
pub mod imp_baum;
pub mod marker;
pub mod output;
pub mod phase_baum;
pub mod records;
pub mod ref_hap_hash;
pub mod regress;
pub mod states;
pub mod window;

pub use config::Params;
pub use engine::{Engine, EngineRecord};
pub use error::{EngineError, Result};
pub use genetic_map::GeneticMap;
pub use marker::Marker;
pub use output::{CohortSummary, MarkerOutput};
pub use records::{GtRecIterator, MarkerRecord, RefGt, TargetGt, TargetSampleGt, VecGtRecIterator};
