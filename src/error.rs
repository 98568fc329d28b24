use thiserror::Error;

/// Errors produced by the phasing / imputation engine.
///
/// Mirrors the error kinds in the design's error-handling section: validation
/// failures are caught before any window is processed, format and numerical
/// errors are fatal once processing has started, and out-of-bounds parameter
/// estimates are recovered locally (logged, not returned as an `Err`).
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("reference and target sample lists do not match: {0}")]
    SampleMismatch(String),

    #[error("malformed record at marker {marker_index}: {reason}")]
    MalformedRecord { marker_index: usize, reason: String },

    #[error("no records found in the requested interval: {0}")]
    EmptyWindow(String),

    #[error("numerical instability ({context}): value was NaN or infinite")]
    NumericalInstability { context: String },

    #[error("index out of bounds: {0}")]
    OutOfBounds(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
