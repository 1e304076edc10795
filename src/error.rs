//! Engine Error Types
//!
//! All failure paths in the mining pipeline are explicit `Result` variants.
//! Budget overruns and missing static analysis are not errors: they degrade
//! the run and are reported as [`MiningWarning`]s attached to the outcome.

use std::io;
use std::time::Duration;
use thiserror::Error;

/// Errors that abort a mining run
#[derive(Error, Debug)]
pub enum MiningError {
    /// I/O error while reading workspace files
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// History document or ABI cannot be parsed
    #[error("malformed input: {0}")]
    InputMalformed(String),

    /// JSON deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Too few successful call records to mine roles from
    #[error("insufficient history: {observed} unique successful calls, {required} required")]
    InsufficientHistory {
        /// Distinct successful (caller, function) pairs observed
        observed: usize,
        /// Configured minimum
        required: usize,
    },

    /// Configuration value out of range
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Should never occur. A violated invariant means the result would be
    /// wrong, so the run crashes with this kind instead of returning it.
    #[error("internal invariant violated: {0}")]
    InternalInvariant(String),
}

/// Conditions that degrade a run without aborting it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MiningWarning {
    /// Lattice enumeration ran past its wall-clock budget; the trivial
    /// partition (distinct permission rows) was used instead.
    LatticeBudgetExceeded {
        /// Time spent before giving up
        elapsed: Duration,
    },

    /// GA evolution was cut short; the best individual found so far was used.
    GaBudgetExceeded {
        /// Generation reached when the budget ran out
        generation: usize,
        /// Time spent before giving up
        elapsed: Duration,
    },

    /// User population exceeded the lattice cap and was sampled down.
    UserPopulationSampled {
        /// Users observed in the history
        observed: usize,
        /// Users kept for lattice enumeration
        kept: usize,
    },

    /// No read/write summary was supplied; roles were mined but no policies
    /// could be derived.
    StaticAnalysisMissing,
}

impl std::fmt::Display for MiningWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MiningWarning::LatticeBudgetExceeded { elapsed } => {
                write!(f, "lattice budget exceeded after {elapsed:?}; trivial partition used")
            }
            MiningWarning::GaBudgetExceeded { generation, elapsed } => {
                write!(f, "GA budget exceeded at generation {generation} after {elapsed:?}")
            }
            MiningWarning::UserPopulationSampled { observed, kept } => {
                write!(f, "user population sampled from {observed} down to {kept}")
            }
            MiningWarning::StaticAnalysisMissing => {
                write!(f, "static read/write summary missing; policies not derived")
            }
        }
    }
}

/// Result type for mining operations
pub type MiningResult<T> = Result<T, MiningError>;
