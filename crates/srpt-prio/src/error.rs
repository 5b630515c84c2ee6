//! # Errors
//!
//! Every failure in this crate is a configuration or programming error:
//! an unknown policy name, a policy dispatched in a direction it does not
//! support, or a distribution that breaks its invariants. None of them are
//! transient and nothing here retries. Callers decide how to terminate.

use thiserror::Error;

use crate::policy::{Direction, PrioPolicy};

// ─── Distribution Errors ────────────────────────────────────────────────────

/// A size distribution violated one of its construction invariants.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DistributionError {
    #[error("distribution has no points")]
    Empty,
    #[error("size decreases at index {index}")]
    SizeOrder { index: usize },
    #[error("cumulative probability decreases at index {index}")]
    ProbabilityOrder { index: usize },
    #[error("probability {value} at index {index} is outside [0, 1]")]
    InvalidProbability { index: usize, value: f64 },
    #[error("last cumulative probability is {last}, expected exactly 1.0")]
    NotNormalized { last: f64 },
    #[error("distribution carries zero bytes")]
    ZeroMass,
}

// ─── Resolver Errors ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PrioError {
    #[error("unknown priority policy: {0:?}")]
    UnknownPolicy(String),
    #[error("priority policy {policy} is not supported for {direction} packets")]
    UnsupportedPolicy {
        policy: PrioPolicy,
        direction: Direction,
    },
    #[error("invalid distribution: {0}")]
    Distribution(#[from] DistributionError),
    #[error(
        "count-weighted distribution has {count_weighted} points but \
         byte-weighted has {byte_weighted}"
    )]
    DistributionLengthMismatch {
        count_weighted: usize,
        byte_weighted: usize,
    },
    #[error("invalid transport config: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, PrioError>;
