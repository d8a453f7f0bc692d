//! Error types of the simulation core.
//!
//! Probability-driven outcomes (fatality, transmission, test results) are never errors; these
//! variants only cover logic errors and lookups that cannot be satisfied.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("poisoned lock: {0}")]
    LockPoisoned(&'static str),
}

pub type SimResult<T> = Result<T, SimError>;
