//! Crate-level error type

use thiserror::Error;

use crate::insights::InsightsError;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Candidate set is empty")]
    EmptyCandidateSet,

    #[error(transparent)]
    Insights(#[from] InsightsError),
}

pub type EngineResult<T> = Result<T, EngineError>;
