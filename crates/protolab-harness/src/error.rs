use thiserror::Error;

use protolab_ancestor::AncestorError;
use protolab_oracle::OracleError;

use crate::lifecycle::Phase;

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("illegal lifecycle transition: {from} -> {to}")]
    InvalidTransition { from: Phase, to: Phase },

    #[error("unknown scenario: {0}")]
    UnknownScenario(String),

    #[error("oracle error: {0}")]
    Oracle(#[from] OracleError),

    #[error("ancestor error: {0}")]
    Ancestor(#[from] AncestorError),
}

pub type HarnessResult<T> = Result<T, HarnessError>;
