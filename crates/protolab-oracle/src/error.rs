//! Error types for the oracle crate.

use protolab_ancestor::AncestorError;

/// Errors that can occur while checking for contamination.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OracleError {
    /// A diff or reset was requested before any baseline was captured.
    /// Indicates harness misuse; the scenario must stop.
    #[error("no baseline captured; call baseline() before diff() or reset()")]
    InconsistentBaseline,

    /// The shared ancestor could not be accessed.
    #[error("shared ancestor unavailable: {0}")]
    Ancestor(#[from] AncestorError),
}

/// Convenience alias for oracle results.
pub type OracleResult<T> = Result<T, OracleError>;
