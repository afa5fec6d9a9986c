/// Errors produced by shared ancestor access.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AncestorError {
    #[error("shared ancestor {0} lock poisoned")]
    Poisoned(&'static str),
}

/// Convenience alias for ancestor results.
pub type AncestorResult<T> = Result<T, AncestorError>;
