use protolab_ancestor::AncestorError;
use protolab_types::KeyPath;

/// Errors that can occur during a merge.
///
/// All of them are recoverable: the caller gets a structured error and the
/// process keeps running. Writes made before the error are not rolled back.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MergeError {
    /// The payload nests records deeper than the configured bound.
    #[error("merge depth exceeded: limit {max_depth} reached at '{path}'")]
    DepthExceeded { max_depth: usize, path: KeyPath },

    /// The shared ancestor could not be accessed.
    #[error("shared ancestor unavailable: {0}")]
    Ancestor(#[from] AncestorError),
}

/// Convenience alias for merge results.
pub type MergeResult<T> = Result<T, MergeError>;
