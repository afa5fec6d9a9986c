use serde::{Deserialize, Serialize};

/// Default bound on record nesting below the root.
pub const DEFAULT_MAX_DEPTH: usize = 1000;

/// Configuration for the merge engine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    /// Deepest record nesting the engine will enter. The top-level source
    /// record is depth 0; anything deeper fails with `DepthExceeded`.
    pub max_depth: usize,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl MergeConfig {
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self { max_depth }
    }
}
