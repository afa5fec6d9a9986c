use serde::{Deserialize, Serialize};

use crate::guard::{GuardScope, KeyPathGuard};
use crate::segments::DangerousSegmentSet;

/// Configuration for the key path guard.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    /// When `false` no policy is installed and merges run unguarded.
    pub enabled: bool,
    /// Segments the guard blocks.
    pub segments: DangerousSegmentSet,
    /// Depths at which segments are checked.
    pub scope: GuardScope,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            segments: DangerousSegmentSet::canonical(),
            scope: GuardScope::AllDepths,
        }
    }
}

impl GuardConfig {
    /// No policy: the vulnerable pass.
    pub fn absent() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    /// Build the configured guard, or `None` when the guard is disabled.
    pub fn build(&self) -> Option<KeyPathGuard> {
        self.enabled
            .then(|| KeyPathGuard::new(self.segments.clone(), self.scope))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::SegmentPolicy;

    #[test]
    fn default_is_enabled_canonical() {
        let config = GuardConfig::default();
        let guard = config.build().unwrap();
        assert!(guard.is_dangerous("prototype", 4));
    }

    #[test]
    fn absent_builds_nothing() {
        assert!(GuardConfig::absent().build().is_none());
    }

    #[test]
    fn deserializes_partial_toml() {
        let config: GuardConfig = toml::from_str(
            r#"
            scope = "top-level-only"
            segments = ["__proto__"]
            "#,
        )
        .unwrap();
        assert!(config.enabled);
        assert_eq!(config.scope, GuardScope::TopLevelOnly);
        assert_eq!(config.segments, DangerousSegmentSet::accessor_only());
    }

    #[test]
    fn json_round_trip() {
        let config = GuardConfig::absent();
        let text = serde_json::to_string(&config).unwrap();
        let back: GuardConfig = serde_json::from_str(&text).unwrap();
        assert_eq!(back, config);
    }
}
