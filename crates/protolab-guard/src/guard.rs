use serde::{Deserialize, Serialize};

use protolab_types::{JsonValue, KeyPath};

use crate::policy::SegmentPolicy;
use crate::segments::DangerousSegmentSet;

/// At which depths the guard inspects segments.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GuardScope {
    /// Every depth. Multi-hop chains such as `constructor -> prototype -> key`
    /// can start anywhere in the payload.
    #[default]
    AllDepths,
    /// Only keys of the top-level source record. Models shallow patches;
    /// a dangerous segment nested inside an ordinary key still gets through.
    TopLevelOnly,
}

/// The default segment policy: a [`DangerousSegmentSet`] applied at the
/// depths selected by a [`GuardScope`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyPathGuard {
    segments: DangerousSegmentSet,
    scope: GuardScope,
}

impl KeyPathGuard {
    pub fn new(segments: DangerousSegmentSet, scope: GuardScope) -> Self {
        Self { segments, scope }
    }

    pub fn segments(&self) -> &DangerousSegmentSet {
        &self.segments
    }

    pub fn scope(&self) -> GuardScope {
        self.scope
    }

    /// Index of the first segment of `path` this guard would block.
    pub fn first_dangerous(&self, path: &KeyPath) -> Option<usize> {
        path.segments()
            .iter()
            .enumerate()
            .position(|(depth, segment)| self.is_dangerous(segment, depth))
    }

    /// Every path in `payload` that ends at a blocked segment.
    ///
    /// The walk does not descend below a blocked segment, mirroring what the
    /// merge engine does. Arrays are opaque: the engine assigns them whole.
    pub fn scan(&self, payload: &JsonValue) -> Vec<KeyPath> {
        let mut found = Vec::new();
        let mut stack = vec![(payload, KeyPath::root())];

        while let Some((value, path)) = stack.pop() {
            let JsonValue::Object(record) = value else {
                continue;
            };
            let depth = path.len();
            for (key, child) in record {
                let child_path = path.child(key.as_str());
                if self.is_dangerous(key, depth) {
                    found.push(child_path);
                } else {
                    stack.push((child, child_path));
                }
            }
        }

        found.sort();
        found
    }
}

impl Default for KeyPathGuard {
    fn default() -> Self {
        Self::new(DangerousSegmentSet::canonical(), GuardScope::AllDepths)
    }
}

impl SegmentPolicy for KeyPathGuard {
    fn name(&self) -> &str {
        match self.scope {
            GuardScope::AllDepths => "key-path-guard",
            GuardScope::TopLevelOnly => "key-path-guard/top-level",
        }
    }

    fn is_dangerous(&self, segment: &str, depth: usize) -> bool {
        match self.scope {
            GuardScope::AllDepths => self.segments.contains(segment),
            GuardScope::TopLevelOnly => depth == 0 && self.segments.contains(segment),
        }
    }
}
