use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

pub use protolab_types::names::{CONSTRUCTOR, PROTOTYPE, PROTO_ACCESSOR};

/// Set of key segments that redirect writes onto the shared ancestor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DangerousSegmentSet(BTreeSet<String>);

impl DangerousSegmentSet {
    /// The canonical set: `__proto__`, `constructor`, `prototype`.
    pub fn canonical() -> Self {
        Self::from_names([PROTO_ACCESSOR, CONSTRUCTOR, PROTOTYPE])
    }

    /// Only the accessor name. Models the partial patch that blocks
    /// `__proto__` but still lets `constructor.prototype` through.
    pub fn accessor_only() -> Self {
        Self::from_names([PROTO_ACCESSOR])
    }

    pub fn empty() -> Self {
        Self(BTreeSet::new())
    }

    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(names.into_iter().map(Into::into).collect())
    }

    pub fn contains(&self, segment: &str) -> bool {
        self.0.contains(segment)
    }

    pub fn insert(&mut self, segment: impl Into<String>) -> bool {
        self.0.insert(segment.into())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl Default for DangerousSegmentSet {
    fn default() -> Self {
        Self::canonical()
    }
}
