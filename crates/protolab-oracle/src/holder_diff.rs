//! Holder-level diff: compare the attributes of the shared holders at two
//! points in time.
//!
//! The diff detects key additions, removals, and value modifications on
//! each holder independently.

use protolab_ancestor::AncestorSnapshot;
use protolab_types::{Holder, JsonValue, Record};

/// The result of comparing one holder's attributes.
#[derive(Clone, Debug, PartialEq)]
pub struct HolderDiff {
    pub holder: Holder,
    /// The list of attribute changes, ordered by key.
    pub changes: Vec<HolderChange>,
}

impl HolderDiff {
    /// Create an empty diff for `holder`.
    pub fn new(holder: Holder) -> Self {
        Self {
            holder,
            changes: Vec::new(),
        }
    }

    /// Returns `true` if there are no changes.
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Number of added keys.
    pub fn additions(&self) -> usize {
        self.changes
            .iter()
            .filter(|c| matches!(c, HolderChange::Added { .. }))
            .count()
    }

    /// Number of removed keys.
    pub fn removals(&self) -> usize {
        self.changes
            .iter()
            .filter(|c| matches!(c, HolderChange::Removed { .. }))
            .count()
    }

    /// Number of modified keys.
    pub fn modifications(&self) -> usize {
        self.changes
            .iter()
            .filter(|c| matches!(c, HolderChange::Modified { .. }))
            .count()
    }
}

/// A single attribute change on a holder.
#[derive(Clone, Debug, PartialEq)]
pub enum HolderChange {
    /// An attribute absent from the baseline appeared.
    Added { key: String, value: JsonValue },
    /// A baseline attribute disappeared.
    Removed { key: String, value: JsonValue },
    /// A baseline attribute now holds a different value.
    Modified {
        key: String,
        old: JsonValue,
        new: JsonValue,
    },
}

impl HolderChange {
    pub fn key(&self) -> &str {
        match self {
            Self::Added { key, .. } | Self::Removed { key, .. } | Self::Modified { key, .. } => key,
        }
    }
}

/// Compute the diff between two versions of a holder's attributes.
///
/// Keys present only in `new` are `Added`, keys present only in `old` are
/// `Removed`, and keys present in both but with different values are
/// `Modified`. Changes come out ordered by key.
pub fn diff_records(holder: Holder, old: &Record, new: &Record) -> HolderDiff {
    let mut changes = Vec::new();

    for (key, old_val) in old {
        match new.get(key) {
            Some(new_val) if new_val != old_val => changes.push(HolderChange::Modified {
                key: key.clone(),
                old: old_val.clone(),
                new: new_val.clone(),
            }),
            Some(_) => {}
            None => changes.push(HolderChange::Removed {
                key: key.clone(),
                value: old_val.clone(),
            }),
        }
    }

    for (key, new_val) in new {
        if !old.contains_key(key) {
            changes.push(HolderChange::Added {
                key: key.clone(),
                value: new_val.clone(),
            });
        }
    }

    changes.sort_by(|a, b| a.key().cmp(b.key()));
    HolderDiff { holder, changes }
}

/// Diff both holders: prototype first, then constructor.
pub fn diff_snapshots(old: &AncestorSnapshot, new: &AncestorSnapshot) -> Vec<HolderDiff> {
    [Holder::Prototype, Holder::Constructor]
        .into_iter()
        .map(|holder| diff_records(holder, old.record(holder), new.record(holder)))
        .collect()
}
