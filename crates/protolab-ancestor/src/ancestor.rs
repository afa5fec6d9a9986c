use std::collections::BTreeMap;
use std::sync::{Arc, RwLock, RwLockReadGuard};

use serde::Serialize;
use tracing::debug;

use protolab_types::{ContaminationSource, Holder, JsonValue, Record};

use crate::builtins;
use crate::error::{AncestorError, AncestorResult};
use crate::resolution::{redirect, Owner, Slot};
use crate::writer::AncestorWriter;

/// Handle to a shared ancestor.
///
/// Cloning the handle shares the underlying state: every clone observes
/// every write. Callers are not isolated from each other; use
/// [`SharedAncestor::fork`] to get an independent copy-on-write instance.
#[derive(Clone)]
pub struct SharedAncestor {
    inner: Arc<RwLock<AncestorState>>,
}

#[derive(Clone, Debug, Default)]
pub(crate) struct AncestorState {
    pub(crate) prototype: Arc<Record>,
    pub(crate) constructor: Arc<Record>,
    pub(crate) provenance: BTreeMap<(Holder, String), ContaminationSource>,
}

impl AncestorState {
    pub(crate) fn record(&self, holder: Holder) -> &Record {
        match holder {
            Holder::Prototype => &self.prototype,
            Holder::Constructor => &self.constructor,
        }
    }

    /// Mutable access; clones the record first if a fork still shares it.
    pub(crate) fn record_mut(&mut self, holder: Holder) -> &mut Record {
        match holder {
            Holder::Prototype => Arc::make_mut(&mut self.prototype),
            Holder::Constructor => Arc::make_mut(&mut self.constructor),
        }
    }

    pub(crate) fn resolve(&self, owner: Owner, own: &Record, key: &str) -> Slot {
        if own.contains_key(key) {
            return Slot::Own;
        }
        if let Some(holder) = redirect(owner, key) {
            return Slot::Redirect(holder);
        }
        if owner == Owner::Ordinary {
            if let Some(value) = self.prototype.get(key) {
                return Slot::Inherited(value.clone());
            }
        }
        Slot::Absent
    }
}

/// A point-in-time copy of both holders.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct AncestorSnapshot {
    pub prototype: Record,
    pub constructor: Record,
}

impl AncestorSnapshot {
    pub fn record(&self, holder: Holder) -> &Record {
        match holder {
            Holder::Prototype => &self.prototype,
            Holder::Constructor => &self.constructor,
        }
    }

    /// Total number of own attributes across both holders.
    pub fn len(&self) -> usize {
        self.prototype.len() + self.constructor.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SharedAncestor {
    /// A new ancestor seeded with the builtin baseline attributes.
    pub fn new() -> Self {
        Self::from_records(builtins::prototype_record(), builtins::constructor_record())
    }

    /// A new ancestor with no attributes at all.
    pub fn empty() -> Self {
        Self::from_records(Record::new(), Record::new())
    }

    pub fn from_records(prototype: Record, constructor: Record) -> Self {
        Self {
            inner: Arc::new(RwLock::new(AncestorState {
                prototype: Arc::new(prototype),
                constructor: Arc::new(constructor),
                provenance: BTreeMap::new(),
            })),
        }
    }

    /// An independent copy-on-write instance.
    ///
    /// The fork starts with this ancestor's current content. Records are
    /// shared until the first write on either side, after which the writer
    /// gets its own copy. Writes never cross between the two.
    pub fn fork(&self) -> AncestorResult<Self> {
        let state = self.read()?.clone();
        debug!("forked shared ancestor");
        Ok(Self {
            inner: Arc::new(RwLock::new(state)),
        })
    }

    /// Returns `true` if both handles refer to the same ancestor.
    pub fn same_as(&self, other: &SharedAncestor) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Exclusive access for one merge operation.
    ///
    /// Other calls on any handle to this ancestor block until the writer is
    /// dropped; do not call them while holding it.
    pub fn writer(&self) -> AncestorResult<AncestorWriter<'_>> {
        let guard = self
            .inner
            .write()
            .map_err(|_| AncestorError::Poisoned("write"))?;
        Ok(AncestorWriter::new(guard))
    }

    pub fn snapshot(&self) -> AncestorResult<AncestorSnapshot> {
        let state = self.read()?;
        Ok(AncestorSnapshot {
            prototype: Record::clone(&state.prototype),
            constructor: Record::clone(&state.constructor),
        })
    }

    /// Own attribute `key` of `holder`.
    pub fn get(&self, holder: Holder, key: &str) -> AncestorResult<Option<JsonValue>> {
        Ok(self.read()?.record(holder).get(key).cloned())
    }

    /// Set an attribute directly, outside any merge.
    pub fn define(
        &self,
        holder: Holder,
        key: &str,
        value: JsonValue,
    ) -> AncestorResult<Option<JsonValue>> {
        let mut writer = self.writer()?;
        Ok(writer.set(holder, key, value, ContaminationSource::Unattributed))
    }

    /// Remove an own attribute and forget who wrote it.
    pub fn remove(&self, holder: Holder, key: &str) -> AncestorResult<Option<JsonValue>> {
        let mut writer = self.writer()?;
        Ok(writer.remove(holder, key))
    }

    /// The operation that last wrote `key` on `holder`.
    pub fn source_of(&self, holder: Holder, key: &str) -> AncestorResult<ContaminationSource> {
        Ok(self
            .read()?
            .provenance
            .get(&(holder, key.to_string()))
            .copied()
            .unwrap_or(ContaminationSource::Unattributed))
    }

    /// A throwaway empty record whose lookups fall back to this ancestor.
    pub fn fresh_record(&self) -> FreshRecord<'_> {
        FreshRecord {
            own: Record::new(),
            ancestor: self,
        }
    }

    fn read(&self) -> AncestorResult<RwLockReadGuard<'_, AncestorState>> {
        self.inner.read().map_err(|_| AncestorError::Poisoned("read"))
    }
}

impl Default for SharedAncestor {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SharedAncestor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.inner.read() {
            Ok(state) => f
                .debug_struct("SharedAncestor")
                .field("prototype", &state.prototype.len())
                .field("constructor", &state.constructor.len())
                .finish(),
            Err(_) => f.write_str("SharedAncestor(<poisoned>)"),
        }
    }
}

/// An empty ordinary record, as created by `{}` in the modelled runtime.
pub struct FreshRecord<'a> {
    own: Record,
    ancestor: &'a SharedAncestor,
}

impl FreshRecord<'_> {
    /// Look up `key` the way the runtime would: own attributes, accessor
    /// redirects, then the shared ancestor.
    pub fn get(&self, key: &str) -> AncestorResult<Option<JsonValue>> {
        let state = self.ancestor.read()?;
        Ok(match state.resolve(Owner::Ordinary, &self.own, key) {
            Slot::Own => self.own.get(key).cloned(),
            Slot::Redirect(holder) => Some(JsonValue::Object(state.record(holder).clone())),
            Slot::Inherited(value) => Some(value),
            Slot::Absent => None,
        })
    }

    /// The `in` operator: does the lookup reach any value?
    pub fn has(&self, key: &str) -> AncestorResult<bool> {
        let state = self.ancestor.read()?;
        Ok(state.resolve(Owner::Ordinary, &self.own, key).is_present())
    }

    /// Attributes the record owns itself. Always empty for a fresh record.
    pub fn own_keys(&self) -> impl Iterator<Item = &str> {
        self.own.keys().map(String::as_str)
    }
}
