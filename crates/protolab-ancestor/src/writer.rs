use std::sync::RwLockWriteGuard;

use tracing::{debug, warn};

use protolab_types::{ContaminationSource, Holder, JsonValue, Record};

use crate::ancestor::AncestorState;
use crate::resolution::{Owner, Slot};

/// Exclusive access to a shared ancestor for the duration of one merge.
///
/// Every write records which operation made it, so a later diff can say
/// where a contaminating attribute came from.
pub struct AncestorWriter<'a> {
    state: RwLockWriteGuard<'a, AncestorState>,
}

impl<'a> AncestorWriter<'a> {
    pub(crate) fn new(state: RwLockWriteGuard<'a, AncestorState>) -> Self {
        Self { state }
    }

    pub fn record(&self, holder: Holder) -> &Record {
        self.state.record(holder)
    }

    pub fn get(&self, holder: Holder, key: &str) -> Option<&JsonValue> {
        self.state.record(holder).get(key)
    }

    /// Resolve `key` on an ordinary record `own`.
    pub fn resolve_ordinary(&self, own: &Record, key: &str) -> Slot {
        self.state.resolve(Owner::Ordinary, own, key)
    }

    /// Resolve `key` on one of the holders.
    pub fn resolve_shared(&self, holder: Holder, key: &str) -> Slot {
        self.state
            .resolve(Owner::Shared(holder), self.state.record(holder), key)
    }

    /// Write `key` on `holder`, returning the previous value.
    pub fn set(
        &mut self,
        holder: Holder,
        key: &str,
        value: JsonValue,
        source: ContaminationSource,
    ) -> Option<JsonValue> {
        warn!(%holder, key, ?source, "write onto shared ancestor");
        self.state
            .provenance
            .insert((holder, key.to_string()), source);
        self.state.record_mut(holder).insert(key.to_string(), value)
    }

    /// Write `key` on `holder` only if the value differs from the stored one.
    /// Returns `true` when a write happened.
    pub fn update(
        &mut self,
        holder: Holder,
        key: &str,
        value: JsonValue,
        source: ContaminationSource,
    ) -> bool {
        if self.get(holder, key) == Some(&value) {
            return false;
        }
        self.set(holder, key, value, source);
        true
    }

    /// Put a baseline value back and forget who last wrote it.
    pub fn restore(&mut self, holder: Holder, key: &str, value: JsonValue) {
        debug!(%holder, key, "restoring baseline attribute");
        self.state.provenance.remove(&(holder, key.to_string()));
        self.state.record_mut(holder).insert(key.to_string(), value);
    }

    pub fn remove(&mut self, holder: Holder, key: &str) -> Option<JsonValue> {
        self.state.provenance.remove(&(holder, key.to_string()));
        self.state.record_mut(holder).remove(key)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::SharedAncestor;

    #[test]
    fn set_records_provenance() {
        let ancestor = SharedAncestor::empty();
        {
            let mut writer = ancestor.writer().unwrap();
            assert_eq!(
                writer.set(Holder::Prototype, "isAdmin", json!(true), ContaminationSource::DefaultsDeep),
                None
            );
            assert_eq!(writer.get(Holder::Prototype, "isAdmin"), Some(&json!(true)));
        }
        assert_eq!(
            ancestor.source_of(Holder::Prototype, "isAdmin").unwrap(),
            ContaminationSource::DefaultsDeep
        );
    }

    #[test]
    fn update_skips_identical_values() {
        let ancestor = SharedAncestor::empty();
        ancestor.define(Holder::Prototype, "k", json!(1)).unwrap();
        let mut writer = ancestor.writer().unwrap();
        assert!(!writer.update(Holder::Prototype, "k", json!(1), ContaminationSource::Merge));
        assert!(writer.update(Holder::Prototype, "k", json!(2), ContaminationSource::Merge));
        drop(writer);
        assert_eq!(
            ancestor.source_of(Holder::Prototype, "k").unwrap(),
            ContaminationSource::Merge
        );
    }

    #[test]
    fn restore_clears_provenance() {
        let ancestor = SharedAncestor::new();
        let mut writer = ancestor.writer().unwrap();
        writer.set(Holder::Constructor, "name", json!("Evil"), ContaminationSource::Merge);
        writer.restore(Holder::Constructor, "name", json!("Object"));
        drop(writer);
        assert_eq!(ancestor.get(Holder::Constructor, "name").unwrap(), Some(json!("Object")));
        assert_eq!(
            ancestor.source_of(Holder::Constructor, "name").unwrap(),
            ContaminationSource::Unattributed
        );
    }

    #[test]
    fn resolution_through_writer() {
        let ancestor = SharedAncestor::new();
        let writer = ancestor.writer().unwrap();
        let mut own = Record::new();
        own.insert("name".into(), json!("x"));

        assert_eq!(writer.resolve_ordinary(&own, "name"), Slot::Own);
        assert_eq!(
            writer.resolve_ordinary(&own, "constructor"),
            Slot::Redirect(Holder::Constructor)
        );
        assert!(matches!(writer.resolve_ordinary(&own, "toString"), Slot::Inherited(_)));
        assert_eq!(writer.resolve_ordinary(&own, "missing"), Slot::Absent);

        assert_eq!(
            writer.resolve_shared(Holder::Constructor, "prototype"),
            Slot::Redirect(Holder::Prototype)
        );
        assert_eq!(writer.resolve_shared(Holder::Constructor, "name"), Slot::Own);
        assert_eq!(writer.resolve_shared(Holder::Prototype, "nothing"), Slot::Absent);
    }

    #[test]
    fn writes_on_fork_copy_on_write() {
        let ancestor = SharedAncestor::new();
        let fork = ancestor.fork().unwrap();
        {
            let mut writer = fork.writer().unwrap();
            writer.set(Holder::Prototype, "isAdmin", json!(true), ContaminationSource::Merge);
            writer.remove(Holder::Constructor, "name");
        }
        assert_eq!(ancestor.get(Holder::Prototype, "isAdmin").unwrap(), None);
        assert_eq!(ancestor.get(Holder::Constructor, "name").unwrap(), Some(json!("Object")));
    }
}
