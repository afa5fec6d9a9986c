use tracing::debug;

use protolab_ancestor::{AncestorWriter, SharedAncestor, Slot};
use protolab_guard::SegmentPolicy;
use protolab_types::{
    kind_name, nesting_depth, ContaminationSource, Holder, JsonValue, KeyPath, MergeStrategy,
    Record,
};

use crate::config::MergeConfig;
use crate::customizer::{ConcatArrays, MergeCustomizer};
use crate::error::{MergeError, MergeResult};

/// What a merge writes into.
#[derive(Clone, Debug, PartialEq)]
pub enum MergeTarget {
    /// An ordinary record supplied by the caller.
    Record(JsonValue),
    /// The shared ancestor itself: the shape where the attacker controls the
    /// merge target, not only the nested payload.
    Ancestor,
}

impl MergeTarget {
    pub fn fresh() -> Self {
        Self::Record(JsonValue::Object(Record::new()))
    }
}

/// The deep merge engine. Traversal keeps its own frame stack, so payload
/// depth is bounded by `MergeConfig::max_depth`, not by the thread stack.
///
/// Every operation locks the shared ancestor for its whole duration, so one
/// merge never interleaves with another; nothing isolates one merge's writes
/// from the next caller, though.
#[derive(Clone, Debug)]
pub struct DeepMergeEngine {
    ancestor: SharedAncestor,
    config: MergeConfig,
}

impl DeepMergeEngine {
    pub fn new(ancestor: SharedAncestor, config: MergeConfig) -> Self {
        Self { ancestor, config }
    }

    pub fn ancestor(&self) -> &SharedAncestor {
        &self.ancestor
    }

    pub fn config(&self) -> &MergeConfig {
        &self.config
    }

    /// Plain deep merge: recurse where both sides hold records, otherwise the
    /// source value overwrites the target's.
    pub fn merge(
        &self,
        target: JsonValue,
        source: &JsonValue,
        guard: Option<&dyn SegmentPolicy>,
    ) -> MergeResult<JsonValue> {
        self.run(MergeStrategy::Merge, MergeTarget::Record(target), source, guard, None)
    }

    /// Deep merge that asks `customizer` first at every key.
    pub fn merge_with(
        &self,
        target: JsonValue,
        source: &JsonValue,
        customizer: &dyn MergeCustomizer,
        guard: Option<&dyn SegmentPolicy>,
    ) -> MergeResult<JsonValue> {
        self.run(
            MergeStrategy::MergeWith,
            MergeTarget::Record(target),
            source,
            guard,
            Some(customizer),
        )
    }

    /// Deep merge that only fills attributes the target lacks or holds as
    /// `null`. Defined values, falsy ones included, are never overwritten.
    pub fn defaults_deep(
        &self,
        target: JsonValue,
        source: &JsonValue,
        guard: Option<&dyn SegmentPolicy>,
    ) -> MergeResult<JsonValue> {
        self.run(
            MergeStrategy::DefaultsDeep,
            MergeTarget::Record(target),
            source,
            guard,
            None,
        )
    }

    /// Mixin-style deep merge: recurse where both sides hold records,
    /// otherwise assign the source value as is.
    pub fn mixin_deep(
        &self,
        target: JsonValue,
        source: &JsonValue,
        guard: Option<&dyn SegmentPolicy>,
    ) -> MergeResult<JsonValue> {
        self.run(
            MergeStrategy::ThirdPartyUtility,
            MergeTarget::Record(target),
            source,
            guard,
            None,
        )
    }

    /// Run `strategy` against any target. `MergeWith` uses [`ConcatArrays`].
    ///
    /// For [`MergeTarget::Ancestor`] the returned value is the prototype
    /// record after the merge.
    pub fn apply(
        &self,
        strategy: MergeStrategy,
        target: MergeTarget,
        source: &JsonValue,
        guard: Option<&dyn SegmentPolicy>,
    ) -> MergeResult<JsonValue> {
        let customizer = match strategy {
            MergeStrategy::MergeWith => Some(&ConcatArrays as &dyn MergeCustomizer),
            _ => None,
        };
        self.run(strategy, target, source, guard, customizer)
    }

    fn run(
        &self,
        strategy: MergeStrategy,
        target: MergeTarget,
        source: &JsonValue,
        guard: Option<&dyn SegmentPolicy>,
        customizer: Option<&dyn MergeCustomizer>,
    ) -> MergeResult<JsonValue> {
        let JsonValue::Object(source) = source else {
            debug!(kind = kind_name(source), "source is not a record; nothing to merge");
            return match target {
                MergeTarget::Record(value) => Ok(value),
                MergeTarget::Ancestor => Ok(JsonValue::Object(
                    self.ancestor.snapshot()?.prototype,
                )),
            };
        };

        let mut pass = Pass {
            strategy,
            guard,
            customizer,
            writer: self.ancestor.writer()?,
            max_depth: self.config.max_depth,
            path: KeyPath::root(),
        };

        let scope = match target {
            MergeTarget::Record(JsonValue::Object(record)) => Scope::Own(record),
            MergeTarget::Record(other) => {
                debug!(kind = kind_name(&other), "target is not a record; starting from {{}}");
                Scope::Own(Record::new())
            }
            MergeTarget::Ancestor => Scope::Shared(Holder::Prototype),
        };

        match pass.traverse(Frame::new(scope, source, Attach::InPlace))? {
            Scope::Own(record) => Ok(JsonValue::Object(record)),
            Scope::Shared(holder) => Ok(JsonValue::Object(pass.writer.record(holder).clone())),
        }
    }
}

// ---------------------------------------------------------------------------
// Traversal
// ---------------------------------------------------------------------------

/// Where the record currently being merged lives.
enum Scope {
    /// A record owned by the traversal, detached from its parent while its
    /// keys are merged.
    Own(Record),
    /// One of the holders on the shared ancestor, written through the lock.
    Shared(Holder),
}

/// How a finished frame is put back into its parent.
enum Attach {
    /// Writes already landed where they belong.
    InPlace,
    /// Assign the finished record at this key.
    Assign(String),
    /// Replace the holder attribute at this key if it changed.
    Update(String),
    /// The record was inherited from the prototype record: write it back
    /// there, then assign it at this key as well.
    Inherited(String),
}

/// One record being merged: the destination, the source keys still to
/// visit, and how to hand the result back.
struct Frame<'s> {
    scope: Scope,
    entries: serde_json::map::Iter<'s>,
    attach: Attach,
}

impl<'s> Frame<'s> {
    fn new(scope: Scope, source: &'s Record, attach: Attach) -> Self {
        Self {
            scope,
            entries: source.iter(),
            attach,
        }
    }
}

/// Outcome of merging one key.
enum Step<'s> {
    Done,
    Enter(Frame<'s>),
}

/// State for one merge operation.
struct Pass<'p, 'w> {
    strategy: MergeStrategy,
    guard: Option<&'p dyn SegmentPolicy>,
    customizer: Option<&'p dyn MergeCustomizer>,
    writer: AncestorWriter<'w>,
    max_depth: usize,
    path: KeyPath,
}

impl Pass<'_, '_> {
    fn source(&self) -> ContaminationSource {
        self.strategy.into()
    }

    fn depth_exceeded(&self) -> MergeError {
        MergeError::DepthExceeded {
            max_depth: self.max_depth,
            path: self.path.clone(),
        }
    }

    /// Depth-first walk over the source with an explicit frame stack. The
    /// path always names the key of the innermost open frame.
    fn traverse<'s>(&mut self, root: Frame<'s>) -> MergeResult<Scope> {
        let mut stack = vec![root];

        while let Some(frame) = stack.last_mut() {
            let depth = self.path.len();

            let Some((key, value)) = frame.entries.next() else {
                let Some(finished) = stack.pop() else { break };
                match stack.last_mut() {
                    Some(parent) => {
                        self.path.pop();
                        self.attach(&mut parent.scope, finished);
                        continue;
                    }
                    None => return Ok(finished.scope),
                }
            };

            if let Some(guard) = self.guard {
                if guard.is_dangerous(key, depth) {
                    debug!(path = %self.path, key = key.as_str(), policy = guard.name(), "dropped dangerous segment");
                    continue;
                }
            }

            self.path.push(key.as_str());
            match self.merge_key(&mut frame.scope, key, value)? {
                Step::Done => {
                    self.path.pop();
                }
                Step::Enter(child) => {
                    if self.path.len() > self.max_depth {
                        return Err(self.depth_exceeded());
                    }
                    stack.push(child);
                }
            }
        }

        // The root frame always returns from inside the loop.
        Ok(Scope::Own(Record::new()))
    }

    fn attach(&mut self, parent: &mut Scope, finished: Frame<'_>) {
        let Scope::Own(record) = finished.scope else {
            return;
        };
        match finished.attach {
            Attach::InPlace => {}
            Attach::Assign(key) => self.write(parent, &key, JsonValue::Object(record)),
            Attach::Update(key) => {
                if let Scope::Shared(holder) = parent {
                    let origin = self.source();
                    self.writer
                        .update(*holder, &key, JsonValue::Object(record), origin);
                }
            }
            Attach::Inherited(key) => {
                let origin = self.source();
                self.writer.update(
                    Holder::Prototype,
                    &key,
                    JsonValue::Object(record.clone()),
                    origin,
                );
                self.write(parent, &key, JsonValue::Object(record));
            }
        }
    }

    fn merge_key<'s>(
        &mut self,
        scope: &mut Scope,
        key: &str,
        source: &'s JsonValue,
    ) -> MergeResult<Step<'s>> {
        let slot = self.resolve(scope, key);

        if let Some(customizer) = self.customizer {
            let current = self.current_value(scope, key, &slot);
            if let Some(value) = customizer.customize(current.as_ref(), source, key) {
                return self.assign(scope, key, value);
            }
        }

        match self.strategy {
            MergeStrategy::Merge | MergeStrategy::MergeWith => match source {
                JsonValue::Object(record) => Ok(self.descend(scope, key, record, slot)),
                other => self.assign(scope, key, other.clone()),
            },
            MergeStrategy::DefaultsDeep => self.fill_default(scope, key, source, slot),
            MergeStrategy::ThirdPartyUtility => match source {
                JsonValue::Object(record) if self.is_mergeable(scope, key, &slot) => {
                    Ok(self.descend(scope, key, record, slot))
                }
                other => self.assign(scope, key, other.clone()),
            },
        }
    }

    fn fill_default<'s>(
        &mut self,
        scope: &mut Scope,
        key: &str,
        source: &'s JsonValue,
        slot: Slot,
    ) -> MergeResult<Step<'s>> {
        let unset = match &slot {
            // The accessor always yields a value; only a record is followed.
            Slot::Redirect(_) => false,
            Slot::Own => matches!(self.own_value(scope, key), Some(JsonValue::Null)),
            // Inherited attributes are not the target's own; defaults apply.
            Slot::Inherited(_) | Slot::Absent => true,
        };

        match source {
            JsonValue::Object(record) if self.is_mergeable(scope, key, &slot) => {
                Ok(self.descend(scope, key, record, slot))
            }
            JsonValue::Object(record) if unset => Ok(rebuild(key, Record::new(), record)),
            other if unset => self.assign(scope, key, other.clone()),
            _ => Ok(Step::Done),
        }
    }

    /// Open a frame on whatever `key` resolves to, or on a rebuilt record.
    fn descend<'s>(&self, scope: &mut Scope, key: &str, source: &'s Record, slot: Slot) -> Step<'s> {
        match slot {
            Slot::Redirect(holder) => {
                debug!(path = %self.path, %holder, "following accessor onto shared ancestor");
                Step::Enter(Frame::new(Scope::Shared(holder), source, Attach::InPlace))
            }
            Slot::Own => match scope {
                Scope::Own(record) => match record.get_mut(key) {
                    Some(JsonValue::Object(child)) => {
                        let child = std::mem::take(child);
                        Step::Enter(Frame::new(Scope::Own(child), source, Attach::Assign(key.to_string())))
                    }
                    _ => rebuild(key, Record::new(), source),
                },
                Scope::Shared(holder) => match self.writer.get(*holder, key) {
                    Some(JsonValue::Object(child)) => Step::Enter(Frame::new(
                        Scope::Own(child.clone()),
                        source,
                        Attach::Update(key.to_string()),
                    )),
                    _ => rebuild(key, Record::new(), source),
                },
            },
            // The shared record is merged into, so every record inheriting
            // it sees the change.
            Slot::Inherited(JsonValue::Object(inherited)) => {
                debug!(path = %self.path, "merging into inherited record");
                Step::Enter(Frame::new(
                    Scope::Own(inherited),
                    source,
                    Attach::Inherited(key.to_string()),
                ))
            }
            Slot::Inherited(_) | Slot::Absent => rebuild(key, Record::new(), source),
        }
    }

    /// Assign a value verbatim after checking it fits under the depth bound.
    fn assign<'s>(&mut self, scope: &mut Scope, key: &str, value: JsonValue) -> MergeResult<Step<'s>> {
        let nested = nesting_depth(&value);
        if nested > 0 && self.path.len() + nested - 1 > self.max_depth {
            return Err(self.depth_exceeded());
        }
        self.write(scope, key, value);
        Ok(Step::Done)
    }

    fn write(&mut self, scope: &mut Scope, key: &str, value: JsonValue) {
        match scope {
            Scope::Own(record) => {
                record.insert(key.to_string(), value);
            }
            Scope::Shared(holder) => {
                let origin = self.source();
                self.writer.set(*holder, key, value, origin);
            }
        }
    }

    fn resolve(&self, scope: &Scope, key: &str) -> Slot {
        match scope {
            Scope::Own(record) => self.writer.resolve_ordinary(record, key),
            Scope::Shared(holder) => self.writer.resolve_shared(*holder, key),
        }
    }

    fn own_value<'a>(&'a self, scope: &'a Scope, key: &str) -> Option<&'a JsonValue> {
        match scope {
            Scope::Own(record) => record.get(key),
            Scope::Shared(holder) => self.writer.get(*holder, key),
        }
    }

    /// The value a lookup of `key` currently yields, as a customizer sees it.
    fn current_value(&self, scope: &Scope, key: &str, slot: &Slot) -> Option<JsonValue> {
        match slot {
            Slot::Own => self.own_value(scope, key).cloned(),
            Slot::Redirect(holder) => Some(JsonValue::Object(self.writer.record(*holder).clone())),
            Slot::Inherited(value) => Some(value.clone()),
            Slot::Absent => None,
        }
    }

    /// Does `key` resolve to something the traversal can descend into?
    fn is_mergeable(&self, scope: &Scope, key: &str, slot: &Slot) -> bool {
        match slot {
            Slot::Redirect(_) => true,
            Slot::Own => matches!(self.own_value(scope, key), Some(JsonValue::Object(_))),
            Slot::Inherited(value) => value.is_object(),
            Slot::Absent => false,
        }
    }
}

/// Merge `source` into `base` and assign the result at `key` once done.
fn rebuild<'s>(key: &str, base: Record, source: &'s Record) -> Step<'s> {
    Step::Enter(Frame::new(Scope::Own(base), source, Attach::Assign(key.to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_MAX_DEPTH;
    use protolab_guard::{DangerousSegmentSet, GuardScope, KeyPathGuard};
    use serde_json::json;

    fn engine() -> DeepMergeEngine {
        DeepMergeEngine::new(SharedAncestor::new(), MergeConfig::default())
    }

    fn nested(depth: usize) -> JsonValue {
        let mut value = json!({"leaf": true});
        for _ in 1..depth {
            let mut record = Record::new();
            record.insert("n".to_string(), value);
            value = JsonValue::Object(record);
        }
        value
    }

    // -----------------------------------------------------------------------
    // Plain merge
    // -----------------------------------------------------------------------

    #[test]
    fn merge_combines_nested_records() {
        let engine = engine();
        let target = json!({"a": {"x": 1, "keep": true}, "b": 1});
        let source = json!({"a": {"x": 2, "y": 3}, "c": [1, 2]});
        let merged = engine.merge(target, &source, None).unwrap();
        assert_eq!(merged, json!({"a": {"x": 2, "y": 3, "keep": true}, "b": 1, "c": [1, 2]}));
    }

    #[test]
    fn merge_source_wins_on_scalar_and_array_conflicts() {
        let engine = engine();
        let target = json!({"n": 1, "tags": ["a", "b"], "obj": {"k": 1}});
        let source = json!({"n": "one", "tags": ["c"], "obj": 5});
        let merged = engine.merge(target, &source, None).unwrap();
        assert_eq!(merged, json!({"n": "one", "tags": ["c"], "obj": 5}));
    }

    #[test]
    fn merge_record_replaces_scalar() {
        let engine = engine();
        let merged = engine
            .merge(json!({"a": 1}), &json!({"a": {"b": 2}}), None)
            .unwrap();
        assert_eq!(merged, json!({"a": {"b": 2}}));
    }

    #[test]
    fn merge_null_overwrites() {
        let engine = engine();
        let merged = engine.merge(json!({"a": 1}), &json!({"a": null}), None).unwrap();
        assert_eq!(merged, json!({"a": null}));
    }

    #[test]
    fn non_record_source_is_ignored() {
        let engine = engine();
        let merged = engine.merge(json!({"a": 1}), &json!([1, 2]), None).unwrap();
        assert_eq!(merged, json!({"a": 1}));
    }

    #[test]
    fn non_record_target_starts_empty() {
        let engine = engine();
        let merged = engine.merge(json!("text"), &json!({"a": 1}), None).unwrap();
        assert_eq!(merged, json!({"a": 1}));
    }

    #[test]
    fn merge_constructor_chain_contaminates_ancestor() {
        let engine = engine();
        let payload = json!({"constructor": {"prototype": {"polluted": "via merge"}}});
        let merged = engine.merge(json!({}), &payload, None).unwrap();

        // The target itself gains nothing; the write went through the chain.
        assert_eq!(merged, json!({}));
        let fresh = engine.ancestor().fresh_record();
        assert_eq!(fresh.get("polluted").unwrap(), Some(json!("via merge")));
        assert_eq!(
            engine.ancestor().source_of(Holder::Prototype, "polluted").unwrap(),
            ContaminationSource::Merge
        );
    }

    #[test]
    fn merge_proto_accessor_contaminates_ancestor() {
        let engine = engine();
        engine
            .merge(json!({}), &json!({"__proto__": {"polluted": true}}), None)
            .unwrap();
        assert_eq!(engine.ancestor().fresh_record().get("polluted").unwrap(), Some(json!(true)));
    }

    #[test]
    fn nested_accessor_inside_ordinary_key_contaminates() {
        let engine = engine();
        let payload = json!({"profile": {"__proto__": {"isAdmin": true}, "name": "x"}});
        let merged = engine.merge(json!({}), &payload, None).unwrap();
        assert_eq!(merged, json!({"profile": {"name": "x"}}));
        assert_eq!(engine.ancestor().fresh_record().get("isAdmin").unwrap(), Some(json!(true)));
    }

    #[test]
    fn constructor_statics_land_on_constructor_record() {
        let engine = engine();
        engine
            .merge(json!({}), &json!({"constructor": {"debug": true}}), None)
            .unwrap();
        assert_eq!(
            engine.ancestor().get(Holder::Constructor, "debug").unwrap(),
            Some(json!(true))
        );
        assert_eq!(engine.ancestor().fresh_record().get("debug").unwrap(), None);
    }

    #[test]
    fn scalar_at_accessor_key_becomes_own_attribute() {
        let engine = engine();
        let merged = engine
            .merge(json!({}), &json!({"constructor": 5, "__proto__": "x"}), None)
            .unwrap();
        assert_eq!(merged, json!({"constructor": 5, "__proto__": "x"}));
        assert_eq!(engine.ancestor().snapshot().unwrap(), SharedAncestor::new().snapshot().unwrap());
    }

    #[test]
    fn own_accessor_key_shadows_redirect() {
        let engine = engine();
        let target = json!({"__proto__": {"own": 1}});
        let merged = engine
            .merge(target, &json!({"__proto__": {"more": 2}}), None)
            .unwrap();
        assert_eq!(merged, json!({"__proto__": {"own": 1, "more": 2}}));
        assert_eq!(engine.ancestor().fresh_record().get("more").unwrap(), None);
    }

    #[test]
    fn inherited_builtin_is_shadowed_not_mutated() {
        let engine = engine();
        let merged = engine
            .merge(json!({}), &json!({"toString": {"custom": true}}), None)
            .unwrap();
        assert_eq!(merged, json!({"toString": {"custom": true}}));
        assert_eq!(engine.ancestor().snapshot().unwrap(), SharedAncestor::new().snapshot().unwrap());
    }

    #[test]
    fn inherited_record_is_merged_in_place() {
        let ancestor = SharedAncestor::new();
        ancestor
            .define(Holder::Prototype, "settings", json!({"theme": "dark"}))
            .unwrap();
        let engine = DeepMergeEngine::new(ancestor.clone(), MergeConfig::default());
        let merged = engine
            .merge(json!({}), &json!({"settings": {"lang": "en"}}), None)
            .unwrap();
        assert_eq!(merged, json!({"settings": {"theme": "dark", "lang": "en"}}));
        assert_eq!(
            ancestor.get(Holder::Prototype, "settings").unwrap(),
            Some(json!({"theme": "dark", "lang": "en"}))
        );
        assert_eq!(
            ancestor.source_of(Holder::Prototype, "settings").unwrap(),
            ContaminationSource::Merge
        );
    }

    #[test]
    fn planted_record_spreads_through_later_plain_payload() {
        let engine = engine();
        let guard = KeyPathGuard::default();
        engine
            .merge(json!({}), &json!({"__proto__": {"config": {}}}), None)
            .unwrap();

        // No dangerous segment here, so the guard has nothing to drop.
        for strategy in MergeStrategy::ALL {
            engine
                .apply(
                    strategy,
                    MergeTarget::fresh(),
                    &json!({"config": {"isAdmin": true}}),
                    Some(&guard),
                )
                .unwrap();
            assert_eq!(
                engine.ancestor().fresh_record().get("config").unwrap(),
                Some(json!({"isAdmin": true})),
                "{strategy}"
            );
        }
    }

    #[test]
    fn defaults_fill_inherited_record_without_overwriting() {
        let ancestor = SharedAncestor::new();
        ancestor
            .define(Holder::Prototype, "settings", json!({"theme": "dark"}))
            .unwrap();
        let engine = DeepMergeEngine::new(ancestor.clone(), MergeConfig::default());
        let merged = engine
            .defaults_deep(json!({}), &json!({"settings": {"theme": "light", "lang": "en"}}), None)
            .unwrap();
        assert_eq!(merged, json!({"settings": {"theme": "dark", "lang": "en"}}));
        assert_eq!(
            ancestor.get(Holder::Prototype, "settings").unwrap(),
            Some(json!({"theme": "dark", "lang": "en"}))
        );
    }

    // -----------------------------------------------------------------------
    // Guard
    // -----------------------------------------------------------------------

    #[test]
    fn guard_drops_dangerous_segments_silently() {
        let engine = engine();
        let guard = KeyPathGuard::default();
        let payload = json!({
            "constructor": {"prototype": {"polluted": 1}},
            "__proto__": {"isAdmin": true},
            "name": "ok",
            "profile": {"prototype": {"x": 1}, "age": 3}
        });
        let merged = engine.merge(json!({}), &payload, Some(&guard)).unwrap();
        assert_eq!(merged, json!({"name": "ok", "profile": {"age": 3}}));
        assert_eq!(engine.ancestor().snapshot().unwrap(), SharedAncestor::new().snapshot().unwrap());
    }

    #[test]
    fn top_level_only_guard_misses_nested_chain() {
        let engine = engine();
        let guard = KeyPathGuard::new(DangerousSegmentSet::canonical(), GuardScope::TopLevelOnly);
        let payload = json!({"wrapper": {"__proto__": {"isHacked": "yes"}}});
        engine.merge(json!({}), &payload, Some(&guard)).unwrap();
        assert_eq!(
            engine.ancestor().fresh_record().get("isHacked").unwrap(),
            Some(json!("yes"))
        );
    }

    #[test]
    fn accessor_only_guard_misses_constructor_chain() {
        let engine = engine();
        let guard = KeyPathGuard::new(DangerousSegmentSet::accessor_only(), GuardScope::AllDepths);
        let payload = json!({"constructor": {"prototype": {"isAdmin": true}}});
        engine.merge(json!({}), &payload, Some(&guard)).unwrap();
        assert_eq!(engine.ancestor().fresh_record().get("isAdmin").unwrap(), Some(json!(true)));
    }

    // -----------------------------------------------------------------------
    // mergeWith
    // -----------------------------------------------------------------------

    #[test]
    fn merge_with_concatenates_arrays() {
        let engine = engine();
        let merged = engine
            .merge_with(json!({"tags": ["a"]}), &json!({"tags": ["b"]}), &ConcatArrays, None)
            .unwrap();
        assert_eq!(merged, json!({"tags": ["a", "b"]}));
    }

    #[test]
    fn merge_with_falls_back_to_merge_rule() {
        let engine = engine();
        let merged = engine
            .merge_with(
                json!({"cfg": {"tags": [1], "x": 1}}),
                &json!({"cfg": {"tags": [2], "x": 2}, "new": "v"}),
                &ConcatArrays,
                None,
            )
            .unwrap();
        assert_eq!(merged, json!({"cfg": {"tags": [1, 2], "x": 2}, "new": "v"}));
    }

    #[test]
    fn merge_with_customizer_sees_key_and_stops_descent() {
        let engine = engine();
        let freeze_config = |_t: Option<&JsonValue>, s: &JsonValue, k: &str| {
            (k == "config").then(|| s.clone())
        };
        let merged = engine
            .merge_with(
                json!({"config": {"a": 1}}),
                &json!({"config": {"b": 2}}),
                &freeze_config,
                None,
            )
            .unwrap();
        assert_eq!(merged, json!({"config": {"b": 2}}));
    }

    #[test]
    fn merge_with_still_contaminates_without_guard() {
        let engine = engine();
        let payload = json!({"constructor": {"prototype": {"isHacked": "yes"}}});
        engine.merge_with(json!({}), &payload, &ConcatArrays, None).unwrap();
        assert_eq!(engine.ancestor().fresh_record().get("isHacked").unwrap(), Some(json!("yes")));
        assert_eq!(
            engine.ancestor().source_of(Holder::Prototype, "isHacked").unwrap(),
            ContaminationSource::MergeWith
        );
    }

    // -----------------------------------------------------------------------
    // defaultsDeep
    // -----------------------------------------------------------------------

    #[test]
    fn defaults_never_overwrite_defined_values() {
        let engine = engine();
        let target = json!({"a": 0, "b": false, "c": "", "d": {"x": 1}});
        let source = json!({"a": 5, "b": true, "c": "filled", "d": {"x": 2, "y": 3}, "e": [1]});
        let merged = engine.defaults_deep(target, &source, None).unwrap();
        assert_eq!(merged, json!({"a": 0, "b": false, "c": "", "d": {"x": 1, "y": 3}, "e": [1]}));
    }

    #[test]
    fn defaults_fill_null() {
        let engine = engine();
        let merged = engine
            .defaults_deep(json!({"a": null, "b": null}), &json!({"a": 1, "b": {"c": 2}}), None)
            .unwrap();
        assert_eq!(merged, json!({"a": 1, "b": {"c": 2}}));
    }

    #[test]
    fn defaults_do_not_descend_into_scalar_target() {
        let engine = engine();
        let merged = engine
            .defaults_deep(json!({"a": 1}), &json!({"a": {"b": 2}}), None)
            .unwrap();
        assert_eq!(merged, json!({"a": 1}));
    }

    #[test]
    fn defaults_deep_canonical_contamination() {
        let engine = engine();
        let payload = json!({"constructor": {"prototype": {"isAdmin": true}}});
        let merged = engine.defaults_deep(json!({}), &payload, None).unwrap();
        assert_eq!(merged, json!({}));
        assert_eq!(engine.ancestor().fresh_record().get("isAdmin").unwrap(), Some(json!(true)));
    }

    #[test]
    fn defaults_deep_guarded_leaves_ancestor_clean() {
        let engine = engine();
        let guard = KeyPathGuard::default();
        let payload = json!({"constructor": {"prototype": {"isAdmin": true}}});
        engine.defaults_deep(json!({}), &payload, Some(&guard)).unwrap();
        assert_eq!(engine.ancestor().fresh_record().get("isAdmin").unwrap(), None);
    }

    #[test]
    fn defaults_do_not_replace_existing_ancestor_attribute() {
        let ancestor = SharedAncestor::new();
        ancestor.define(Holder::Prototype, "isAdmin", json!(false)).unwrap();
        let engine = DeepMergeEngine::new(ancestor.clone(), MergeConfig::default());
        let payload = json!({"__proto__": {"isAdmin": true}});
        engine.defaults_deep(json!({}), &payload, None).unwrap();
        assert_eq!(ancestor.get(Holder::Prototype, "isAdmin").unwrap(), Some(json!(false)));
    }

    // -----------------------------------------------------------------------
    // mixinDeep and ancestor targets
    // -----------------------------------------------------------------------

    #[test]
    fn mixin_assigns_records_verbatim_when_target_lacks_one() {
        let engine = engine();
        let merged = engine
            .mixin_deep(json!({"a": 1}), &json!({"a": {"b": {"c": 1}}, "d": {"e": 2}}), None)
            .unwrap();
        assert_eq!(merged, json!({"a": {"b": {"c": 1}}, "d": {"e": 2}}));
    }

    #[test]
    fn mixin_verbatim_assignment_keeps_nested_accessor_as_data() {
        let engine = engine();
        let payload = json!({"wrapper": {"__proto__": {"isVulnerable": "mixin-deep"}}});
        let merged = engine.mixin_deep(json!({}), &payload, None).unwrap();
        assert_eq!(merged, payload);
        assert_eq!(engine.ancestor().fresh_record().get("isVulnerable").unwrap(), None);
    }

    #[test]
    fn mixin_follows_accessor() {
        let engine = engine();
        engine
            .mixin_deep(json!({}), &json!({"__proto__": {"isVulnerable": "mixin-deep"}}), None)
            .unwrap();
        assert_eq!(
            engine.ancestor().fresh_record().get("isVulnerable").unwrap(),
            Some(json!("mixin-deep"))
        );
        assert_eq!(
            engine.ancestor().source_of(Holder::Prototype, "isVulnerable").unwrap(),
            ContaminationSource::ThirdPartyUtility
        );
    }

    #[test]
    fn ancestor_target_is_contaminated_even_when_guarded() {
        let engine = engine();
        let guard = KeyPathGuard::default();
        let result = engine
            .apply(
                MergeStrategy::ThirdPartyUtility,
                MergeTarget::Ancestor,
                &json!({"isVulnerable": "mixin-deep"}),
                Some(&guard),
            )
            .unwrap();
        assert_eq!(result["isVulnerable"], json!("mixin-deep"));
        assert_eq!(
            engine.ancestor().fresh_record().get("isVulnerable").unwrap(),
            Some(json!("mixin-deep"))
        );
    }

    #[test]
    fn apply_merge_with_uses_concat() {
        let engine = engine();
        let merged = engine
            .apply(
                MergeStrategy::MergeWith,
                MergeTarget::Record(json!({"tags": ["a"]})),
                &json!({"tags": ["b"]}),
                None,
            )
            .unwrap();
        assert_eq!(merged, json!({"tags": ["a", "b"]}));
    }

    #[test]
    fn apply_with_fresh_target() {
        let engine = engine();
        let merged = engine
            .apply(MergeStrategy::Merge, MergeTarget::fresh(), &json!({"a": 1}), None)
            .unwrap();
        assert_eq!(merged, json!({"a": 1}));
    }

    // -----------------------------------------------------------------------
    // Depth bound
    // -----------------------------------------------------------------------

    #[test]
    fn depth_within_bound_succeeds() {
        let engine = DeepMergeEngine::new(SharedAncestor::new(), MergeConfig::with_max_depth(8));
        // Nine nested records: the innermost sits at depth 8.
        let merged = engine.merge(json!({}), &nested(9), None).unwrap();
        assert_eq!(merged, nested(9));
    }

    #[test]
    fn depth_exceeded_for_every_strategy_and_guard_setting() {
        let engine = DeepMergeEngine::new(SharedAncestor::new(), MergeConfig::with_max_depth(8));
        let guard = KeyPathGuard::default();
        let payload = nested(10);
        for strategy in MergeStrategy::ALL {
            for policy in [None, Some(&guard as &dyn SegmentPolicy)] {
                let err = engine
                    .apply(strategy, MergeTarget::fresh(), &payload, policy)
                    .unwrap_err();
                match err {
                    MergeError::DepthExceeded { max_depth, path } => {
                        assert_eq!(max_depth, 8);
                        // mixin assigns the whole chain verbatim at `n`.
                        let expected = if strategy == MergeStrategy::ThirdPartyUtility { 1 } else { 9 };
                        assert_eq!(path.len(), expected, "{strategy}");
                    }
                    other => panic!("expected DepthExceeded, got {other:?}"),
                }
            }
        }
    }

    /// Drop a deep chain one level at a time.
    fn unwind(mut value: JsonValue) {
        while let JsonValue::Object(mut map) = value {
            value = map.remove("n").unwrap_or(JsonValue::Null);
        }
    }

    #[test]
    fn default_bound_is_reachable_for_every_strategy() {
        let engine = engine();
        // Innermost record sits exactly at the default bound.
        let payload = nested(DEFAULT_MAX_DEPTH + 1);
        for strategy in MergeStrategy::ALL {
            let merged = engine.apply(strategy, MergeTarget::fresh(), &payload, None).unwrap();
            assert_eq!(nesting_depth(&merged), DEFAULT_MAX_DEPTH + 1, "{strategy}");
            unwind(merged);
        }
        unwind(payload);
    }

    #[test]
    fn one_past_default_bound_fails_for_every_strategy() {
        let engine = engine();
        let guard = KeyPathGuard::default();
        let payload = nested(DEFAULT_MAX_DEPTH + 2);
        for strategy in MergeStrategy::ALL {
            for policy in [None, Some(&guard as &dyn SegmentPolicy)] {
                let err = engine
                    .apply(strategy, MergeTarget::fresh(), &payload, policy)
                    .unwrap_err();
                assert!(
                    matches!(err, MergeError::DepthExceeded { max_depth: DEFAULT_MAX_DEPTH, .. }),
                    "{strategy}"
                );
            }
        }
        unwind(payload);
    }

    #[test]
    fn traversal_does_not_grow_the_call_stack() {
        let engine = DeepMergeEngine::new(SharedAncestor::new(), MergeConfig::with_max_depth(20_000));
        let payload = nested(10_000);
        for strategy in [MergeStrategy::Merge, MergeStrategy::DefaultsDeep] {
            let merged = engine.apply(strategy, MergeTarget::fresh(), &payload, None).unwrap();
            assert_eq!(nesting_depth(&merged), 10_000);
            unwind(merged);
        }
        unwind(payload);
    }

    #[test]
    fn deep_merge_into_existing_chain_keeps_target_values() {
        let engine = DeepMergeEngine::new(SharedAncestor::new(), MergeConfig::with_max_depth(4));
        let target = json!({"n": {"n": {"keep": 1}}});
        let merged = engine.merge(target, &nested(3), None).unwrap();
        assert_eq!(merged, json!({"n": {"n": {"keep": 1, "leaf": true}}}));
    }

    #[test]
    fn depth_bound_applies_to_verbatim_arrays() {
        let engine = DeepMergeEngine::new(SharedAncestor::new(), MergeConfig::with_max_depth(3));
        let payload = json!({"a": [[[[[1]]]]]});
        let err = engine.merge(json!({}), &payload, None).unwrap_err();
        assert!(matches!(err, MergeError::DepthExceeded { .. }));
    }

    #[test]
    fn depth_error_message_names_path() {
        let engine = DeepMergeEngine::new(SharedAncestor::new(), MergeConfig::with_max_depth(1));
        let err = engine
            .merge(json!({}), &json!({"a": {"b": {"c": 1}}}), None)
            .unwrap_err();
        assert_eq!(err.to_string(), "merge depth exceeded: limit 1 reached at 'a.b'");
    }
}
