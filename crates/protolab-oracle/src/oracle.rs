use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, info};

use protolab_ancestor::{AncestorSnapshot, SharedAncestor};
use protolab_types::{ContaminationRecord, Holder, JsonValue};

use crate::config::OracleConfig;
use crate::error::{OracleError, OracleResult};
use crate::holder_diff::{diff_records, diff_snapshots, HolderChange, HolderDiff};

/// Watched attributes a fresh record exposes through the ancestor chain.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeReport {
    /// `true` if any watched attribute is reachable.
    pub detected: bool,
    /// Every exposed watched attribute and the value a lookup yields.
    pub exposed: BTreeMap<String, JsonValue>,
}

impl ProbeReport {
    pub fn get(&self, name: &str) -> Option<&JsonValue> {
        self.exposed.get(name)
    }
}

/// Detects attributes on the shared holders that were not there at baseline.
#[derive(Clone, Debug)]
pub struct ContaminationOracle {
    ancestor: SharedAncestor,
    baseline: Option<AncestorSnapshot>,
    config: OracleConfig,
}

impl ContaminationOracle {
    pub fn new(ancestor: SharedAncestor, config: OracleConfig) -> Self {
        Self {
            ancestor,
            baseline: None,
            config,
        }
    }

    /// An oracle observing `ancestor` that shares this one's baseline and
    /// watch list. Used for forked ancestors.
    pub fn scoped_to(&self, ancestor: SharedAncestor) -> Self {
        Self {
            ancestor,
            baseline: self.baseline.clone(),
            config: self.config.clone(),
        }
    }

    pub fn ancestor(&self) -> &SharedAncestor {
        &self.ancestor
    }

    pub fn config(&self) -> &OracleConfig {
        &self.config
    }

    pub fn watched(&self) -> &[String] {
        &self.config.watched
    }

    pub fn has_baseline(&self) -> bool {
        self.baseline.is_some()
    }

    /// Capture the known-clean state.
    ///
    /// Only the first call snapshots the ancestor; later calls return the
    /// stored baseline so a contaminated ancestor can never become the
    /// reference.
    pub fn baseline(&mut self) -> OracleResult<AncestorSnapshot> {
        if let Some(existing) = &self.baseline {
            debug!("baseline already captured");
            return Ok(existing.clone());
        }
        let snapshot = self.ancestor.snapshot()?;
        info!(attributes = snapshot.len(), "captured ancestor baseline");
        self.baseline = Some(snapshot.clone());
        Ok(snapshot)
    }

    fn require_baseline(&self) -> OracleResult<&AncestorSnapshot> {
        self.baseline.as_ref().ok_or(OracleError::InconsistentBaseline)
    }

    /// Full per-holder diff against the baseline, removals included.
    pub fn changes(&self) -> OracleResult<Vec<HolderDiff>> {
        let baseline = self.require_baseline()?;
        let current = self.ancestor.snapshot()?;
        Ok(diff_snapshots(baseline, &current))
    }

    /// Every attribute added to, or changed on, a holder since baseline.
    pub fn diff(&self) -> OracleResult<Vec<ContaminationRecord>> {
        let mut records = Vec::new();
        for holder_diff in self.changes()? {
            let holder = holder_diff.holder;
            for change in holder_diff.changes {
                let (key, value, previous) = match change {
                    HolderChange::Added { key, value } => (key, value, None),
                    HolderChange::Modified { key, old, new } => (key, new, Some(old)),
                    HolderChange::Removed { .. } => continue,
                };
                let source = self.ancestor.source_of(holder, &key)?;
                records.push(ContaminationRecord {
                    key,
                    value,
                    source,
                    holder,
                    previous,
                });
            }
        }
        Ok(records)
    }

    /// Restore both holders to the baseline.
    ///
    /// Added attributes are deleted, changed and deleted ones get their
    /// baseline value back. Returns the number of attributes touched; a
    /// second call in a row returns 0.
    pub fn reset(&self) -> OracleResult<usize> {
        let baseline = self.require_baseline()?;
        let mut writer = self.ancestor.writer()?;
        let mut restored = 0;

        for holder in Holder::ALL {
            let diff = diff_records(holder, baseline.record(holder), writer.record(holder));
            for change in diff.changes {
                match change {
                    HolderChange::Added { key, .. } => {
                        writer.remove(holder, &key);
                    }
                    HolderChange::Modified { key, old, .. } => writer.restore(holder, &key, old),
                    HolderChange::Removed { key, value } => writer.restore(holder, &key, value),
                }
                restored += 1;
            }
        }

        if restored > 0 {
            info!(restored, "reset shared ancestor to baseline");
        }
        Ok(restored)
    }

    /// Look up every watched name on a throwaway fresh record.
    pub fn probe(&self) -> OracleResult<ProbeReport> {
        let fresh = self.ancestor.fresh_record();
        let mut exposed = BTreeMap::new();
        for name in &self.config.watched {
            if let Some(value) = fresh.get(name)? {
                exposed.insert(name.clone(), value);
            }
        }
        Ok(ProbeReport {
            detected: !exposed.is_empty(),
            exposed,
        })
    }

    /// The value a fresh record yields for `name`, if any.
    pub fn inherited(&self, name: &str) -> OracleResult<Option<JsonValue>> {
        Ok(self.ancestor.fresh_record().get(name)?)
    }
}
