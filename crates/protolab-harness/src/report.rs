use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use protolab_types::{ContaminationRecord, JsonValue, KeyPath, MergeStrategy};

use crate::harness::AncestorMode;
use crate::scenario::ScenarioTarget;

/// How a scenario run turned out.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    /// The scenario's expected attribute showed up on a fresh record.
    Reproduced,
    /// The ancestor changed, but not (only) in the expected way.
    Contaminated,
    /// The ancestor is unchanged.
    Clean,
    /// The engine reported an error. Contamination was still checked.
    EngineFailure,
}

impl Verdict {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Reproduced => "REPRODUCED",
            Self::Contaminated => "CONTAMINATED",
            Self::Clean => "CLEAN",
            Self::EngineFailure => "ENGINE_FAILURE",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable outcome of one scenario run.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioResult {
    pub name: String,
    pub payload: JsonValue,
    pub strategy_used: MergeStrategy,
    pub guard_enabled: bool,
    pub target: ScenarioTarget,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advisory: Option<String>,
    pub contamination_detected: bool,
    pub records: Vec<ContaminationRecord>,
    /// Watched attributes a fresh record exposed after the payload.
    pub watched: BTreeMap<String, JsonValue>,
    /// Paths in the payload a guard would block.
    pub dangerous_paths: Vec<KeyPath>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merged: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub verdict: Verdict,
    pub elapsed_ms: u64,
}

/// Verdict counts across a battery run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatterySummary {
    pub total: usize,
    pub reproduced: usize,
    pub contaminated: usize,
    pub clean: usize,
    pub engine_failures: usize,
}

impl BatterySummary {
    pub fn tally(results: &[ScenarioResult]) -> Self {
        let mut summary = Self {
            total: results.len(),
            ..Self::default()
        };
        for result in results {
            match result.verdict {
                Verdict::Reproduced => summary.reproduced += 1,
                Verdict::Contaminated => summary.contaminated += 1,
                Verdict::Clean => summary.clean += 1,
                Verdict::EngineFailure => summary.engine_failures += 1,
            }
        }
        summary
    }
}

/// Results of one battery run.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatteryReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub ancestor_mode: AncestorMode,
    pub results: Vec<ScenarioResult>,
    pub summary: BatterySummary,
}

impl BatteryReport {
    pub fn new(ancestor_mode: AncestorMode, started_at: DateTime<Utc>, results: Vec<ScenarioResult>) -> Self {
        Self {
            run_id: Uuid::now_v7(),
            started_at,
            ancestor_mode,
            summary: BatterySummary::tally(&results),
            results,
        }
    }

    /// Results of guarded runs that still left contamination behind.
    pub fn guard_escapes(&self) -> impl Iterator<Item = &ScenarioResult> {
        self.results
            .iter()
            .filter(|r| r.guard_enabled && r.contamination_detected)
    }
}
