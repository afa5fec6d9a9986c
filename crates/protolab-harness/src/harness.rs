use std::time::Instant;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use protolab_ancestor::SharedAncestor;
use protolab_guard::{GuardConfig, KeyPathGuard, SegmentPolicy};
use protolab_merge::{DeepMergeEngine, MergeConfig, MergeResult, MergeTarget};
use protolab_oracle::{ContaminationOracle, OracleConfig, ProbeReport};
use protolab_types::{ContaminationRecord, JsonValue, MergeStrategy};

use crate::error::{HarnessError, HarnessResult};
use crate::lifecycle::{Lifecycle, Phase};
use crate::report::{BatteryReport, ScenarioResult, Verdict};
use crate::scenario::{self, Scenario, ScenarioTarget};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Whether runs share the process-wide ancestor or get their own fork.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AncestorMode {
    /// Every run and submission writes to the one shared ancestor; their
    /// contamination is visible to each other until reset.
    #[default]
    Shared,
    /// Every run and submission gets a copy-on-write fork that is discarded
    /// afterwards.
    Scoped,
}

impl AncestorMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Shared => "shared",
            Self::Scoped => "scoped",
        }
    }
}

/// Which side of the comparison a battery run is on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GuardPass {
    Unguarded,
    Guarded,
}

impl GuardPass {
    pub const BOTH: [GuardPass; 2] = [GuardPass::Unguarded, GuardPass::Guarded];

    pub fn is_guarded(self) -> bool {
        matches!(self, Self::Guarded)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    pub merge: MergeConfig,
    /// Segments and scope of the guard used by guarded passes. `enabled`
    /// decides whether ad-hoc submissions are guarded.
    pub guard: GuardConfig,
    pub oracle: OracleConfig,
    pub mode: AncestorMode,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            merge: MergeConfig::default(),
            guard: GuardConfig::absent(),
            oracle: OracleConfig::default(),
            mode: AncestorMode::Shared,
        }
    }
}

// ---------------------------------------------------------------------------
// Submission
// ---------------------------------------------------------------------------

/// Outcome of an ad-hoc payload applied without cleanup.
#[derive(Clone, Debug)]
pub struct Submission {
    pub strategy: MergeStrategy,
    pub guard_enabled: bool,
    pub outcome: MergeResult<JsonValue>,
    pub records: Vec<ContaminationRecord>,
    pub probe: ProbeReport,
}

impl Submission {
    pub fn contamination_detected(&self) -> bool {
        !self.records.is_empty() || self.probe.detected
    }
}

// ---------------------------------------------------------------------------
// Cleanup
// ---------------------------------------------------------------------------

/// Resets the oracle's ancestor when dropped unless finished explicitly.
struct Cleanup<'a> {
    oracle: &'a ContaminationOracle,
    armed: bool,
}

impl<'a> Cleanup<'a> {
    fn arm(oracle: &'a ContaminationOracle) -> Self {
        Self {
            oracle,
            armed: true,
        }
    }

    fn finish(mut self) -> HarnessResult<usize> {
        self.armed = false;
        Ok(self.oracle.reset()?)
    }
}

impl Drop for Cleanup<'_> {
    fn drop(&mut self) {
        if self.armed {
            if let Err(err) = self.oracle.reset() {
                warn!(%err, "cleanup after aborted scenario failed");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// ScenarioHarness
// ---------------------------------------------------------------------------

/// Runs payloads through the merge engine and reports what reached the
/// shared ancestor.
///
/// Battery and ad-hoc runs follow the full lifecycle and always end with a
/// reset. [`ScenarioHarness::submit`] skips the reset.
pub struct ScenarioHarness {
    oracle: ContaminationOracle,
    config: HarnessConfig,
    patched: KeyPathGuard,
    lifecycle: Lifecycle,
}

impl ScenarioHarness {
    /// Create a harness over `ancestor` and capture its baseline.
    pub fn new(ancestor: SharedAncestor, config: HarnessConfig) -> HarnessResult<Self> {
        let mut oracle = ContaminationOracle::new(ancestor, config.oracle.clone());
        oracle.baseline()?;
        let patched = KeyPathGuard::new(config.guard.segments.clone(), config.guard.scope);
        info!(
            mode = config.mode.as_str(),
            guard = config.guard.enabled,
            max_depth = config.merge.max_depth,
            "scenario harness ready"
        );
        Ok(Self {
            oracle,
            config,
            patched,
            lifecycle: Lifecycle::new(),
        })
    }

    pub fn ancestor(&self) -> &SharedAncestor {
        self.oracle.ancestor()
    }

    pub fn oracle(&self) -> &ContaminationOracle {
        &self.oracle
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn mode(&self) -> AncestorMode {
        self.config.mode
    }

    pub fn phase(&self) -> Phase {
        self.lifecycle.phase()
    }

    /// The oracle a run should observe: the shared one, or one bound to a
    /// fresh fork.
    fn workspace(&self) -> HarnessResult<ContaminationOracle> {
        match self.config.mode {
            AncestorMode::Shared => Ok(self.oracle.clone()),
            AncestorMode::Scoped => Ok(self.oracle.scoped_to(self.ancestor().fork()?)),
        }
    }

    fn engine(&self, oracle: &ContaminationOracle) -> DeepMergeEngine {
        DeepMergeEngine::new(oracle.ancestor().clone(), self.config.merge.clone())
    }

    /// Run one scenario through the full lifecycle.
    pub fn run(&mut self, scenario: &Scenario, pass: GuardPass) -> HarnessResult<ScenarioResult> {
        let oracle = self.workspace()?;
        let cleanup = Cleanup::arm(&oracle);

        let outcome = self
            .execute(&oracle, scenario, pass)
            .and_then(|result| Ok((result, cleanup.finish()?)));

        match outcome {
            Ok((result, restored)) => {
                self.lifecycle.advance(Phase::Cleaned)?;
                debug!(scenario = %scenario.name, restored, "ancestor restored");
                self.lifecycle.advance(Phase::Init)?;
                Ok(result)
            }
            Err(err) => {
                self.lifecycle.abort();
                Err(err)
            }
        }
    }

    fn execute(
        &mut self,
        oracle: &ContaminationOracle,
        scenario: &Scenario,
        pass: GuardPass,
    ) -> HarnessResult<ScenarioResult> {
        let started = Instant::now();

        let dirty = oracle.diff()?;
        if !dirty.is_empty() {
            warn!(scenario = %scenario.name, attributes = dirty.len(), "dirty baseline, resetting before run");
            oracle.reset()?;
        }
        self.lifecycle.advance(Phase::BaselineVerified)?;

        let guard = pass.is_guarded().then_some(&self.patched);
        let target = match scenario.target {
            ScenarioTarget::Fresh => MergeTarget::fresh(),
            ScenarioTarget::Ancestor => MergeTarget::Ancestor,
        };
        let outcome = self.engine(oracle).apply(
            scenario.strategy,
            target,
            &scenario.payload,
            guard.map(|g| g as &dyn SegmentPolicy),
        );
        self.lifecycle.advance(Phase::PayloadApplied)?;

        let records = oracle.diff()?;
        let probe = oracle.probe()?;
        let expectation_met = match &scenario.expectation {
            Some(expected) => oracle.inherited(&expected.attribute)?.as_ref() == Some(&expected.value),
            None => false,
        };
        self.lifecycle.advance(Phase::ContaminationChecked)?;

        let contamination_detected = !records.is_empty() || probe.detected;
        let verdict = match &outcome {
            Err(_) => Verdict::EngineFailure,
            Ok(_) if expectation_met => Verdict::Reproduced,
            Ok(_) if contamination_detected => Verdict::Contaminated,
            Ok(_) => Verdict::Clean,
        };
        let (merged, error) = match outcome {
            Ok(value) => (Some(value), None),
            Err(err) => (None, Some(err.to_string())),
        };

        let result = ScenarioResult {
            name: scenario.name.clone(),
            payload: scenario.payload.clone(),
            strategy_used: scenario.strategy,
            guard_enabled: pass.is_guarded(),
            target: scenario.target,
            advisory: scenario.advisory.clone(),
            contamination_detected,
            records,
            watched: probe.exposed,
            dangerous_paths: self.patched.scan(&scenario.payload),
            merged,
            error,
            verdict,
            elapsed_ms: started.elapsed().as_millis() as u64,
        };
        info!(
            scenario = %result.name,
            guarded = result.guard_enabled,
            %verdict,
            records = result.records.len(),
            "scenario complete"
        );
        self.lifecycle.advance(Phase::Reported)?;
        Ok(result)
    }

    /// Run every battery scenario once per requested pass.
    pub fn run_battery(&mut self, passes: &[GuardPass]) -> HarnessResult<BatteryReport> {
        let started_at = Utc::now();
        let mut results = Vec::new();
        for scenario in scenario::battery() {
            for &pass in passes {
                results.push(self.run(&scenario, pass)?);
            }
        }

        let report = BatteryReport::new(self.config.mode, started_at, results);
        info!(
            run_id = %report.run_id,
            total = report.summary.total,
            reproduced = report.summary.reproduced,
            clean = report.summary.clean,
            "battery complete"
        );
        Ok(report)
    }

    /// Run the battery scenario called `name`.
    pub fn run_named(&mut self, name: &str, pass: GuardPass) -> HarnessResult<ScenarioResult> {
        let scenario =
            scenario::find(name).ok_or_else(|| HarnessError::UnknownScenario(name.to_string()))?;
        self.run(&scenario, pass)
    }

    /// Run an arbitrary payload through the full lifecycle.
    pub fn run_adhoc(
        &mut self,
        strategy: MergeStrategy,
        target: ScenarioTarget,
        payload: JsonValue,
        pass: GuardPass,
    ) -> HarnessResult<ScenarioResult> {
        let scenario = Scenario::adhoc(strategy, payload).with_target(target);
        self.run(&scenario, pass)
    }

    /// Apply a payload from the external boundary.
    ///
    /// Nothing is reset afterwards: in shared mode the contamination stays
    /// visible to every later caller until [`ScenarioHarness::reset`].
    /// Engine errors are reported in the submission, not returned.
    pub fn submit(&self, strategy: MergeStrategy, payload: &JsonValue) -> HarnessResult<Submission> {
        let oracle = self.workspace()?;
        let guard_enabled = self.config.guard.enabled;
        let guard = guard_enabled.then_some(&self.patched);

        let outcome = self.engine(&oracle).apply(
            strategy,
            MergeTarget::fresh(),
            payload,
            guard.map(|g| g as &dyn SegmentPolicy),
        );
        if let Err(err) = &outcome {
            warn!(%strategy, %err, "submission rejected by engine");
        }

        let records = oracle.diff()?;
        let probe = oracle.probe()?;
        if !records.is_empty() {
            warn!(%strategy, attributes = records.len(), mode = self.config.mode.as_str(), "submission contaminated ancestor");
        }

        Ok(Submission {
            strategy,
            guard_enabled,
            outcome,
            records,
            probe,
        })
    }

    /// Probe the shared ancestor.
    pub fn status(&self) -> HarnessResult<ProbeReport> {
        Ok(self.oracle.probe()?)
    }

    /// Contamination currently on the shared ancestor.
    pub fn contamination(&self) -> HarnessResult<Vec<ContaminationRecord>> {
        Ok(self.oracle.diff()?)
    }

    /// Restore the shared ancestor to its baseline.
    pub fn reset(&self) -> HarnessResult<usize> {
        Ok(self.oracle.reset()?)
    }
}
