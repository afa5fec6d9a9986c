//! Scenario harness for protolab.
//!
//! Drives payloads through the merge engine under a per-scenario lifecycle
//! (INIT -> BASELINE_VERIFIED -> PAYLOAD_APPLIED -> CONTAMINATION_CHECKED ->
//! REPORTED -> CLEANED) and reports what reached the shared ancestor. Every
//! battery run ends with a reset, engine failures included, so scenarios
//! never observe each other.
//!
//! # Key Types
//!
//! - [`ScenarioHarness`] -- Runs scenarios, the battery, and boundary submissions
//! - [`Scenario`] / [`battery`] -- The canonical exploit payloads
//! - [`ScenarioResult`] / [`BatteryReport`] -- Immutable run outcomes
//! - [`AncestorMode`] -- Shared (vulnerable) or scoped (isolated) ancestor

pub mod error;
pub mod harness;
pub mod lifecycle;
pub mod report;
pub mod scenario;

pub use error::{HarnessError, HarnessResult};
pub use harness::{AncestorMode, GuardPass, HarnessConfig, ScenarioHarness, Submission};
pub use lifecycle::{Lifecycle, Phase};
pub use report::{BatteryReport, BatterySummary, ScenarioResult, Verdict};
pub use scenario::{battery, find, Expectation, Scenario, ScenarioTarget};
