use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{HarnessError, HarnessResult};

/// Where a scenario run currently stands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    Init,
    BaselineVerified,
    PayloadApplied,
    ContaminationChecked,
    Reported,
    Cleaned,
}

impl Phase {
    /// The only phase this one may advance to.
    pub fn next(self) -> Phase {
        match self {
            Self::Init => Self::BaselineVerified,
            Self::BaselineVerified => Self::PayloadApplied,
            Self::PayloadApplied => Self::ContaminationChecked,
            Self::ContaminationChecked => Self::Reported,
            Self::Reported => Self::Cleaned,
            Self::Cleaned => Self::Init,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Init => "INIT",
            Self::BaselineVerified => "BASELINE_VERIFIED",
            Self::PayloadApplied => "PAYLOAD_APPLIED",
            Self::ContaminationChecked => "CONTAMINATION_CHECKED",
            Self::Reported => "REPORTED",
            Self::Cleaned => "CLEANED",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-scenario state machine.
///
/// INIT -> BASELINE_VERIFIED -> PAYLOAD_APPLIED -> CONTAMINATION_CHECKED
/// -> REPORTED -> CLEANED, and CLEANED loops back to INIT.
#[derive(Clone, Debug)]
pub struct Lifecycle {
    phase: Phase,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self { phase: Phase::Init }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Move to `to`, which must be the successor of the current phase.
    pub fn advance(&mut self, to: Phase) -> HarnessResult<()> {
        let from = self.phase;
        if from.next() != to {
            return Err(HarnessError::InvalidTransition { from, to });
        }
        debug!(%from, %to, "scenario phase");
        self.phase = to;
        Ok(())
    }

    /// Return to INIT after a run was abandoned part way.
    pub fn abort(&mut self) {
        if self.phase != Phase::Init {
            debug!(from = %self.phase, "scenario aborted");
            self.phase = Phase::Init;
        }
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}
