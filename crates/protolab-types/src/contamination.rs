use std::fmt;

use serde::{Deserialize, Serialize};

use crate::json::JsonValue;
use crate::strategy::MergeStrategy;

/// One of the two well-known shared records every ordinary record can reach.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Holder {
    /// The shared ancestor proper: consulted for every attribute a record
    /// does not own.
    Prototype,
    /// The constructor record, whose `prototype` attribute is the shared
    /// ancestor.
    Constructor,
}

impl Holder {
    pub const ALL: [Holder; 2] = [Holder::Prototype, Holder::Constructor];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Prototype => "prototype",
            Self::Constructor => "constructor",
        }
    }
}

impl fmt::Display for Holder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which operation wrote a contaminating attribute.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContaminationSource {
    Merge,
    MergeWith,
    DefaultsDeep,
    ThirdPartyUtility,
    /// Written directly through the ancestor API rather than by a merge.
    Unattributed,
}

impl From<MergeStrategy> for ContaminationSource {
    fn from(strategy: MergeStrategy) -> Self {
        match strategy {
            MergeStrategy::Merge => Self::Merge,
            MergeStrategy::MergeWith => Self::MergeWith,
            MergeStrategy::DefaultsDeep => Self::DefaultsDeep,
            MergeStrategy::ThirdPartyUtility => Self::ThirdPartyUtility,
        }
    }
}

/// An attribute present on a shared holder that differs from the baseline.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContaminationRecord {
    pub key: String,
    pub value: JsonValue,
    pub source: ContaminationSource,
    pub holder: Holder,
    /// The baseline value when an existing attribute was overwritten.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous: Option<JsonValue>,
}

impl ContaminationRecord {
    /// Returns `true` when the attribute did not exist at baseline.
    pub fn is_addition(&self) -> bool {
        self.previous.is_none()
    }
}
