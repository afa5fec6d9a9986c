use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The recursive merge variant being exercised.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MergeStrategy {
    /// Plain deep merge; source wins on conflicts.
    Merge,
    /// Deep merge with a per-key customizer consulted first.
    MergeWith,
    /// Deep merge that only fills absent or unset target attributes.
    DefaultsDeep,
    /// Mixin-style deep merge as done by transitive third-party utilities.
    ThirdPartyUtility,
}

impl MergeStrategy {
    pub const ALL: [MergeStrategy; 4] = [
        Self::Merge,
        Self::MergeWith,
        Self::DefaultsDeep,
        Self::ThirdPartyUtility,
    ];

    /// The short kebab-case name used by the CLI and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Merge => "merge",
            Self::MergeWith => "merge-with",
            Self::DefaultsDeep => "defaults-deep",
            Self::ThirdPartyUtility => "mixin",
        }
    }
}

impl fmt::Display for MergeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a strategy name is not recognised.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown merge strategy '{0}'")]
pub struct ParseStrategyError(pub String);

impl FromStr for MergeStrategy {
    type Err = ParseStrategyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "merge" => Ok(Self::Merge),
            "merge-with" | "mergewith" => Ok(Self::MergeWith),
            "defaults-deep" | "defaultsdeep" => Ok(Self::DefaultsDeep),
            "mixin" | "mixin-deep" | "third-party-utility" => Ok(Self::ThirdPartyUtility),
            _ => Err(ParseStrategyError(s.to_string())),
        }
    }
}
