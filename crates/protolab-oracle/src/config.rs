use serde::{Deserialize, Serialize};

/// Attribute names attackers typically plant.
pub const DEFAULT_WATCHED: [&str; 4] = ["isAdmin", "polluted", "isHacked", "isVulnerable"];

/// Configuration for the contamination oracle.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    /// Names `probe()` looks up on a fresh record.
    pub watched: Vec<String>,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            watched: DEFAULT_WATCHED.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl OracleConfig {
    pub fn watching<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            watched: names.into_iter().map(Into::into).collect(),
        }
    }
}
