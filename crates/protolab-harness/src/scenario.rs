use serde::{Deserialize, Serialize};
use serde_json::json;

use protolab_types::{JsonValue, MergeStrategy};

/// What the scenario's payload is merged into.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScenarioTarget {
    /// A fresh empty record; the payload reaches the ancestor only through
    /// accessor keys.
    Fresh,
    /// The prototype record itself.
    Ancestor,
}

/// An attribute a fresh record should expose after a successful attack.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Expectation {
    pub attribute: String,
    pub value: JsonValue,
}

impl Expectation {
    pub fn new(attribute: impl Into<String>, value: JsonValue) -> Self {
        Self {
            attribute: attribute.into(),
            value,
        }
    }
}

/// A named payload run through one merge strategy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    pub name: String,
    pub strategy: MergeStrategy,
    pub target: ScenarioTarget,
    pub payload: JsonValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub advisory: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expectation: Option<Expectation>,
}

impl Scenario {
    /// A scenario with no advisory or expectation, merged into a fresh record.
    pub fn adhoc(strategy: MergeStrategy, payload: JsonValue) -> Self {
        Self {
            name: format!("adhoc-{}", strategy.as_str()),
            strategy,
            target: ScenarioTarget::Fresh,
            payload,
            advisory: None,
            expectation: None,
        }
    }

    pub fn with_target(mut self, target: ScenarioTarget) -> Self {
        self.target = target;
        self
    }

    fn canonical(
        name: &str,
        strategy: MergeStrategy,
        target: ScenarioTarget,
        payload: JsonValue,
        advisory: &str,
        expectation: Expectation,
    ) -> Self {
        Self {
            name: name.to_string(),
            strategy,
            target,
            payload,
            advisory: Some(advisory.to_string()),
            expectation: Some(expectation),
        }
    }
}

/// The canonical battery, one scenario per known exploit shape.
pub fn battery() -> Vec<Scenario> {
    use MergeStrategy::*;
    use ScenarioTarget::*;

    vec![
        Scenario::canonical(
            "defaults-deep-constructor",
            DefaultsDeep,
            Fresh,
            json!({"constructor": {"prototype": {"isAdmin": true}}}),
            "CVE-2019-10744",
            Expectation::new("isAdmin", json!(true)),
        ),
        Scenario::canonical(
            "merge-constructor",
            Merge,
            Fresh,
            json!({"constructor": {"prototype": {"polluted": "via merge"}}}),
            "CVE-2018-3721",
            Expectation::new("polluted", json!("via merge")),
        ),
        Scenario::canonical(
            "merge-with-constructor",
            MergeWith,
            Fresh,
            json!({"constructor": {"prototype": {"isHacked": "yes"}}}),
            "CVE-2018-3721",
            Expectation::new("isHacked", json!("yes")),
        ),
        Scenario::canonical(
            "merge-proto-accessor",
            Merge,
            Fresh,
            json!({"__proto__": {"polluted": true}}),
            "CVE-2018-3721",
            Expectation::new("polluted", json!(true)),
        ),
        Scenario::canonical(
            "mixin-deep-proto",
            ThirdPartyUtility,
            Fresh,
            json!({"__proto__": {"isVulnerable": "mixin-deep"}}),
            "CVE-2019-10746",
            Expectation::new("isVulnerable", json!("mixin-deep")),
        ),
        Scenario::canonical(
            "mixin-deep-ancestor-target",
            ThirdPartyUtility,
            Ancestor,
            json!({"isVulnerable": "mixin-deep"}),
            "CVE-2019-10746",
            Expectation::new("isVulnerable", json!("mixin-deep")),
        ),
    ]
}

/// Look up a battery scenario by name.
pub fn find(name: &str) -> Option<Scenario> {
    battery().into_iter().find(|s| s.name == name)
}
