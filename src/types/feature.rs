//! Feature flag definitions as served to SDKs and fed to the evaluator.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// A single variation of a feature flag.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Variation {
    pub id: String,
    pub value: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// Comparison applied by a [`Clause`] to a user attribute.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClauseOperator {
    #[default]
    Equals,
    In,
    EndsWith,
    StartsWith,
    /// Values are segment ids; matches users included in any of them.
    Segment,
    Greater,
    GreaterOrEqual,
    Less,
    LessOrEqual,
    Before,
    After,
    /// Attribute is a feature id; values are accepted variation ids.
    FeatureFlag,
    PartiallyMatch,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Clause {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub attribute: String,
    pub operator: ClauseOperator,
    #[serde(default)]
    pub values: Vec<String>,
}

/// Share of a rollout assigned to one variation, in units of 1/100 000.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RolloutVariation {
    pub variation: String,
    pub weight: u32,
}

/// How a matching user is mapped to a variation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Strategy {
    Fixed { variation: String },
    Rollout { variations: Vec<RolloutVariation> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub id: String,
    pub strategy: Strategy,
    #[serde(default)]
    pub clauses: Vec<Clause>,
}

/// Individually targeted users.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub variation: String,
    #[serde(default)]
    pub users: Vec<String>,
}

/// Another flag that must evaluate to `variation_id` for this one to be on.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Prerequisite {
    pub feature_id: String,
    pub variation_id: String,
}

/// A feature flag.
///
/// `updated_at` is in unix seconds; archiving bumps it, so for archived flags
/// it doubles as the archive time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: i32,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub variations: Vec<Variation>,
    #[serde(default)]
    pub targets: Vec<Target>,
    #[serde(default)]
    pub rules: Vec<Rule>,
    #[serde(default)]
    pub default_strategy: Option<Strategy>,
    #[serde(default)]
    pub off_variation: String,
    #[serde(default)]
    pub prerequisites: Vec<Prerequisite>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub updated_at: i64,
    #[serde(default)]
    pub sampling_seed: String,
}

impl Feature {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    pub fn has_prerequisites(&self) -> bool {
        !self.prerequisites.is_empty()
    }

    /// Segment ids referenced by SEGMENT clauses, deduplicated and sorted.
    pub fn segment_ids(&self) -> Vec<String> {
        let ids: BTreeSet<&str> = self
            .rules
            .iter()
            .flat_map(|r| r.clauses.iter())
            .filter(|c| c.operator == ClauseOperator::Segment)
            .flat_map(|c| c.values.iter().map(String::as_str))
            .collect();
        ids.into_iter().map(str::to_string).collect()
    }

    pub fn find_variation(&self, id: &str) -> Option<&Variation> {
        self.variations.iter().find(|v| v.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segment_ids_are_deduplicated() {
        let clause = |values: &[&str]| Clause {
            operator: ClauseOperator::Segment,
            values: values.iter().map(|v| v.to_string()).collect(),
            ..Default::default()
        };
        let feature = Feature {
            id: "f".into(),
            rules: vec![
                Rule {
                    id: "r1".into(),
                    strategy: Strategy::Fixed {
                        variation: "a".into(),
                    },
                    clauses: vec![clause(&["s2", "s1"])],
                },
                Rule {
                    id: "r2".into(),
                    strategy: Strategy::Fixed {
                        variation: "a".into(),
                    },
                    clauses: vec![
                        clause(&["s1"]),
                        Clause {
                            attribute: "country".into(),
                            operator: ClauseOperator::Equals,
                            values: vec!["jp".into()],
                            ..Default::default()
                        },
                    ],
                },
            ],
            ..Default::default()
        };
        assert_eq!(feature.segment_ids(), vec!["s1", "s2"]);
    }

    #[test]
    fn strategy_serializes_with_type_tag() {
        let json = serde_json::to_string(&Strategy::Fixed {
            variation: "v1".into(),
        })
        .unwrap();
        assert_eq!(json, r#"{"type":"fixed","variation":"v1"}"#);
    }
}
