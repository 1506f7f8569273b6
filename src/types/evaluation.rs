//! Evaluation results. Derived per request, never stored.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReasonType {
    Target,
    Rule,
    #[default]
    Default,
    /// Evaluated on the client side.
    Client,
    OffVariation,
    Prerequisite,
    ErrorNoEvaluations,
    ErrorFlagNotFound,
    ErrorWrongType,
    ErrorUserIdNotSpecified,
    ErrorFeatureFlagIdNotSpecified,
    ErrorException,
}

impl ReasonType {
    /// Reasons under which an SDK reports an evaluation without a variation.
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            ReasonType::Client
                | ReasonType::ErrorNoEvaluations
                | ReasonType::ErrorFlagNotFound
                | ReasonType::ErrorWrongType
                | ReasonType::ErrorUserIdNotSpecified
                | ReasonType::ErrorFeatureFlagIdNotSpecified
                | ReasonType::ErrorException
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reason {
    #[serde(rename = "type")]
    pub reason_type: ReasonType,
    #[serde(default)]
    pub rule_id: String,
}

impl Reason {
    pub fn new(reason_type: ReasonType) -> Self {
        Self {
            reason_type,
            rule_id: String::new(),
        }
    }

    pub fn rule(rule_id: impl Into<String>) -> Self {
        Self {
            reason_type: ReasonType::Rule,
            rule_id: rule_id.into(),
        }
    }
}

/// The variation a user receives for one feature.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    /// `{feature_id}:{feature_version}:{user_id}`
    pub id: String,
    pub feature_id: String,
    pub feature_version: i32,
    pub user_id: String,
    pub variation_id: String,
    pub variation_name: String,
    pub variation_value: String,
    pub reason: Reason,
}

pub fn evaluation_id(feature_id: &str, feature_version: i32, user_id: &str) -> String {
    format!("{feature_id}:{feature_version}:{user_id}")
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserEvaluationsState {
    Queued,
    Partial,
    #[default]
    Full,
}

/// Evaluations for one user, keyed by a fingerprint of their inputs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserEvaluations {
    pub id: String,
    pub evaluations: Vec<Evaluation>,
    /// Features archived within the retention window, for SDK-side eviction.
    pub archived_feature_ids: Vec<String>,
    /// The payload replaces the SDK's local state instead of patching it.
    pub force_update: bool,
    pub created_at: i64,
}

impl UserEvaluations {
    pub fn empty(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }
}
