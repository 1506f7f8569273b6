//! Request and response shapes of the SDK-facing RPCs.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::evaluation::{Evaluation, UserEvaluations, UserEvaluationsState};
use super::event::{Event, SourceId};
use super::feature::Feature;
use super::segment::SegmentUsers;
use super::user::User;

/// Selects the evaluated-at diffing variant of `GetEvaluations`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserEvaluationCondition {
    /// When the SDK last received evaluations (unix seconds).
    pub evaluated_at: i64,
    pub user_attributes_updated: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GetEvaluationsRequest {
    #[serde(default)]
    pub tag: String,
    pub user: Option<User>,
    /// Fingerprint the SDK currently holds.
    #[serde(default)]
    pub user_evaluations_id: String,
    #[serde(default)]
    pub user_evaluation_condition: Option<UserEvaluationCondition>,
    #[serde(default)]
    pub source_id: SourceId,
    #[serde(default)]
    pub sdk_version: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GetEvaluationsResponse {
    pub state: UserEvaluationsState,
    pub evaluations: UserEvaluations,
    pub user_evaluations_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GetEvaluationRequest {
    pub tag: String,
    pub user: Option<User>,
    pub feature_id: String,
    #[serde(default)]
    pub source_id: SourceId,
    #[serde(default)]
    pub sdk_version: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GetEvaluationResponse {
    pub evaluation: Evaluation,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GetFeatureFlagsRequest {
    #[serde(default)]
    pub tag: String,
    #[serde(default)]
    pub feature_flags_id: String,
    /// `requested_at` of the SDK's previous response (unix seconds).
    #[serde(default)]
    pub requested_at: i64,
    pub source_id: SourceId,
    pub sdk_version: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GetFeatureFlagsResponse {
    pub feature_flags_id: String,
    pub features: Vec<Feature>,
    pub archived_feature_flag_ids: Vec<String>,
    pub requested_at: i64,
    pub force_update: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GetSegmentUsersRequest {
    /// Segments the SDK currently holds.
    #[serde(default)]
    pub segment_ids: Vec<String>,
    #[serde(default)]
    pub requested_at: i64,
    pub source_id: SourceId,
    pub sdk_version: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GetSegmentUsersResponse {
    pub segment_users: Vec<SegmentUsers>,
    pub deleted_segment_ids: Vec<String>,
    pub requested_at: i64,
    pub force_update: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegisterEventsRequest {
    pub events: Vec<Event>,
    #[serde(default)]
    pub source_id: SourceId,
    #[serde(default)]
    pub sdk_version: String,
}

/// Why one event of a batch was not accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterEventsError {
    /// The SDK may resend this event later.
    pub retriable: bool,
    pub message: String,
}

impl RegisterEventsError {
    pub fn retriable(message: impl Into<String>) -> Self {
        Self {
            retriable: true,
            message: message.into(),
        }
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        Self {
            retriable: false,
            message: message.into(),
        }
    }
}

/// Per-event failures keyed by event id; absent ids were accepted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegisterEventsResponse {
    pub errors: HashMap<String, RegisterEventsError>,
}

/// Legacy goal-only submission, shared by the gRPC and HTTP transports.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackRequest {
    #[serde(default, rename = "apikey")]
    pub api_key: String,
    #[serde(default, rename = "userid")]
    pub user_id: String,
    #[serde(default, rename = "goalid")]
    pub goal_id: String,
    #[serde(default)]
    pub tag: String,
    #[serde(default)]
    pub timestamp: i64,
    #[serde(default)]
    pub value: f64,
}
