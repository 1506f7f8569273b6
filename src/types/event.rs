//! SDK events and the internal events the gateway publishes.
//!
//! An incoming event's payload type is decided once, when the transport
//! decodes it, and carried as an [`EventPayload`] variant from then on.
//! Payloads that were recognised but failed to decode are kept as
//! [`EventPayload::Malformed`] so the ingestion pipeline can still report them
//! against their event id.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::evaluation::Reason;
use super::user::User;

/// SDK family that produced a request or event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SourceId {
    #[default]
    Unknown,
    Android,
    Ios,
    Web,
    GoalBatch,
    GoServer,
    NodeServer,
    JavaScript,
    Flutter,
    ReactNative,
    OpenFeatureKotlin,
    OpenFeatureSwift,
    OpenFeatureJavascript,
    OpenFeatureGo,
    OpenFeatureNode,
}

impl SourceId {
    const ALL: [SourceId; 15] = [
        SourceId::Unknown,
        SourceId::Android,
        SourceId::Ios,
        SourceId::Web,
        SourceId::GoalBatch,
        SourceId::GoServer,
        SourceId::NodeServer,
        SourceId::JavaScript,
        SourceId::Flutter,
        SourceId::ReactNative,
        SourceId::OpenFeatureKotlin,
        SourceId::OpenFeatureSwift,
        SourceId::OpenFeatureJavascript,
        SourceId::OpenFeatureGo,
        SourceId::OpenFeatureNode,
    ];

    /// Wire value; unknown numbers collapse to [`SourceId::Unknown`].
    pub fn from_i32(value: i32) -> Self {
        usize::try_from(value)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
            .unwrap_or_default()
    }

    pub fn as_i32(&self) -> i32 {
        Self::ALL.iter().position(|s| s == self).unwrap_or(0) as i32
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceId::Unknown => "UNKNOWN",
            SourceId::Android => "ANDROID",
            SourceId::Ios => "IOS",
            SourceId::Web => "WEB",
            SourceId::GoalBatch => "GOAL_BATCH",
            SourceId::GoServer => "GO_SERVER",
            SourceId::NodeServer => "NODE_SERVER",
            SourceId::JavaScript => "JAVASCRIPT",
            SourceId::Flutter => "FLUTTER",
            SourceId::ReactNative => "REACT_NATIVE",
            SourceId::OpenFeatureKotlin => "OPEN_FEATURE_KOTLIN",
            SourceId::OpenFeatureSwift => "OPEN_FEATURE_SWIFT",
            SourceId::OpenFeatureJavascript => "OPEN_FEATURE_JAVASCRIPT",
            SourceId::OpenFeatureGo => "OPEN_FEATURE_GO",
            SourceId::OpenFeatureNode => "OPEN_FEATURE_NODE",
        }
    }
}

/// SDK API an operational metric refers to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApiId {
    #[default]
    UnknownApi,
    GetEvaluation,
    GetEvaluations,
    RegisterEvents,
    GetFeatureFlags,
    GetSegmentUsers,
    SdkGetVariation,
}

impl ApiId {
    pub fn from_i32(value: i32) -> Self {
        match value {
            1 => ApiId::GetEvaluation,
            2 => ApiId::GetEvaluations,
            3 => ApiId::RegisterEvents,
            4 => ApiId::GetFeatureFlags,
            5 => ApiId::GetSegmentUsers,
            100 => ApiId::SdkGetVariation,
            _ => ApiId::UnknownApi,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ApiId::UnknownApi => "UNKNOWN_API",
            ApiId::GetEvaluation => "GET_EVALUATION",
            ApiId::GetEvaluations => "GET_EVALUATIONS",
            ApiId::RegisterEvents => "REGISTER_EVENTS",
            ApiId::GetFeatureFlags => "GET_FEATURE_FLAGS",
            ApiId::GetSegmentUsers => "GET_SEGMENT_USERS",
            ApiId::SdkGetVariation => "SDK_GET_VARIATION",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GoalEvent {
    pub timestamp: i64,
    pub goal_id: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub value: f64,
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub tag: String,
    #[serde(default)]
    pub source_id: SourceId,
    #[serde(default)]
    pub sdk_version: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationEvent {
    pub timestamp: i64,
    pub feature_id: String,
    #[serde(default)]
    pub feature_version: i32,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub variation_id: String,
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub reason: Option<Reason>,
    #[serde(default)]
    pub tag: String,
    #[serde(default)]
    pub source_id: SourceId,
    #[serde(default)]
    pub sdk_version: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// Error classes SDKs report through error metrics events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SdkErrorType {
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    ClientClosedRequest,
    InternalServerError,
    ServiceUnavailable,
    Timeout,
    Internal,
    Network,
    InternalSdk,
    Unknown,
    Redirection,
    PayloadTooLarge,
}

impl SdkErrorType {
    /// Label value of the `error_type` metric label.
    pub fn label(&self) -> &'static str {
        match self {
            SdkErrorType::BadRequest => "BadRequest",
            SdkErrorType::Unauthorized => "Unauthenticated",
            SdkErrorType::Forbidden => "Forbidden",
            SdkErrorType::NotFound => "NotFound",
            SdkErrorType::ClientClosedRequest => "ClientClosedRequest",
            SdkErrorType::InternalServerError => "InternalServerError",
            SdkErrorType::ServiceUnavailable => "ServiceUnavailable",
            SdkErrorType::Timeout => "Timeout",
            SdkErrorType::Internal => "Internal",
            SdkErrorType::Network => "Network",
            SdkErrorType::InternalSdk => "SDKInternal",
            SdkErrorType::Unknown => "Unknown",
            SdkErrorType::Redirection => "ErrRedirection",
            SdkErrorType::PayloadTooLarge => "ErrPayloadTooLarge",
        }
    }
}

/// The concrete operational measurement inside a [`MetricsEvent`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MetricsEventKind {
    GetEvaluationLatency {
        labels: HashMap<String, String>,
        duration: Option<Duration>,
    },
    GetEvaluationSize {
        labels: HashMap<String, String>,
        size_byte: i32,
    },
    TimeoutErrorCount {
        tag: String,
    },
    InternalErrorCount {
        tag: String,
    },
    Latency {
        api_id: ApiId,
        labels: HashMap<String, String>,
        duration: Option<Duration>,
        latency_second: f64,
    },
    Size {
        api_id: ApiId,
        labels: HashMap<String, String>,
        size_byte: i32,
    },
    Error {
        error_type: SdkErrorType,
        api_id: ApiId,
        labels: HashMap<String, String>,
    },
    /// A metrics payload type this gateway does not know.
    Unrecognized { type_url: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsEvent {
    pub timestamp: i64,
    pub kind: MetricsEventKind,
    #[serde(default)]
    pub sdk_version: String,
    #[serde(default)]
    pub source_id: SourceId,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// "User seen" record published for every evaluation request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserEvent {
    pub user_id: String,
    pub source_id: SourceId,
    pub tag: String,
    pub last_seen: i64,
    pub data: HashMap<String, String>,
    pub environment_id: String,
}

/// Which typed payload an event claimed to carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    Goal,
    Evaluation,
    Metrics,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Goal => "Goal",
            EventKind::Evaluation => "Evaluation",
            EventKind::Metrics => "Metrics",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "event", rename_all = "snake_case")]
pub enum EventPayload {
    Goal(GoalEvent),
    Evaluation(EvaluationEvent),
    Metrics(MetricsEvent),
    /// Emitted by the gateway itself; never accepted from SDKs.
    User(UserEvent),
    /// Known type whose body could not be decoded.
    Malformed { kind: EventKind, reason: String },
    /// Type the gateway does not recognise.
    Unknown { type_url: String },
}

impl EventPayload {
    pub fn type_label(&self) -> &'static str {
        match self {
            EventPayload::Goal(_) => "Goal",
            EventPayload::Evaluation(_) => "Evaluation",
            EventPayload::Metrics(_) => "Metrics",
            EventPayload::User(_) => "User",
            EventPayload::Malformed { kind, .. } => kind.as_str(),
            EventPayload::Unknown { .. } => "Unknown",
        }
    }
}

/// An event envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub payload: EventPayload,
    #[serde(default)]
    pub environment_id: String,
}

impl Event {
    pub fn new(id: impl Into<String>, payload: EventPayload) -> Self {
        Self {
            id: id.into(),
            payload,
            environment_id: String::new(),
        }
    }

    /// Stamp the environment resolved from the caller's API key.
    pub fn in_environment(mut self, environment_id: impl Into<String>) -> Self {
        self.environment_id = environment_id.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_id_round_trips_known_values() {
        assert_eq!(SourceId::from_i32(SourceId::Flutter.as_i32()), SourceId::Flutter);
        assert_eq!(SourceId::from_i32(999), SourceId::Unknown);
        assert_eq!(SourceId::from_i32(-1), SourceId::Unknown);
    }

    #[test]
    fn malformed_payload_keeps_claimed_kind_label() {
        let payload = EventPayload::Malformed {
            kind: EventKind::Evaluation,
            reason: "truncated".into(),
        };
        assert_eq!(payload.type_label(), "Evaluation");
    }
}
