//! Conversions between heimdall native types and protobuf types.
//!
//! Server-side conversions: proto → native for requests, native → proto for
//! responses. Event payloads arrive as `google.protobuf.Any` and are decoded
//! exactly once here, into an [`EventPayload`] variant.

use std::time::Duration;

use prost::Message as _;

use crate::types::{
    ApiId, Clause, ClauseOperator, Evaluation, EvaluationEvent, Event, EventKind, EventPayload,
    Feature, GetEvaluationRequest, GetEvaluationResponse, GetEvaluationsRequest,
    GetEvaluationsResponse, GetFeatureFlagsRequest, GetFeatureFlagsResponse,
    GetSegmentUsersRequest, GetSegmentUsersResponse, GoalEvent, MetricsEvent, MetricsEventKind,
    Prerequisite, Reason, ReasonType, RegisterEventsRequest, RegisterEventsResponse,
    RolloutVariation, Rule, SdkErrorType, SegmentUser, SegmentUserState, SegmentUsers, SourceId,
    Strategy, Target, TrackRequest, User, UserEvaluationCondition, UserEvaluations,
    UserEvaluationsState, Variation,
};

use super::proto;

const TYPE_URL_PREFIX: &str = "type.googleapis.com/";

// Fully qualified message names carried in `Any.type_url`.
pub const GOAL_EVENT: &str = "heimdall.v1.GoalEvent";
pub const EVALUATION_EVENT: &str = "heimdall.v1.EvaluationEvent";
pub const METRICS_EVENT: &str = "heimdall.v1.MetricsEvent";
pub const GET_EVALUATION_LATENCY_METRICS_EVENT: &str =
    "heimdall.v1.GetEvaluationLatencyMetricsEvent";
pub const GET_EVALUATION_SIZE_METRICS_EVENT: &str = "heimdall.v1.GetEvaluationSizeMetricsEvent";
pub const TIMEOUT_ERROR_COUNT_METRICS_EVENT: &str = "heimdall.v1.TimeoutErrorCountMetricsEvent";
pub const INTERNAL_ERROR_COUNT_METRICS_EVENT: &str = "heimdall.v1.InternalErrorCountMetricsEvent";
pub const LATENCY_METRICS_EVENT: &str = "heimdall.v1.LatencyMetricsEvent";
pub const SIZE_METRICS_EVENT: &str = "heimdall.v1.SizeMetricsEvent";
pub const ERROR_METRICS_EVENT: &str = "heimdall.v1.ErrorMetricsEvent";

/// Message name of a type URL (the part after the last `/`).
fn type_name(type_url: &str) -> &str {
    type_url.rsplit('/').next().unwrap_or(type_url)
}

/// Pack a message into an `Any` under `name`.
pub fn pack<M: prost::Message>(name: &str, message: &M) -> prost_types::Any {
    prost_types::Any {
        type_url: format!("{TYPE_URL_PREFIX}{name}"),
        value: message.encode_to_vec(),
    }
}

fn duration_from_proto(d: Option<prost_types::Duration>) -> Option<Duration> {
    d.and_then(|d| Duration::try_from(d).ok())
}

// =============================================================================
// From Proto → Native (incoming requests)
// =============================================================================

impl From<proto::User> for User {
    fn from(p: proto::User) -> Self {
        User {
            id: p.id,
            data: p.data.into_iter().collect(),
        }
    }
}

impl From<proto::UserEvaluationCondition> for UserEvaluationCondition {
    fn from(p: proto::UserEvaluationCondition) -> Self {
        UserEvaluationCondition {
            evaluated_at: p.evaluated_at,
            user_attributes_updated: p.user_attributes_updated,
        }
    }
}

impl From<proto::GetEvaluationsRequest> for GetEvaluationsRequest {
    fn from(p: proto::GetEvaluationsRequest) -> Self {
        GetEvaluationsRequest {
            tag: p.tag,
            user: p.user.map(Into::into),
            user_evaluations_id: p.user_evaluations_id,
            user_evaluation_condition: p.user_evaluation_condition.map(Into::into),
            source_id: SourceId::from_i32(p.source_id),
            sdk_version: p.sdk_version,
        }
    }
}

impl From<proto::GetEvaluationRequest> for GetEvaluationRequest {
    fn from(p: proto::GetEvaluationRequest) -> Self {
        GetEvaluationRequest {
            tag: p.tag,
            user: p.user.map(Into::into),
            feature_id: p.feature_id,
            source_id: SourceId::from_i32(p.source_id),
            sdk_version: p.sdk_version,
        }
    }
}

impl From<proto::GetFeatureFlagsRequest> for GetFeatureFlagsRequest {
    fn from(p: proto::GetFeatureFlagsRequest) -> Self {
        GetFeatureFlagsRequest {
            tag: p.tag,
            feature_flags_id: p.feature_flags_id,
            requested_at: p.requested_at,
            source_id: SourceId::from_i32(p.source_id),
            sdk_version: p.sdk_version,
        }
    }
}

impl From<proto::GetSegmentUsersRequest> for GetSegmentUsersRequest {
    fn from(p: proto::GetSegmentUsersRequest) -> Self {
        GetSegmentUsersRequest {
            segment_ids: p.segment_ids,
            requested_at: p.requested_at,
            source_id: SourceId::from_i32(p.source_id),
            sdk_version: p.sdk_version,
        }
    }
}

impl From<proto::RegisterEventsRequest> for RegisterEventsRequest {
    fn from(p: proto::RegisterEventsRequest) -> Self {
        RegisterEventsRequest {
            events: p.events.into_iter().map(Into::into).collect(),
            source_id: SourceId::from_i32(p.source_id),
            sdk_version: p.sdk_version,
        }
    }
}

impl From<proto::TrackRequest> for TrackRequest {
    fn from(p: proto::TrackRequest) -> Self {
        TrackRequest {
            api_key: p.apikey,
            user_id: p.userid,
            goal_id: p.goalid,
            tag: p.tag,
            timestamp: p.timestamp,
            value: p.value,
        }
    }
}

impl From<proto::Event> for Event {
    fn from(p: proto::Event) -> Self {
        let payload = match p.event {
            Some(any) => decode_payload(any),
            None => EventPayload::Unknown {
                type_url: String::new(),
            },
        };
        Event {
            id: p.id,
            payload,
            environment_id: p.environment_id,
        }
    }
}

fn malformed(kind: EventKind, err: prost::DecodeError) -> EventPayload {
    EventPayload::Malformed {
        kind,
        reason: err.to_string(),
    }
}

fn decode_payload(any: prost_types::Any) -> EventPayload {
    let bytes = any.value.as_slice();
    match type_name(&any.type_url) {
        GOAL_EVENT => proto::GoalEvent::decode(bytes)
            .map(|g| EventPayload::Goal(g.into()))
            .unwrap_or_else(|e| malformed(EventKind::Goal, e)),
        EVALUATION_EVENT => proto::EvaluationEvent::decode(bytes)
            .map(|e| EventPayload::Evaluation(e.into()))
            .unwrap_or_else(|e| malformed(EventKind::Evaluation, e)),
        METRICS_EVENT => proto::MetricsEvent::decode(bytes)
            .map_err(|e| malformed(EventKind::Metrics, e))
            .and_then(decode_metrics_event)
            .unwrap_or_else(|payload| payload),
        _ => EventPayload::Unknown {
            type_url: any.type_url,
        },
    }
}

fn decode_metrics_event(p: proto::MetricsEvent) -> Result<EventPayload, EventPayload> {
    let kind = match p.event {
        Some(any) => decode_metrics_kind(any)
            .map_err(|e| malformed(EventKind::Metrics, e))?,
        None => MetricsEventKind::Unrecognized {
            type_url: String::new(),
        },
    };
    Ok(EventPayload::Metrics(MetricsEvent {
        timestamp: p.timestamp,
        kind,
        sdk_version: p.sdk_version,
        source_id: SourceId::from_i32(p.source_id),
        metadata: p.metadata.into_iter().collect(),
    }))
}

fn decode_metrics_kind(any: prost_types::Any) -> Result<MetricsEventKind, prost::DecodeError> {
    let bytes = any.value.as_slice();
    let kind = match type_name(&any.type_url) {
        GET_EVALUATION_LATENCY_METRICS_EVENT => {
            let e = proto::GetEvaluationLatencyMetricsEvent::decode(bytes)?;
            MetricsEventKind::GetEvaluationLatency {
                labels: e.labels.into_iter().collect(),
                duration: duration_from_proto(e.duration),
            }
        }
        GET_EVALUATION_SIZE_METRICS_EVENT => {
            let e = proto::GetEvaluationSizeMetricsEvent::decode(bytes)?;
            MetricsEventKind::GetEvaluationSize {
                labels: e.labels.into_iter().collect(),
                size_byte: e.size_byte,
            }
        }
        TIMEOUT_ERROR_COUNT_METRICS_EVENT => {
            let e = proto::TimeoutErrorCountMetricsEvent::decode(bytes)?;
            MetricsEventKind::TimeoutErrorCount { tag: e.tag }
        }
        INTERNAL_ERROR_COUNT_METRICS_EVENT => {
            let e = proto::InternalErrorCountMetricsEvent::decode(bytes)?;
            MetricsEventKind::InternalErrorCount { tag: e.tag }
        }
        LATENCY_METRICS_EVENT => {
            let e = proto::LatencyMetricsEvent::decode(bytes)?;
            MetricsEventKind::Latency {
                api_id: ApiId::from_i32(e.api_id),
                labels: e.labels.into_iter().collect(),
                duration: duration_from_proto(e.duration),
                latency_second: e.latency_second,
            }
        }
        SIZE_METRICS_EVENT => {
            let e = proto::SizeMetricsEvent::decode(bytes)?;
            MetricsEventKind::Size {
                api_id: ApiId::from_i32(e.api_id),
                labels: e.labels.into_iter().collect(),
                size_byte: e.size_byte,
            }
        }
        ERROR_METRICS_EVENT => {
            let e = proto::ErrorMetricsEvent::decode(bytes)?;
            MetricsEventKind::Error {
                error_type: sdk_error_type(e.error_type),
                api_id: ApiId::from_i32(e.api_id),
                labels: e.labels.into_iter().collect(),
            }
        }
        _ => MetricsEventKind::Unrecognized {
            type_url: any.type_url,
        },
    };
    Ok(kind)
}

fn sdk_error_type(value: i32) -> SdkErrorType {
    use proto::error_metrics_event::ErrorType;
    match ErrorType::try_from(value).unwrap_or(ErrorType::Unknown) {
        ErrorType::BadRequest => SdkErrorType::BadRequest,
        ErrorType::Unauthorized => SdkErrorType::Unauthorized,
        ErrorType::Forbidden => SdkErrorType::Forbidden,
        ErrorType::NotFound => SdkErrorType::NotFound,
        ErrorType::ClientClosedRequest => SdkErrorType::ClientClosedRequest,
        ErrorType::InternalServerError => SdkErrorType::InternalServerError,
        ErrorType::ServiceUnavailable => SdkErrorType::ServiceUnavailable,
        ErrorType::Timeout => SdkErrorType::Timeout,
        ErrorType::Internal => SdkErrorType::Internal,
        ErrorType::Network => SdkErrorType::Network,
        ErrorType::InternalSdk => SdkErrorType::InternalSdk,
        ErrorType::Unknown => SdkErrorType::Unknown,
        ErrorType::Redirection => SdkErrorType::Redirection,
        ErrorType::PayloadTooLarge => SdkErrorType::PayloadTooLarge,
    }
}

impl From<proto::GoalEvent> for GoalEvent {
    fn from(p: proto::GoalEvent) -> Self {
        GoalEvent {
            timestamp: p.timestamp,
            goal_id: p.goal_id,
            user_id: p.user_id,
            value: p.value,
            user: p.user.map(Into::into),
            tag: p.tag,
            source_id: SourceId::from_i32(p.source_id),
            sdk_version: p.sdk_version,
            metadata: p.metadata.into_iter().collect(),
        }
    }
}

impl From<proto::EvaluationEvent> for EvaluationEvent {
    fn from(p: proto::EvaluationEvent) -> Self {
        EvaluationEvent {
            timestamp: p.timestamp,
            feature_id: p.feature_id,
            feature_version: p.feature_version,
            user_id: p.user_id,
            variation_id: p.variation_id,
            user: p.user.map(Into::into),
            reason: p.reason.map(Into::into),
            tag: p.tag,
            source_id: SourceId::from_i32(p.source_id),
            sdk_version: p.sdk_version,
            metadata: p.metadata.into_iter().collect(),
        }
    }
}

impl From<proto::Reason> for Reason {
    fn from(p: proto::Reason) -> Self {
        use proto::reason::Type;
        let reason_type = match Type::try_from(p.r#type).unwrap_or(Type::Default) {
            Type::Target => ReasonType::Target,
            Type::Rule => ReasonType::Rule,
            Type::Default => ReasonType::Default,
            Type::Client => ReasonType::Client,
            Type::OffVariation => ReasonType::OffVariation,
            Type::Prerequisite => ReasonType::Prerequisite,
            Type::ErrorNoEvaluations => ReasonType::ErrorNoEvaluations,
            Type::ErrorFlagNotFound => ReasonType::ErrorFlagNotFound,
            Type::ErrorWrongType => ReasonType::ErrorWrongType,
            Type::ErrorUserIdNotSpecified => ReasonType::ErrorUserIdNotSpecified,
            Type::ErrorFeatureFlagIdNotSpecified => ReasonType::ErrorFeatureFlagIdNotSpecified,
            Type::ErrorException => ReasonType::ErrorException,
        };
        Reason {
            reason_type,
            rule_id: p.rule_id,
        }
    }
}

// =============================================================================
// Native → Proto (outgoing responses)
// =============================================================================

impl From<User> for proto::User {
    fn from(u: User) -> Self {
        proto::User {
            id: u.id,
            data: u.data.into_iter().collect(),
        }
    }
}

impl From<ReasonType> for proto::reason::Type {
    fn from(r: ReasonType) -> Self {
        use proto::reason::Type;
        match r {
            ReasonType::Target => Type::Target,
            ReasonType::Rule => Type::Rule,
            ReasonType::Default => Type::Default,
            ReasonType::Client => Type::Client,
            ReasonType::OffVariation => Type::OffVariation,
            ReasonType::Prerequisite => Type::Prerequisite,
            ReasonType::ErrorNoEvaluations => Type::ErrorNoEvaluations,
            ReasonType::ErrorFlagNotFound => Type::ErrorFlagNotFound,
            ReasonType::ErrorWrongType => Type::ErrorWrongType,
            ReasonType::ErrorUserIdNotSpecified => Type::ErrorUserIdNotSpecified,
            ReasonType::ErrorFeatureFlagIdNotSpecified => Type::ErrorFeatureFlagIdNotSpecified,
            ReasonType::ErrorException => Type::ErrorException,
        }
    }
}

impl From<Reason> for proto::Reason {
    fn from(r: Reason) -> Self {
        proto::Reason {
            r#type: proto::reason::Type::from(r.reason_type) as i32,
            rule_id: r.rule_id,
        }
    }
}

impl From<Evaluation> for proto::Evaluation {
    fn from(e: Evaluation) -> Self {
        proto::Evaluation {
            id: e.id,
            feature_id: e.feature_id,
            feature_version: e.feature_version,
            user_id: e.user_id,
            variation_id: e.variation_id,
            variation_name: e.variation_name,
            variation_value: e.variation_value,
            reason: Some(e.reason.into()),
        }
    }
}

impl From<UserEvaluationsState> for proto::user_evaluations::State {
    fn from(s: UserEvaluationsState) -> Self {
        match s {
            UserEvaluationsState::Queued => proto::user_evaluations::State::Queued,
            UserEvaluationsState::Partial => proto::user_evaluations::State::Partial,
            UserEvaluationsState::Full => proto::user_evaluations::State::Full,
        }
    }
}

impl From<UserEvaluations> for proto::UserEvaluations {
    fn from(u: UserEvaluations) -> Self {
        proto::UserEvaluations {
            id: u.id,
            evaluations: u.evaluations.into_iter().map(Into::into).collect(),
            archived_feature_ids: u.archived_feature_ids,
            force_update: u.force_update,
            created_at: u.created_at,
        }
    }
}

impl From<GetEvaluationsResponse> for proto::GetEvaluationsResponse {
    fn from(r: GetEvaluationsResponse) -> Self {
        proto::GetEvaluationsResponse {
            state: proto::user_evaluations::State::from(r.state) as i32,
            evaluations: Some(r.evaluations.into()),
            user_evaluations_id: r.user_evaluations_id,
        }
    }
}

impl From<GetEvaluationResponse> for proto::GetEvaluationResponse {
    fn from(r: GetEvaluationResponse) -> Self {
        proto::GetEvaluationResponse {
            evaluation: Some(r.evaluation.into()),
        }
    }
}

impl From<Variation> for proto::Variation {
    fn from(v: Variation) -> Self {
        proto::Variation {
            id: v.id,
            value: v.value,
            name: v.name,
            description: v.description,
        }
    }
}

impl From<ClauseOperator> for proto::clause::Operator {
    fn from(o: ClauseOperator) -> Self {
        use proto::clause::Operator;
        match o {
            ClauseOperator::Equals => Operator::Equals,
            ClauseOperator::In => Operator::In,
            ClauseOperator::EndsWith => Operator::EndsWith,
            ClauseOperator::StartsWith => Operator::StartsWith,
            ClauseOperator::Segment => Operator::Segment,
            ClauseOperator::Greater => Operator::Greater,
            ClauseOperator::GreaterOrEqual => Operator::GreaterOrEqual,
            ClauseOperator::Less => Operator::Less,
            ClauseOperator::LessOrEqual => Operator::LessOrEqual,
            ClauseOperator::Before => Operator::Before,
            ClauseOperator::After => Operator::After,
            ClauseOperator::FeatureFlag => Operator::FeatureFlag,
            ClauseOperator::PartiallyMatch => Operator::PartiallyMatch,
        }
    }
}

impl From<Clause> for proto::Clause {
    fn from(c: Clause) -> Self {
        proto::Clause {
            id: c.id,
            attribute: c.attribute,
            operator: proto::clause::Operator::from(c.operator) as i32,
            values: c.values,
        }
    }
}

impl From<Strategy> for proto::Strategy {
    fn from(s: Strategy) -> Self {
        match s {
            Strategy::Fixed { variation } => proto::Strategy {
                r#type: proto::strategy::Type::Fixed as i32,
                fixed_variation: variation,
                rollout_variations: Vec::new(),
            },
            Strategy::Rollout { variations } => proto::Strategy {
                r#type: proto::strategy::Type::Rollout as i32,
                fixed_variation: String::new(),
                rollout_variations: variations
                    .into_iter()
                    .map(|RolloutVariation { variation, weight }| proto::RolloutVariation {
                        variation,
                        weight,
                    })
                    .collect(),
            },
        }
    }
}

impl From<Rule> for proto::Rule {
    fn from(r: Rule) -> Self {
        proto::Rule {
            id: r.id,
            strategy: Some(r.strategy.into()),
            clauses: r.clauses.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<Target> for proto::Target {
    fn from(t: Target) -> Self {
        proto::Target {
            variation: t.variation,
            users: t.users,
        }
    }
}

impl From<Prerequisite> for proto::Prerequisite {
    fn from(p: Prerequisite) -> Self {
        proto::Prerequisite {
            feature_id: p.feature_id,
            variation_id: p.variation_id,
        }
    }
}

impl From<Feature> for proto::Feature {
    fn from(f: Feature) -> Self {
        proto::Feature {
            id: f.id,
            name: f.name,
            version: f.version,
            enabled: f.enabled,
            variations: f.variations.into_iter().map(Into::into).collect(),
            targets: f.targets.into_iter().map(Into::into).collect(),
            rules: f.rules.into_iter().map(Into::into).collect(),
            default_strategy: f.default_strategy.map(Into::into),
            off_variation: f.off_variation,
            prerequisites: f.prerequisites.into_iter().map(Into::into).collect(),
            tags: f.tags,
            archived: f.archived,
            updated_at: f.updated_at,
            sampling_seed: f.sampling_seed,
        }
    }
}

impl From<GetFeatureFlagsResponse> for proto::GetFeatureFlagsResponse {
    fn from(r: GetFeatureFlagsResponse) -> Self {
        proto::GetFeatureFlagsResponse {
            feature_flags_id: r.feature_flags_id,
            features: r.features.into_iter().map(Into::into).collect(),
            archived_feature_flag_ids: r.archived_feature_flag_ids,
            requested_at: r.requested_at,
            force_update: r.force_update,
        }
    }
}

impl From<SegmentUser> for proto::SegmentUser {
    fn from(u: SegmentUser) -> Self {
        let state = match u.state {
            SegmentUserState::Included => proto::segment_user::State::Included,
            SegmentUserState::Excluded => proto::segment_user::State::Excluded,
        };
        proto::SegmentUser {
            id: u.id,
            segment_id: u.segment_id,
            user_id: u.user_id,
            state: state as i32,
            deleted: u.deleted,
        }
    }
}

impl From<SegmentUsers> for proto::SegmentUsers {
    fn from(s: SegmentUsers) -> Self {
        proto::SegmentUsers {
            segment_id: s.segment_id,
            users: s.users.into_iter().map(Into::into).collect(),
            updated_at: s.updated_at,
        }
    }
}

impl From<GetSegmentUsersResponse> for proto::GetSegmentUsersResponse {
    fn from(r: GetSegmentUsersResponse) -> Self {
        proto::GetSegmentUsersResponse {
            segment_users: r.segment_users.into_iter().map(Into::into).collect(),
            deleted_segment_ids: r.deleted_segment_ids,
            requested_at: r.requested_at,
            force_update: r.force_update,
        }
    }
}

impl From<RegisterEventsResponse> for proto::RegisterEventsResponse {
    fn from(r: RegisterEventsResponse) -> Self {
        proto::RegisterEventsResponse {
            errors: r
                .errors
                .into_iter()
                .map(|(id, e)| {
                    (
                        id,
                        proto::register_events_response::Error {
                            retriable: e.retriable,
                            message: e.message,
                        },
                    )
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn goal_any(goal_id: &str) -> prost_types::Any {
        pack(
            GOAL_EVENT,
            &proto::GoalEvent {
                timestamp: 10,
                goal_id: goal_id.into(),
                user_id: "u1".into(),
                ..Default::default()
            },
        )
    }

    #[test]
    fn goal_payload_is_decoded() {
        let event: Event = proto::Event {
            id: "e1".into(),
            event: Some(goal_any("g1")),
            environment_id: String::new(),
        }
        .into();
        match event.payload {
            EventPayload::Goal(goal) => {
                assert_eq!(goal.goal_id, "g1");
                assert_eq!(goal.timestamp, 10);
            }
            other => panic!("expected goal, got {other:?}"),
        }
    }

    #[test]
    fn corrupt_body_keeps_claimed_kind() {
        let any = prost_types::Any {
            type_url: format!("{TYPE_URL_PREFIX}{EVALUATION_EVENT}"),
            value: vec![0xff, 0xff, 0xff],
        };
        let event: Event = proto::Event {
            id: "e1".into(),
            event: Some(any),
            environment_id: String::new(),
        }
        .into();
        assert!(matches!(
            event.payload,
            EventPayload::Malformed {
                kind: EventKind::Evaluation,
                ..
            }
        ));
    }

    #[test]
    fn unknown_type_url_is_unknown() {
        let any = prost_types::Any {
            type_url: "type.googleapis.com/other.v1.Thing".into(),
            value: Vec::new(),
        };
        let event: Event = proto::Event {
            id: "e1".into(),
            event: Some(any),
            environment_id: String::new(),
        }
        .into();
        assert!(matches!(event.payload, EventPayload::Unknown { .. }));
    }

    #[test]
    fn metrics_latency_is_decoded() {
        let inner = pack(
            LATENCY_METRICS_EVENT,
            &proto::LatencyMetricsEvent {
                api_id: proto::ApiId::GetEvaluations as i32,
                labels: Default::default(),
                duration: Some(prost_types::Duration {
                    seconds: 1,
                    nanos: 500_000_000,
                }),
                latency_second: 0.0,
            },
        );
        let outer = pack(
            METRICS_EVENT,
            &proto::MetricsEvent {
                timestamp: 5,
                event: Some(inner),
                sdk_version: "1.0.0".into(),
                source_id: proto::SourceId::GoServer as i32,
                metadata: Default::default(),
            },
        );
        let event: Event = proto::Event {
            id: "e1".into(),
            event: Some(outer),
            environment_id: String::new(),
        }
        .into();
        let EventPayload::Metrics(metrics) = event.payload else {
            panic!("expected metrics payload");
        };
        assert_eq!(metrics.source_id, SourceId::GoServer);
        assert_eq!(
            metrics.kind,
            MetricsEventKind::Latency {
                api_id: ApiId::GetEvaluations,
                labels: Default::default(),
                duration: Some(Duration::from_millis(1500)),
                latency_second: 0.0,
            }
        );
    }
}
