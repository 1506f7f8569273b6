//! `RegisterEvents`: per-event validation, topic batching and publish
//! reconciliation.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, instrument};
use uuid::Uuid;

use super::auth::is_expected;
use super::metrics_event::save_metrics_events_async;
use super::{Gateway, METHOD_REGISTER_EVENTS, record_request};
use crate::Result;
use crate::context::RequestContext;
use crate::error::{EventError, GatewayError};
use crate::evaluation::selection::now_unix;
use crate::telemetry;
use crate::traits::Publisher;
use crate::types::{
    ApiKeyRole, EvaluationEvent, Event, EventPayload, GoalEvent, MetricsEvent,
    RegisterEventsError, RegisterEventsRequest, RegisterEventsResponse,
};

pub(crate) const TYPE_GOAL: &str = "Goal";
const TYPE_EVALUATION: &str = "Evaluation";
const TYPE_METRICS: &str = "Metrics";
const TYPE_UNKNOWN: &str = "Unknown";
const TYPE_REGISTER_EVENT: &str = "RegisterEvent";

pub(crate) const CODE_OK: &str = "OK";
pub(crate) const CODE_NON_REPEATABLE_ERROR: &str = "NonRepeatableError";
pub(crate) const CODE_REPEATABLE_ERROR: &str = "RepeatableError";
const CODE_INVALID_TIMESTAMP_REQUEST: &str = "InvalidTimestampRequest";

const PUBLISH_FAILED: &str = "Failed to publish event";

pub(crate) fn count_event(kind: &'static str, code: &'static str, n: u64) {
    if n == 0 {
        return;
    }
    metrics::counter!(telemetry::REGISTER_EVENTS_TOTAL, "type" => kind, "code" => code)
        .increment(n);
}

impl Gateway {
    /// Ingest a batch of SDK events.
    ///
    /// Only a structurally missing event id fails the whole call; every
    /// other problem is reported per event in the response map. Goal and
    /// evaluation events go out in one publish call per topic; metrics
    /// events are recorded locally on a detached task.
    #[instrument(skip_all, fields(method = METHOD_REGISTER_EVENTS, events = req.events.len()))]
    pub async fn register_events(
        &self,
        ctx: &RequestContext,
        req: RegisterEventsRequest,
    ) -> Result<RegisterEventsResponse> {
        let start = Instant::now();
        let result = self.register_events_inner(ctx, req).await;
        record_request(METHOD_REGISTER_EVENTS, start, &result);
        result
    }

    async fn register_events_inner(
        &self,
        ctx: &RequestContext,
        req: RegisterEventsRequest,
    ) -> Result<RegisterEventsResponse> {
        let key = self
            .check_request(ctx, &[ApiKeyRole::SdkClient, ApiKeyRole::SdkServer])
            .await
            .inspect_err(|err| {
                if !is_expected(err) {
                    error!(error = %err, "failed to check RegisterEvents request");
                }
            })?;
        if req.events.is_empty() {
            return Err(GatewayError::MissingEvents);
        }
        // Batch-fatal; checked before anything is published or recorded.
        if req.events.iter().any(|e| e.id.is_empty()) {
            return Err(GatewayError::MissingEventId);
        }
        let env = key.environment_id.as_str();

        let now = now_unix();
        let mut errors = HashMap::new();
        let mut goals = Vec::new();
        let mut evaluations = Vec::new();
        let mut metrics_events = Vec::new();

        for event in req.events {
            let event = event.in_environment(env);
            match self.classify(&event, now) {
                Ok(Accepted::Goal) => goals.push(event),
                Ok(Accepted::Evaluation) => evaluations.push(event),
                Ok(Accepted::Metrics(metrics_event)) => metrics_events.push(metrics_event),
                Err((kind, err)) => {
                    count_event(kind, err.metric_code(), 1);
                    debug!(environment_id = env, event_id = %event.id, error = %err, "rejected event");
                    errors.insert(event.id, RegisterEventsError::permanent(err.to_string()));
                }
            }
        }

        save_metrics_events_async(metrics_events, env.to_owned());
        let goal_errors = publish(&self.goal_publisher, &goals, TYPE_GOAL, env).await;
        let evaluation_errors =
            publish(&self.evaluation_publisher, &evaluations, TYPE_EVALUATION, env).await;
        errors.extend(goal_errors);
        errors.extend(evaluation_errors);

        if errors.is_empty() {
            count_event(TYPE_REGISTER_EVENT, CODE_OK, 1);
        } else if errors
            .values()
            .any(|e| e.message == EventError::InvalidTimestamp.to_string())
        {
            count_event(TYPE_REGISTER_EVENT, CODE_INVALID_TIMESTAMP_REQUEST, 1);
        }
        Ok(RegisterEventsResponse { errors })
    }

    /// Validate one event and decide where it goes.
    fn classify(
        &self,
        event: &Event,
        now: i64,
    ) -> std::result::Result<Accepted, (&'static str, EventError)> {
        let kind = match &event.payload {
            EventPayload::Goal(_) => TYPE_GOAL,
            EventPayload::Evaluation(_) => TYPE_EVALUATION,
            EventPayload::Metrics(_) => TYPE_METRICS,
            EventPayload::Malformed { kind, .. } => kind.as_str(),
            EventPayload::User(_) | EventPayload::Unknown { .. } => {
                return Err((TYPE_UNKNOWN, EventError::InvalidType));
            }
        };
        if !is_hyphenated_uuid(&event.id) {
            return Err((kind, EventError::InvalidIdFormat));
        }
        match &event.payload {
            EventPayload::Goal(goal) => self
                .validate_goal(goal, now)
                .map(|()| Accepted::Goal)
                .map_err(|err| (kind, err)),
            EventPayload::Evaluation(evaluation) => self
                .validate_evaluation(evaluation, now)
                .map(|()| Accepted::Evaluation)
                .map_err(|err| (kind, err)),
            // Metrics carry no timestamp constraint.
            EventPayload::Metrics(metrics_event) => Ok(Accepted::Metrics(metrics_event.clone())),
            _ => Err((kind, EventError::UnmarshalFailed)),
        }
    }

    fn validate_goal(&self, goal: &GoalEvent, now: i64) -> std::result::Result<(), EventError> {
        if goal.goal_id.is_empty() {
            return Err(EventError::EmptyField("goal_id"));
        }
        let user_missing = goal.user.as_ref().is_none_or(|u| u.id.is_empty());
        if user_missing && goal.user_id.is_empty() {
            return Err(EventError::EmptyField("user_id"));
        }
        if !self.config.accepts_timestamp(goal.timestamp, now) {
            return Err(EventError::InvalidTimestamp);
        }
        Ok(())
    }

    fn validate_evaluation(
        &self,
        evaluation: &EvaluationEvent,
        now: i64,
    ) -> std::result::Result<(), EventError> {
        if evaluation.feature_id.is_empty() {
            return Err(EventError::EmptyField("feature_id"));
        }
        // SDKs report error evaluations without a variation.
        let error_reason = evaluation
            .reason
            .as_ref()
            .is_some_and(|r| r.reason_type.is_error());
        if evaluation.variation_id.is_empty() && !error_reason {
            return Err(EventError::EmptyField("variation_id"));
        }
        if evaluation.user_id.is_empty() {
            return Err(EventError::EmptyField("user_id"));
        }
        if evaluation.reason.is_none() {
            return Err(EventError::NilReason);
        }
        if !self.config.accepts_timestamp(evaluation.timestamp, now) {
            return Err(EventError::InvalidTimestamp);
        }
        Ok(())
    }
}

enum Accepted {
    Goal,
    Evaluation,
    Metrics(MetricsEvent),
}

/// One publish call per topic; failures become per-event errors.
async fn publish(
    publisher: &Arc<dyn Publisher>,
    events: &[Event],
    kind: &'static str,
    environment_id: &str,
) -> HashMap<String, RegisterEventsError> {
    if events.is_empty() {
        return HashMap::new();
    }
    let failures = publisher.publish_multi(events).await;
    let mut errors = HashMap::with_capacity(failures.len());
    let mut repeatable = 0;
    let mut non_repeatable = 0;
    for (id, err) in failures {
        error!(error = %err, environment_id, event_type = kind, event_id = %id, "failed to publish event");
        let retriable = err.is_retriable();
        if retriable {
            repeatable += 1;
        } else {
            non_repeatable += 1;
        }
        errors.insert(
            id,
            RegisterEventsError {
                retriable,
                message: PUBLISH_FAILED.to_string(),
            },
        );
    }
    count_event(kind, CODE_NON_REPEATABLE_ERROR, non_repeatable);
    count_event(kind, CODE_REPEATABLE_ERROR, repeatable);
    count_event(kind, CODE_OK, (events.len() - errors.len()) as u64);
    errors
}

/// Event ids must be in the 36-character hyphenated form; the simple, braced
/// and URN forms are rejected.
fn is_hyphenated_uuid(id: &str) -> bool {
    id.len() == 36 && Uuid::try_parse(id).is_ok()
}
