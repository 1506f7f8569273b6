//! Legacy goal-only `Track`, shared by the gRPC and query-string HTTP
//! transports.

use std::time::Instant;

use tracing::{error, instrument, warn};
use uuid::Uuid;

use super::events::{
    CODE_NON_REPEATABLE_ERROR, CODE_OK, CODE_REPEATABLE_ERROR, TYPE_GOAL, count_event,
};
use super::{Gateway, METHOD_TRACK, record_request};
use crate::Result;
use crate::context::{RequestContext, obfuscate_api_key};
use crate::error::{GatewayError, PublishError};
use crate::evaluation::selection::now_unix;
use crate::types::{Event, EventPayload, GoalEvent, TrackRequest, User};

const TYPE_TRACK: &str = "Track";
const CODE_INVALID_URL_PARAMS: &str = "InvalidURLParams";

impl Gateway {
    /// Publish a single goal event to the goal topic.
    ///
    /// The API key travels in the request itself rather than in request
    /// metadata.
    #[instrument(skip_all, fields(method = METHOD_TRACK, goal_id = %req.goal_id))]
    pub async fn track(&self, ctx: &RequestContext, req: TrackRequest) -> Result<()> {
        let start = Instant::now();
        let result = self.track_inner(ctx, req).await;
        record_request(METHOD_TRACK, start, &result);
        result
    }

    async fn track_inner(&self, ctx: &RequestContext, req: TrackRequest) -> Result<()> {
        if let Err(err) = self.validate_track_request(&req, now_unix()) {
            count_event(TYPE_TRACK, CODE_INVALID_URL_PARAMS, 1);
            warn!(error = %err, "invalid track parameters");
            return Err(err);
        }
        let key = self
            .check_track_request(ctx, &req.api_key)
            .await
            .inspect_err(|err| {
                error!(error = %err, api_key = %obfuscate_api_key(&req.api_key), "failed to get environment api key");
            })?;

        let goal = GoalEvent {
            timestamp: req.timestamp,
            goal_id: req.goal_id,
            user_id: req.user_id.clone(),
            value: req.value,
            user: Some(User::new(req.user_id)),
            tag: req.tag,
            ..Default::default()
        };
        let event = Event::new(Uuid::new_v4().to_string(), EventPayload::Goal(goal))
            .in_environment(&key.environment_id);

        if let Err(err) = self.goal_publisher.publish(&event).await {
            let code = match err {
                PublishError::BadMessage => CODE_NON_REPEATABLE_ERROR,
                PublishError::Failed(_) => CODE_REPEATABLE_ERROR,
            };
            count_event(TYPE_GOAL, code, 1);
            error!(error = %err, environment_id = %key.environment_id, event_id = %event.id, "failed to publish goal event");
            return Err(GatewayError::Internal);
        }
        count_event(TYPE_GOAL, CODE_OK, 1);
        Ok(())
    }

    fn validate_track_request(&self, req: &TrackRequest, now: i64) -> Result<()> {
        if req.api_key.is_empty() {
            return Err(GatewayError::MissingApiKey);
        }
        if req.user_id.is_empty() {
            return Err(GatewayError::Required("user id"));
        }
        if req.goal_id.is_empty() {
            return Err(GatewayError::Required("goal id"));
        }
        if req.tag.is_empty() {
            return Err(GatewayError::Required("tag"));
        }
        if !self.config.accepts_timestamp(req.timestamp, now) {
            return Err(GatewayError::InvalidTimestamp);
        }
        Ok(())
    }
}
