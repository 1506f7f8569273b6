//! Background "user seen" publication.

use tracing::error;
use uuid::Uuid;

use super::Gateway;
use crate::evaluation::selection::now_unix;
use crate::telemetry;
use crate::types::{Event, EventPayload, SourceId, User, UserEvent};

impl Gateway {
    /// Publish a [`UserEvent`] for `user` on a detached task.
    ///
    /// The task has its own deadline and is not tied to the request: it
    /// outlives cancellation of the caller, and its outcome is only logged
    /// and counted.
    pub(crate) fn publish_user(
        &self,
        environment_id: &str,
        user: &User,
        tag: &str,
        source_id: SourceId,
    ) {
        let event = Event::new(
            Uuid::new_v4().to_string(),
            EventPayload::User(UserEvent {
                user_id: user.id.clone(),
                source_id,
                tag: tag.to_string(),
                last_seen: now_unix(),
                data: user.data.clone(),
                environment_id: environment_id.to_string(),
            }),
        )
        .in_environment(environment_id);
        let publisher = self.user_publisher.clone();
        let timeout = self.config.user_publish_timeout;

        tokio::spawn(async move {
            let status = match tokio::time::timeout(timeout, publisher.publish(&event)).await {
                Ok(Ok(())) => "ok",
                Ok(Err(err)) => {
                    error!(error = %err, environment_id = %event.environment_id, event_id = %event.id, "failed to publish user event");
                    "error"
                }
                Err(_) => {
                    error!(environment_id = %event.environment_id, event_id = %event.id, "user event publication timed out");
                    "timeout"
                }
            };
            metrics::counter!(telemetry::USER_PUBLICATIONS_TOTAL, "status" => status).increment(1);
        });
    }
}
