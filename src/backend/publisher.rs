//! Pub/sub publisher over HTTP.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use super::{HttpBase, check_status};
use crate::error::{BackendError, PublishError};
use crate::traits::Publisher;
use crate::types::Event;

/// Publishes to one topic through `POST /v1/topics/{topic}:publish`.
///
/// The endpoint answers `400` when the whole batch is unpublishable and
/// otherwise reports per-message failures in the body.
#[derive(Clone)]
pub struct HttpPublisher {
    base: HttpBase,
    topic: String,
}

impl HttpPublisher {
    pub fn new(
        base_url: impl Into<String>,
        topic: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, BackendError> {
        Ok(Self {
            base: HttpBase::new(base_url, timeout)?,
            topic: topic.into(),
        })
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    async fn send(&self, events: &[Event]) -> Result<HashMap<String, PublishError>, PublishError> {
        let response = self
            .base
            .client()
            .post(self.base.url(&format!("/v1/topics/{}:publish", self.topic)))
            .json(&PublishRequest { events })
            .send()
            .await
            .map_err(|e| PublishError::Failed(e.to_string()))?;
        if response.status() == StatusCode::BAD_REQUEST {
            return Err(PublishError::BadMessage);
        }
        let response = check_status(response)
            .await
            .map_err(|e| PublishError::Failed(e.to_string()))?;
        let body: PublishResponse = response
            .json()
            .await
            .map_err(|e| PublishError::Failed(e.to_string()))?;
        Ok(body
            .failures
            .into_iter()
            .map(|(id, failure)| {
                let err = if failure.bad_message {
                    PublishError::BadMessage
                } else {
                    PublishError::Failed(failure.message)
                };
                (id, err)
            })
            .collect())
    }
}

#[derive(Serialize)]
struct PublishRequest<'a> {
    events: &'a [Event],
}

#[derive(Deserialize)]
struct PublishResponse {
    #[serde(default)]
    failures: HashMap<String, PublishFailure>,
}

#[derive(Deserialize)]
struct PublishFailure {
    #[serde(default)]
    bad_message: bool,
    #[serde(default)]
    message: String,
}

#[async_trait]
impl Publisher for HttpPublisher {
    async fn publish(&self, event: &Event) -> Result<(), PublishError> {
        let mut failures = self.send(std::slice::from_ref(event)).await?;
        match failures.remove(&event.id) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn publish_multi(&self, events: &[Event]) -> HashMap<String, PublishError> {
        match self.send(events).await {
            Ok(failures) => failures,
            // A failed call fails every message in it.
            Err(err) => events.iter().map(|e| (e.id.clone(), err.clone())).collect(),
        }
    }
}
