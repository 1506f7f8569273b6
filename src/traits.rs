//! Collaborator seams.
//!
//! The gateway owns none of the systems behind these traits. Implementations
//! report failures with the collaborator-level error types
//! ([`BackendError`], [`PublishError`], [`CacheError`]); the gateway
//! classifies them into [`GatewayError`](crate::GatewayError)s at the call
//! site.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::{BackendError, CacheError, PublishError};
use crate::evaluation::EvaluationError;
use crate::types::{
    BatchJob, EnvironmentApiKey, Evaluation, Event, Feature, Segment, SegmentUser, SegmentUsers,
    User,
};

/// Account service: resolves API keys across all environments.
#[async_trait]
pub trait AccountSource: Send + Sync {
    /// Resolve a bearer token. Unknown tokens are `BackendError::NotFound`.
    async fn get_api_key_by_token(&self, token: &str) -> Result<EnvironmentApiKey, BackendError>;
}

/// One page of a feature listing.
#[derive(Debug, Clone, Default)]
pub struct FeaturePage {
    pub features: Vec<Feature>,
    /// Cursor for the next page; meaningless once a short page is returned.
    pub cursor: String,
}

/// Feature service: flag definitions and segment membership.
#[async_trait]
pub trait FeatureSource: Send + Sync {
    /// List one page of an environment's features, starting at `cursor`
    /// (empty for the first page).
    async fn list_features(
        &self,
        environment_id: &str,
        cursor: &str,
        page_size: usize,
    ) -> Result<FeaturePage, BackendError>;

    async fn list_segment_users(
        &self,
        environment_id: &str,
        segment_id: &str,
    ) -> Result<Vec<SegmentUser>, BackendError>;

    async fn get_segment(
        &self,
        environment_id: &str,
        segment_id: &str,
    ) -> Result<Segment, BackendError>;
}

/// Pub/sub topic publisher.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, event: &Event) -> Result<(), PublishError>;

    /// Publish a batch. Returns failures keyed by event id; ids not in the
    /// map were published.
    async fn publish_multi(&self, events: &[Event]) -> HashMap<String, PublishError> {
        let mut failures = HashMap::new();
        for event in events {
            if let Err(err) = self.publish(event).await {
                failures.insert(event.id.clone(), err);
            }
        }
        failures
    }
}

/// Shared cache tier (e.g. redis). Values are opaque bytes.
#[async_trait]
pub trait ExternalCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<(), CacheError>;
}

/// Output of an [`Evaluator`] run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvaluationOutcome {
    pub evaluations: Vec<Evaluation>,
    /// Input features that are archived, but not longer than the retention
    /// window ago.
    pub archived_feature_ids: Vec<String>,
}

/// Rule engine computing variations for a user.
pub trait Evaluator: Send + Sync {
    /// Evaluate `features` for `user`.
    ///
    /// `features` must contain every prerequisite of every feature it
    /// contains. A non-empty `tag` restricts which evaluations are returned,
    /// not which features participate.
    fn evaluate(
        &self,
        features: &[Feature],
        user: &User,
        segment_users: &HashMap<String, SegmentUsers>,
        tag: &str,
    ) -> Result<EvaluationOutcome, EvaluationError>;
}

/// Executes named maintenance jobs.
#[async_trait]
pub trait JobRunner: Send + Sync {
    /// Run a job to completion. `BackendError::ResourceExhausted` means the
    /// instance is busy with another run.
    async fn run(&self, job: BatchJob) -> Result<(), BackendError>;
}
