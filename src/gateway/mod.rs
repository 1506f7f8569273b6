//! The SDK-facing gateway.
//!
//! [`Gateway`] owns the caches and collaborators and implements one method
//! per RPC. Transports (the `server` module) only convert wire shapes and call
//! into it; all protocol decisions live here.
//!
//! # Request flow
//!
//! ```text
//! request ─► check_request ─► validate ─► caches ─► protocol branch ─► response
//!              │                            │
//!              │ cancel / key / role        │ coalesced backing fetch on miss
//! ```
//!
//! Every public method records `heimdall_requests_total` and
//! `heimdall_request_duration_seconds` on completion.

mod auth;
mod builder;
mod evaluations;
mod events;
mod flags;
mod jobs;
mod metrics_event;
mod segments;
mod track;
mod user;

use std::sync::Arc;
use std::time::{Duration, Instant};

pub use builder::{Heimdall, HeimdallBuilder};
pub use metrics_event::MetricsSaveError;

use crate::Result;
use crate::cache::{ApiKeyResolver, FeatureCatalog, SegmentUsersCache};
use crate::telemetry;
use crate::traits::{Evaluator, JobRunner, Publisher};

/// Tunables of the protocol handlers.
///
/// ```rust
/// # use heimdall::GatewayConfig;
/// # use std::time::Duration;
/// let config = GatewayConfig::new()
///     .furthest_event_timestamp(Duration::from_secs(600))
///     .user_publish_timeout(Duration::from_secs(5));
/// ```
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// How far in the past goal/evaluation event timestamps may lie.
    /// Default: 744 hours.
    pub oldest_event_timestamp: Duration,
    /// How far in the future event timestamps may lie. Default: 1 hour.
    pub furthest_event_timestamp: Duration,
    /// Deadline of the background "user seen" publication. Default: 20s.
    pub user_publish_timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            oldest_event_timestamp: Duration::from_secs(744 * 60 * 60),
            furthest_event_timestamp: Duration::from_secs(60 * 60),
            user_publish_timeout: Duration::from_secs(20),
        }
    }
}

impl GatewayConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn oldest_event_timestamp(mut self, window: Duration) -> Self {
        self.oldest_event_timestamp = window;
        self
    }

    pub fn furthest_event_timestamp(mut self, window: Duration) -> Self {
        self.furthest_event_timestamp = window;
        self
    }

    pub fn user_publish_timeout(mut self, timeout: Duration) -> Self {
        self.user_publish_timeout = timeout;
        self
    }

    /// Whether `timestamp` (unix seconds) lies inside the accepted event
    /// window around `now`. Both bounds are inclusive.
    pub(crate) fn accepts_timestamp(&self, timestamp: i64, now: i64) -> bool {
        let oldest = now - self.oldest_event_timestamp.as_secs() as i64;
        let furthest = now + self.furthest_event_timestamp.as_secs() as i64;
        (oldest..=furthest).contains(&timestamp)
    }
}

/// Evaluation and synchronization gateway. Construct with
/// [`Heimdall::builder()`].
pub struct Gateway {
    config: GatewayConfig,
    api_keys: ApiKeyResolver,
    features: FeatureCatalog,
    segment_users: SegmentUsersCache,
    evaluator: Arc<dyn Evaluator>,
    goal_publisher: Arc<dyn Publisher>,
    evaluation_publisher: Arc<dyn Publisher>,
    user_publisher: Arc<dyn Publisher>,
    jobs: Option<Arc<dyn JobRunner>>,
}

impl Gateway {
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }
}

// RPC names, used as the `method` metric label.
pub(crate) const METHOD_GET_EVALUATIONS: &str = "GetEvaluations";
pub(crate) const METHOD_GET_EVALUATION: &str = "GetEvaluation";
pub(crate) const METHOD_GET_FEATURE_FLAGS: &str = "GetFeatureFlags";
pub(crate) const METHOD_GET_SEGMENT_USERS: &str = "GetSegmentUsers";
pub(crate) const METHOD_REGISTER_EVENTS: &str = "RegisterEvents";
pub(crate) const METHOD_TRACK: &str = "Track";
pub(crate) const METHOD_RUN_JOB: &str = "RunJob";

/// Record request outcome metrics (counter + histogram).
fn record_request<T>(method: &'static str, start: Instant, result: &Result<T>) {
    let status = match result {
        Ok(_) => "ok",
        Err(err) => err.code().as_str(),
    };
    metrics::counter!(telemetry::REQUESTS_TOTAL, "method" => method, "status" => status)
        .increment(1);
    metrics::histogram!(telemetry::REQUEST_DURATION_SECONDS, "method" => method)
        .record(start.elapsed().as_secs_f64());
}
