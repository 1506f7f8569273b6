//! Heimdall - evaluation and synchronization gateway for feature-flag SDKs
//!
//! SDKs talk to a [`Gateway`] instead of the feature, account and event
//! services directly. The gateway authenticates environment API keys,
//! serves feature flags and segment memberships with a fingerprint-based
//! diff protocol, evaluates flags server-side for thin clients, and fans
//! SDK events out to the goal/evaluation/user topics.
//!
//! Every backing collaborator sits behind a trait in [`traits`], so the
//! gateway runs the same against the bundled HTTP clients ([`backend`]) and
//! against in-process fakes.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use heimdall::backend::{HttpAccountSource, HttpFeatureSource, HttpPublisher};
//! use heimdall::{GetFeatureFlagsRequest, Heimdall, RequestContext, SourceId};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let timeout = Duration::from_secs(10);
//!     let gateway = Heimdall::builder()
//!         .account_source(Arc::new(HttpAccountSource::new("http://account:8080", timeout)?))
//!         .feature_source(Arc::new(HttpFeatureSource::new("http://feature:8080", timeout)?))
//!         .publisher(Arc::new(HttpPublisher::new("http://pubsub:8080", "events", timeout)?))
//!         .build()?;
//!
//!     let ctx = RequestContext::with_api_key("sdk-server-key");
//!     let response = gateway
//!         .get_feature_flags(
//!             &ctx,
//!             GetFeatureFlagsRequest {
//!                 tag: "web".to_string(),
//!                 source_id: SourceId::GoServer,
//!                 sdk_version: "1.0.0".to_string(),
//!                 ..Default::default()
//!             },
//!         )
//!         .await?;
//!
//!     println!("{} flags", response.features.len());
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod cache;
pub mod coalesce;
pub mod context;
pub mod error;
pub mod evaluation;
pub mod gateway;
#[cfg(feature = "server")]
pub mod server;
pub mod telemetry;
pub mod traits;
pub mod types;
pub mod version;

// Re-export main types at crate root
pub use cache::CacheConfig;
pub use context::RequestContext;
pub use error::{BackendError, CacheError, ErrorCode, EventError, GatewayError, PublishError, Result};
pub use gateway::{Gateway, GatewayConfig, Heimdall, HeimdallBuilder, MetricsSaveError};
pub use version::{BUILD_TIMESTAMP, GIT_BRANCH, GIT_SHA, PKG_VERSION, git_dirty, version_string};

// Re-export all types
pub use types::{
    ApiId, ApiKeyRole, BatchJob, Clause, ClauseOperator, EnvironmentApiKey, Evaluation,
    EvaluationEvent, Event, EventKind, EventPayload, Feature, GetEvaluationRequest,
    GetEvaluationResponse, GetEvaluationsRequest, GetEvaluationsResponse, GetFeatureFlagsRequest,
    GetFeatureFlagsResponse, GetSegmentUsersRequest, GetSegmentUsersResponse, GoalEvent,
    MetricsEvent, MetricsEventKind, Prerequisite, Reason, ReasonType, RegisterEventsError,
    RegisterEventsRequest, RegisterEventsResponse, RolloutVariation, Rule, SdkErrorType, Segment,
    SegmentUser, SegmentUserState, SegmentUsers, SourceId, Strategy, Target, TrackRequest, User,
    UserEvaluationCondition, UserEvaluations, UserEvaluationsState, UserEvent, Variation,
};
