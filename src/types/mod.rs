//! Public types for the Heimdall API.

mod api_key;
mod evaluation;
mod event;
mod feature;
mod job;
mod request;
mod segment;
mod user;

pub use api_key::{ApiKeyRole, EnvironmentApiKey};
pub use evaluation::{
    Evaluation, Reason, ReasonType, UserEvaluations, UserEvaluationsState, evaluation_id,
};
pub use event::{
    ApiId, EvaluationEvent, Event, EventKind, EventPayload, GoalEvent, MetricsEvent,
    MetricsEventKind, SdkErrorType, SourceId, UserEvent,
};
pub use feature::{
    Clause, ClauseOperator, Feature, Prerequisite, RolloutVariation, Rule, Strategy, Target,
    Variation,
};
pub use job::BatchJob;
pub use request::{
    GetEvaluationRequest, GetEvaluationResponse, GetEvaluationsRequest, GetEvaluationsResponse,
    GetFeatureFlagsRequest, GetFeatureFlagsResponse, GetSegmentUsersRequest,
    GetSegmentUsersResponse, RegisterEventsError, RegisterEventsRequest, RegisterEventsResponse,
    TrackRequest, UserEvaluationCondition,
};
pub use segment::{Segment, SegmentUser, SegmentUserState, SegmentUsers};
pub use user::User;
