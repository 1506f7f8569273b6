//! Telemetry metric name constants.
//!
//! Centralised metric names for heimdall operations. Components emit through
//! the `metrics` facade and never hold a registry; the daemon installs one
//! recorder (prometheus) at startup, tests install a local debugging
//! recorder. Without a recorder installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `heimdall_`. Counters end in `_total`,
//! histograms use meaningful units (e.g. `_seconds`, `_bytes`).
//!
//! # Common labels
//!
//! - `type`: cached entity or event kind (e.g. "APIKey", "Goal")
//! - `layer`: cache tier: "InMemory" or "External"
//! - `code`: outcome code (e.g. "Hit", "Miss", "OK", "InvalidID")
//! - `environment_id`: resolved environment of the calling SDK
//! - `method`: RPC name (e.g. "GetEvaluations")

/// Cache lookups.
///
/// Labels: `type`, `layer`, `code` ("Hit" | "Miss").
pub const CACHE_REQUESTS_TOTAL: &str = "heimdall_cache_requests_total";

/// Callers that attached to an already in-flight backing fetch.
///
/// Labels: `type`.
pub const COALESCED_REQUESTS_TOTAL: &str = "heimdall_coalesced_requests_total";

/// GetEvaluations outcomes.
///
/// Labels: `environment_id`, `tag`, `evaluation_type`.
pub const EVALUATIONS_TOTAL: &str = "heimdall_evaluations_total";

/// GetFeatureFlags outcomes.
///
/// Labels: `environment_id`, `tag`, `response_type`.
pub const FEATURE_FLAGS_TOTAL: &str = "heimdall_feature_flags_total";

/// GetSegmentUsers outcomes.
///
/// Labels: `environment_id`, `response_type`.
pub const SEGMENT_USERS_TOTAL: &str = "heimdall_segment_users_total";

/// Ingested events.
///
/// Labels: `type`, `code`.
pub const REGISTER_EVENTS_TOTAL: &str = "heimdall_register_events_total";

/// Requests served.
///
/// Labels: `method`, `status` ("ok" | error code).
pub const REQUESTS_TOTAL: &str = "heimdall_requests_total";

/// Request duration in seconds.
///
/// Labels: `method`.
pub const REQUEST_DURATION_SECONDS: &str = "heimdall_request_duration_seconds";

/// Background "user seen" publications.
///
/// Labels: `status` ("ok" | "error" | "timeout").
pub const USER_PUBLICATIONS_TOTAL: &str = "heimdall_user_publications_total";

/// Batch job executions.
///
/// Labels: `job`, `status` ("ok" | "busy" | "error").
pub const JOBS_TOTAL: &str = "heimdall_jobs_total";

// SDK-reported telemetry, recorded from Metrics events.

/// Labels: `environment_id`, `tag`, `api_id`, `sdk_version`, `source_id`.
pub const SDK_LATENCY_SECONDS: &str = "heimdall_sdk_latency_seconds";

/// Labels: `environment_id`, `tag`, `api_id`, `sdk_version`, `source_id`.
pub const SDK_SIZE_BYTES: &str = "heimdall_sdk_size_bytes";

/// Labels: `environment_id`, `tag`, `error_type`, `api_id`, `sdk_version`, `source_id`.
pub const SDK_ERRORS_TOTAL: &str = "heimdall_sdk_errors_total";

/// Labels: `environment_id`, `tag`, `state`.
pub const SDK_GET_EVALUATIONS_LATENCY_SECONDS: &str =
    "heimdall_sdk_get_evaluations_latency_seconds";

/// Labels: `environment_id`, `tag`, `state`.
pub const SDK_GET_EVALUATIONS_SIZE_BYTES: &str = "heimdall_sdk_get_evaluations_size_bytes";

/// Labels: `environment_id`, `tag`.
pub const SDK_TIMEOUT_ERRORS_TOTAL: &str = "heimdall_sdk_timeout_errors_total";

/// Labels: `environment_id`, `tag`.
pub const SDK_INTERNAL_ERRORS_TOTAL: &str = "heimdall_sdk_internal_errors_total";

// Label values shared across modules.

pub(crate) const TYPE_API_KEY: &str = "APIKey";
pub(crate) const TYPE_FEATURES: &str = "Features";
pub(crate) const TYPE_SEGMENT_USERS: &str = "SegmentUsers";

pub(crate) const LAYER_IN_MEMORY: &str = "InMemory";
pub(crate) const LAYER_EXTERNAL: &str = "External";

pub(crate) const CODE_HIT: &str = "Hit";
pub(crate) const CODE_MISS: &str = "Miss";

pub(crate) fn record_cache(kind: &'static str, layer: &'static str, hit: bool) {
    let code = if hit { CODE_HIT } else { CODE_MISS };
    metrics::counter!(CACHE_REQUESTS_TOTAL, "type" => kind, "layer" => layer, "code" => code)
        .increment(1);
}
