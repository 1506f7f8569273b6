//! `GetFeatureFlags`: time-window diff of raw flag definitions for
//! server-side SDKs.

use std::time::Instant;

use tracing::{debug, error, instrument};

use super::auth::is_expected;
use super::{Gateway, METHOD_GET_FEATURE_FLAGS, record_request};
use crate::Result;
use crate::context::RequestContext;
use crate::error::GatewayError;
use crate::evaluation::features_id;
use crate::evaluation::selection::{
    CLOCK_SKEW_SECS, filter_by_tag, filter_out_archived, is_archived_within_retention,
    is_beyond_retention, now_unix,
};
use crate::telemetry;
use crate::types::{
    ApiKeyRole, Feature, GetFeatureFlagsRequest, GetFeatureFlagsResponse, SourceId,
};

const CODE_BAD_REQUEST: &str = "BadRequest";
const CODE_INTERNAL_ERROR: &str = "InternalError";
const CODE_NO_FEATURES: &str = "NoFeatures";
const CODE_NONE: &str = "None";
const CODE_ALL: &str = "All";
const CODE_DIFF: &str = "Diff";

fn count(environment_id: &str, tag: &str, code: &'static str) {
    metrics::counter!(telemetry::FEATURE_FLAGS_TOTAL,
        "environment_id" => environment_id.to_owned(),
        "tag" => tag.to_owned(),
        "response_type" => code,
    )
    .increment(1);
}

impl Gateway {
    /// Ship flag definitions changed since the caller's last sync.
    ///
    /// Branches, in precedence order:
    /// 1. no candidate flags: empty payload, empty id
    /// 2. caller's id equals the current id: unchanged, empty payload
    /// 3. caller has no id, or `requested_at` is beyond the retention
    ///    window: every active flag, `force_update = true`
    /// 4. otherwise: flags updated after `requested_at` (minus clock skew)
    ///    plus ids archived within the window
    #[instrument(skip_all, fields(method = METHOD_GET_FEATURE_FLAGS, tag = %req.tag))]
    pub async fn get_feature_flags(
        &self,
        ctx: &RequestContext,
        req: GetFeatureFlagsRequest,
    ) -> Result<GetFeatureFlagsResponse> {
        let start = Instant::now();
        let result = self.get_feature_flags_inner(ctx, req).await;
        record_request(METHOD_GET_FEATURE_FLAGS, start, &result);
        result
    }

    async fn get_feature_flags_inner(
        &self,
        ctx: &RequestContext,
        req: GetFeatureFlagsRequest,
    ) -> Result<GetFeatureFlagsResponse> {
        let key = self
            .check_request(ctx, &[ApiKeyRole::SdkServer])
            .await
            .inspect_err(|err| {
                if !is_expected(err) {
                    error!(error = %err, feature_flags_id = %req.feature_flags_id, "failed to check GetFeatureFlags request");
                }
            })?;
        let env = key.environment_id.as_str();

        if let Err(err) = validate_sdk_identity(req.source_id, &req.sdk_version) {
            error!(error = %err, environment_id = env, api_key_id = %key.api_key_id, "failed to validate GetFeatureFlags request");
            count(env, &req.tag, CODE_BAD_REQUEST);
            return Err(err);
        }

        let features = self
            .features
            .get(env)
            .await
            .inspect_err(|_| count(env, &req.tag, CODE_INTERNAL_ERROR))?;

        let (response, code) = feature_flags_diff(&features, &req, now_unix());
        count(env, &req.tag, code);
        debug!(environment_id = env, response_type = code, features = response.features.len(), "feature flags response");
        Ok(response)
    }
}

/// The four-way branch over an environment's catalog.
fn feature_flags_diff(
    features: &[Feature],
    req: &GetFeatureFlagsRequest,
    now: i64,
) -> (GetFeatureFlagsResponse, &'static str) {
    let targets = if req.tag.is_empty() {
        features.to_vec()
    } else {
        filter_by_tag(features, &req.tag)
    };
    if targets.is_empty() {
        return (
            GetFeatureFlagsResponse {
                requested_at: now,
                ..Default::default()
            },
            CODE_NO_FEATURES,
        );
    }

    // Archived flags never contribute to the id.
    let active = filter_out_archived(&targets);
    let id = features_id(&active);
    if req.feature_flags_id == id {
        return (
            GetFeatureFlagsResponse {
                feature_flags_id: id,
                requested_at: now,
                ..Default::default()
            },
            CODE_NONE,
        );
    }

    if req.feature_flags_id.is_empty() || is_beyond_retention(req.requested_at, now) {
        return (
            GetFeatureFlagsResponse {
                feature_flags_id: id,
                features: active,
                archived_feature_flag_ids: Vec::new(),
                requested_at: now,
                force_update: true,
            },
            CODE_ALL,
        );
    }

    let adjusted = req.requested_at - CLOCK_SKEW_SECS;
    let mut updated = Vec::new();
    let mut archived_ids = Vec::new();
    for feature in targets {
        if feature.archived {
            if is_archived_within_retention(&feature, now) {
                archived_ids.push(feature.id);
            }
            continue;
        }
        if feature.updated_at > adjusted {
            updated.push(feature);
        }
    }
    (
        GetFeatureFlagsResponse {
            feature_flags_id: id,
            features: updated,
            archived_feature_flag_ids: archived_ids,
            requested_at: now,
            force_update: false,
        },
        CODE_DIFF,
    )
}

/// Server SDK requests must identify the SDK.
pub(crate) fn validate_sdk_identity(source_id: SourceId, sdk_version: &str) -> Result<()> {
    if source_id == SourceId::Unknown {
        return Err(GatewayError::Required("source id"));
    }
    if sdk_version.is_empty() {
        return Err(GatewayError::Required("sdk version"));
    }
    Ok(())
}
