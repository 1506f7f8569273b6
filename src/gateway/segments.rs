//! `GetSegmentUsers`: time-window diff of segment membership for
//! server-side SDKs.

use std::collections::HashSet;
use std::time::Instant;

use futures_util::future::try_join_all;
use tracing::{debug, error, instrument};

use super::auth::is_expected;
use super::flags::validate_sdk_identity;
use super::{Gateway, METHOD_GET_SEGMENT_USERS, record_request};
use crate::Result;
use crate::context::RequestContext;
use crate::evaluation::selection::{
    CLOCK_SKEW_SECS, filter_out_archived, is_beyond_retention, now_unix, segment_ids,
};
use crate::telemetry;
use crate::types::{ApiKeyRole, GetSegmentUsersRequest, GetSegmentUsersResponse, SegmentUsers};

const CODE_BAD_REQUEST: &str = "BadRequest";
const CODE_INTERNAL_ERROR: &str = "InternalError";
const CODE_NO_FEATURES: &str = "NoFeatures";
const CODE_NO_SEGMENTS: &str = "NoSegments";
const CODE_NONE: &str = "None";
const CODE_ALL: &str = "All";
const CODE_DIFF: &str = "Diff";

fn count(environment_id: &str, code: &'static str) {
    metrics::counter!(telemetry::SEGMENT_USERS_TOTAL,
        "environment_id" => environment_id.to_owned(),
        "response_type" => code,
    )
    .increment(1);
}

impl Gateway {
    /// Ship membership of segments referenced by the environment's active
    /// flags, changed since the caller's last sync, plus the ids of held
    /// segments no flag references any more.
    #[instrument(skip_all, fields(method = METHOD_GET_SEGMENT_USERS, segments = req.segment_ids.len()))]
    pub async fn get_segment_users(
        &self,
        ctx: &RequestContext,
        req: GetSegmentUsersRequest,
    ) -> Result<GetSegmentUsersResponse> {
        let start = Instant::now();
        let result = self.get_segment_users_inner(ctx, req).await;
        record_request(METHOD_GET_SEGMENT_USERS, start, &result);
        result
    }

    async fn get_segment_users_inner(
        &self,
        ctx: &RequestContext,
        req: GetSegmentUsersRequest,
    ) -> Result<GetSegmentUsersResponse> {
        let key = self
            .check_request(ctx, &[ApiKeyRole::SdkServer])
            .await
            .inspect_err(|err| {
                if !is_expected(err) {
                    error!(error = %err, "failed to check GetSegmentUsers request");
                }
            })?;
        let env = key.environment_id.as_str();

        if let Err(err) = validate_sdk_identity(req.source_id, &req.sdk_version) {
            error!(error = %err, environment_id = env, api_key_id = %key.api_key_id, "failed to validate GetSegmentUsers request");
            count(env, CODE_BAD_REQUEST);
            return Err(err);
        }

        let now = now_unix();
        let features = self
            .features
            .get(env)
            .await
            .inspect_err(|_| count(env, CODE_INTERNAL_ERROR))?;
        let targets = filter_out_archived(&features);
        if targets.is_empty() {
            count(env, CODE_NO_FEATURES);
            return Ok(full_response(Vec::new(), now));
        }

        let ids = segment_ids(&targets);
        if ids.is_empty() {
            count(env, CODE_NO_SEGMENTS);
            return Ok(full_response(Vec::new(), now));
        }

        let segments = try_join_all(
            ids.iter()
                .map(|segment_id| self.segment_users.get_by_segment(segment_id, env)),
        )
        .await
        .inspect_err(|err| {
            error!(error = %err, environment_id = env, "failed to get segment users");
            count(env, CODE_INTERNAL_ERROR);
        })?;

        let (response, code) = segment_users_diff(segments, &ids, &req, now);
        count(env, code);
        debug!(
            environment_id = env,
            response_type = code,
            updated = response.segment_users.len(),
            deleted = response.deleted_segment_ids.len(),
            "segment users response"
        );
        Ok(response)
    }
}

fn full_response(segment_users: Vec<SegmentUsers>, now: i64) -> GetSegmentUsersResponse {
    GetSegmentUsersResponse {
        segment_users,
        deleted_segment_ids: Vec::new(),
        requested_at: now,
        force_update: true,
    }
}

/// `segments` holds the current membership of every id in `target_ids`.
fn segment_users_diff(
    segments: Vec<SegmentUsers>,
    target_ids: &[String],
    req: &GetSegmentUsersRequest,
    now: i64,
) -> (GetSegmentUsersResponse, &'static str) {
    if is_beyond_retention(req.requested_at, now) {
        return (full_response(segments, now), CODE_ALL);
    }

    let targets: HashSet<&str> = target_ids.iter().map(String::as_str).collect();
    let deleted: Vec<String> = req
        .segment_ids
        .iter()
        .filter(|id| !targets.contains(id.as_str()))
        .cloned()
        .collect();

    let adjusted = req.requested_at - CLOCK_SKEW_SECS;
    let updated: Vec<SegmentUsers> = segments
        .into_iter()
        .filter(|s| s.updated_at > adjusted)
        .collect();

    let code = if updated.is_empty() && deleted.is_empty() {
        CODE_NONE
    } else {
        CODE_DIFF
    };
    (
        GetSegmentUsersResponse {
            segment_users: updated,
            deleted_segment_ids: deleted,
            requested_at: now,
            force_update: false,
        },
        code,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000;

    fn segment(id: &str, updated_at: i64) -> SegmentUsers {
        SegmentUsers {
            segment_id: id.into(),
            users: Vec::new(),
            updated_at,
        }
    }

    fn request(held: &[&str], requested_at: i64) -> GetSegmentUsersRequest {
        GetSegmentUsersRequest {
            segment_ids: held.iter().map(|s| s.to_string()).collect(),
            requested_at,
            ..Default::default()
        }
    }

    #[test]
    fn stale_requested_at_forces_full_payload() {
        let segments = vec![segment("s1", NOW - 100)];
        let (response, code) =
            segment_users_diff(segments, &["s1".into()], &request(&[], 0), NOW);
        assert_eq!(code, CODE_ALL);
        assert!(response.force_update);
        assert_eq!(response.segment_users.len(), 1);
    }

    #[test]
    fn unreferenced_held_segments_are_deleted() {
        let requested_at = NOW - 60;
        let segments = vec![segment("s1", requested_at - 3600)];
        let (response, code) = segment_users_diff(
            segments,
            &["s1".into()],
            &request(&["s1", "s2"], requested_at),
            NOW,
        );
        assert_eq!(code, CODE_DIFF);
        assert!(response.segment_users.is_empty());
        assert_eq!(response.deleted_segment_ids, vec!["s2"]);
    }

    #[test]
    fn nothing_changed_is_none() {
        let requested_at = NOW - 60;
        let segments = vec![segment("s1", requested_at - CLOCK_SKEW_SECS)];
        let (response, code) =
            segment_users_diff(segments, &["s1".into()], &request(&["s1"], requested_at), NOW);
        assert_eq!(code, CODE_NONE);
        assert!(!response.force_update);
        assert!(response.segment_users.is_empty());
    }
}
