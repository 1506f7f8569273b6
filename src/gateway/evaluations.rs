//! `GetEvaluations` and `GetEvaluation`: fingerprint short-circuit sync.

use std::collections::HashMap;
use std::time::Instant;

use futures_util::future::try_join_all;
use tracing::{debug, error, instrument};

use super::auth::is_expected;
use super::{Gateway, METHOD_GET_EVALUATION, METHOD_GET_EVALUATIONS, record_request};
use crate::Result;
use crate::context::RequestContext;
use crate::error::GatewayError;
use crate::evaluation::selection::{
    dependency_ids, diff_targets, filter_by_tag, filter_out_archived, is_beyond_retention,
    now_unix, prerequisite_closure, segment_ids, updated_since,
};
use crate::evaluation::{NO_EVALUATIONS, user_evaluations_id};
use crate::telemetry;
use crate::traits::EvaluationOutcome;
use crate::types::{
    ApiKeyRole, Feature, GetEvaluationRequest, GetEvaluationResponse, GetEvaluationsRequest,
    GetEvaluationsResponse, SegmentUsers, User, UserEvaluationCondition, UserEvaluations,
    UserEvaluationsState,
};

// `evaluation_type` label values.
const CODE_BAD_REQUEST: &str = "BadRequest";
const CODE_INTERNAL_ERROR: &str = "InternalError";
const CODE_NO_FEATURES: &str = "NoFeatures";
const CODE_NONE: &str = "None";
const CODE_OLD: &str = "Old";
const CODE_ALL: &str = "All";
const CODE_DIFF: &str = "Diff";

fn count(environment_id: &str, tag: &str, code: &'static str) {
    metrics::counter!(telemetry::EVALUATIONS_TOTAL,
        "environment_id" => environment_id.to_owned(),
        "tag" => tag.to_owned(),
        "evaluation_type" => code,
    )
    .increment(1);
}

impl Gateway {
    /// Evaluate every candidate feature for a user.
    ///
    /// Outcomes, in precedence order: no candidates (sentinel fingerprint),
    /// unchanged fingerprint (empty payload), then a fresh evaluation, either
    /// evaluated-at diffing when the request carries a
    /// [`UserEvaluationCondition`] or legacy full recompute otherwise.
    #[instrument(skip_all, fields(method = METHOD_GET_EVALUATIONS, tag = %req.tag))]
    pub async fn get_evaluations(
        &self,
        ctx: &RequestContext,
        req: GetEvaluationsRequest,
    ) -> Result<GetEvaluationsResponse> {
        let start = Instant::now();
        let result = self.get_evaluations_inner(ctx, req).await;
        record_request(METHOD_GET_EVALUATIONS, start, &result);
        result
    }

    async fn get_evaluations_inner(
        &self,
        ctx: &RequestContext,
        req: GetEvaluationsRequest,
    ) -> Result<GetEvaluationsResponse> {
        let key = self
            .check_request(ctx, &[ApiKeyRole::SdkClient])
            .await
            .inspect_err(|err| {
                if !is_expected(err) {
                    error!(error = %err, source_id = req.source_id.as_str(), sdk_version = %req.sdk_version, "failed to check GetEvaluations request");
                }
            })?;
        let env = key.environment_id.as_str();

        let user = match validate_user(req.user.as_ref()) {
            Ok(user) => user,
            Err(err) => {
                error!(error = %err, environment_id = env, source_id = req.source_id.as_str(), "failed to validate GetEvaluations request");
                count(env, &req.tag, CODE_BAD_REQUEST);
                return Err(err);
            }
        };
        self.publish_user(env, user, &req.tag, req.source_id);

        let features = self.features.get(env).await.inspect_err(|_| {
            count(env, &req.tag, CODE_INTERNAL_ERROR);
        })?;

        let candidates = bulk_candidates(&features, &req.tag);
        if candidates.is_empty() {
            count(env, &req.tag, CODE_NO_FEATURES);
            return Ok(GetEvaluationsResponse {
                state: UserEvaluationsState::Full,
                evaluations: empty_user_evaluations(),
                user_evaluations_id: NO_EVALUATIONS.to_string(),
            });
        }

        let ueid = user_evaluations_id(&user.id, &user.data, &candidates);
        if req.user_evaluations_id == ueid {
            // Deployed SDKs read an empty payload with their own id as
            // "unchanged"; there is no dedicated state for it.
            count(env, &req.tag, CODE_NONE);
            debug!(environment_id = env, features = features.len(), candidates = candidates.len(), "user evaluations id is unchanged");
            return Ok(GetEvaluationsResponse {
                state: UserEvaluationsState::Full,
                evaluations: empty_user_evaluations(),
                user_evaluations_id: ueid,
            });
        }

        let segment_users = self.segment_users_for(env, &features).await.inspect_err(|err| {
            count(env, &req.tag, CODE_INTERNAL_ERROR);
            error!(error = %err, environment_id = env, "failed to get segment users map");
        })?;

        let evaluated = match req.user_evaluation_condition {
            // Legacy SDKs: full recompute, tag required.
            None => {
                if req.tag.is_empty() {
                    count(env, &req.tag, CODE_BAD_REQUEST);
                    return Err(GatewayError::Required("tag"));
                }
                self.evaluate_for(env, &features, user, &segment_users, &req.tag, false)
            }
            // Current SDKs: re-evaluate only what changed since `evaluated_at`.
            Some(condition) => self.evaluate_by_evaluated_at(
                env,
                &features,
                user,
                &segment_users,
                &req.user_evaluations_id,
                condition,
                &req.tag,
            ),
        };
        let evaluations = evaluated.inspect_err(|_| count(env, &req.tag, CODE_INTERNAL_ERROR))?;
        let code = match (req.user_evaluation_condition, evaluations.force_update) {
            (None, _) => CODE_OLD,
            (Some(_), true) => CODE_ALL,
            (Some(_), false) => CODE_DIFF,
        };
        count(env, &req.tag, code);

        debug!(environment_id = env, features = features.len(), candidates = candidates.len(), evaluations = evaluations.evaluations.len(), "user evaluations id has changed");
        Ok(GetEvaluationsResponse {
            state: UserEvaluationsState::Full,
            evaluations,
            user_evaluations_id: ueid,
        })
    }

    /// Evaluate a single feature for a user.
    ///
    /// The feature is evaluated together with its transitive prerequisites
    /// when it has any. `FeatureNotFound` when the feature is not in the
    /// catalog; `EvaluationNotFound` when it produced no evaluation (e.g. it
    /// lacks the requested tag).
    #[instrument(skip_all, fields(method = METHOD_GET_EVALUATION, feature_id = %req.feature_id))]
    pub async fn get_evaluation(
        &self,
        ctx: &RequestContext,
        req: GetEvaluationRequest,
    ) -> Result<GetEvaluationResponse> {
        let start = Instant::now();
        let result = self.get_evaluation_inner(ctx, req).await;
        record_request(METHOD_GET_EVALUATION, start, &result);
        result
    }

    async fn get_evaluation_inner(
        &self,
        ctx: &RequestContext,
        req: GetEvaluationRequest,
    ) -> Result<GetEvaluationResponse> {
        let key = self
            .check_request(ctx, &[ApiKeyRole::SdkClient])
            .await
            .inspect_err(|err| {
                if !is_expected(err) {
                    error!(error = %err, feature_id = %req.feature_id, "failed to check GetEvaluation request");
                }
            })?;
        let env = key.environment_id.as_str();

        let user = validate_get_evaluation(&req).inspect_err(|err| {
            error!(error = %err, environment_id = env, source_id = req.source_id.as_str(), "failed to validate GetEvaluation request");
        })?;
        self.publish_user(env, user, &req.tag, req.source_id);

        let features = filter_out_archived(&self.features.get(env).await?);
        let targets = single_candidates(&features, &req.feature_id)?;
        let segment_users = self.segment_users_for(env, &targets).await.inspect_err(|err| {
            error!(error = %err, environment_id = env, "failed to get segment users map");
        })?;
        let evaluations =
            self.evaluate_for(env, &targets, user, &segment_users, &req.tag, false)?;

        evaluations
            .evaluations
            .into_iter()
            .find(|e| e.feature_id == req.feature_id)
            .map(|evaluation| GetEvaluationResponse { evaluation })
            .ok_or_else(|| {
                error!(environment_id = env, feature_id = %req.feature_id, tag = %req.tag, "failed to find evaluation");
                GatewayError::EvaluationNotFound
            })
    }

    /// Membership of every segment `features` reference, by segment id.
    pub(crate) async fn segment_users_for(
        &self,
        environment_id: &str,
        features: &[Feature],
    ) -> Result<HashMap<String, SegmentUsers>> {
        let ids = segment_ids(features);
        let segments = try_join_all(
            ids.iter()
                .map(|segment_id| self.segment_users.get_by_segment(segment_id, environment_id)),
        )
        .await?;
        Ok(ids.into_iter().zip(segments).collect())
    }

    #[allow(clippy::too_many_arguments)]
    fn evaluate_by_evaluated_at(
        &self,
        environment_id: &str,
        features: &[Feature],
        user: &User,
        segment_users: &HashMap<String, SegmentUsers>,
        previous_id: &str,
        condition: UserEvaluationCondition,
        tag: &str,
    ) -> Result<UserEvaluations> {
        let now = now_unix();
        if previous_id.is_empty() || is_beyond_retention(condition.evaluated_at, now) {
            return self.evaluate_for(environment_id, features, user, segment_users, tag, true);
        }
        let updated = updated_since(
            features,
            condition.evaluated_at,
            condition.user_attributes_updated,
        );
        // The id changed although neither flags nor attributes did: the SDK
        // state is suspect, replace it.
        if updated.is_empty() {
            return self.evaluate_for(environment_id, features, user, segment_users, tag, true);
        }
        let targets = diff_targets(&updated, features);
        self.evaluate_for(environment_id, &targets, user, segment_users, tag, false)
    }

    fn evaluate_for(
        &self,
        environment_id: &str,
        features: &[Feature],
        user: &User,
        segment_users: &HashMap<String, SegmentUsers>,
        tag: &str,
        force_update: bool,
    ) -> Result<UserEvaluations> {
        let EvaluationOutcome {
            evaluations,
            archived_feature_ids,
        } = self
            .evaluator
            .evaluate(features, user, segment_users, tag)
            .map_err(|err| {
                let feature_ids: Vec<&str> = features.iter().map(|f| f.id.as_str()).collect();
                error!(error = %err, environment_id, user_id = %user.id, tag, ?feature_ids, "failed to evaluate");
                GatewayError::Internal
            })?;
        Ok(UserEvaluations {
            id: user_evaluations_id(&user.id, &user.data, features),
            evaluations,
            archived_feature_ids,
            force_update,
            created_at: now_unix(),
        })
    }
}

/// Non-archived features, narrowed to `tag` when one is given.
fn bulk_candidates(features: &[Feature], tag: &str) -> Vec<Feature> {
    let active = filter_out_archived(features);
    if tag.is_empty() {
        active
    } else {
        filter_by_tag(&active, tag)
    }
}

/// The target feature, plus its transitive prerequisites if it has any.
fn single_candidates(features: &[Feature], feature_id: &str) -> Result<Vec<Feature>> {
    let target = features
        .iter()
        .find(|f| f.id == feature_id)
        .ok_or(GatewayError::FeatureNotFound)?;
    if dependency_ids(target).next().is_none() {
        return Ok(vec![target.clone()]);
    }
    Ok(prerequisite_closure(std::slice::from_ref(target), features).features)
}

fn validate_user(user: Option<&User>) -> Result<&User> {
    let user = user.ok_or(GatewayError::Required("user"))?;
    if user.id.is_empty() {
        return Err(GatewayError::Required("user id"));
    }
    Ok(user)
}

fn validate_get_evaluation(req: &GetEvaluationRequest) -> Result<&User> {
    if req.tag.is_empty() {
        return Err(GatewayError::Required("tag"));
    }
    let user = validate_user(req.user.as_ref())?;
    if req.feature_id.is_empty() {
        return Err(GatewayError::Required("feature id"));
    }
    Ok(user)
}

fn empty_user_evaluations() -> UserEvaluations {
    UserEvaluations {
        created_at: now_unix(),
        ..UserEvaluations::empty(NO_EVALUATIONS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Prerequisite;

    fn feature(id: &str, tags: &[&str]) -> Feature {
        Feature {
            id: id.into(),
            enabled: true,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn bulk_candidates_skip_archived_and_other_tags() {
        let mut archived = feature("archived", &["web"]);
        archived.archived = true;
        let features = vec![feature("a", &["web"]), feature("b", &["ios"]), archived];

        let ids: Vec<String> = bulk_candidates(&features, "web").into_iter().map(|f| f.id).collect();
        assert_eq!(ids, vec!["a"]);
        assert_eq!(bulk_candidates(&features, "").len(), 2);
    }

    #[test]
    fn single_candidates_include_prerequisites() {
        let mut child = feature("child", &[]);
        child.prerequisites.push(Prerequisite {
            feature_id: "parent".into(),
            variation_id: "on".into(),
        });
        let features = vec![child, feature("parent", &[]), feature("other", &[])];

        let ids: Vec<String> = single_candidates(&features, "child")
            .unwrap()
            .into_iter()
            .map(|f| f.id)
            .collect();
        assert_eq!(ids, vec!["child", "parent"]);
        assert_eq!(single_candidates(&features, "other").unwrap().len(), 1);
        assert_eq!(
            single_candidates(&features, "missing"),
            Err(GatewayError::FeatureNotFound)
        );
    }

    #[test]
    fn user_validation_order() {
        assert_eq!(validate_user(None), Err(GatewayError::Required("user")));
        assert_eq!(
            validate_user(Some(&User::default())),
            Err(GatewayError::Required("user id"))
        );
        let req = GetEvaluationRequest {
            user: Some(User::new("u1")),
            feature_id: "f".into(),
            ..Default::default()
        };
        assert_eq!(validate_get_evaluation(&req), Err(GatewayError::Required("tag")));
    }
}
