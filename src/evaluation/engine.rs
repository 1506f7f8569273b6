//! Default rule evaluator.
//!
//! Walks features in dependency order so prerequisite and FEATURE_FLAG
//! clauses can see the variations already assigned upstream. Per feature:
//! prerequisites, off variation, individual targets, rules top to bottom,
//! then the default strategy.
//!
//! Rollout bucketing hashes `"{feature_id}-{user_id}{sampling_seed}"` with
//! xxh3. That is not the hash server SDKs use when they evaluate a
//! `GetFeatureFlags` payload locally, so a user in a rollout can land in a
//! different bucket here than in an SDK. Deployments that need both sides to
//! agree should plug in an [`Evaluator`] that buckets the way their SDKs do.

use std::collections::{HashMap, HashSet, VecDeque};

use xxhash_rust::xxh3::xxh3_64;

use super::EvaluationError;
use super::selection::{dependency_ids, is_archived_beyond_retention, now_unix};
use crate::traits::{EvaluationOutcome, Evaluator};
use crate::types::{
    Clause, ClauseOperator, Evaluation, Feature, Reason, ReasonType, Rule, SegmentUsers,
    Strategy, User, Variation, evaluation_id,
};

/// Rollout weights are expressed out of this many buckets.
const ROLLOUT_BUCKETS: u64 = 100_000;

/// The built-in [`Evaluator`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultEvaluator;

impl Evaluator for DefaultEvaluator {
    fn evaluate(
        &self,
        features: &[Feature],
        user: &User,
        segment_users: &HashMap<String, SegmentUsers>,
        tag: &str,
    ) -> Result<EvaluationOutcome, EvaluationError> {
        let now = now_unix();
        let sorted = topological_sort(features)?;
        let mut assigned: HashMap<String, String> = HashMap::new();
        let mut outcome = EvaluationOutcome::default();

        for feature in sorted {
            let (reason, variation) = assign_user(feature, user, segment_users, &assigned)?;
            // Archived features still feed their dependents.
            assigned.insert(feature.id.clone(), variation.id.clone());

            if feature.archived {
                if !is_archived_beyond_retention(feature, now) {
                    outcome.archived_feature_ids.push(feature.id.clone());
                }
                continue;
            }
            if !tag.is_empty() && !feature.has_tag(tag) {
                continue;
            }
            outcome.evaluations.push(Evaluation {
                id: evaluation_id(&feature.id, feature.version, &user.id),
                feature_id: feature.id.clone(),
                feature_version: feature.version,
                user_id: user.id.clone(),
                variation_id: variation.id.clone(),
                variation_name: variation.name.clone(),
                variation_value: variation.value.clone(),
                reason,
            });
        }
        Ok(outcome)
    }
}

/// Order features so every feature comes after the features it depends on.
/// Dependencies outside the set are ignored here and surface during
/// assignment.
pub fn topological_sort(features: &[Feature]) -> Result<Vec<&Feature>, EvaluationError> {
    let index: HashMap<&str, usize> = features
        .iter()
        .enumerate()
        .map(|(i, f)| (f.id.as_str(), i))
        .collect();

    let mut in_degree = vec![0usize; features.len()];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); features.len()];
    for (i, feature) in features.iter().enumerate() {
        let deps: HashSet<usize> = dependency_ids(feature)
            .filter_map(|id| index.get(id).copied())
            .collect();
        in_degree[i] = deps.len();
        for dep in deps {
            dependents[dep].push(i);
        }
    }

    let mut ready: VecDeque<usize> = (0..features.len()).filter(|&i| in_degree[i] == 0).collect();
    let mut sorted = Vec::with_capacity(features.len());
    while let Some(i) = ready.pop_front() {
        sorted.push(&features[i]);
        for &next in &dependents[i] {
            in_degree[next] -= 1;
            if in_degree[next] == 0 {
                ready.push_back(next);
            }
        }
    }

    if sorted.len() != features.len() {
        let stuck = (0..features.len())
            .find(|&i| in_degree[i] > 0)
            .map(|i| features[i].id.clone())
            .unwrap_or_default();
        return Err(EvaluationError::CycleDetected(stuck));
    }
    Ok(sorted)
}

fn assign_user<'a>(
    feature: &'a Feature,
    user: &User,
    segment_users: &HashMap<String, SegmentUsers>,
    assigned: &HashMap<String, String>,
) -> Result<(Reason, &'a Variation), EvaluationError> {
    for prerequisite in &feature.prerequisites {
        let variation = assigned.get(&prerequisite.feature_id).ok_or_else(|| {
            EvaluationError::PrerequisiteVariationNotFound(prerequisite.feature_id.clone())
        })?;
        if *variation != prerequisite.variation_id && !feature.off_variation.is_empty() {
            let off = find_variation(feature, &feature.off_variation)?;
            return Ok((Reason::new(ReasonType::Prerequisite), off));
        }
    }

    if !feature.enabled && !feature.off_variation.is_empty() {
        let off = find_variation(feature, &feature.off_variation)?;
        return Ok((Reason::new(ReasonType::OffVariation), off));
    }

    if let Some(target) = feature.targets.iter().find(|t| t.users.contains(&user.id)) {
        let variation = find_variation(feature, &target.variation)?;
        return Ok((Reason::new(ReasonType::Target), variation));
    }

    if let Some(rule) = feature
        .rules
        .iter()
        .find(|r| rule_matches(r, user, segment_users, assigned))
    {
        let variation = apply_strategy(feature, &rule.strategy, &user.id)?;
        return Ok((Reason::rule(&rule.id), variation));
    }

    let strategy = feature
        .default_strategy
        .as_ref()
        .ok_or_else(|| EvaluationError::DefaultStrategyNotFound(feature.id.clone()))?;
    let variation = apply_strategy(feature, strategy, &user.id)?;
    Ok((Reason::new(ReasonType::Default), variation))
}

fn rule_matches(
    rule: &Rule,
    user: &User,
    segment_users: &HashMap<String, SegmentUsers>,
    assigned: &HashMap<String, String>,
) -> bool {
    rule.clauses
        .iter()
        .all(|c| clause_matches(c, user, segment_users, assigned))
}

fn clause_matches(
    clause: &Clause,
    user: &User,
    segment_users: &HashMap<String, SegmentUsers>,
    assigned: &HashMap<String, String>,
) -> bool {
    match clause.operator {
        ClauseOperator::Segment => clause.values.iter().any(|segment_id| {
            segment_users
                .get(segment_id)
                .is_some_and(|members| members.includes(&user.id))
        }),
        ClauseOperator::FeatureFlag => assigned
            .get(&clause.attribute)
            .is_some_and(|variation| clause.values.contains(variation)),
        _ => {
            let Some(target) = user.data.get(&clause.attribute) else {
                return false;
            };
            clause
                .values
                .iter()
                .any(|value| compare(clause.operator, target, value))
        }
    }
}

fn compare(operator: ClauseOperator, target: &str, value: &str) -> bool {
    match operator {
        ClauseOperator::Equals | ClauseOperator::In => target == value,
        ClauseOperator::StartsWith => target.starts_with(value),
        ClauseOperator::EndsWith => target.ends_with(value),
        ClauseOperator::PartiallyMatch => target.contains(value),
        ClauseOperator::Greater => numeric(target, value, |t, v| t > v),
        ClauseOperator::GreaterOrEqual => numeric(target, value, |t, v| t >= v),
        ClauseOperator::Less => numeric(target, value, |t, v| t < v),
        ClauseOperator::LessOrEqual => numeric(target, value, |t, v| t <= v),
        ClauseOperator::Before => timestamps(target, value, |t, v| t < v),
        ClauseOperator::After => timestamps(target, value, |t, v| t > v),
        ClauseOperator::Segment | ClauseOperator::FeatureFlag => false,
    }
}

fn numeric(target: &str, value: &str, cmp: impl Fn(f64, f64) -> bool) -> bool {
    match (target.parse::<f64>(), value.parse::<f64>()) {
        (Ok(t), Ok(v)) => cmp(t, v),
        _ => false,
    }
}

fn timestamps(target: &str, value: &str, cmp: impl Fn(i64, i64) -> bool) -> bool {
    match (target.parse::<i64>(), value.parse::<i64>()) {
        (Ok(t), Ok(v)) => cmp(t, v),
        _ => false,
    }
}

fn apply_strategy<'a>(
    feature: &'a Feature,
    strategy: &Strategy,
    user_id: &str,
) -> Result<&'a Variation, EvaluationError> {
    match strategy {
        Strategy::Fixed { variation } => find_variation(feature, variation),
        Strategy::Rollout { variations } => {
            let bucket = bucket(&feature.id, user_id, &feature.sampling_seed);
            let mut upper = 0u64;
            for rollout in variations {
                upper += u64::from(rollout.weight);
                if bucket < upper {
                    return find_variation(feature, &rollout.variation);
                }
            }
            Err(EvaluationError::VariationNotFound(feature.id.clone()))
        }
    }
}

/// Stable bucket in `[0, ROLLOUT_BUCKETS)` for a user of a feature.
fn bucket(feature_id: &str, user_id: &str, sampling_seed: &str) -> u64 {
    let input = format!("{feature_id}-{user_id}{sampling_seed}");
    xxh3_64(input.as_bytes()) % ROLLOUT_BUCKETS
}

fn find_variation<'a>(feature: &'a Feature, id: &str) -> Result<&'a Variation, EvaluationError> {
    feature
        .find_variation(id)
        .ok_or_else(|| EvaluationError::VariationNotFound(feature.id.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Prerequisite, RolloutVariation, SegmentUser, Target};

    fn variations() -> Vec<Variation> {
        ["on", "off"]
            .iter()
            .map(|id| Variation {
                id: id.to_string(),
                value: id.to_string(),
                name: id.to_string(),
                ..Default::default()
            })
            .collect()
    }

    fn feature(id: &str) -> Feature {
        Feature {
            id: id.into(),
            version: 1,
            enabled: true,
            variations: variations(),
            default_strategy: Some(Strategy::Fixed {
                variation: "on".into(),
            }),
            off_variation: "off".into(),
            ..Default::default()
        }
    }

    fn evaluate(features: &[Feature], user: &User) -> EvaluationOutcome {
        DefaultEvaluator
            .evaluate(features, user, &HashMap::new(), "")
            .unwrap()
    }

    fn variation_of<'a>(outcome: &'a EvaluationOutcome, feature_id: &str) -> &'a str {
        &outcome
            .evaluations
            .iter()
            .find(|e| e.feature_id == feature_id)
            .unwrap()
            .variation_id
    }

    #[test]
    fn default_strategy_applies() {
        let outcome = evaluate(&[feature("f")], &User::new("u"));
        assert_eq!(variation_of(&outcome, "f"), "on");
        assert_eq!(outcome.evaluations[0].id, "f:1:u");
        assert_eq!(outcome.evaluations[0].reason.reason_type, ReasonType::Default);
    }

    #[test]
    fn disabled_feature_serves_off_variation() {
        let mut f = feature("f");
        f.enabled = false;
        let outcome = evaluate(&[f], &User::new("u"));
        assert_eq!(variation_of(&outcome, "f"), "off");
        assert_eq!(outcome.evaluations[0].reason.reason_type, ReasonType::OffVariation);
    }

    #[test]
    fn targets_win_over_rules() {
        let mut f = feature("f");
        f.targets = vec![Target {
            variation: "off".into(),
            users: vec!["vip".into()],
        }];
        let outcome = evaluate(&[f], &User::new("vip"));
        assert_eq!(variation_of(&outcome, "f"), "off");
    }

    #[test]
    fn failed_prerequisite_serves_off_variation() {
        let mut parent = feature("parent");
        parent.enabled = false;
        let mut child = feature("child");
        child.prerequisites = vec![Prerequisite {
            feature_id: "parent".into(),
            variation_id: "on".into(),
        }];
        // Child listed first: ordering must come from the dependency graph.
        let outcome = evaluate(&[child, parent], &User::new("u"));
        assert_eq!(variation_of(&outcome, "child"), "off");
        let child_eval = outcome.evaluations.iter().find(|e| e.feature_id == "child").unwrap();
        assert_eq!(child_eval.reason.reason_type, ReasonType::Prerequisite);
    }

    #[test]
    fn segment_rule_matches_included_user() {
        let mut f = feature("f");
        f.rules = vec![Rule {
            id: "r1".into(),
            strategy: Strategy::Fixed {
                variation: "off".into(),
            },
            clauses: vec![Clause {
                operator: ClauseOperator::Segment,
                values: vec!["beta".into()],
                ..Default::default()
            }],
        }];
        let mut segments = HashMap::new();
        segments.insert(
            "beta".to_string(),
            SegmentUsers {
                segment_id: "beta".into(),
                users: vec![SegmentUser {
                    segment_id: "beta".into(),
                    user_id: "u1".into(),
                    ..Default::default()
                }],
                updated_at: 0,
            },
        );
        let outcome = DefaultEvaluator
            .evaluate(&[f.clone()], &User::new("u1"), &segments, "")
            .unwrap();
        assert_eq!(outcome.evaluations[0].reason, Reason::rule("r1"));
        let outcome = DefaultEvaluator
            .evaluate(&[f], &User::new("u2"), &segments, "")
            .unwrap();
        assert_eq!(outcome.evaluations[0].reason.reason_type, ReasonType::Default);
    }

    #[test]
    fn attribute_rule_compares_numbers() {
        let mut f = feature("f");
        f.rules = vec![Rule {
            id: "adults".into(),
            strategy: Strategy::Fixed {
                variation: "off".into(),
            },
            clauses: vec![Clause {
                attribute: "age".into(),
                operator: ClauseOperator::GreaterOrEqual,
                values: vec!["18".into()],
                ..Default::default()
            }],
        }];
        let adult = evaluate(&[f.clone()], &User::new("a").attribute("age", "30"));
        assert_eq!(variation_of(&adult, "f"), "off");
        let minor = evaluate(&[f], &User::new("b").attribute("age", "9"));
        assert_eq!(variation_of(&minor, "f"), "on");
    }

    #[test]
    fn rollout_is_deterministic_and_total() {
        let mut f = feature("f");
        f.default_strategy = Some(Strategy::Rollout {
            variations: vec![
                RolloutVariation {
                    variation: "on".into(),
                    weight: 50_000,
                },
                RolloutVariation {
                    variation: "off".into(),
                    weight: 50_000,
                },
            ],
        });
        for i in 0..50 {
            let user = User::new(format!("user-{i}"));
            let first = evaluate(&[f.clone()], &user);
            let second = evaluate(&[f.clone()], &user);
            assert_eq!(variation_of(&first, "f"), variation_of(&second, "f"));
        }
    }

    #[test]
    fn bucket_is_keyed_by_feature_user_and_seed() {
        assert_eq!(
            bucket("f", "u", "seed"),
            xxh3_64(b"f-useed") % ROLLOUT_BUCKETS
        );
        assert!((0..50).all(|i| bucket("f", &format!("user-{i}"), "") < ROLLOUT_BUCKETS));
        let reshuffled = (0..50)
            .filter(|i| {
                let user = format!("user-{i}");
                bucket("f", &user, "") != bucket("f", &user, "seed")
            })
            .count();
        assert!(reshuffled > 0);
    }

    #[test]
    fn archived_features_are_reported_not_evaluated() {
        let mut f = feature("old");
        f.archived = true;
        f.updated_at = now_unix();
        let outcome = evaluate(&[f, feature("live")], &User::new("u"));
        assert_eq!(outcome.archived_feature_ids, vec!["old"]);
        assert_eq!(outcome.evaluations.len(), 1);
    }

    #[test]
    fn tag_filters_output_only() {
        let mut tagged = feature("tagged");
        tagged.tags = vec!["android".into()];
        let outcome = DefaultEvaluator
            .evaluate(&[tagged, feature("plain")], &User::new("u"), &HashMap::new(), "android")
            .unwrap();
        assert_eq!(outcome.evaluations.len(), 1);
        assert_eq!(outcome.evaluations[0].feature_id, "tagged");
    }

    #[test]
    fn cycles_are_rejected() {
        let mut a = feature("a");
        a.prerequisites = vec![Prerequisite {
            feature_id: "b".into(),
            variation_id: "on".into(),
        }];
        let mut b = feature("b");
        b.prerequisites = vec![Prerequisite {
            feature_id: "a".into(),
            variation_id: "on".into(),
        }];
        let result = DefaultEvaluator.evaluate(&[a, b], &User::new("u"), &HashMap::new(), "");
        assert!(matches!(result, Err(EvaluationError::CycleDetected(_))));
    }
}
