//! Candidate-set selection: which features a request evaluates or ships.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::types::{ClauseOperator, Feature};

/// Archived entities older than this are purged; diffs against state older
/// than this are not trusted.
pub const RETENTION_WINDOW_SECS: i64 = 30 * 24 * 60 * 60;

/// Subtracted from client-supplied timestamps before diffing, to absorb
/// clock skew between SDK hosts and the gateway.
pub const CLOCK_SKEW_SECS: i64 = 10;

pub fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

/// Whether `timestamp` lies before the retention window ending at `now`.
pub fn is_beyond_retention(timestamp: i64, now: i64) -> bool {
    timestamp < now - RETENTION_WINDOW_SECS
}

/// Archived more than the retention window ago.
pub fn is_archived_beyond_retention(feature: &Feature, now: i64) -> bool {
    feature.archived && is_beyond_retention(feature.updated_at, now)
}

/// Archived, but recently enough that SDKs must still be told about it.
pub fn is_archived_within_retention(feature: &Feature, now: i64) -> bool {
    feature.archived && feature.updated_at > now - RETENTION_WINDOW_SECS
}

/// Whether a feature belongs in an environment's served catalog.
///
/// Disabled features without an off variation have nothing to serve;
/// long-archived features are gone for every SDK.
pub fn is_servable(feature: &Feature, now: i64) -> bool {
    let unservable = !feature.enabled && feature.off_variation.is_empty();
    !unservable && !is_archived_beyond_retention(feature, now)
}

pub fn filter_by_tag(features: &[Feature], tag: &str) -> Vec<Feature> {
    features.iter().filter(|f| f.has_tag(tag)).cloned().collect()
}

pub fn filter_out_archived(features: &[Feature]) -> Vec<Feature> {
    features.iter().filter(|f| !f.archived).cloned().collect()
}

/// Ids a feature depends on: prerequisites and FEATURE_FLAG clause targets.
pub fn dependency_ids(feature: &Feature) -> impl Iterator<Item = &str> {
    let prerequisites = feature.prerequisites.iter().map(|p| p.feature_id.as_str());
    let flag_clauses = feature
        .rules
        .iter()
        .flat_map(|r| r.clauses.iter())
        .filter(|c| c.operator == ClauseOperator::FeatureFlag)
        .map(|c| c.attribute.as_str());
    prerequisites.chain(flag_clauses)
}

/// Result of a dependency walk.
#[derive(Debug, Clone, Default)]
pub struct Closure {
    /// Targets plus everything reached, in first-visit order.
    pub features: Vec<Feature>,
    /// Referenced ids absent from the feature set.
    pub missing: Vec<String>,
}

/// Targets plus the transitive set of features they depend on.
pub fn prerequisite_closure(targets: &[Feature], all: &[Feature]) -> Closure {
    let by_id: HashMap<&str, &Feature> = all.iter().map(|f| (f.id.as_str(), f)).collect();
    let mut seen: HashSet<String> = HashSet::new();
    let mut closure = Closure::default();
    let mut stack: Vec<Feature> = targets.iter().rev().cloned().collect();

    while let Some(feature) = stack.pop() {
        if !seen.insert(feature.id.clone()) {
            continue;
        }
        for dep in dependency_ids(&feature) {
            if seen.contains(dep) {
                continue;
            }
            match by_id.get(dep) {
                Some(found) => stack.push((*found).clone()),
                None => closure.missing.push(dep.to_string()),
            }
        }
        closure.features.push(feature);
    }
    closure
}

/// Targets plus the transitive set of features that depend on them.
pub fn dependents_closure(targets: &[Feature], all: &[Feature]) -> Vec<Feature> {
    let mut dependents: HashMap<&str, Vec<&Feature>> = HashMap::new();
    for feature in all {
        for dep in dependency_ids(feature) {
            dependents.entry(dep).or_default().push(feature);
        }
    }

    let mut seen: HashSet<&str> = HashSet::new();
    let mut out = Vec::new();
    let mut stack: Vec<&Feature> = targets.iter().rev().collect();
    while let Some(feature) = stack.pop() {
        if !seen.insert(feature.id.as_str()) {
            continue;
        }
        if let Some(children) = dependents.get(feature.id.as_str()) {
            stack.extend(children.iter().copied());
        }
        out.push(feature.clone());
    }
    out
}

/// Features whose evaluation may differ from what an SDK evaluated at
/// `evaluated_at`: those changed since (minus skew), plus every rule-bearing
/// feature when the user's attributes changed.
pub fn updated_since(
    features: &[Feature],
    evaluated_at: i64,
    user_attributes_updated: bool,
) -> Vec<Feature> {
    let adjusted = evaluated_at - CLOCK_SKEW_SECS;
    features
        .iter()
        .filter(|f| f.updated_at > adjusted || (user_attributes_updated && !f.rules.is_empty()))
        .cloned()
        .collect()
}

/// Features to re-evaluate for a diff: the updated features, what they
/// depend on, and what depends on them.
pub fn diff_targets(updated: &[Feature], all: &[Feature]) -> Vec<Feature> {
    let downward = prerequisite_closure(updated, all).features;
    let upward = dependents_closure(updated, all);

    let mut seen: HashSet<String> = HashSet::new();
    downward
        .into_iter()
        .chain(upward)
        .filter(|f| seen.insert(f.id.clone()))
        .collect()
}

/// Union of segment ids referenced by SEGMENT clauses, sorted.
pub fn segment_ids(features: &[Feature]) -> Vec<String> {
    let ids: BTreeSet<String> = features.iter().flat_map(Feature::segment_ids).collect();
    ids.into_iter().collect()
}
