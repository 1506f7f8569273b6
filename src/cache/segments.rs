//! Per-(environment, segment) membership snapshots.

use std::sync::Arc;

use tracing::{error, warn};

use super::{environment_scoped, get_json, put_json, segment_users_key};
use crate::Result;
use crate::coalesce::Coalescer;
use crate::error::GatewayError;
use crate::telemetry::{self, LAYER_EXTERNAL, TYPE_SEGMENT_USERS};
use crate::traits::{ExternalCache, FeatureSource};
use crate::types::SegmentUsers;

/// Read-through cache of segment membership.
///
/// Each segment is its own coalescing key, so one slow segment never
/// blocks lookups of another.
pub struct SegmentUsersCache {
    external: Arc<dyn ExternalCache>,
    source: Arc<dyn FeatureSource>,
    flight: Coalescer<SegmentUsers>,
}

impl SegmentUsersCache {
    pub fn new(external: Arc<dyn ExternalCache>, source: Arc<dyn FeatureSource>) -> Self {
        Self {
            external,
            source,
            flight: Coalescer::new(TYPE_SEGMENT_USERS),
        }
    }

    /// Membership of `segment_id` in `environment_id`, with the segment's own
    /// `updated_at`.
    pub async fn get_by_segment(
        &self,
        segment_id: &str,
        environment_id: &str,
    ) -> Result<SegmentUsers> {
        let external = self.external.clone();
        let source = self.source.clone();
        let env = environment_id.to_string();
        let segment = segment_id.to_string();
        self.flight
            .run(&flight_key(environment_id, segment_id), move || {
                load(external, source, env, segment)
            })
            .await
    }
}

fn flight_key(environment_id: &str, segment_id: &str) -> String {
    environment_scoped(environment_id, segment_id)
}

async fn load(
    external: Arc<dyn ExternalCache>,
    source: Arc<dyn FeatureSource>,
    environment_id: String,
    segment_id: String,
) -> Result<SegmentUsers> {
    let key = segment_users_key(&environment_id, &segment_id);
    match get_json::<SegmentUsers>(external.as_ref(), &key).await {
        Ok(Some(users)) => {
            telemetry::record_cache(TYPE_SEGMENT_USERS, LAYER_EXTERNAL, true);
            return Ok(users);
        }
        Ok(None) => {
            telemetry::record_cache(TYPE_SEGMENT_USERS, LAYER_EXTERNAL, false);
            warn!(environment_id = %environment_id, segment_id = %segment_id, "no cached data for segment users");
        }
        Err(err) => {
            telemetry::record_cache(TYPE_SEGMENT_USERS, LAYER_EXTERNAL, false);
            warn!(error = %err, environment_id = %environment_id, segment_id = %segment_id, "failed to read segment users from cache");
        }
    }

    let users = source
        .list_segment_users(&environment_id, &segment_id)
        .await
        .map_err(|err| {
            error!(error = %err, environment_id = %environment_id, segment_id = %segment_id, "failed to list segment users");
            GatewayError::Internal
        })?;
    let segment = source
        .get_segment(&environment_id, &segment_id)
        .await
        .map_err(|err| {
            error!(error = %err, environment_id = %environment_id, segment_id = %segment_id, "failed to get segment");
            GatewayError::Internal
        })?;

    let snapshot = SegmentUsers {
        segment_id,
        users,
        updated_at: segment.updated_at,
    };
    if let Err(err) = put_json(external.as_ref(), &key, &snapshot).await {
        error!(error = %err, environment_id = %environment_id, segment_id = %snapshot.segment_id, "failed to cache segment users");
    }
    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flight_key_is_scoped_to_environment() {
        assert_ne!(flight_key("a:b", "c"), flight_key("a", "b:c"));
        assert_ne!(flight_key("env-1", "seg"), flight_key("env-2", "seg"));
        assert_eq!(flight_key("env", "seg"), "3:env:seg");
    }
}
