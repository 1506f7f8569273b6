//! Per-environment feature catalog.

use std::sync::Arc;

use tracing::{error, warn};

use super::{features_key, get_json, put_json};
use crate::Result;
use crate::coalesce::Coalescer;
use crate::error::GatewayError;
use crate::evaluation::selection::{is_servable, now_unix};
use crate::telemetry::{self, LAYER_EXTERNAL, TYPE_FEATURES};
use crate::traits::{ExternalCache, FeatureSource};
use crate::types::Feature;

/// Features requested per page when listing from the feature service.
pub const LIST_PAGE_SIZE: usize = 500;

/// Read-through cache of every servable feature in an environment.
///
/// Holds the whole catalog, untagged; tag filtering happens per request.
pub struct FeatureCatalog {
    external: Arc<dyn ExternalCache>,
    source: Arc<dyn FeatureSource>,
    flight: Coalescer<Vec<Feature>>,
}

impl FeatureCatalog {
    pub fn new(external: Arc<dyn ExternalCache>, source: Arc<dyn FeatureSource>) -> Self {
        Self {
            external,
            source,
            flight: Coalescer::new(TYPE_FEATURES),
        }
    }

    /// Servable features of `environment_id`. Backing failures are
    /// [`GatewayError::Internal`].
    pub async fn get(&self, environment_id: &str) -> Result<Vec<Feature>> {
        let external = self.external.clone();
        let source = self.source.clone();
        let env = environment_id.to_string();
        self.flight
            .run(environment_id, move || load(external, source, env))
            .await
    }
}

async fn load(
    external: Arc<dyn ExternalCache>,
    source: Arc<dyn FeatureSource>,
    environment_id: String,
) -> Result<Vec<Feature>> {
    let key = features_key(&environment_id);
    match get_json::<Vec<Feature>>(external.as_ref(), &key).await {
        Ok(Some(features)) => {
            telemetry::record_cache(TYPE_FEATURES, LAYER_EXTERNAL, true);
            return Ok(features);
        }
        Ok(None) => {
            telemetry::record_cache(TYPE_FEATURES, LAYER_EXTERNAL, false);
            warn!(environment_id = %environment_id, "no cached data for features");
        }
        Err(err) => {
            telemetry::record_cache(TYPE_FEATURES, LAYER_EXTERNAL, false);
            warn!(error = %err, environment_id = %environment_id, "failed to read features from cache");
        }
    }

    let features = list_all(source.as_ref(), &environment_id).await?;
    if let Err(err) = put_json(external.as_ref(), &key, &features).await {
        error!(error = %err, environment_id = %environment_id, "failed to cache features");
    }
    Ok(features)
}

/// Page through the feature service until a short or empty page.
async fn list_all(source: &dyn FeatureSource, environment_id: &str) -> Result<Vec<Feature>> {
    let now = now_unix();
    let mut features = Vec::new();
    let mut cursor = String::new();
    loop {
        let page = source
            .list_features(environment_id, &cursor, LIST_PAGE_SIZE)
            .await
            .map_err(|err| {
                error!(error = %err, environment_id, "failed to list features");
                GatewayError::Internal
            })?;
        let size = page.features.len();
        features.extend(page.features.into_iter().filter(|f| is_servable(f, now)));
        if size == 0 || size < LIST_PAGE_SIZE {
            return Ok(features);
        }
        cursor = page.cursor;
    }
}
