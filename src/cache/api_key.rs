//! Bearer token → environment API key, two-tier cached.

use std::sync::Arc;

use moka::future::Cache;
use tracing::{error, warn};

use super::{CacheConfig, api_key_key, get_json, put_json};
use crate::Result;
use crate::coalesce::Coalescer;
use crate::context::obfuscate_api_key;
use crate::error::{BackendError, GatewayError};
use crate::telemetry::{self, LAYER_EXTERNAL, LAYER_IN_MEMORY, TYPE_API_KEY};
use crate::traits::{AccountSource, ExternalCache};
use crate::types::EnvironmentApiKey;

/// Resolves tokens through the in-process tier, the shared tier and
/// finally the account service. Lookups are coalesced per token.
///
/// The resolver only answers "which key is this". Role and disabled checks
/// happen on every request in the gateway, whether or not the record came
/// from a cache.
pub struct ApiKeyResolver {
    local: Cache<String, EnvironmentApiKey>,
    external: Arc<dyn ExternalCache>,
    account: Arc<dyn AccountSource>,
    flight: Coalescer<EnvironmentApiKey>,
}

impl ApiKeyResolver {
    pub fn new(
        config: &CacheConfig,
        external: Arc<dyn ExternalCache>,
        account: Arc<dyn AccountSource>,
    ) -> Self {
        let local = Cache::builder()
            .max_capacity(config.api_key_max_entries)
            .time_to_live(config.api_key_ttl)
            .build();
        Self {
            local,
            external,
            account,
            flight: Coalescer::new(TYPE_API_KEY),
        }
    }

    /// Resolve `token`. Unknown tokens are [`GatewayError::InvalidApiKey`];
    /// any other account service failure is [`GatewayError::Internal`].
    pub async fn resolve(&self, token: &str) -> Result<EnvironmentApiKey> {
        let local = self.local.clone();
        let external = self.external.clone();
        let account = self.account.clone();
        let owned = token.to_string();
        self.flight
            .run(token, move || lookup(local, external, account, owned))
            .await
    }

    /// Drop the in-process entry for `token`.
    pub async fn invalidate(&self, token: &str) {
        self.local.invalidate(token).await;
    }
}

async fn lookup(
    local: Cache<String, EnvironmentApiKey>,
    external: Arc<dyn ExternalCache>,
    account: Arc<dyn AccountSource>,
    token: String,
) -> Result<EnvironmentApiKey> {
    if let Some(key) = local.get(&token).await {
        telemetry::record_cache(TYPE_API_KEY, LAYER_IN_MEMORY, true);
        return Ok(key);
    }
    telemetry::record_cache(TYPE_API_KEY, LAYER_IN_MEMORY, false);

    let shared_key = api_key_key(&token);
    match get_json::<EnvironmentApiKey>(external.as_ref(), &shared_key).await {
        Ok(Some(key)) => {
            telemetry::record_cache(TYPE_API_KEY, LAYER_EXTERNAL, true);
            local.insert(token, key.clone()).await;
            return Ok(key);
        }
        Ok(None) => telemetry::record_cache(TYPE_API_KEY, LAYER_EXTERNAL, false),
        Err(err) => {
            telemetry::record_cache(TYPE_API_KEY, LAYER_EXTERNAL, false);
            warn!(error = %err, api_key = %obfuscate_api_key(&token), "failed to read api key from cache");
        }
    }

    let key = match account.get_api_key_by_token(&token).await {
        Ok(key) => key,
        Err(BackendError::NotFound(_)) => return Err(GatewayError::InvalidApiKey),
        Err(err) => {
            error!(error = %err, api_key = %obfuscate_api_key(&token), "failed to get environment api key");
            return Err(GatewayError::Internal);
        }
    };

    if let Err(err) = put_json(external.as_ref(), &shared_key, &key).await {
        warn!(error = %err, environment_id = %key.environment_id, "failed to cache api key");
    }
    local.insert(token, key.clone()).await;
    Ok(key)
}
