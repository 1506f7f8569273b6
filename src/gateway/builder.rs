//! Builder for configuring gateway instances

use std::sync::Arc;

use super::{Gateway, GatewayConfig};
use crate::cache::{ApiKeyResolver, CacheConfig, FeatureCatalog, MemoryCache, SegmentUsersCache};
use crate::evaluation::DefaultEvaluator;
use crate::traits::{AccountSource, Evaluator, ExternalCache, FeatureSource, JobRunner, Publisher};
use crate::{GatewayError, Result};

/// Main entry point for creating gateway instances.
pub struct Heimdall;

impl Heimdall {
    /// Create a new builder for configuring the gateway.
    pub fn builder() -> HeimdallBuilder {
        HeimdallBuilder::new()
    }
}

/// Builder for configuring gateway instances.
///
/// The account service, the feature service and the goal/evaluation/user
/// publishers are required. Everything else has a default: an in-process
/// [`MemoryCache`] as the shared cache tier and [`DefaultEvaluator`] as the
/// rule engine.
pub struct HeimdallBuilder {
    config: GatewayConfig,
    cache_config: CacheConfig,
    account: Option<Arc<dyn AccountSource>>,
    features: Option<Arc<dyn FeatureSource>>,
    external_cache: Option<Arc<dyn ExternalCache>>,
    evaluator: Option<Arc<dyn Evaluator>>,
    goal_publisher: Option<Arc<dyn Publisher>>,
    evaluation_publisher: Option<Arc<dyn Publisher>>,
    user_publisher: Option<Arc<dyn Publisher>>,
    jobs: Option<Arc<dyn JobRunner>>,
}

impl HeimdallBuilder {
    pub fn new() -> Self {
        Self {
            config: GatewayConfig::default(),
            cache_config: CacheConfig::default(),
            account: None,
            features: None,
            external_cache: None,
            evaluator: None,
            goal_publisher: None,
            evaluation_publisher: None,
            user_publisher: None,
            jobs: None,
        }
    }

    pub fn config(mut self, config: GatewayConfig) -> Self {
        self.config = config;
        self
    }

    pub fn cache_config(mut self, config: CacheConfig) -> Self {
        self.cache_config = config;
        self
    }

    /// Account service used to resolve API keys.
    pub fn account_source(mut self, source: Arc<dyn AccountSource>) -> Self {
        self.account = Some(source);
        self
    }

    /// Feature service used to list features and segment users.
    pub fn feature_source(mut self, source: Arc<dyn FeatureSource>) -> Self {
        self.features = Some(source);
        self
    }

    /// Shared cache tier (default: a process-local [`MemoryCache`]).
    pub fn external_cache(mut self, cache: Arc<dyn ExternalCache>) -> Self {
        self.external_cache = Some(cache);
        self
    }

    /// Rule engine (default: [`DefaultEvaluator`]).
    pub fn evaluator(mut self, evaluator: Arc<dyn Evaluator>) -> Self {
        self.evaluator = Some(evaluator);
        self
    }

    pub fn goal_publisher(mut self, publisher: Arc<dyn Publisher>) -> Self {
        self.goal_publisher = Some(publisher);
        self
    }

    pub fn evaluation_publisher(mut self, publisher: Arc<dyn Publisher>) -> Self {
        self.evaluation_publisher = Some(publisher);
        self
    }

    pub fn user_publisher(mut self, publisher: Arc<dyn Publisher>) -> Self {
        self.user_publisher = Some(publisher);
        self
    }

    /// Use one publisher for the goal, evaluation and user topics.
    pub fn publisher(self, publisher: Arc<dyn Publisher>) -> Self {
        self.goal_publisher(publisher.clone())
            .evaluation_publisher(publisher.clone())
            .user_publisher(publisher)
    }

    /// Enable job dispatch.
    pub fn job_runner(mut self, runner: Arc<dyn JobRunner>) -> Self {
        self.jobs = Some(runner);
        self
    }

    /// Build the gateway.
    pub fn build(self) -> Result<Gateway> {
        let account = self.account.ok_or_else(|| missing("account source"))?;
        let features = self.features.ok_or_else(|| missing("feature source"))?;
        let goal_publisher = self.goal_publisher.ok_or_else(|| missing("goal publisher"))?;
        let evaluation_publisher = self
            .evaluation_publisher
            .ok_or_else(|| missing("evaluation publisher"))?;
        let user_publisher = self.user_publisher.ok_or_else(|| missing("user publisher"))?;

        let external = self
            .external_cache
            .unwrap_or_else(|| Arc::new(MemoryCache::new()));
        let evaluator = self
            .evaluator
            .unwrap_or_else(|| Arc::new(DefaultEvaluator));

        Ok(Gateway {
            config: self.config,
            api_keys: ApiKeyResolver::new(&self.cache_config, external.clone(), account),
            features: FeatureCatalog::new(external.clone(), features.clone()),
            segment_users: SegmentUsersCache::new(external, features),
            evaluator,
            goal_publisher,
            evaluation_publisher,
            user_publisher,
            jobs: self.jobs,
        })
    }
}

impl Default for HeimdallBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn missing(what: &str) -> GatewayError {
    GatewayError::Configuration(format!("{what} is required"))
}
