//! heimdalld: the Heimdall daemon.
//!
//! Serves the [`Gateway`](heimdall::Gateway) to SDKs over gRPC, plus the
//! legacy HTTP Track endpoint and an optional Prometheus scrape listener.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use tonic::transport::Server;
use tracing::{error, info};

use heimdall::backend::{HttpAccountSource, HttpFeatureSource, HttpJobRunner, HttpPublisher};
use heimdall::cache::MemoryCache;
use heimdall::server::HeimdallService;
use heimdall::server::config::{Config, ExternalCacheKind};
use heimdall::traits::ExternalCache;
use heimdall::{Gateway, GatewayError, Heimdall};

const GOAL_TOPIC: &str = "goal";
const EVALUATION_TOPIC: &str = "evaluation";
const USER_TOPIC: &str = "user";

const MEMORY_CACHE_MAX_ENTRIES: u64 = 100_000;

/// Heimdall daemon: feature-flag evaluation and synchronization gateway.
#[derive(Parser)]
#[command(name = "heimdalld")]
#[command(version = heimdall::PKG_VERSION)]
#[command(about = "Heimdall feature-flag SDK gateway daemon")]
struct Args {
    /// Path to configuration file.
    #[arg(short, long, env = "HEIMDALL_CONFIG")]
    config: Option<std::path::PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = Config::load(args.config.as_deref())?;

    if let Some(ref address) = config.server.metrics_address {
        let addr = parse_addr("server.metrics_address", address)?;
        PrometheusBuilder::new().with_http_listener(addr).install()?;
        info!(%addr, "prometheus exporter listening");
    }

    let gateway = Arc::new(build_gateway(&config)?);

    let grpc_addr = parse_addr("server.grpc_address", &config.server.grpc_address)?;
    let http_addr = parse_addr("server.http_address", &config.server.http_address)?;

    info!(
        version = %heimdall::version_string(),
        %grpc_addr,
        %http_addr,
        "heimdalld starting"
    );

    let grpc = Server::builder()
        .add_service(HeimdallService::new(gateway.clone()).into_server())
        .serve_with_shutdown(grpc_addr, shutdown_signal());

    let listener = tokio::net::TcpListener::bind(http_addr).await?;
    let http = axum::serve(listener, heimdall::server::http::router(gateway))
        .with_graceful_shutdown(shutdown_signal());

    tokio::try_join!(
        async { grpc.await.map_err(|e| Box::new(e) as Box<dyn std::error::Error>) },
        async { http.await.map_err(|e| Box::new(e) as Box<dyn std::error::Error>) },
    )?;

    info!("heimdalld stopped");
    Ok(())
}

fn parse_addr(name: &str, value: &str) -> Result<SocketAddr, GatewayError> {
    value
        .parse()
        .map_err(|e| GatewayError::Configuration(format!("invalid {name} {value:?}: {e}")))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

/// Build a [`Gateway`] from configuration.
fn build_gateway(config: &Config) -> Result<Gateway, Box<dyn std::error::Error>> {
    let backend = &config.backend;
    let timeout = Duration::from_secs(backend.request_timeout_secs);
    let publisher = |topic: &str| HttpPublisher::new(&backend.publisher_url, topic, timeout);

    let mut builder = Heimdall::builder()
        .config(config.gateway.to_gateway_config())
        .cache_config(config.cache.to_cache_config())
        .account_source(Arc::new(HttpAccountSource::new(&backend.account_url, timeout)?))
        .feature_source(Arc::new(HttpFeatureSource::new(&backend.feature_url, timeout)?))
        .goal_publisher(Arc::new(publisher(GOAL_TOPIC)?))
        .evaluation_publisher(Arc::new(publisher(EVALUATION_TOPIC)?))
        .user_publisher(Arc::new(publisher(USER_TOPIC)?))
        .external_cache(external_cache(config)?);

    if let Some(ref batch_url) = backend.batch_url {
        builder = builder.job_runner(Arc::new(HttpJobRunner::new(batch_url, timeout)?));
    }

    Ok(builder.build()?)
}

fn external_cache(config: &Config) -> Result<Arc<dyn ExternalCache>, Box<dyn std::error::Error>> {
    let cache = &config.cache;
    let ttl = Duration::from_secs(cache.external_ttl_secs);
    match cache.external {
        ExternalCacheKind::Memory => Ok(Arc::new(MemoryCache::with_limits(
            MEMORY_CACHE_MAX_ENTRIES,
            ttl,
        ))),
        #[cfg(feature = "redis")]
        ExternalCacheKind::Redis => {
            let url = cache.redis_url.as_deref().unwrap_or_default();
            Ok(Arc::new(heimdall::cache::RedisCache::new(
                url,
                cache.redis_pool_size,
                ttl,
            )?))
        }
        #[cfg(not(feature = "redis"))]
        ExternalCacheKind::Redis => Err(Box::new(GatewayError::Configuration(
            "cache.external = \"redis\" requires the `redis` feature".to_string(),
        ))),
    }
}
