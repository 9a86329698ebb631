//! Docker Exporter: serves metrics about Docker containers and the Docker
//! engine for pull-based monitoring.
//!
//! Every scrape lists the containers, fetches stats of the running ones
//! concurrently under a single time budget and renders the result in the text
//! exposition format. Nothing is stored between scrapes.

pub mod api;
pub mod collector;
pub mod config;
pub mod container;
pub mod derived;
pub mod error;
pub mod exposition;
pub mod fsutil;
pub mod logging;
pub mod metrics;
pub mod runtime;
pub mod stats;

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use crate::config::{BuildInfo, Config};
use crate::runtime::ContainerRuntime;

/// Time budget of the connectivity check before serving.
const STARTUP_PING_TIMEOUT: Duration = Duration::from_secs(5);

/// Runs the exporter until it receives SIGINT or SIGTERM.
///
/// # Errors
///
/// Fails if the configuration is invalid, the Docker API cannot be reached at
/// startup or the listen address cannot be bound.
pub async fn run(config: Config) -> error::Result<()> {
    let build = BuildInfo::current();
    log::info!(
        "starting docker-exporter {} (commit {})",
        build.version,
        build.commit
    );

    let registry = metrics::Registry::new(&config.prefix)?;
    let client = runtime::DockerClient::new(&config.docker_host)
        .map_err(error::Error::DockerHost)?
        .with_fetch_limit(config.fetch_limit());
    log::debug!("using Docker API at {}", client.endpoint());
    client
        .ping(Instant::now() + STARTUP_PING_TIMEOUT)
        .await?;
    log::info!("connected to Docker API at {}", client.endpoint());

    let collector = collector::Collector::new(Arc::new(client), build, config.timeout)
        .with_fetch_limit(config.fetch_limit());
    let exposition = exposition::Exposition::new(registry, config.output)?;
    let metrics_path = config.metrics_path();
    let state = api::AppState::new(
        collector,
        exposition,
        config.health_timeout,
        &metrics_path,
    );

    log::info!("serving metrics on {}", metrics_path);
    api::APIServer::new(state).listen(&config.address()).await
}
