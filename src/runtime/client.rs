use std::future::Future;
use std::sync::Arc;

use hyper::StatusCode;
use serde::de::DeserializeOwned;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;

use super::models::{ContainerInspect, ContainerSummary, CpuStats, StatsResponse, SystemInfo};
use super::transport::{Endpoint, RawResponse, Transport};
use super::{ContainerRuntime, Error, Result};
use crate::container::{
    ContainerID, ContainerSnapshot, EngineSnapshot, HealthState, LifecycleState, parse_timestamp,
};
use crate::stats::{CpuUsage, IoStat, NetworkStat, Networks, ResourceSample};

/// Read timestamp the runtime reports in stats of containers that are not running.
const ZERO_TIME_PREFIX: &str = "0001-01-01";

/// Docker Engine API client.
///
/// Cloning is cheap; clones talk to the same endpoint.
#[derive(Debug, Clone)]
pub struct DockerClient {
    transport: Transport,
    lookup_limit: Option<usize>,
}

impl DockerClient {
    /// Creates a client for the given address, e.g. `unix:///var/run/docker.sock`
    /// or `tcp://localhost:2375`. No connection is made until the first call.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAddress`] if the address cannot be parsed.
    pub fn new(address: &str) -> Result<Self> {
        let endpoint: Endpoint = address.parse()?;
        Ok(Self {
            transport: Transport::new(endpoint),
            lookup_limit: None,
        })
    }

    /// Caps the number of detail lookups in flight while listing. `None` or
    /// `Some(0)` leaves them unbounded.
    pub fn with_fetch_limit(mut self, limit: Option<usize>) -> Self {
        self.lookup_limit = limit.filter(|&n| n > 0);
        self
    }

    pub fn endpoint(&self) -> &Endpoint {
        self.transport.endpoint()
    }

    /// Looks up the details of a single container.
    pub async fn inspect_container(&self, id: &str) -> Result<ContainerSnapshot> {
        let inspect: ContainerInspect = self.get_json(&format!("/containers/{id}/json")).await?;
        ContainerSnapshot::try_from(inspect)
    }

    async fn list(&self) -> Result<Vec<ContainerSnapshot>> {
        let summaries: Vec<ContainerSummary> = self.get_json("/containers/json?all=true").await?;
        log::debug!("runtime listed {} containers", summaries.len());

        let limiter = self.lookup_limit.map(|n| Arc::new(Semaphore::new(n)));
        let mut lookups = JoinSet::new();
        for (index, summary) in summaries.into_iter().enumerate() {
            let client = self.clone();
            let limiter = limiter.clone();
            lookups.spawn(async move {
                let _permit = match limiter {
                    Some(limiter) => limiter.acquire_owned().await.ok(),
                    None => None,
                };
                let result = client.inspect_container(&summary.id).await;
                (index, summary.id, result)
            });
        }

        let mut found = Vec::with_capacity(lookups.len());
        while let Some(joined) = lookups.join_next().await {
            match joined {
                Ok((index, _, Ok(snapshot))) => found.push((index, snapshot)),
                // Containers may be removed between listing and inspection.
                Ok((_, id, Err(err))) => log::warn!(
                    target: "runtime",
                    "dropping container `{}` from inventory: {}",
                    id,
                    err
                ),
                Err(err) => log::error!(target: "runtime", "container inspection task failed: {}", err),
            }
        }
        found.sort_unstable_by_key(|(index, _)| *index);

        Ok(found.into_iter().map(|(_, snapshot)| snapshot).collect())
    }

    async fn stats(&self, container: &ContainerSnapshot) -> Result<ResourceSample> {
        let path = format!("/containers/{}/stats?stream=false", container.id);
        let response = self.transport.get(&path).await?;
        if matches!(
            response.status,
            StatusCode::NOT_FOUND | StatusCode::CONFLICT
        ) {
            return Err(Error::StatsUnavailable {
                container: container.id.clone(),
                reason: format!("runtime answered {}", response.status),
            });
        }
        ensure_success(&path, &response)?;

        let stats: StatsResponse = decode(&path, &response)?;
        if stats.read.starts_with(ZERO_TIME_PREFIX) {
            return Err(Error::StatsUnavailable {
                container: container.id.clone(),
                reason: "container is no longer running".to_owned(),
            });
        }

        Ok(sample_from_stats(container, stats))
    }

    async fn info(&self) -> Result<EngineSnapshot> {
        let info: SystemInfo = self.get_json("/info").await?;
        Ok(EngineSnapshot::from(info))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.transport.get(path).await?;
        ensure_success(path, &response)?;
        decode(path, &response)
    }
}

impl ContainerRuntime for DockerClient {
    async fn list_containers(&self, deadline: Instant) -> Result<Vec<ContainerSnapshot>> {
        with_deadline(deadline, "container listing", self.list()).await
    }

    async fn container_stats(
        &self,
        container: &ContainerSnapshot,
        deadline: Instant,
    ) -> Result<ResourceSample> {
        with_deadline(deadline, "container stats", self.stats(container)).await
    }

    async fn engine_info(&self, deadline: Instant) -> Result<EngineSnapshot> {
        with_deadline(deadline, "engine info", self.info()).await
    }

    async fn ping(&self, deadline: Instant) -> Result<()> {
        with_deadline(deadline, "ping", async {
            let response = self.transport.get("/_ping").await?;
            ensure_success("/_ping", &response)
        })
        .await
    }
}

async fn with_deadline<T>(
    deadline: Instant,
    operation: &'static str,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::time::timeout_at(deadline, fut)
        .await
        .map_err(|_| Error::Timeout { operation })?
}

fn ensure_success(path: &str, response: &RawResponse) -> Result<()> {
    if response.status.is_success() {
        Ok(())
    } else {
        Err(Error::Status {
            path: path.to_owned(),
            status: response.status.as_u16(),
        })
    }
}

fn decode<T: DeserializeOwned>(path: &str, response: &RawResponse) -> Result<T> {
    serde_json::from_slice(&response.body).map_err(|source| Error::Parse {
        path: path.to_owned(),
        source,
    })
}

impl TryFrom<ContainerInspect> for ContainerSnapshot {
    type Error = Error;

    fn try_from(inspect: ContainerInspect) -> Result<Self> {
        let id = ContainerID::new(&inspect.id).map_err(Error::InvalidContainer)?;
        let state = inspect.state.unwrap_or_default();
        let image = inspect
            .config
            .map(|config| config.image)
            .filter(|image| !image.is_empty())
            .unwrap_or(inspect.image);
        let name = inspect
            .name
            .strip_prefix('/')
            .unwrap_or(&inspect.name)
            .to_owned();

        Ok(ContainerSnapshot {
            id,
            name,
            image,
            state: LifecycleState::from(state.status.as_str()),
            health: state
                .health
                .map_or(HealthState::None, |health| {
                    HealthState::from(health.status.as_str())
                }),
            created_at: parse_timestamp(&inspect.created),
            started_at: parse_timestamp(&state.started_at),
            finished_at: parse_timestamp(&state.finished_at),
            restart_count: u64::try_from(inspect.restart_count).unwrap_or(0),
            exit_code: state.exit_code,
            oom_killed: state.oom_killed,
            running: state.running,
        })
    }
}

impl From<SystemInfo> for EngineSnapshot {
    fn from(info: SystemInfo) -> Self {
        Self {
            version: info.server_version,
            os: info.operating_system,
            arch: info.architecture,
            kernel_version: info.kernel_version,
            containers_running: info.containers_running,
            containers_paused: info.containers_paused,
            containers_stopped: info.containers_stopped,
            images: info.images,
            cpus: info.ncpu,
            memory_total: info.mem_total,
        }
    }
}

fn cpu_usage(stats: &CpuStats) -> CpuUsage {
    CpuUsage {
        total_usage: stats.cpu_usage.total_usage,
        system_usage: stats.system_cpu_usage,
        online_cpus: stats.online_cpus,
        percpu_counters: stats.cpu_usage.percpu_usage.as_ref().map_or(0, Vec::len),
    }
}

fn sample_from_stats(container: &ContainerSnapshot, stats: StatsResponse) -> ResourceSample {
    let networks: Networks = stats
        .networks
        .unwrap_or_default()
        .into_iter()
        .map(|(iface, net)| {
            (
                iface,
                NetworkStat {
                    rx_bytes: net.rx_bytes,
                    tx_bytes: net.tx_bytes,
                },
            )
        })
        .collect();
    let block_io: IoStat = stats
        .blkio_stats
        .io_service_bytes_recursive
        .iter()
        .flatten()
        .map(|entry| (entry.op.as_str(), entry.value))
        .collect();

    ResourceSample::new(
        container.id.clone(),
        container.name.clone(),
        &cpu_usage(&stats.cpu_stats),
        &cpu_usage(&stats.precpu_stats),
        stats.memory_stats.usage,
        stats.memory_stats.limit,
        networks,
        block_io,
        stats.pids_stats.current,
    )
}
