//! Collection orchestrator.
//!
//! One call to [`Collector::collect`] is one scrape: list the inventory, fan
//! out one stats fetch per running container while the engine info is fetched
//! alongside, join everything under a single deadline and assemble the metric
//! set. Nothing is kept between scrapes.
//!
//! Failures degrade the scrape instead of failing it. A container whose stats
//! cannot be fetched in time only loses its resource metrics, a failed engine
//! lookup only drops the engine metrics, and a failed listing leaves the build
//! info and scrape duration.

mod assemble;

pub use assemble::assemble;

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;

use crate::config::BuildInfo;
use crate::container::{ContainerID, ContainerSnapshot, EngineSnapshot};
use crate::error::ResultOkLogExt;
use crate::metrics::MetricSet;
use crate::runtime::{self, ContainerRuntime, ErrorKind};
use crate::stats::ResourceSample;

/// Progress of a single scrape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    ListingInventory,
    FetchingStats,
    Assembling,
    Done,
    /// The inventory could not be listed.
    Failed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Idle => "idle",
            Phase::ListingInventory => "listing inventory",
            Phase::FetchingStats => "fetching stats",
            Phase::Assembling => "assembling",
            Phase::Done => "done",
            Phase::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Everything gathered during one scrape, before assembly.
#[derive(Debug, Clone)]
pub struct ScrapeOutcome {
    pub phase: Phase,
    /// The instant all time-relative values of the scrape are computed against.
    pub now: DateTime<Utc>,
    /// Inventory in the order the runtime listed it.
    pub containers: Vec<ContainerSnapshot>,
    /// At most one sample per running container.
    pub samples: HashMap<ContainerID, ResourceSample>,
    pub engine: Option<EngineSnapshot>,
}

impl ScrapeOutcome {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            phase: Phase::Idle,
            now,
            containers: Vec::new(),
            samples: HashMap::new(),
            engine: None,
        }
    }

    fn advance(&mut self, phase: Phase) {
        log::debug!(target: "collector", "scrape phase: {} -> {}", self.phase, phase);
        self.phase = phase;
    }
}

pub struct Collector<R> {
    runtime: Arc<R>,
    build: BuildInfo,
    timeout: Duration,
    fetch_limit: Option<usize>,
}

impl<R> fmt::Debug for Collector<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collector")
            .field("build", &self.build)
            .field("timeout", &self.timeout)
            .field("fetch_limit", &self.fetch_limit)
            .finish_non_exhaustive()
    }
}

impl<R: ContainerRuntime> Collector<R> {
    /// Creates a collector whose scrapes are bounded by `timeout`.
    pub fn new(runtime: Arc<R>, build: BuildInfo, timeout: Duration) -> Self {
        Self {
            runtime,
            build,
            timeout,
            fetch_limit: None,
        }
    }

    /// Caps the number of stats fetches in flight at once. `None` leaves the
    /// fan-out unbounded.
    pub fn with_fetch_limit(mut self, limit: Option<usize>) -> Self {
        self.fetch_limit = limit.filter(|&n| n > 0);
        self
    }

    pub fn runtime(&self) -> &Arc<R> {
        &self.runtime
    }

    pub fn build(&self) -> &BuildInfo {
        &self.build
    }

    /// Runs one scrape and returns its metrics. Never fails.
    pub async fn collect(&self) -> MetricSet {
        let started = Instant::now();
        let mut outcome = self.gather(started + self.timeout).await;

        if outcome.phase != Phase::Failed {
            outcome.advance(Phase::Assembling);
        }
        let metrics = assemble(&outcome, &self.build, started.elapsed());
        if outcome.phase != Phase::Failed {
            outcome.advance(Phase::Done);
        }

        log::debug!(
            target: "collector",
            "scrape finished in {:?}: {} containers, {} stats samples, {} metrics",
            started.elapsed(),
            outcome.containers.len(),
            outcome.samples.len(),
            metrics.len()
        );
        metrics
    }

    /// Gathers inventory, stats and engine info, all bound to `deadline`.
    pub async fn gather(&self, deadline: Instant) -> ScrapeOutcome {
        let mut outcome = ScrapeOutcome::new(Utc::now());

        outcome.advance(Phase::ListingInventory);
        let listing = bounded(
            deadline,
            "container listing",
            self.runtime.list_containers(deadline),
        );
        let containers = match listing.await {
            Ok(containers) => containers,
            Err(err) => {
                log::error!(target: "collector", "failed to list containers: {}", err);
                outcome.advance(Phase::Failed);
                return outcome;
            }
        };

        if containers.iter().any(|c| c.running) {
            outcome.advance(Phase::FetchingStats);
        }
        let (samples, engine) = tokio::join!(
            self.fetch_stats(&containers, deadline),
            self.fetch_engine(deadline)
        );

        outcome.containers = containers;
        outcome.samples = samples;
        outcome.engine = engine;
        outcome
    }

    async fn fetch_engine(&self, deadline: Instant) -> Option<EngineSnapshot> {
        bounded(deadline, "engine info", self.runtime.engine_info(deadline))
            .await
            .ok_log_at(log::Level::Error, "failed to fetch engine info")
    }

    /// Fetches stats of all running containers concurrently.
    ///
    /// Fetches still in flight at the deadline are aborted and their results
    /// dropped.
    async fn fetch_stats(
        &self,
        containers: &[ContainerSnapshot],
        deadline: Instant,
    ) -> HashMap<ContainerID, ResourceSample> {
        let results: Arc<DashMap<ContainerID, ResourceSample>> = Arc::new(DashMap::new());
        let limiter = self.fetch_limit.map(|n| Arc::new(Semaphore::new(n)));

        let mut tasks = JoinSet::new();
        for container in containers.iter().filter(|c| c.running) {
            let runtime = Arc::clone(&self.runtime);
            let results = Arc::clone(&results);
            let limiter = limiter.clone();
            let container = container.clone();
            tasks.spawn(async move {
                let _permit = match limiter {
                    Some(limiter) => match limiter.acquire_owned().await {
                        Ok(permit) => Some(permit),
                        Err(_) => return,
                    },
                    None => None,
                };
                match runtime.container_stats(&container, deadline).await {
                    Ok(sample) => {
                        log::debug!(target: "collector", "fetched stats of `{}`", container.name);
                        results.insert(container.id.clone(), sample);
                    }
                    Err(err) if err.kind() == ErrorKind::StatsUnavailable => {
                        log::debug!(target: "collector", "skipping stats of `{}`: {}", container.name, err);
                    }
                    Err(err) => {
                        log::warn!(target: "collector", "failed to fetch stats of `{}`: {}", container.name, err);
                    }
                }
            });
        }

        let joined = tokio::time::timeout_at(deadline, async {
            while let Some(joined) = tasks.join_next().await {
                if let Err(err) = joined {
                    log::error!(target: "collector", "stats task failed: {}", err);
                }
            }
        })
        .await;
        if joined.is_err() {
            log::warn!(
                target: "collector",
                "scrape deadline elapsed with {} stats fetches in flight",
                tasks.len()
            );
            tasks.shutdown().await;
        }

        results
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }
}

/// Holds a runtime call to the scrape deadline even if the runtime overruns it.
async fn bounded<T>(
    deadline: Instant,
    operation: &'static str,
    call: impl Future<Output = runtime::Result<T>>,
) -> runtime::Result<T> {
    tokio::time::timeout_at(deadline, call)
        .await
        .map_err(|_| runtime::Error::Timeout { operation })?
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::container::LifecycleState;
    use crate::metrics::Metric;
    use crate::runtime::{Error, Result};
    use crate::stats::{CpuUsage, IoStat, Networks};

    #[derive(Default)]
    struct FakeRuntime {
        containers: Vec<ContainerSnapshot>,
        list_fails: bool,
        list_hangs: bool,
        engine: Option<EngineSnapshot>,
        hanging: HashSet<&'static str>,
        stopped: HashSet<&'static str>,
        broken: HashSet<&'static str>,
        stats_calls: AtomicUsize,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl ContainerRuntime for FakeRuntime {
        async fn list_containers(&self, _deadline: Instant) -> Result<Vec<ContainerSnapshot>> {
            if self.list_hangs {
                std::future::pending::<()>().await;
            }
            if self.list_fails {
                return Err(Error::Status {
                    path: "/containers/json".to_owned(),
                    status: 500,
                });
            }
            Ok(self.containers.clone())
        }

        async fn container_stats(
            &self,
            container: &ContainerSnapshot,
            _deadline: Instant,
        ) -> Result<ResourceSample> {
            self.stats_calls.fetch_add(1, Ordering::SeqCst);
            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(current, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.hanging.contains(container.name.as_str()) {
                std::future::pending::<()>().await;
            }
            if self.stopped.contains(container.name.as_str()) {
                return Err(Error::StatsUnavailable {
                    container: container.id.clone(),
                    reason: "gone".to_owned(),
                });
            }
            if self.broken.contains(container.name.as_str()) {
                return Err(Error::Parse {
                    path: format!("/containers/{}/stats", container.id),
                    source: serde_json::from_str::<u64>("{ truncated").unwrap_err(),
                });
            }

            let cpu = CpuUsage {
                total_usage: 1_200_000_000,
                system_usage: 11_000_000_000,
                online_cpus: 2,
                percpu_counters: 2,
            };
            let previous = CpuUsage {
                total_usage: 1_000_000_000,
                system_usage: 10_000_000_000,
                ..cpu
            };
            Ok(ResourceSample::new(
                container.id.clone(),
                container.name.clone(),
                &cpu,
                &previous,
                256,
                1024,
                Networks::new(),
                IoStat::default(),
                3,
            ))
        }

        async fn engine_info(&self, _deadline: Instant) -> Result<EngineSnapshot> {
            self.engine.clone().ok_or(Error::Status {
                path: "/info".to_owned(),
                status: 500,
            })
        }

        async fn ping(&self, _deadline: Instant) -> Result<()> {
            Ok(())
        }
    }

    fn container(id: &str, name: &str, state: LifecycleState) -> ContainerSnapshot {
        ContainerSnapshot::new(ContainerID::new(id).unwrap(), name, "busybox", state)
    }

    fn engine() -> EngineSnapshot {
        EngineSnapshot {
            version: "27.3.1".to_owned(),
            os: "linux".to_owned(),
            arch: "x86_64".to_owned(),
            kernel_version: "6.1.0".to_owned(),
            containers_running: 3,
            images: 4,
            cpus: 8,
            memory_total: 1 << 34,
            ..EngineSnapshot::default()
        }
    }

    fn build() -> BuildInfo {
        BuildInfo {
            version: "0.1.0".to_owned(),
            commit: "abc1234".to_owned(),
            build_date: "2024-03-01T00:00:00Z".to_owned(),
            rustc_version: "rustc 1.85.0".to_owned(),
        }
    }

    fn collector(runtime: FakeRuntime) -> Collector<FakeRuntime> {
        Collector::new(Arc::new(runtime), build(), Duration::from_secs(2))
    }

    fn three_running() -> Vec<ContainerSnapshot> {
        vec![
            container("aaa", "web", LifecycleState::Running),
            container("bbb", "db", LifecycleState::Running),
            container("ccc", "cache", LifecycleState::Running),
        ]
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_container_only_loses_resource_metrics() {
        let collector = collector(FakeRuntime {
            containers: three_running(),
            engine: Some(engine()),
            hanging: HashSet::from(["cache"]),
            ..FakeRuntime::default()
        });

        let started = Instant::now();
        let metrics = collector.collect().await;
        assert!(started.elapsed() >= Duration::from_secs(2));
        assert!(started.elapsed() < Duration::from_secs(3));

        assert_eq!(metrics.of(Metric::ContainerInfo).count(), 3);
        assert_eq!(metrics.of(Metric::ContainerState).count(), 3);
        assert_eq!(metrics.of(Metric::ContainerCpuPercent).count(), 2);
        assert_eq!(metrics.of(Metric::ContainerMemoryUsage).count(), 2);
        assert_eq!(
            metrics.value(Metric::ContainerCpuPercent, &["ccc", "cache"]),
            None
        );
        assert!(metrics.value(Metric::ContainerCpuPercent, &["aaa", "web"]).is_some());
        assert_eq!(metrics.of(Metric::EngineInfo).count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_containers_emit_fixed_metrics_only() {
        let collector = collector(FakeRuntime {
            engine: Some(engine()),
            ..FakeRuntime::default()
        });

        let metrics = collector.collect().await;
        assert!(metrics.samples().iter().all(|s| !s.metric.is_container_scoped()));
        let families: Vec<Metric> = metrics.samples().iter().map(|s| s.metric).collect();
        assert_eq!(
            families,
            [
                Metric::EngineInfo,
                Metric::ContainersTotal,
                Metric::ContainersTotal,
                Metric::ContainersTotal,
                Metric::ImagesTotal,
                Metric::EngineCpus,
                Metric::EngineMemory,
                Metric::ScrapeDuration,
                Metric::BuildInfo,
            ]
        );
        assert_eq!(collector.runtime().stats_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_list_failure_leaves_build_and_duration() {
        let collector = collector(FakeRuntime {
            containers: three_running(),
            list_fails: true,
            engine: Some(engine()),
            ..FakeRuntime::default()
        });

        let outcome = collector.gather(Instant::now() + Duration::from_secs(2)).await;
        assert_eq!(outcome.phase, Phase::Failed);

        let metrics = collector.collect().await;
        let families: Vec<Metric> = metrics.samples().iter().map(|s| s.metric).collect();
        assert_eq!(families, [Metric::ScrapeDuration, Metric::BuildInfo]);
        assert_eq!(
            metrics.value(
                Metric::BuildInfo,
                &["0.1.0", "abc1234", "2024-03-01T00:00:00Z", "rustc 1.85.0"]
            ),
            Some(1.0)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_listing_past_deadline_leaves_build_and_duration() {
        let collector = collector(FakeRuntime {
            containers: three_running(),
            list_hangs: true,
            engine: Some(engine()),
            ..FakeRuntime::default()
        });

        let started = Instant::now();
        let metrics = collector.collect().await;
        assert!(started.elapsed() >= Duration::from_secs(2));
        assert!(started.elapsed() < Duration::from_secs(3));

        let families: Vec<Metric> = metrics.samples().iter().map(|s| s.metric).collect();
        assert_eq!(families, [Metric::ScrapeDuration, Metric::BuildInfo]);
        assert_eq!(collector.runtime().stats_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_broken_stats_only_lose_resource_metrics() {
        let collector = collector(FakeRuntime {
            containers: three_running(),
            broken: HashSet::from(["db"]),
            engine: Some(engine()),
            ..FakeRuntime::default()
        });

        let outcome = collector.gather(Instant::now() + Duration::from_secs(2)).await;
        assert_eq!(outcome.containers.len(), 3);
        assert_eq!(outcome.samples.len(), 2);

        let metrics = collector.collect().await;
        assert_eq!(metrics.of(Metric::ContainerInfo).count(), 3);
        assert_eq!(metrics.of(Metric::ContainerState).count(), 3);
        assert_eq!(metrics.of(Metric::ContainerCpuPercent).count(), 2);
        assert_eq!(metrics.of(Metric::ContainerPids).count(), 2);
        assert_eq!(metrics.value(Metric::ContainerCpuPercent, &["bbb", "db"]), None);
        assert!(metrics.value(Metric::ContainerCpuPercent, &["ccc", "cache"]).is_some());
        assert_eq!(metrics.of(Metric::EngineInfo).count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_engine_failure_keeps_container_metrics() {
        let collector = collector(FakeRuntime {
            containers: three_running(),
            ..FakeRuntime::default()
        });

        let outcome = collector.gather(Instant::now() + Duration::from_secs(2)).await;
        assert_eq!(outcome.phase, Phase::FetchingStats);
        assert!(outcome.engine.is_none());
        assert_eq!(outcome.samples.len(), 3);

        let metrics = collector.collect().await;
        assert_eq!(metrics.of(Metric::EngineInfo).count(), 0);
        assert_eq!(metrics.of(Metric::ContainersTotal).count(), 0);
        assert_eq!(metrics.of(Metric::ContainerCpuPercent).count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_only_running_containers_are_fetched() {
        let collector = collector(FakeRuntime {
            containers: vec![
                container("aaa", "web", LifecycleState::Running),
                container("bbb", "job", LifecycleState::Exited),
                container("ccc", "new", LifecycleState::Created),
                container("ddd", "stopping", LifecycleState::Running),
            ],
            stopped: HashSet::from(["stopping"]),
            engine: Some(engine()),
            ..FakeRuntime::default()
        });

        let metrics = collector.collect().await;
        assert_eq!(collector.runtime().stats_calls.load(Ordering::SeqCst), 2);
        assert_eq!(metrics.of(Metric::ContainerInfo).count(), 4);
        assert_eq!(metrics.of(Metric::ContainerPids).count(), 1);
        assert_eq!(metrics.value(Metric::ContainerState, &["bbb", "job"]), Some(4.0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeated_scrapes_are_identical() {
        let collector = collector(FakeRuntime {
            containers: three_running(),
            engine: Some(engine()),
            ..FakeRuntime::default()
        });

        let stable = |metrics: MetricSet| -> Vec<_> {
            metrics
                .into_iter()
                .filter(|s| !matches!(s.metric, Metric::ScrapeDuration | Metric::ContainerUptime))
                .collect()
        };
        let first = stable(collector.collect().await);
        let second = stable(collector.collect().await);
        assert!(!first.is_empty());
        assert_eq!(first, second);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_limit_bounds_in_flight_requests() {
        let containers = (0..6)
            .map(|i| {
                let id = format!("c{i}");
                ContainerSnapshot::new(
                    ContainerID::new(&id).unwrap(),
                    id.clone(),
                    "busybox",
                    LifecycleState::Running,
                )
            })
            .collect();
        let collector = collector(FakeRuntime {
            containers,
            engine: Some(engine()),
            ..FakeRuntime::default()
        })
        .with_fetch_limit(Some(2));

        let metrics = collector.collect().await;
        assert_eq!(metrics.of(Metric::ContainerCpuPercent).count(), 6);
        assert_eq!(collector.runtime().max_in_flight.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unbounded_fan_out_runs_all_fetches_at_once() {
        let collector = collector(FakeRuntime {
            containers: three_running(),
            engine: Some(engine()),
            ..FakeRuntime::default()
        })
        .with_fetch_limit(Some(0));

        collector.collect().await;
        assert_eq!(collector.runtime().max_in_flight.load(Ordering::SeqCst), 3);
    }
}
