//! Metric descriptors, samples and the registry holding them.
//!
//! Descriptors are static: the set of exported metrics, their help text, label
//! names and value kinds is fixed when the [`Registry`] is built at startup and
//! shared read-only by every scrape. A scrape only produces [`MetricSample`]s,
//! collected into a [`MetricSet`], that refer back to a descriptor by [`Metric`].

mod registry;
mod sample;

pub use registry::{Error, MetricDescriptor, Registry, Result};
pub use sample::{MetricSample, MetricSet};

/// Whether a metric is a point-in-time value or a monotonically increasing total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Gauge,
    Counter,
}

impl ValueKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ValueKind::Gauge => "gauge",
            ValueKind::Counter => "counter",
        }
    }
}

const CONTAINER_LABELS: &[&str] = &["id", "name"];

/// Every metric the exporter can emit, in exposition order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    ContainerInfo,
    ContainerState,
    ContainerUptime,
    ContainerCreated,
    ContainerStarted,
    ContainerFinished,
    ContainerRestartCount,
    ContainerHealthStatus,
    ContainerExitCode,
    ContainerOomKilled,
    ContainerCpuPercent,
    ContainerCpuSeconds,
    ContainerMemoryUsage,
    ContainerMemoryLimit,
    ContainerMemoryPercent,
    ContainerNetworkRxBytes,
    ContainerNetworkTxBytes,
    ContainerBlkioReadBytes,
    ContainerBlkioWriteBytes,
    ContainerPids,
    EngineInfo,
    ContainersTotal,
    ImagesTotal,
    EngineCpus,
    EngineMemory,
    ScrapeDuration,
    BuildInfo,
}

impl Metric {
    pub const ALL: [Metric; 27] = [
        Metric::ContainerInfo,
        Metric::ContainerState,
        Metric::ContainerUptime,
        Metric::ContainerCreated,
        Metric::ContainerStarted,
        Metric::ContainerFinished,
        Metric::ContainerRestartCount,
        Metric::ContainerHealthStatus,
        Metric::ContainerExitCode,
        Metric::ContainerOomKilled,
        Metric::ContainerCpuPercent,
        Metric::ContainerCpuSeconds,
        Metric::ContainerMemoryUsage,
        Metric::ContainerMemoryLimit,
        Metric::ContainerMemoryPercent,
        Metric::ContainerNetworkRxBytes,
        Metric::ContainerNetworkTxBytes,
        Metric::ContainerBlkioReadBytes,
        Metric::ContainerBlkioWriteBytes,
        Metric::ContainerPids,
        Metric::EngineInfo,
        Metric::ContainersTotal,
        Metric::ImagesTotal,
        Metric::EngineCpus,
        Metric::EngineMemory,
        Metric::ScrapeDuration,
        Metric::BuildInfo,
    ];

    /// Position of the metric in [`Metric::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    /// Metric name without the configured prefix.
    pub fn suffix(self) -> &'static str {
        match self {
            Metric::ContainerInfo => "container_info",
            Metric::ContainerState => "container_state",
            Metric::ContainerUptime => "container_uptime_seconds",
            Metric::ContainerCreated => "container_created_seconds",
            Metric::ContainerStarted => "container_started_seconds",
            Metric::ContainerFinished => "container_finished_seconds",
            Metric::ContainerRestartCount => "container_restart_count",
            Metric::ContainerHealthStatus => "container_health_status",
            Metric::ContainerExitCode => "container_exit_code",
            Metric::ContainerOomKilled => "container_oom_killed",
            Metric::ContainerCpuPercent => "container_cpu_usage_percent",
            Metric::ContainerCpuSeconds => "container_cpu_usage_seconds_total",
            Metric::ContainerMemoryUsage => "container_memory_usage_bytes",
            Metric::ContainerMemoryLimit => "container_memory_limit_bytes",
            Metric::ContainerMemoryPercent => "container_memory_usage_percent",
            Metric::ContainerNetworkRxBytes => "container_network_rx_bytes_total",
            Metric::ContainerNetworkTxBytes => "container_network_tx_bytes_total",
            Metric::ContainerBlkioReadBytes => "container_blkio_read_bytes_total",
            Metric::ContainerBlkioWriteBytes => "container_blkio_write_bytes_total",
            Metric::ContainerPids => "container_pids",
            Metric::EngineInfo => "engine_info",
            Metric::ContainersTotal => "containers_total",
            Metric::ImagesTotal => "images_total",
            Metric::EngineCpus => "engine_cpus",
            Metric::EngineMemory => "engine_memory_bytes",
            Metric::ScrapeDuration => "scrape_duration_seconds",
            Metric::BuildInfo => "build_info",
        }
    }

    pub fn help(self) -> &'static str {
        match self {
            Metric::ContainerInfo => "Container information",
            Metric::ContainerState => {
                "Container state (1=running, 2=paused, 3=restarting, 4=exited, 5=dead, 6=created, 0=unknown)"
            }
            Metric::ContainerUptime => "Container uptime in seconds",
            Metric::ContainerCreated => "Container creation timestamp",
            Metric::ContainerStarted => "Container start timestamp",
            Metric::ContainerFinished => "Container finish timestamp",
            Metric::ContainerRestartCount => "Container restart count",
            Metric::ContainerHealthStatus => {
                "Container health status (1=healthy, 0=unhealthy, 2=starting, -1=none)"
            }
            Metric::ContainerExitCode => "Container exit code",
            Metric::ContainerOomKilled => "Container OOM killed (1=true, 0=false)",
            Metric::ContainerCpuPercent => "Container CPU usage percentage",
            Metric::ContainerCpuSeconds => "Container total CPU usage in seconds",
            Metric::ContainerMemoryUsage => "Container memory usage in bytes",
            Metric::ContainerMemoryLimit => "Container memory limit in bytes",
            Metric::ContainerMemoryPercent => "Container memory usage percentage",
            Metric::ContainerNetworkRxBytes => "Container network bytes received",
            Metric::ContainerNetworkTxBytes => "Container network bytes transmitted",
            Metric::ContainerBlkioReadBytes => "Container block I/O bytes read",
            Metric::ContainerBlkioWriteBytes => "Container block I/O bytes written",
            Metric::ContainerPids => "Number of processes running in the container",
            Metric::EngineInfo => "Docker engine information",
            Metric::ContainersTotal => "Total number of containers by state",
            Metric::ImagesTotal => "Total number of images",
            Metric::EngineCpus => "Number of CPUs available to the engine",
            Metric::EngineMemory => "Total memory available to the engine in bytes",
            Metric::ScrapeDuration => "Duration of the scrape",
            Metric::BuildInfo => "Exporter build information",
        }
    }

    /// Ordered label names every sample of this metric carries values for.
    pub fn labels(self) -> &'static [&'static str] {
        match self {
            Metric::ContainerInfo => &["id", "name", "image", "state"],
            Metric::ContainerNetworkRxBytes | Metric::ContainerNetworkTxBytes => {
                &["id", "name", "interface"]
            }
            Metric::EngineInfo => &["version", "os", "arch", "kernel"],
            Metric::ContainersTotal => &["state"],
            Metric::BuildInfo => &["version", "commit", "build_date", "rustc_version"],
            Metric::ImagesTotal
            | Metric::EngineCpus
            | Metric::EngineMemory
            | Metric::ScrapeDuration => &[],
            _ => CONTAINER_LABELS,
        }
    }

    pub fn kind(self) -> ValueKind {
        match self {
            Metric::ContainerCpuSeconds
            | Metric::ContainerNetworkRxBytes
            | Metric::ContainerNetworkTxBytes
            | Metric::ContainerBlkioReadBytes
            | Metric::ContainerBlkioWriteBytes => ValueKind::Counter,
            _ => ValueKind::Gauge,
        }
    }

    /// Whether samples of this metric are scoped to a single container.
    pub fn is_container_scoped(self) -> bool {
        self.labels().first() == Some(&"id")
    }
}
