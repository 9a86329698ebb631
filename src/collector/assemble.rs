use std::time::Duration;

use chrono::{DateTime, Utc};

use super::{Phase, ScrapeOutcome};
use crate::config::BuildInfo;
use crate::container::{ContainerSnapshot, EngineSnapshot};
use crate::derived;
use crate::metrics::{Metric, MetricSet};
use crate::stats::ResourceSample;

/// Turns the outcome of a scrape into its metric set.
///
/// Identity and lifecycle metrics are emitted for every container, resource
/// metrics only for containers with a sample, engine metrics only if the engine
/// lookup succeeded. Scrape duration and build info are always present.
pub fn assemble(outcome: &ScrapeOutcome, build: &BuildInfo, duration: Duration) -> MetricSet {
    let mut metrics = MetricSet::default();

    if outcome.phase != Phase::Failed {
        for container in &outcome.containers {
            push_lifecycle(&mut metrics, container, outcome.now);
            if let Some(sample) = outcome.samples.get(&container.id) {
                push_resources(&mut metrics, sample);
            }
        }
        if let Some(engine) = &outcome.engine {
            push_engine(&mut metrics, engine);
        }
    }

    metrics.push(Metric::ScrapeDuration, Vec::new(), duration.as_secs_f64());
    metrics.push(Metric::BuildInfo, build.labels(), 1.0);
    metrics
}

fn container_labels(id: &str, name: &str) -> Vec<String> {
    vec![id.to_owned(), name.to_owned()]
}

fn push_lifecycle(metrics: &mut MetricSet, container: &ContainerSnapshot, now: DateTime<Utc>) {
    let id = container.id.as_str();
    let name = container.name.as_str();

    metrics.push(
        Metric::ContainerInfo,
        vec![
            id.to_owned(),
            name.to_owned(),
            container.image.clone(),
            container.state.to_string(),
        ],
        1.0,
    );

    let values = [
        (Metric::ContainerState, container.state.code() as f64),
        (
            Metric::ContainerUptime,
            derived::uptime_seconds(container.running, container.started_at, now),
        ),
        (
            Metric::ContainerCreated,
            derived::timestamp_seconds(container.created_at),
        ),
        (
            Metric::ContainerStarted,
            derived::timestamp_seconds(container.started_at),
        ),
        (
            Metric::ContainerFinished,
            derived::timestamp_seconds(container.finished_at),
        ),
        (Metric::ContainerRestartCount, container.restart_count as f64),
        (Metric::ContainerHealthStatus, container.health.code() as f64),
        (Metric::ContainerExitCode, container.exit_code as f64),
        (
            Metric::ContainerOomKilled,
            if container.oom_killed { 1.0 } else { 0.0 },
        ),
    ];
    for (metric, value) in values {
        metrics.push(metric, container_labels(id, name), value);
    }
}

fn push_resources(metrics: &mut MetricSet, sample: &ResourceSample) {
    let id = sample.id.as_str();
    let name = sample.name.as_str();

    let values = [
        (Metric::ContainerCpuPercent, sample.cpu_percent),
        (Metric::ContainerCpuSeconds, sample.cpu_seconds()),
        (Metric::ContainerMemoryUsage, sample.memory_usage as f64),
        (Metric::ContainerMemoryLimit, sample.memory_limit as f64),
        (Metric::ContainerMemoryPercent, sample.memory_percent),
    ];
    for (metric, value) in values {
        metrics.push(metric, container_labels(id, name), value);
    }

    for (iface, net) in &sample.networks {
        let labels = vec![id.to_owned(), name.to_owned(), iface.clone()];
        metrics.push(
            Metric::ContainerNetworkRxBytes,
            labels.clone(),
            net.rx_bytes as f64,
        );
        metrics.push(Metric::ContainerNetworkTxBytes, labels, net.tx_bytes as f64);
    }

    metrics.push(
        Metric::ContainerBlkioReadBytes,
        container_labels(id, name),
        sample.block_io.read_bytes as f64,
    );
    metrics.push(
        Metric::ContainerBlkioWriteBytes,
        container_labels(id, name),
        sample.block_io.write_bytes as f64,
    );
    metrics.push(
        Metric::ContainerPids,
        container_labels(id, name),
        sample.pids as f64,
    );
}

fn push_engine(metrics: &mut MetricSet, engine: &EngineSnapshot) {
    metrics.push(
        Metric::EngineInfo,
        vec![
            engine.version.clone(),
            engine.os.clone(),
            engine.arch.clone(),
            engine.kernel_version.clone(),
        ],
        1.0,
    );
    for (state, count) in [
        ("running", engine.containers_running),
        ("paused", engine.containers_paused),
        ("stopped", engine.containers_stopped),
    ] {
        metrics.push(Metric::ContainersTotal, vec![state.to_owned()], count as f64);
    }
    metrics.push(Metric::ImagesTotal, Vec::new(), engine.images as f64);
    metrics.push(Metric::EngineCpus, Vec::new(), engine.cpus as f64);
    metrics.push(Metric::EngineMemory, Vec::new(), engine.memory_total as f64);
}
