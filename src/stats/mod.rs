//! Per-container resource statistics.
//!
//! A [`ResourceSample`] is the normalized result of one stats call for one
//! running container: CPU and memory usage with their derived percentages,
//! per-interface network counters, aggregated block I/O and the process count.
//!
//! # Main types
//!
//! - [`ResourceSample`]: everything exported about a container's resource usage.
//! - [`CpuUsage`]: one cumulative CPU reading; two of them yield a percentage.
//! - [`NetworkStat`] and [`Networks`]: per-interface byte counters.
//! - [`IoStat`]: read/write byte counters summed across devices.

mod cpu;
mod io;
mod net;

pub use cpu::CpuUsage;
pub use io::IoStat;
pub use net::{NetworkStat, Networks};

use crate::container::ContainerID;
use crate::derived;

/// Resource usage of a single running container at scrape time.
///
/// At most one sample exists per container and scrape. A missing sample means
/// the resource metrics of that container are omitted, not that they are zero.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceSample {
    pub id: ContainerID,
    pub name: String,
    pub cpu_percent: f64,
    /// Cumulative CPU time in nanoseconds.
    pub cpu_total_usage: u64,
    pub memory_usage: u64,
    /// Memory limit in bytes, `0` if unlimited.
    pub memory_limit: u64,
    pub memory_percent: f64,
    pub networks: Networks,
    pub block_io: IoStat,
    pub pids: u64,
}

impl ResourceSample {
    /// Builds a sample, deriving the CPU and memory percentages.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: ContainerID,
        name: impl Into<String>,
        cpu: &CpuUsage,
        previous_cpu: &CpuUsage,
        memory_usage: u64,
        memory_limit: u64,
        networks: Networks,
        block_io: IoStat,
        pids: u64,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            cpu_percent: cpu.percent_since(previous_cpu),
            cpu_total_usage: cpu.total_usage,
            memory_usage,
            memory_limit,
            memory_percent: derived::memory_percent(memory_usage, memory_limit),
            networks,
            block_io,
            pids,
        }
    }

    /// Cumulative CPU time in seconds.
    pub fn cpu_seconds(&self) -> f64 {
        self.cpu_total_usage as f64 / 1e9
    }
}
