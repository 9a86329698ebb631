//! Cumulative CPU counters as reported by a single stats call.
//!
//! The runtime returns two readings per call: the current one and the one taken
//! immediately before it. The percentage is always computed from that pair,
//! never from readings of different scrapes.

use crate::derived;

/// One cumulative CPU reading.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CpuUsage {
    /// Total CPU time consumed by the container, in nanoseconds.
    pub total_usage: u64,
    /// Total CPU time of the host, in nanoseconds.
    pub system_usage: u64,
    /// Number of online CPUs, `0` if not reported.
    pub online_cpus: u32,
    /// Number of per-core usage counters, used when `online_cpus` is missing.
    pub percpu_counters: usize,
}

impl CpuUsage {
    /// Usage percentage between `previous` and this reading, scaled by the
    /// number of CPUs visible in this reading.
    pub fn percent_since(&self, previous: &CpuUsage) -> f64 {
        derived::cpu_percent(
            self.total_usage,
            previous.total_usage,
            self.system_usage,
            previous.system_usage,
            derived::online_cpus(self.online_cpus, self.percpu_counters),
        )
    }
}
