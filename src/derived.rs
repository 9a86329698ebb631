//! Derived-metric calculations.
//!
//! Pure functions turning raw runtime counters and states into the values that
//! are exported. Nothing in here performs I/O or keeps state between calls; the
//! CPU percentage in particular is computed from the two counter readings the
//! runtime hands out in a single stats response.

use chrono::{DateTime, Utc};

use crate::container::{HealthState, LifecycleState};

/// Resolves the number of CPUs to scale the CPU percentage by.
///
/// Prefers the count reported by the runtime, then the number of per-core
/// counters, and finally falls back to a single CPU.
pub fn online_cpus(reported: u32, percpu_counters: usize) -> u32 {
    if reported > 0 {
        return reported;
    }
    match u32::try_from(percpu_counters) {
        Ok(0) | Err(_) => 1,
        Ok(n) => n,
    }
}

/// Computes the CPU usage percentage between two cumulative readings.
///
/// Returns `(usage_delta / system_delta) * cpus * 100` when both deltas are
/// positive and `0.0` otherwise, which also covers counter resets.
///
/// # Examples
///
/// ```
/// # use docker_exporter::derived::cpu_percent;
/// let pct = cpu_percent(1_200_000_000, 1_000_000_000, 11_000_000_000, 10_000_000_000, 2);
/// assert!((pct - 40.0).abs() < 1e-9);
/// ```
pub fn cpu_percent(
    total_usage: u64,
    previous_total_usage: u64,
    system_usage: u64,
    previous_system_usage: u64,
    cpus: u32,
) -> f64 {
    let usage_delta = total_usage.saturating_sub(previous_total_usage);
    let system_delta = system_usage.saturating_sub(previous_system_usage);
    if usage_delta == 0 || system_delta == 0 {
        return 0.0;
    }

    (usage_delta as f64 / system_delta as f64) * f64::from(cpus.max(1)) * 100.0
}

/// Computes memory usage as a percentage of the limit. A limit of `0` means
/// unlimited and yields `0.0`.
pub fn memory_percent(usage: u64, limit: u64) -> f64 {
    if limit == 0 {
        return 0.0;
    }
    usage as f64 / limit as f64 * 100.0
}

/// Maps a lifecycle state name to its numeric code. Unknown names map to `0`.
pub fn lifecycle_code(state: &str) -> i64 {
    LifecycleState::from(state).code()
}

/// Maps a health state name to its numeric code. Anything but `healthy`,
/// `unhealthy` and `starting` maps to `-1`.
pub fn health_code(health: &str) -> i64 {
    HealthState::from(health).code()
}

/// Seconds since the container started, relative to the scrape's `now`.
///
/// Zero when the container is not running or its start time is unknown;
/// never negative.
pub fn uptime_seconds(running: bool, started_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> f64 {
    match started_at {
        Some(started) if running => {
            let elapsed = now.signed_duration_since(started);
            (elapsed.num_milliseconds() as f64 / 1000.0).max(0.0)
        }
        _ => 0.0,
    }
}

/// UNIX timestamp in seconds, or `0.0` when absent.
pub fn timestamp_seconds(ts: Option<DateTime<Utc>>) -> f64 {
    ts.map_or(0.0, |ts| ts.timestamp() as f64)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_cpu_percent_concrete_scenario() {
        let pct = cpu_percent(
            5_200_000_000,
            5_000_000_000,
            91_000_000_000,
            90_000_000_000,
            2,
        );
        assert!((pct - 40.0).abs() < 1e-9, "got {pct}");
    }

    #[test]
    fn test_cpu_percent_non_positive_deltas() {
        // no usage change
        assert_eq!(cpu_percent(100, 100, 2000, 1000, 4), 0.0);
        // no system change
        assert_eq!(cpu_percent(200, 100, 1000, 1000, 4), 0.0);
        // counter reset on either side
        assert_eq!(cpu_percent(50, 100, 2000, 1000, 4), 0.0);
        assert_eq!(cpu_percent(200, 100, 500, 1000, 4), 0.0);
        // first sample, previous all zero but system unchanged
        assert_eq!(cpu_percent(0, 0, 0, 0, 0), 0.0);
    }

    #[test]
    fn test_cpu_percent_never_nan_or_negative() {
        let readings = [0u64, 1, 1_000, u64::MAX / 2, u64::MAX];
        for &a in &readings {
            for &b in &readings {
                for &c in &readings {
                    for &d in &readings {
                        let pct = cpu_percent(a, b, c, d, 0);
                        assert!(pct.is_finite());
                        assert!(pct >= 0.0);
                    }
                }
            }
        }
    }

    #[test]
    fn test_online_cpus_fallbacks() {
        assert_eq!(online_cpus(8, 4), 8);
        assert_eq!(online_cpus(0, 4), 4);
        assert_eq!(online_cpus(0, 0), 1);
    }

    #[test]
    fn test_memory_percent() {
        const MIB: u64 = 1024 * 1024;
        assert_eq!(memory_percent(512 * MIB, 1024 * MIB), 50.0);
        assert_eq!(memory_percent(512 * MIB, 0), 0.0);
        assert_eq!(memory_percent(0, 0), 0.0);
    }

    #[test]
    fn test_lifecycle_code_is_total() {
        let cases = [
            ("running", 1),
            ("paused", 2),
            ("restarting", 3),
            ("exited", 4),
            ("dead", 5),
            ("created", 6),
            ("removing", 0),
            ("", 0),
            ("RUNNING", 0),
        ];
        for (state, code) in cases {
            assert_eq!(lifecycle_code(state), code, "state {state:?}");
        }
    }

    #[test]
    fn test_health_code() {
        assert_eq!(health_code("healthy"), 1);
        assert_eq!(health_code("unhealthy"), 0);
        assert_eq!(health_code("starting"), 2);
        assert_eq!(health_code("none"), -1);
        assert_eq!(health_code(""), -1);
    }

    #[test]
    fn test_uptime_seconds() {
        let started = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 1, 30).unwrap();

        assert_eq!(uptime_seconds(true, Some(started), now), 90.0);
        assert_eq!(uptime_seconds(false, Some(started), now), 0.0);
        assert_eq!(uptime_seconds(true, None, now), 0.0);
        // clock skew between runtime and exporter
        assert_eq!(uptime_seconds(true, Some(now), started), 0.0);
    }

    #[test]
    fn test_timestamp_seconds() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        assert_eq!(timestamp_seconds(Some(ts)), 1_709_294_400.0);
        assert_eq!(timestamp_seconds(None), 0.0);
    }
}
