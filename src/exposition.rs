//! Text exposition of a scrape's metric set.
//!
//! Samples are grouped by descriptor in registry order, each family preceded
//! by its `# HELP` and `# TYPE` lines. In [`OutputMode::All`] the process
//! metrics and the handler request counter of a `prometheus` registry are
//! appended.

use std::fmt::Write;

use prometheus::{Encoder, IntCounterVec, Opts, TextEncoder};

use crate::config::OutputMode;
use crate::metrics::{MetricSet, Registry};

/// Content type of the rendered output.
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to set up process metrics: {0}")]
    Setup(#[from] prometheus::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Renders metric sets, optionally followed by process-level metrics.
pub struct Exposition {
    registry: Registry,
    process: Option<ProcessMetrics>,
}

struct ProcessMetrics {
    registry: prometheus::Registry,
    requests: IntCounterVec,
}

impl ProcessMetrics {
    fn new(prefix: &str) -> Result<Self> {
        let registry = prometheus::Registry::new();
        #[cfg(target_os = "linux")]
        registry.register(Box::new(
            prometheus::process_collector::ProcessCollector::for_self(),
        ))?;

        let requests = IntCounterVec::new(
            Opts::new(
                format!("{prefix}_http_metric_handler_requests_total"),
                "Total number of scrapes by HTTP status code.",
            ),
            &["code"],
        )?;
        registry.register(Box::new(requests.clone()))?;

        Ok(Self { registry, requests })
    }

    fn encode(&self, out: &mut String) {
        let families = self.registry.gather();
        let mut buffer = Vec::new();
        if let Err(err) = TextEncoder::new().encode(&families, &mut buffer) {
            log::error!("failed to encode process metrics: {}", err);
            return;
        }
        match String::from_utf8(buffer) {
            Ok(text) => out.push_str(&text),
            Err(err) => log::error!("process metrics contain invalid UTF-8: {}", err),
        }
    }
}

impl Exposition {
    /// # Errors
    ///
    /// Fails if the process metrics of [`OutputMode::All`] cannot be registered.
    pub fn new(registry: Registry, mode: OutputMode) -> Result<Self> {
        let process = match mode {
            OutputMode::All => Some(ProcessMetrics::new(registry.prefix())?),
            OutputMode::Minimum => None,
        };
        Ok(Self { registry, process })
    }

    /// Counts one served scrape with the given HTTP status code.
    pub fn record_request(&self, code: u16) {
        if let Some(process) = &self.process {
            process
                .requests
                .with_label_values(&[code.to_string().as_str()])
                .inc();
        }
    }

    pub fn render(&self, metrics: &MetricSet) -> String {
        let mut out = render(&self.registry, metrics);
        if let Some(process) = &self.process {
            process.encode(&mut out);
        }
        out
    }
}

/// Renders `metrics` in the text exposition format.
///
/// Families without samples are left out entirely.
pub fn render(registry: &Registry, metrics: &MetricSet) -> String {
    let mut out = String::new();

    for descriptor in registry.descriptors() {
        let mut samples = metrics.of(descriptor.metric).peekable();
        if samples.peek().is_none() {
            continue;
        }

        let _ = writeln!(out, "# HELP {} {}", descriptor.name, descriptor.help);
        let _ = writeln!(out, "# TYPE {} {}", descriptor.name, descriptor.kind.as_str());
        for sample in samples {
            out.push_str(&descriptor.name);
            if !descriptor.labels.is_empty() {
                out.push('{');
                for (i, (name, value)) in descriptor.labels.iter().zip(&sample.labels).enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    let _ = write!(out, "{}=\"{}\"", name, escape_label_value(value));
                }
                out.push('}');
            }
            let _ = writeln!(out, " {}", format_value(sample.value));
        }
    }

    out
}

fn escape_label_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            c => escaped.push(c),
        }
    }
    escaped
}

fn format_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_owned()
    } else if value == f64::INFINITY {
        "+Inf".to_owned()
    } else if value == f64::NEG_INFINITY {
        "-Inf".to_owned()
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::Metric;

    fn sample_set() -> MetricSet {
        let mut metrics = MetricSet::default();
        metrics.push(
            Metric::BuildInfo,
            vec!["0.1.0".into(), "abc".into(), "today".into(), "rustc".into()],
            1.0,
        );
        metrics.push(Metric::ContainerState, vec!["aaa".into(), "web".into()], 1.0);
        metrics.push(Metric::ContainerState, vec!["bbb".into(), "db".into()], 4.0);
        metrics.push(Metric::ScrapeDuration, Vec::new(), 0.25);
        metrics
    }

    #[test]
    fn test_render_groups_by_family_in_registry_order() {
        let registry = Registry::new("ndocker").unwrap();
        let text = render(&registry, &sample_set());

        let expected = "\
# HELP ndocker_container_state Container state (1=running, 2=paused, 3=restarting, 4=exited, 5=dead, 6=created, 0=unknown)
# TYPE ndocker_container_state gauge
ndocker_container_state{id=\"aaa\",name=\"web\"} 1
ndocker_container_state{id=\"bbb\",name=\"db\"} 4
";
        assert!(text.starts_with(expected), "{text}");
        assert!(text.contains("ndocker_scrape_duration_seconds 0.25\n"));
        let state = text.find("ndocker_container_state").unwrap();
        let duration = text.find("ndocker_scrape_duration_seconds").unwrap();
        let build = text.find("ndocker_build_info").unwrap();
        assert!(state < duration && duration < build);
    }

    #[test]
    fn test_empty_families_are_skipped() {
        let registry = Registry::new("ndocker").unwrap();
        let text = render(&registry, &sample_set());
        assert!(!text.contains("ndocker_container_cpu_usage_percent"));
        assert_eq!(render(&registry, &MetricSet::default()), "");
    }

    #[test]
    fn test_label_values_are_escaped() {
        assert_eq!(escape_label_value(r#"a"b\c"#), r#"a\"b\\c"#);
        assert_eq!(escape_label_value("line\nbreak"), "line\\nbreak");
    }

    #[test]
    fn test_special_values() {
        assert_eq!(format_value(f64::NAN), "NaN");
        assert_eq!(format_value(f64::INFINITY), "+Inf");
        assert_eq!(format_value(f64::NEG_INFINITY), "-Inf");
        assert_eq!(format_value(1_709_294_400.0), "1709294400");
        assert_eq!(format_value(-1.0), "-1");
    }

    #[test]
    fn test_minimum_mode_has_no_process_metrics() {
        let exposition =
            Exposition::new(Registry::new("ndocker").unwrap(), OutputMode::Minimum).unwrap();
        exposition.record_request(200);
        let text = exposition.render(&sample_set());
        assert!(!text.contains("http_metric_handler_requests_total"));
        assert!(!text.contains("process_"));
    }

    #[test]
    fn test_all_mode_appends_handler_counter() {
        let exposition =
            Exposition::new(Registry::new("ndocker").unwrap(), OutputMode::All).unwrap();
        exposition.record_request(200);
        exposition.record_request(200);
        let text = exposition.render(&sample_set());
        assert!(text.contains("ndocker_http_metric_handler_requests_total{code=\"200\"} 2"));
        assert!(text.starts_with("# HELP ndocker_container_state"));
    }
}
