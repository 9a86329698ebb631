//! Command-line and environment configuration, and build metadata.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Parser};

/// Docker container metrics exporter.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "docker-exporter",
    about = "Exports Docker container and engine metrics for pull-based scraping",
    disable_help_flag = true,
    disable_version_flag = true
)]
pub struct Config {
    /// Address to bind the HTTP server to.
    #[arg(short = 'h', long, env = "EXPORTER_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to bind the HTTP server to.
    #[arg(short, long, env = "EXPORTER_PORT", default_value_t = 9324)]
    pub port: u16,

    /// Path the metrics are served on.
    #[arg(short, long, env = "EXPORTER_ENDPOINT", default_value = "metrics")]
    pub endpoint: String,

    /// Prefix of every exported metric name.
    #[arg(short = 'r', long, env = "EXPORTER_PREFIX", default_value = "ndocker")]
    pub prefix: String,

    /// Log level: debug, info, warn or error.
    #[arg(short, long, env = "EXPORTER_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Also append log output to this file.
    #[arg(short = 'o', long, env = "EXPORTER_LOG_PATH", value_name = "PATH")]
    pub log_path: Option<PathBuf>,

    /// Docker API address (unix:///path, tcp://host:port or a socket path).
    #[arg(
        short,
        long,
        env = "DOCKER_HOST",
        default_value = "tcp://localhost:2375"
    )]
    pub docker_host: String,

    /// Output mode: `minimum` or `all` (adds process and handler metrics).
    #[arg(
        short = 'u',
        long,
        env = "EXPORTER_OUTPUT",
        default_value = "minimum",
        value_parser = parse_output_mode
    )]
    pub output: OutputMode,

    /// Time budget of one scrape, e.g. `500ms`, `2s`, `1m`.
    #[arg(
        short,
        long,
        env = "EXPORTER_TIMEOUT",
        default_value = "2s",
        value_parser = parse_duration
    )]
    pub timeout: Duration,

    /// Time budget of one health check, independent of `--timeout`.
    #[arg(
        long,
        env = "EXPORTER_HEALTH_TIMEOUT",
        default_value = "1s",
        value_parser = parse_duration
    )]
    pub health_timeout: Duration,

    /// Maximum number of in-flight stats requests per scrape, 0 for no limit.
    #[arg(long, env = "EXPORTER_MAX_CONCURRENT_FETCHES", default_value_t = 0)]
    pub max_concurrent_fetches: usize,

    /// Print build information and exit.
    #[arg(short = 'v', long, action = ArgAction::SetTrue)]
    pub version: bool,

    /// Print help.
    #[arg(long, action = ArgAction::Help)]
    pub help: Option<bool>,
}

impl Config {
    /// `host:port` to bind to.
    pub fn address(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    /// Route of the metrics endpoint, always starting with a single `/`.
    pub fn metrics_path(&self) -> String {
        format!("/{}", self.endpoint.trim_start_matches('/'))
    }

    pub fn log_level(&self) -> log::LevelFilter {
        match self.log_level.to_ascii_lowercase().as_str() {
            "trace" => log::LevelFilter::Trace,
            "debug" => log::LevelFilter::Debug,
            "warn" | "warning" => log::LevelFilter::Warn,
            "error" => log::LevelFilter::Error,
            _ => log::LevelFilter::Info,
        }
    }

    /// Bound on concurrent stats fetches, `None` if unbounded.
    pub fn fetch_limit(&self) -> Option<usize> {
        (self.max_concurrent_fetches > 0).then_some(self.max_concurrent_fetches)
    }
}

/// Which metrics the exporter serves besides the container metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// Container and engine metrics only.
    #[default]
    Minimum,
    /// Additionally process metrics and the handler request counter.
    All,
}

impl From<&str> for OutputMode {
    fn from(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("all") {
            OutputMode::All
        } else {
            OutputMode::Minimum
        }
    }
}

fn parse_output_mode(s: &str) -> Result<OutputMode, String> {
    Ok(OutputMode::from(s))
}

/// Parses durations such as `250ms`, `2s`, `1.5s` or `1m`. A bare number is
/// taken as seconds.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration".to_owned());
    }

    let (num_str, to_secs): (&str, fn(f64) -> f64) = if let Some(num) = s.strip_suffix("ms") {
        (num, |ms| ms / 1000.0)
    } else if let Some(num) = s.strip_suffix('s') {
        (num, |secs| secs)
    } else if let Some(num) = s.strip_suffix('m') {
        (num, |mins| mins * 60.0)
    } else {
        (s, |secs| secs)
    };

    let value: f64 = num_str
        .trim()
        .parse()
        .map_err(|e| format!("invalid duration '{s}': {e}"))?;
    let duration = Duration::try_from_secs_f64(to_secs(value))
        .map_err(|e| format!("invalid duration '{s}': {e}"))?;
    if duration.is_zero() {
        return Err(format!("duration '{s}' must be positive"));
    }
    Ok(duration)
}

/// Build metadata, computed at compile time and handed to the components that
/// export it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildInfo {
    pub version: String,
    pub commit: String,
    pub build_date: String,
    pub rustc_version: String,
}

impl BuildInfo {
    /// Metadata of the running binary.
    pub fn current() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_owned(),
            commit: env!("EXPORTER_GIT_COMMIT").to_owned(),
            build_date: env!("EXPORTER_BUILD_DATE").to_owned(),
            rustc_version: env!("EXPORTER_RUSTC_VERSION").to_owned(),
        }
    }

    /// Label values of the build info metric.
    pub fn labels(&self) -> Vec<String> {
        vec![
            self.version.clone(),
            self.commit.clone(),
            self.build_date.clone(),
            self.rustc_version.clone(),
        ]
    }
}

impl fmt::Display for BuildInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "docker-exporter {}", self.version)?;
        writeln!(f, "  commit:     {}", self.commit)?;
        writeln!(f, "  build date: {}", self.build_date)?;
        write!(f, "  rustc:      {}", self.rustc_version)
    }
}
