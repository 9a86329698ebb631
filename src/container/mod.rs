//! Point-in-time views of containers and of the engine that runs them.
//!
//! Everything in here is built fresh on every scrape from runtime responses,
//! never mutated afterwards and dropped once the scrape has been assembled.

use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};

mod error;
mod utils;

pub use error::{Error, Result};
pub(crate) use utils::parse_timestamp;

/// Length of the short container id used as the `id` label.
pub const SHORT_ID_LEN: usize = 12;

/// A validated, shortened container identifier.
///
/// # Examples
///
/// ```
/// # use docker_exporter::container::ContainerID;
/// let raw_id = "abc123abc123abc123abc123abc123abc123abc123abc123abc123abc123abcd";
/// let container_id = ContainerID::new(raw_id).unwrap();
/// assert_eq!(container_id.as_ref(), "abc123abc123");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContainerID(Arc<str>);

impl ContainerID {
    /// Creates a new `ContainerID` from the given raw id, keeping at most
    /// [`SHORT_ID_LEN`] characters.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidContainerID`] if the input is empty or contains anything
    /// but lowercase ASCII letters and digits.
    pub fn new(src: impl AsRef<str>) -> Result<Self> {
        let src = src.as_ref();
        if src.is_empty() || !utils::is_lowercase_alpha_numeric(src.as_bytes()) {
            return Err(Error::InvalidContainerID(src.to_owned()));
        }

        let short = &src[..src.len().min(SHORT_ID_LEN)];
        Ok(Self(short.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ContainerID {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ContainerID {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Coarse lifecycle state of a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    Running,
    Paused,
    Restarting,
    Exited,
    Dead,
    Created,
    Unknown,
}

impl LifecycleState {
    /// Stable numeric code exported as the value of the state gauge.
    pub fn code(self) -> i64 {
        match self {
            LifecycleState::Running => 1,
            LifecycleState::Paused => 2,
            LifecycleState::Restarting => 3,
            LifecycleState::Exited => 4,
            LifecycleState::Dead => 5,
            LifecycleState::Created => 6,
            LifecycleState::Unknown => 0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LifecycleState::Running => "running",
            LifecycleState::Paused => "paused",
            LifecycleState::Restarting => "restarting",
            LifecycleState::Exited => "exited",
            LifecycleState::Dead => "dead",
            LifecycleState::Created => "created",
            LifecycleState::Unknown => "unknown",
        }
    }
}

impl From<&str> for LifecycleState {
    fn from(value: &str) -> Self {
        match value {
            "running" => LifecycleState::Running,
            "paused" => LifecycleState::Paused,
            "restarting" => LifecycleState::Restarting,
            "exited" => LifecycleState::Exited,
            "dead" => LifecycleState::Dead,
            "created" => LifecycleState::Created,
            _ => LifecycleState::Unknown,
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Health check state. Containers without a health check report [`HealthState::None`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HealthState {
    Healthy,
    Unhealthy,
    Starting,
    #[default]
    None,
}

impl HealthState {
    pub fn code(self) -> i64 {
        match self {
            HealthState::Healthy => 1,
            HealthState::Unhealthy => 0,
            HealthState::Starting => 2,
            HealthState::None => -1,
        }
    }
}

impl From<&str> for HealthState {
    fn from(value: &str) -> Self {
        match value {
            "healthy" => HealthState::Healthy,
            "unhealthy" => HealthState::Unhealthy,
            "starting" => HealthState::Starting,
            _ => HealthState::None,
        }
    }
}

/// One container as seen by a single scrape.
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerSnapshot {
    pub id: ContainerID,
    pub name: String,
    pub image: String,
    pub state: LifecycleState,
    pub health: HealthState,
    pub created_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub restart_count: u64,
    /// Only meaningful while the container is not running.
    pub exit_code: i64,
    pub oom_killed: bool,
    pub running: bool,
}

impl ContainerSnapshot {
    /// Creates a snapshot with no timestamps, no health check and zeroed counters.
    pub fn new(
        id: ContainerID,
        name: impl Into<String>,
        image: impl Into<String>,
        state: LifecycleState,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            image: image.into(),
            state,
            health: HealthState::None,
            created_at: None,
            started_at: None,
            finished_at: None,
            restart_count: 0,
            exit_code: 0,
            oom_killed: false,
            running: matches!(state, LifecycleState::Running),
        }
    }
}

/// Engine-wide facts reported by the runtime daemon.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EngineSnapshot {
    pub version: String,
    pub os: String,
    pub arch: String,
    pub kernel_version: String,
    pub containers_running: u64,
    pub containers_paused: u64,
    pub containers_stopped: u64,
    pub images: u64,
    pub cpus: u64,
    pub memory_total: u64,
}
