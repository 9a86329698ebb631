//! Runtime client: the thin adapter between the exporter and the container
//! runtime API.
//!
//! The [`ContainerRuntime`] trait is the seam the collector is written
//! against; [`DockerClient`] implements it over the Docker Engine API. Every
//! call takes the scrape deadline so that a single budget bounds the whole
//! scrape.

mod client;
mod error;
pub mod models;
mod transport;

pub use client::DockerClient;
pub use error::{Error, ErrorKind, Result};
pub use transport::{Endpoint, RawResponse, Transport};

use std::future::Future;

use tokio::time::Instant;

use crate::container::{ContainerSnapshot, EngineSnapshot};
use crate::stats::ResourceSample;

/// Read-only access to a container runtime.
///
/// Implementations are shared by all concurrent fetch tasks of a scrape and
/// must therefore be usable through a shared reference.
pub trait ContainerRuntime: Send + Sync + 'static {
    /// Lists all containers in every lifecycle state, with details.
    ///
    /// A container whose detail lookup fails is dropped from the result; only a
    /// failure of the listing itself is returned as an error.
    fn list_containers(
        &self,
        deadline: Instant,
    ) -> impl Future<Output = Result<Vec<ContainerSnapshot>>> + Send;

    /// Fetches one stats sample for a running container.
    fn container_stats(
        &self,
        container: &ContainerSnapshot,
        deadline: Instant,
    ) -> impl Future<Output = Result<ResourceSample>> + Send;

    /// Fetches engine-wide information.
    fn engine_info(&self, deadline: Instant) -> impl Future<Output = Result<EngineSnapshot>> + Send;

    /// Checks that the runtime answers.
    fn ping(&self, deadline: Instant) -> impl Future<Output = Result<()>> + Send;
}
