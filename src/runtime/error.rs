use crate::container::ContainerID;

/// Coarse classification of runtime failures, deciding how callers react.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Connectivity or protocol failure talking to the runtime.
    Transport,
    /// The scrape deadline elapsed.
    Timeout,
    /// The container went away between listing and fetching its stats.
    StatsUnavailable,
    /// The runtime answered with something that could not be decoded.
    Parse,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid runtime address `{address}`: {reason}")]
    InvalidAddress {
        address: String,
        reason: &'static str,
    },
    #[error("failed to connect to `{endpoint}`: {source}")]
    Connect {
        endpoint: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to build request for `{path}`: {source}")]
    Request {
        path: String,
        #[source]
        source: hyper::http::Error,
    },
    #[error("HTTP exchange with `{endpoint}` failed: {source}")]
    Http {
        endpoint: String,
        #[source]
        source: hyper::Error,
    },
    #[error("failed to read response body of `{path}`: {source}")]
    Body {
        path: String,
        #[source]
        source: axum::Error,
    },
    #[error("`{path}` returned unexpected status {status}")]
    Status { path: String, status: u16 },
    #[error("deadline elapsed during {operation}")]
    Timeout { operation: &'static str },
    #[error("stats unavailable for container `{container}`: {reason}")]
    StatsUnavailable {
        container: ContainerID,
        reason: String,
    },
    #[error("failed to decode response of `{path}`: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("runtime returned an invalid container id: {0}")]
    InvalidContainer(#[source] crate::container::Error),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidAddress { .. }
            | Error::Connect { .. }
            | Error::Request { .. }
            | Error::Http { .. }
            | Error::Body { .. }
            | Error::Status { .. } => ErrorKind::Transport,
            Error::Timeout { .. } => ErrorKind::Timeout,
            Error::StatsUnavailable { .. } => ErrorKind::StatsUnavailable,
            Error::Parse { .. } | Error::InvalidContainer(_) => ErrorKind::Parse,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
