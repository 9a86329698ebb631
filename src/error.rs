use crate::{exposition, metrics, runtime};

/// Fatal errors that prevent the exporter from starting.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    Config(#[from] metrics::Error),
    #[error("invalid Docker host: {0}")]
    DockerHost(#[source] runtime::Error),
    #[error(transparent)]
    Exposition(#[from] exposition::Error),
    #[error("cannot reach the Docker API: {0}")]
    Runtime(#[from] runtime::Error),
    #[error("failed to bind `{address}`: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },
    #[error("HTTP server failed: {0}")]
    Serve(#[source] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

pub trait ResultOkLogExt<T, E> {
    /// Discards the error after logging it with the given level and context.
    fn ok_log_at(self, level: log::Level, context: &str) -> Option<T>;
}

impl<T, E> ResultOkLogExt<T, E> for std::result::Result<T, E>
where
    E: std::error::Error,
{
    fn ok_log_at(self, level: log::Level, context: &str) -> Option<T> {
        match self {
            Ok(ok) => Some(ok),
            Err(err) => {
                log::log!(level, "{context}: {err}");
                None
            }
        }
    }
}
