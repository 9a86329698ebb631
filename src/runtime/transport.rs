//! Plain HTTP/1.1 requests against the runtime API over a unix socket or TCP.
//!
//! Every request opens its own connection. The API is local, requests are few
//! per scrape, and it keeps concurrent fetches independent of each other.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use axum::body::{Body, Bytes};
use hyper::body::Incoming;
use hyper::{Method, Request, Response, StatusCode, header};
use hyper_util::rt::TokioIo;

use super::{Error, Result};

/// Upper bound for a single response body.
const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;
const DEFAULT_TCP_PORT: u16 = 2375;
const USER_AGENT: &str = concat!("docker-exporter/", env!("CARGO_PKG_VERSION"));

/// Where the runtime API listens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    Unix(PathBuf),
    /// `host:port`
    Tcp(String),
}

impl FromStr for Endpoint {
    type Err = Error;

    /// Accepts `unix:///path`, `tcp://host[:port]`, `http://host[:port]` and
    /// bare absolute socket paths.
    fn from_str(address: &str) -> Result<Self> {
        let invalid = |reason| Error::InvalidAddress {
            address: address.to_owned(),
            reason,
        };

        if let Some(path) = address.strip_prefix("unix://") {
            if path.is_empty() {
                return Err(invalid("missing socket path"));
            }
            return Ok(Endpoint::Unix(PathBuf::from(path)));
        }
        if address.starts_with('/') {
            return Ok(Endpoint::Unix(PathBuf::from(address)));
        }
        if address.starts_with("https://") {
            return Err(invalid("TLS connections are not supported"));
        }

        let authority = address
            .strip_prefix("tcp://")
            .or_else(|| address.strip_prefix("http://"))
            .ok_or_else(|| invalid("expected a unix://, tcp:// or http:// address"))?
            .trim_end_matches('/');
        if authority.is_empty() || authority.contains('/') {
            return Err(invalid("expected host[:port]"));
        }

        let has_port = match authority.rsplit_once(':') {
            // bracketed IPv6 without port, e.g. `[::1]`
            Some((_, port)) if port.ends_with(']') => false,
            Some((_, port)) => {
                port.parse::<u16>()
                    .map_err(|_| invalid("invalid port number"))?;
                true
            }
            None => false,
        };

        if has_port {
            Ok(Endpoint::Tcp(authority.to_owned()))
        } else {
            Ok(Endpoint::Tcp(format!("{authority}:{DEFAULT_TCP_PORT}")))
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Unix(path) => write!(f, "unix://{}", path.display()),
            Endpoint::Tcp(authority) => write!(f, "tcp://{authority}"),
        }
    }
}

impl Endpoint {
    /// Value of the `Host` header. Unix sockets have no authority; the runtime
    /// ignores the header but HTTP/1.1 requires it.
    fn host_header(&self) -> &str {
        match self {
            Endpoint::Unix(_) => "localhost",
            Endpoint::Tcp(authority) => authority,
        }
    }
}

/// A fully read response.
#[derive(Debug)]
pub struct RawResponse {
    pub status: StatusCode,
    pub body: Bytes,
}

#[derive(Debug, Clone)]
pub struct Transport {
    endpoint: Endpoint,
}

impl Transport {
    pub fn new(endpoint: Endpoint) -> Self {
        Self { endpoint }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Issues `GET path_and_query` and reads the whole body.
    pub async fn get(&self, path_and_query: &str) -> Result<RawResponse> {
        let request = Request::builder()
            .method(Method::GET)
            .uri(path_and_query)
            .header(header::HOST, self.endpoint.host_header())
            .header(header::USER_AGENT, USER_AGENT)
            .body(String::new())
            .map_err(|source| Error::Request {
                path: path_and_query.to_owned(),
                source,
            })?;

        let response = match &self.endpoint {
            Endpoint::Unix(path) => {
                let stream = tokio::net::UnixStream::connect(path)
                    .await
                    .map_err(|source| self.connect_error(source))?;
                self.send(TokioIo::new(stream), request).await?
            }
            Endpoint::Tcp(authority) => {
                let stream = tokio::net::TcpStream::connect(authority.as_str())
                    .await
                    .map_err(|source| self.connect_error(source))?;
                self.send(TokioIo::new(stream), request).await?
            }
        };

        let status = response.status();
        let body = axum::body::to_bytes(Body::new(response.into_body()), MAX_BODY_BYTES)
            .await
            .map_err(|source| Error::Body {
                path: path_and_query.to_owned(),
                source,
            })?;
        log::trace!(
            "GET {} -> {} ({} bytes)",
            path_and_query,
            status,
            body.len()
        );

        Ok(RawResponse { status, body })
    }

    async fn send<T>(&self, io: T, request: Request<String>) -> Result<Response<Incoming>>
    where
        T: hyper::rt::Read + hyper::rt::Write + Unpin + Send + 'static,
    {
        let (mut sender, connection) = hyper::client::conn::http1::handshake(io)
            .await
            .map_err(|source| self.http_error(source))?;
        tokio::spawn(async move {
            if let Err(err) = connection.await {
                log::debug!("runtime connection closed with error: {}", err);
            }
        });

        sender
            .send_request(request)
            .await
            .map_err(|source| self.http_error(source))
    }

    fn connect_error(&self, source: std::io::Error) -> Error {
        Error::Connect {
            endpoint: self.endpoint.to_string(),
            source,
        }
    }

    fn http_error(&self, source: hyper::Error) -> Error {
        Error::Http {
            endpoint: self.endpoint.to_string(),
            source,
        }
    }
}
