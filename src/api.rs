use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use tokio::time::Instant;

use crate::collector::Collector;
use crate::error::{Error, Result};
use crate::exposition::{self, Exposition};
use crate::runtime::ContainerRuntime;

/// Shared state of all HTTP handlers.
pub struct AppState<R> {
    collector: Arc<Collector<R>>,
    exposition: Arc<Exposition>,
    health_timeout: Duration,
    metrics_path: Arc<str>,
}

// Derived `Clone` would require `R: Clone`.
impl<R> Clone for AppState<R> {
    fn clone(&self) -> Self {
        Self {
            collector: Arc::clone(&self.collector),
            exposition: Arc::clone(&self.exposition),
            health_timeout: self.health_timeout,
            metrics_path: Arc::clone(&self.metrics_path),
        }
    }
}

impl<R: ContainerRuntime> AppState<R> {
    pub fn new(
        collector: Collector<R>,
        exposition: Exposition,
        health_timeout: Duration,
        metrics_path: &str,
    ) -> Self {
        Self {
            collector: Arc::new(collector),
            exposition: Arc::new(exposition),
            health_timeout,
            metrics_path: metrics_path.into(),
        }
    }
}

async fn serve_metrics<R: ContainerRuntime>(State(state): State<AppState<R>>) -> Response {
    let metrics = state.collector.collect().await;
    state.exposition.record_request(StatusCode::OK.as_u16());
    let body = state.exposition.render(&metrics);

    ([(header::CONTENT_TYPE, exposition::CONTENT_TYPE)], body).into_response()
}

async fn health<R: ContainerRuntime>(State(state): State<AppState<R>>) -> Response {
    let deadline = Instant::now() + state.health_timeout;
    match state.collector.runtime().ping(deadline).await {
        Ok(()) => (StatusCode::OK, "healthy").into_response(),
        Err(err) => {
            log::warn!("health check failed: {}", err);
            (StatusCode::SERVICE_UNAVAILABLE, format!("unhealthy: {err}")).into_response()
        }
    }
}

async fn landing<R: ContainerRuntime>(State(state): State<AppState<R>>) -> Html<String> {
    Html(format!(
        "<html>\n\
         <head><title>Docker Exporter</title></head>\n\
         <body>\n\
         <h1>Docker Exporter</h1>\n\
         <p>Version {}</p>\n\
         <p><a href=\"{}\">Metrics</a></p>\n\
         </body>\n\
         </html>\n",
        state.collector.build().version,
        state.metrics_path
    ))
}

pub struct APIServer {
    router: Router,
}

impl APIServer {
    pub fn new<R: ContainerRuntime>(state: AppState<R>) -> Self {
        let metrics_path = Arc::clone(&state.metrics_path);
        let mut router = Router::new()
            .route(&metrics_path, get(serve_metrics::<R>))
            .route("/health", get(health::<R>));
        if &*metrics_path != "/" {
            router = router.route("/", get(landing::<R>));
        }
        Self {
            router: router.with_state(state),
        }
    }

    /// Serves until SIGINT or SIGTERM is received.
    pub async fn listen(self, addr: &str) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|source| Error::Bind {
                address: addr.to_owned(),
                source,
            })?;
        log::info!("listening on {}", addr);

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(Error::Serve)
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            log::error!("failed to listen for SIGINT: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                log::error!("failed to listen for SIGTERM: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    log::info!("shutting down");
}
