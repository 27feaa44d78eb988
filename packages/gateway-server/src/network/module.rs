//! Network module with deferred startup lifecycle.
//!
//! `new()` assembles shared state, `start()` binds the TCP listener, and
//! `serve()` accepts connections until shutdown. Binding before serving lets
//! the caller learn the OS-assigned port first.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tracing::{info, warn};

use super::config::{NetworkConfig, TlsConfig};
use super::handlers::{
    gateway_routes, health_handler, liveness_handler, method_not_allowed, readiness_handler,
    AppState,
};
use super::middleware::build_http_layers;
use super::shutdown::ShutdownController;
use crate::broker::Publisher;
use crate::service::GatewayPipeline;

/// Owns the HTTP listener and the state handed to every handler.
///
/// 1. `new()` -- allocates shared state (shutdown controller, app state)
/// 2. `start()` -- binds TCP listener to the configured address
/// 3. `serve()` -- accepts connections until the shutdown future resolves,
///    then drains in-flight flows
pub struct NetworkModule {
    config: NetworkConfig,
    listener: Option<TcpListener>,
    shutdown: Arc<ShutdownController>,
    state: AppState,
}

impl NetworkModule {
    #[must_use]
    pub fn new(config: NetworkConfig, pipeline: GatewayPipeline, publisher: Arc<Publisher>) -> Self {
        let shutdown = Arc::new(ShutdownController::new());
        let state = AppState {
            shutdown: Arc::clone(&shutdown),
            pipeline,
            publisher,
            start_time: Instant::now(),
        };
        Self {
            config,
            listener: None,
            shutdown,
            state,
        }
    }

    #[must_use]
    pub fn shutdown_controller(&self) -> Arc<ShutdownController> {
        Arc::clone(&self.shutdown)
    }

    /// Assembles the axum router with all routes and middleware.
    ///
    /// - `GET /health`, `/health/live`, `/health/ready` -- probes
    /// - gateway routes, see [`gateway_routes`]
    pub fn build_router(&self) -> Router {
        Router::new()
            .route("/health", get(health_handler))
            .route("/health/live", get(liveness_handler))
            .route("/health/ready", get(readiness_handler))
            .merge(gateway_routes())
            .method_not_allowed_fallback(method_not_allowed)
            .layer(DefaultBodyLimit::max(self.config.max_body_bytes))
            .layer(build_http_layers(&self.config))
            .with_state(self.state.clone())
    }

    /// Binds the TCP listener and returns the bound port (useful with port 0).
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound (e.g., port in use).
    pub async fn start(&mut self) -> anyhow::Result<u16> {
        let addr = self.config.bind_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("failed to bind {addr}"))?;
        let port = listener.local_addr()?.port();

        info!(host = %self.config.host, port, "TCP listener bound");

        self.listener = Some(listener);
        Ok(port)
    }

    /// Serves connections until `shutdown` resolves.
    ///
    /// Once it resolves, health moves to `Draining`, the listener stops
    /// accepting, and in-flight flows get up to `drain_timeout` to finish.
    ///
    /// # Errors
    ///
    /// Returns an error if `start()` was not called, TLS material cannot be
    /// loaded, or the server hits a fatal I/O error.
    pub async fn serve(
        mut self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> anyhow::Result<()> {
        let listener = self
            .listener
            .take()
            .ok_or_else(|| anyhow::anyhow!("start() must be called before serve()"))?;
        let router = self.build_router();
        let ctrl = Arc::clone(&self.shutdown);

        let signal = {
            let ctrl = Arc::clone(&ctrl);
            async move {
                shutdown.await;
                info!("shutdown signalled, draining");
                ctrl.trigger_shutdown();
            }
        };

        ctrl.set_ready();

        match self.config.tls {
            Some(ref tls) => serve_tls(listener, router, tls, signal).await?,
            None => serve_plain(listener, router, signal).await?,
        }

        if ctrl.wait_for_drain(self.config.drain_timeout).await {
            info!("all in-flight requests drained");
        } else {
            warn!(
                remaining = ctrl.in_flight_count(),
                "drain timeout expired with requests in flight"
            );
        }
        Ok(())
    }
}

async fn serve_plain(
    listener: TcpListener,
    router: Router,
    signal: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    info!("serving plain HTTP");
    axum::serve(listener, router)
        .with_graceful_shutdown(signal)
        .await?;
    Ok(())
}

/// Serves TLS via `axum-server`, reusing the pre-bound listener.
async fn serve_tls(
    listener: TcpListener,
    router: Router,
    tls: &TlsConfig,
    signal: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    use axum_server::tls_rustls::RustlsConfig;

    let rustls_config = RustlsConfig::from_pem_file(&tls.cert_path, &tls.key_path)
        .await
        .map_err(|e| anyhow::anyhow!("failed to load TLS certificates: {e}"))?;

    let addr = listener.local_addr()?;
    let std_listener = listener.into_std()?;
    let handle = axum_server::Handle::new();
    let shutdown_handle = handle.clone();

    tokio::spawn(async move {
        signal.await;
        shutdown_handle.graceful_shutdown(None);
    });

    info!(%addr, "serving TLS");

    axum_server::from_tcp_rustls(std_listener, rustls_config)
        .handle(handle)
        .serve(router.into_make_service())
        .await?;
    Ok(())
}
