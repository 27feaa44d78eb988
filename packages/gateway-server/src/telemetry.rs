//! Logging and metrics exporter setup for the `jobgate` binary.

use std::net::SocketAddr;

use anyhow::Context;
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Installs the global tracing subscriber.
///
/// `RUST_LOG` wins over `default_filter`. With `json` set, events are written
/// as one JSON object per line.
///
/// # Errors
///
/// Returns an error if the filter is invalid or a subscriber is already
/// installed.
pub fn init_tracing(default_filter: &str, json: bool) -> anyhow::Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_filter)
            .with_context(|| format!("invalid log filter '{default_filter}'"))?,
    };

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
            .context("tracing subscriber already installed")?;
    } else {
        registry
            .with(tracing_subscriber::fmt::layer())
            .try_init()
            .context("tracing subscriber already installed")?;
    }
    Ok(())
}

/// Serves Prometheus metrics on `addr`. Must be called inside a tokio
/// runtime.
///
/// # Errors
///
/// Returns an error if the exporter cannot be installed.
pub fn install_metrics_exporter(addr: SocketAddr) -> anyhow::Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .context("failed to install Prometheus exporter")?;
    tracing::info!(%addr, "metrics exporter listening");
    Ok(())
}

