//! `jobgate` binary: parses configuration, installs logging, and runs the
//! gateway until SIGINT or SIGTERM.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use jobgate_core::DEFAULT_REQUEST_TOPIC;
use jobgate_server::network::{NetworkConfig, TlsConfig};
use jobgate_server::service::{AuthorityConfig, BackendConfig, BrokerConfig, DispatchConfig, GatewayConfig};
use jobgate_server::telemetry::{init_tracing, install_metrics_exporter};
use jobgate_server::Gateway;
use tracing::{error, info};

/// HTTP gateway for job submission and job, data, and service queries.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[arg(long, env = "JOBGATE_HOST", default_value = "0.0.0.0")]
    host: String,

    #[arg(long, env = "JOBGATE_PORT", default_value_t = 8080)]
    port: u16,

    /// PEM certificate; TLS is enabled when both cert and key are given.
    #[arg(long, env = "JOBGATE_TLS_CERT")]
    tls_cert: Option<PathBuf>,

    #[arg(long, env = "JOBGATE_TLS_KEY")]
    tls_key: Option<PathBuf>,

    /// Allowed CORS origins, comma separated. `*` allows any.
    #[arg(long, env = "JOBGATE_CORS_ORIGINS", value_delimiter = ',', default_value = "*")]
    cors_origins: Vec<String>,

    /// Seconds to wait for in-flight requests on shutdown.
    #[arg(long, env = "JOBGATE_DRAIN_TIMEOUT_SECS", default_value_t = 30)]
    drain_timeout_secs: u64,

    /// Largest accepted request body, in bytes.
    #[arg(long, env = "JOBGATE_MAX_BODY_BYTES", default_value_t = 2 * 1024 * 1024)]
    max_body_bytes: usize,

    /// Security authority base URL.
    #[arg(long, env = "JOBGATE_AUTHORITY_URL", default_value = "http://localhost:8083")]
    authority_url: String,

    #[arg(long, env = "JOBGATE_AUTHORITY_TIMEOUT_SECS", default_value_t = 5)]
    authority_timeout_secs: u64,

    /// Job status service base URL.
    #[arg(long, env = "JOBGATE_JOBS_URL", default_value = "http://localhost:8084")]
    jobs_url: String,

    /// Data registry base URL.
    #[arg(long, env = "JOBGATE_DATA_URL", default_value = "http://localhost:8085")]
    data_url: String,

    /// Service registry base URL.
    #[arg(long, env = "JOBGATE_SERVICES_URL", default_value = "http://localhost:8086")]
    services_url: String,

    #[arg(long, env = "JOBGATE_BACKEND_TIMEOUT_SECS", default_value_t = 30)]
    backend_timeout_secs: u64,

    /// Publish submitted jobs to the broker. Without it jobs are accepted and
    /// dropped.
    #[arg(long, env = "JOBGATE_BROKER_ENABLED")]
    broker_enabled: bool,

    #[arg(long, env = "JOBGATE_BROKER_SERVERS", default_value = "localhost:9092")]
    broker_servers: String,

    #[arg(long, env = "JOBGATE_BROKER_TOPIC", default_value = DEFAULT_REQUEST_TOPIC)]
    broker_topic: String,

    /// Deployment space appended to the topic name.
    #[arg(long, env = "JOBGATE_SPACE")]
    space: Option<String>,

    #[arg(long, env = "JOBGATE_PUBLISH_QUEUE_CAPACITY", default_value_t = 1024)]
    publish_queue_capacity: usize,

    /// Deliveries awaiting broker acknowledgement at once.
    #[arg(long, env = "JOBGATE_BROKER_MAX_IN_FLIGHT", default_value_t = 64)]
    broker_max_in_flight: usize,

    #[arg(long, env = "JOBGATE_BROKER_DELIVERY_TIMEOUT_SECS", default_value_t = 30)]
    broker_delivery_timeout_secs: u64,

    /// Seconds to spend publishing queued jobs on shutdown.
    #[arg(long, env = "JOBGATE_BROKER_DRAIN_TIMEOUT_SECS", default_value_t = 30)]
    broker_drain_timeout_secs: u64,

    #[arg(long, env = "JOBGATE_MAX_CONCURRENT_REQUESTS", default_value_t = 1000)]
    max_concurrent_requests: u32,

    /// Default log filter when `RUST_LOG` is unset.
    #[arg(long, env = "JOBGATE_LOG", default_value = "info")]
    log: String,

    #[arg(long, env = "JOBGATE_LOG_JSON")]
    log_json: bool,

    /// Address for the Prometheus scrape endpoint. Disabled when unset.
    #[arg(long, env = "JOBGATE_METRICS_ADDR")]
    metrics_addr: Option<SocketAddr>,
}

impl Cli {
    fn into_config(self) -> anyhow::Result<GatewayConfig> {
        let tls = TlsConfig::from_paths(self.tls_cert, self.tls_key)?;

        Ok(GatewayConfig {
            network: NetworkConfig {
                host: self.host,
                port: self.port,
                tls,
                cors_origins: self.cors_origins,
                drain_timeout: Duration::from_secs(self.drain_timeout_secs),
                max_body_bytes: self.max_body_bytes,
            },
            authority: AuthorityConfig {
                url: self.authority_url,
                timeout: Duration::from_secs(self.authority_timeout_secs),
                ..AuthorityConfig::default()
            },
            backend: BackendConfig {
                jobs_url: self.jobs_url,
                data_url: self.data_url,
                services_url: self.services_url,
                timeout: Duration::from_secs(self.backend_timeout_secs),
                ..BackendConfig::default()
            },
            broker: BrokerConfig {
                enabled: self.broker_enabled,
                bootstrap_servers: self.broker_servers,
                request_topic: self.broker_topic,
                space: self.space,
                queue_capacity: self.publish_queue_capacity,
                max_in_flight: self.broker_max_in_flight,
                delivery_timeout: Duration::from_secs(self.broker_delivery_timeout_secs),
                drain_timeout: Duration::from_secs(self.broker_drain_timeout_secs),
                ..BrokerConfig::default()
            },
            dispatch: DispatchConfig {
                max_concurrent_requests: self.max_concurrent_requests,
            },
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log, cli.log_json)?;

    if let Some(addr) = cli.metrics_addr {
        install_metrics_exporter(addr)?;
    }

    let mut gateway = Gateway::new(cli.into_config()?)?;
    let port = gateway.start().await?;
    info!(port, "jobgate started");

    if let Err(e) = gateway.run(shutdown_signal()).await {
        error!(error = %e, "gateway terminated with error");
        return Err(e);
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("received ctrl-c"),
        () = terminate => info!("received SIGTERM"),
    }
}
