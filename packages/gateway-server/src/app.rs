//! Process assembly: wires configuration into components and owns the
//! startup and shutdown order.

use std::future::Future;
use std::sync::Arc;

use jobgate_core::request_topic;
use tracing::info;

use crate::broker::{build_broker, Publisher};
use crate::network::{NetworkModule, ShutdownController};
use crate::service::domain::{AsyncSubmitter, AuthGate, HttpAuthority, SyncProxy, TracingAuditSink};
use crate::service::{build_gateway_pipeline, GatewayConfig, GatewayRouter};
use crate::traits::{AuditSink, BrokerClient, CredentialAuthority};

/// A fully assembled gateway.
///
/// The publisher (and through it the broker client) is created here, once,
/// and released in [`run`](Self::run) after the HTTP server has drained.
pub struct Gateway {
    publisher: Arc<Publisher>,
    network: NetworkModule,
}

impl Gateway {
    /// Builds a gateway with the HTTP authority, tracing audit sink, and the
    /// broker selected by `config`. Must be called inside a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if a URL is invalid or the broker client cannot be
    /// created.
    pub fn new(config: GatewayConfig) -> anyhow::Result<Self> {
        let authority = Arc::new(HttpAuthority::new(&config.authority)?);
        let broker = build_broker(&config.broker)?;
        Self::with_components(config, broker, authority, Arc::new(TracingAuditSink))
    }

    /// Builds a gateway around caller-supplied collaborators.
    ///
    /// # Errors
    ///
    /// Returns an error if a backend URL is invalid.
    pub fn with_components(
        config: GatewayConfig,
        broker: Arc<dyn BrokerClient>,
        authority: Arc<dyn CredentialAuthority>,
        audit: Arc<dyn AuditSink>,
    ) -> anyhow::Result<Self> {
        let proxy = SyncProxy::new(&config.backend)?;
        let topic = request_topic(&config.broker.request_topic, config.broker.space.as_deref());
        info!(%topic, broker_enabled = config.broker.enabled, "assembling gateway");

        let publisher = Arc::new(Publisher::start(broker, &config.broker));
        let router = GatewayRouter::new(
            AuthGate::new(authority, audit),
            proxy,
            AsyncSubmitter::new(Arc::clone(&publisher), topic),
        );
        let pipeline = build_gateway_pipeline(router, &config.dispatch);
        let network = NetworkModule::new(config.network, pipeline, Arc::clone(&publisher));

        Ok(Self { publisher, network })
    }

    /// Binds the listener; returns the bound port.
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound.
    pub async fn start(&mut self) -> anyhow::Result<u16> {
        self.network.start().await
    }

    #[must_use]
    pub fn shutdown_controller(&self) -> Arc<ShutdownController> {
        self.network.shutdown_controller()
    }

    /// Serves until `shutdown` resolves, drains in-flight requests, then
    /// drains the publish queue and closes the broker client.
    ///
    /// The publisher is shut down even if serving fails.
    ///
    /// # Errors
    ///
    /// Returns the server error, if any.
    pub async fn run(self, shutdown: impl Future<Output = ()> + Send + 'static) -> anyhow::Result<()> {
        let served = self.network.serve(shutdown).await;
        self.publisher.shutdown().await;
        info!("gateway stopped");
        served
    }
}
