//! Message broker clients and the publishing lifecycle.
//!
//! - [`disabled`]: no-op client for deployments without a broker
//! - [`kafka`]: `rdkafka` producer (cargo feature `kafka`)
//! - [`publisher`]: owns the client for the life of the process and feeds it
//!   from a bounded queue, with a cap on concurrent deliveries

pub mod disabled;
#[cfg(feature = "kafka")]
pub mod kafka;
pub mod publisher;

use std::sync::Arc;

use tracing::warn;

pub use disabled::DisabledBroker;
#[cfg(feature = "kafka")]
pub use kafka::KafkaBroker;
pub use publisher::Publisher;

use crate::service::config::BrokerConfig;
use crate::traits::BrokerClient;

/// Errors raised by broker clients and the publisher.
#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    #[error("publisher is shut down")]
    PublisherClosed,
    #[error("publish queue is full")]
    QueueFull,
    #[error("broker delivery failed: {0}")]
    Delivery(String),
    #[error("broker client error: {0}")]
    Client(String),
}

/// Creates the broker client selected by `config`.
///
/// # Errors
///
/// Returns an error if the broker is enabled but the client cannot be
/// created, or if the binary was built without a broker implementation.
pub fn build_broker(config: &BrokerConfig) -> anyhow::Result<Arc<dyn BrokerClient>> {
    if !config.enabled {
        warn!("broker disabled: submitted jobs are acknowledged but not delivered");
        return Ok(Arc::new(DisabledBroker));
    }

    #[cfg(feature = "kafka")]
    {
        Ok(Arc::new(KafkaBroker::new(config)?))
    }

    #[cfg(not(feature = "kafka"))]
    {
        anyhow::bail!("broker enabled but jobgate was built without the `kafka` feature")
    }
}
