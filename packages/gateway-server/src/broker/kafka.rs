use std::time::{Duration, Instant};

use anyhow::Context;
use async_trait::async_trait;
use jobgate_core::BrokerMessage;
use rdkafka::config::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use rdkafka::util::Timeout;
use tracing::{debug, info};

use super::BrokerError;
use crate::service::config::BrokerConfig;
use crate::traits::BrokerClient;

/// Kafka producer for job request messages.
///
/// Configured for acknowledged writes (`acks=all`, idempotence on). Retries
/// are left to librdkafka within `delivery_timeout`; the gateway itself never
/// re-sends a message.
pub struct KafkaBroker {
    producer: FutureProducer,
    delivery_timeout: Duration,
}

impl KafkaBroker {
    /// Create a producer connected to `config.bootstrap_servers`.
    ///
    /// # Errors
    ///
    /// Returns an error if librdkafka rejects the configuration.
    pub fn new(config: &BrokerConfig) -> anyhow::Result<Self> {
        info!(servers = %config.bootstrap_servers, "initializing Kafka producer");

        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", &config.bootstrap_servers)
            .set("acks", "all")
            .set("enable.idempotence", "true")
            .set(
                "message.timeout.ms",
                config.delivery_timeout.as_millis().to_string(),
            )
            .create()
            .context("failed to create Kafka producer")?;

        Ok(Self {
            producer,
            delivery_timeout: config.delivery_timeout,
        })
    }
}

#[async_trait]
impl BrokerClient for KafkaBroker {
    async fn publish(&self, message: BrokerMessage) -> Result<(), BrokerError> {
        let record = FutureRecord::to(&message.topic)
            .key(message.key.as_str())
            .payload(message.payload.as_slice());

        let start = Instant::now();
        match self
            .producer
            .send(record, Timeout::After(self.delivery_timeout))
            .await
        {
            Ok((partition, offset)) => {
                debug!(
                    topic = %message.topic,
                    key = %message.key,
                    partition,
                    offset,
                    latency_ms = start.elapsed().as_millis(),
                    "message delivered"
                );
                Ok(())
            }
            Err((kafka_err, _)) => Err(BrokerError::Delivery(kafka_err.to_string())),
        }
    }

    async fn close(&self) -> Result<(), BrokerError> {
        info!(timeout = ?self.delivery_timeout, "flushing Kafka producer");
        self.producer
            .flush(Timeout::After(self.delivery_timeout))
            .map_err(|e| BrokerError::Client(e.to_string()))
    }
}
