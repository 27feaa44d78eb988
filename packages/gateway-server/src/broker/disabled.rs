use async_trait::async_trait;
use jobgate_core::BrokerMessage;
use tracing::debug;

use super::BrokerError;
use crate::traits::BrokerClient;

/// Broker client used when no broker is configured. Messages are logged and
/// dropped.
#[derive(Debug, Default)]
pub struct DisabledBroker;

#[async_trait]
impl BrokerClient for DisabledBroker {
    async fn publish(&self, message: BrokerMessage) -> Result<(), BrokerError> {
        debug!(
            topic = %message.topic,
            key = %message.key,
            "broker disabled - message NOT sent"
        );
        Ok(())
    }

    async fn close(&self) -> Result<(), BrokerError> {
        Ok(())
    }
}
