use async_trait::async_trait;
use jobgate_core::{AuditRecord, BrokerMessage};

use crate::broker::BrokerError;

/// External authority that decides whether a credential is valid.
/// Implementations: HTTP security service, test doubles.
#[async_trait]
pub trait CredentialAuthority: Send + Sync {
    /// Ask the authority about `credential`.
    ///
    /// `Ok(false)` is an explicit rejection; `Err` means no decision could
    /// be obtained.
    async fn verify(&self, credential: &str) -> anyhow::Result<bool>;
}

/// Destination for audit records produced by credential checks.
pub trait AuditSink: Send + Sync {
    /// Record one entry. Called synchronously, before the decision is used.
    fn record(&self, record: AuditRecord);
}

/// Message bus client. Shared by every flow; publish must be safe to call
/// concurrently.
#[async_trait]
pub trait BrokerClient: Send + Sync {
    /// Deliver one message, waiting for the broker's acknowledgement.
    async fn publish(&self, message: BrokerMessage) -> Result<(), BrokerError>;

    /// Flush pending deliveries and release the client.
    async fn close(&self) -> Result<(), BrokerError>;
}
