//! Test doubles shared by unit tests across the crate.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use jobgate_core::{AuditRecord, BrokerMessage};
use parking_lot::Mutex;

use crate::broker::{BrokerError, Publisher};
use crate::service::config::{BackendConfig, BrokerConfig};
use crate::service::domain::{AsyncSubmitter, AuthGate, SyncProxy};
use crate::service::router::GatewayRouter;
use crate::traits::{AuditSink, BrokerClient, CredentialAuthority};

// ---------------------------------------------------------------------------
// Broker
// ---------------------------------------------------------------------------

/// Broker that records every message it is asked to publish.
#[derive(Default)]
pub struct RecordingBroker {
    messages: Mutex<Vec<BrokerMessage>>,
    attempts: AtomicUsize,
    closes: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    fail: bool,
    delay: Option<Duration>,
}

impl RecordingBroker {
    /// A broker whose every delivery fails.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// A broker that takes `delay` to acknowledge each delivery.
    pub fn delayed(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    /// A broker that never acknowledges.
    pub fn stalled() -> Self {
        Self::delayed(Duration::from_secs(3600))
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    pub fn messages(&self) -> Vec<BrokerMessage> {
        self.messages.lock().clone()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BrokerClient for RecordingBroker {
    async fn publish(&self, message: BrokerMessage) -> Result<(), BrokerError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(delay).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
        }
        if self.fail {
            return Err(BrokerError::Delivery("broker down".to_string()));
        }
        self.messages.lock().push(message);
        Ok(())
    }

    async fn close(&self) -> Result<(), BrokerError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Authority and audit
// ---------------------------------------------------------------------------

#[derive(Clone, Copy)]
enum Verdict {
    Accept,
    Decline,
    Unreachable,
}

/// Authority with a fixed answer.
pub struct StaticAuthority {
    verdict: Verdict,
    calls: AtomicUsize,
}

impl StaticAuthority {
    fn with(verdict: Verdict) -> Self {
        Self {
            verdict,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn accepting() -> Self {
        Self::with(Verdict::Accept)
    }

    pub fn declining() -> Self {
        Self::with(Verdict::Decline)
    }

    pub fn unreachable() -> Self {
        Self::with(Verdict::Unreachable)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CredentialAuthority for StaticAuthority {
    async fn verify(&self, _credential: &str) -> anyhow::Result<bool> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.verdict {
            Verdict::Accept => Ok(true),
            Verdict::Decline => Ok(false),
            Verdict::Unreachable => Err(anyhow::anyhow!("connection refused")),
        }
    }
}

#[derive(Default)]
pub struct RecordingAudit {
    records: Mutex<Vec<AuditRecord>>,
}

impl RecordingAudit {
    pub fn records(&self) -> Vec<AuditRecord> {
        self.records.lock().clone()
    }
}

impl AuditSink for RecordingAudit {
    fn record(&self, record: AuditRecord) {
        self.records.lock().push(record);
    }
}

// ---------------------------------------------------------------------------
// Assembled router
// ---------------------------------------------------------------------------

/// A router wired to test doubles, with every backend resource served from
/// `backend_url`. Must be created inside a tokio runtime.
pub struct TestGateway {
    router: GatewayRouter,
    pub publisher: Arc<Publisher>,
    pub broker: Arc<RecordingBroker>,
    pub audit: Arc<RecordingAudit>,
    pub authority: Arc<StaticAuthority>,
}

impl TestGateway {
    pub fn start(authority: StaticAuthority, backend_url: &str) -> Self {
        Self::with_broker(
            authority,
            backend_url,
            RecordingBroker::default(),
            &BrokerConfig::default(),
        )
    }

    pub fn with_broker(
        authority: StaticAuthority,
        backend_url: &str,
        broker: RecordingBroker,
        broker_config: &BrokerConfig,
    ) -> Self {
        let authority = Arc::new(authority);
        let audit = Arc::new(RecordingAudit::default());
        let broker = Arc::new(broker);
        let publisher = Arc::new(Publisher::start(broker.clone(), broker_config));

        let proxy = SyncProxy::new(&BackendConfig {
            jobs_url: backend_url.to_string(),
            data_url: backend_url.to_string(),
            services_url: backend_url.to_string(),
            timeout: Duration::from_secs(2),
            connect_timeout: Duration::from_secs(1),
        })
        .expect("test backend url");

        let router = GatewayRouter::new(
            AuthGate::new(authority.clone(), audit.clone()),
            proxy,
            AsyncSubmitter::new(Arc::clone(&publisher), "Request-Job"),
        );

        Self {
            router,
            publisher,
            broker,
            audit,
            authority,
        }
    }

    pub fn router(&self) -> GatewayRouter {
        self.router.clone()
    }

    /// Drains the publisher so every submitted message is visible.
    pub async fn shutdown(&self) {
        self.publisher.shutdown().await;
    }
}
