use std::time::Duration;

use jobgate_core::DEFAULT_REQUEST_TOPIC;

use crate::network::NetworkConfig;

/// Complete gateway configuration.
#[derive(Debug, Clone, Default)]
pub struct GatewayConfig {
    pub network: NetworkConfig,
    pub authority: AuthorityConfig,
    pub backend: BackendConfig,
    pub broker: BrokerConfig,
    pub dispatch: DispatchConfig,
}

/// External security authority used by the auth gate.
#[derive(Debug, Clone)]
pub struct AuthorityConfig {
    /// Base URL; verification is posted to `{url}/v2/verification`.
    pub url: String,
    /// Upper bound on one verification call, connect included.
    pub timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for AuthorityConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8083".to_string(),
            timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(2),
        }
    }
}

/// Backend services reached by the sync proxy.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Job status service (`/job/{id}`).
    pub jobs_url: String,
    /// Data registry (`/data`).
    pub data_url: String,
    /// Service registry (`/service`).
    pub services_url: String,
    /// Upper bound on one backend call. No retries are attempted.
    pub timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            jobs_url: "http://localhost:8084".to_string(),
            data_url: "http://localhost:8085".to_string(),
            services_url: "http://localhost:8086".to_string(),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(5),
        }
    }
}

/// Message broker and publishing queue.
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    /// When `false`, submissions are accepted but never delivered.
    pub enabled: bool,
    pub bootstrap_servers: String,
    pub request_topic: String,
    /// Deployment space appended to the topic name, if set.
    pub space: Option<String>,
    /// Bounded publish queue between request flows and the publishing task.
    pub queue_capacity: usize,
    /// Deliveries awaiting broker acknowledgement at the same time.
    pub max_in_flight: usize,
    /// Per-message delivery timeout inside the broker client.
    pub delivery_timeout: Duration,
    /// Upper bound on draining the queue at shutdown.
    pub drain_timeout: Duration,
    /// Interval of the publisher's periodic status report.
    pub report_interval: Duration,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bootstrap_servers: "localhost:9092".to_string(),
            request_topic: DEFAULT_REQUEST_TOPIC.to_string(),
            space: None,
            queue_capacity: 1024,
            max_in_flight: 64,
            delivery_timeout: Duration::from_secs(30),
            drain_timeout: Duration::from_secs(30),
            report_interval: Duration::from_secs(60),
        }
    }
}

/// Request dispatch limits.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Concurrent flows allowed before requests are shed.
    pub max_concurrent_requests: u32,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_concurrent_requests: 1000,
        }
    }
}
