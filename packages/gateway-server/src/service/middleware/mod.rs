//! Tower middleware layers for the gateway pipeline.
//!
//! - [`load_shed`]: Semaphore-based concurrency limiting
//! - [`metrics`]: Flow timing, terminal state, and counters
//! - [`pipeline`]: Composes all layers around the router

pub mod load_shed;
pub mod metrics;
pub mod pipeline;

pub use load_shed::LoadShedLayer;
pub use metrics::MetricsLayer;
pub use pipeline::{build_gateway_pipeline, GatewayPipeline};
