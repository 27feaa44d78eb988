//! Pipeline composition: wraps the router in the middleware stack.

use tower::ServiceBuilder;

use super::load_shed::{LoadShedLayer, LoadShedService};
use super::metrics::{MetricsLayer, MetricsService};
use crate::service::config::DispatchConfig;
use crate::service::router::GatewayRouter;

/// The full service stack handed to the HTTP layer.
pub type GatewayPipeline = LoadShedService<MetricsService<GatewayRouter>>;

/// Build the gateway pipeline.
///
/// Layer order (outermost to innermost):
/// 1. `LoadShedLayer` -- reject when overloaded (fail fast before doing any work)
/// 2. `MetricsLayer` -- record timing and terminal state (closest to the router)
#[must_use]
pub fn build_gateway_pipeline(router: GatewayRouter, config: &DispatchConfig) -> GatewayPipeline {
    ServiceBuilder::new()
        .layer(LoadShedLayer::new(config.max_concurrent_requests))
        .layer(MetricsLayer)
        .service(router)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
