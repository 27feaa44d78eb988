//! HTTP handler definitions for the gateway.
//!
//! This module defines `AppState` (the shared state carried through axum
//! extractors) and the single entry point every gateway route funnels into.

pub mod gateway;
pub mod health;

pub use gateway::{gateway_routes, method_not_allowed};
pub use health::{health_handler, liveness_handler, readiness_handler};

use std::sync::Arc;
use std::time::Instant;

use axum::http::HeaderMap;
use axum::response::Response;
use tower::ServiceExt;

use super::ShutdownController;
use crate::broker::Publisher;
use crate::service::domain::credential_from_headers;
use crate::service::{normalize, GatewayPipeline, GatewayRequest, InboundCall};

/// Shared application state passed to all axum handlers via `State` extraction.
///
/// Holds `Arc` references and a cloneable service stack, so cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    /// Graceful shutdown controller with health state and in-flight tracking.
    pub shutdown: Arc<ShutdownController>,
    /// Middleware-wrapped router that runs each flow.
    pub pipeline: GatewayPipeline,
    /// Broker lifecycle owner, for health reporting.
    pub publisher: Arc<Publisher>,
    /// Process start time, used for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    /// Runs one flow for `call` and renders its outcome.
    ///
    /// Always produces a response: every flow result is normalized into a
    /// status code plus envelope.
    pub async fn dispatch(&self, headers: &HeaderMap, call: InboundCall) -> Response {
        let _guard = self.shutdown.in_flight_guard();
        let request = GatewayRequest::new(credential_from_headers(headers), call);
        normalize(self.pipeline.clone().oneshot(request).await)
    }
}
