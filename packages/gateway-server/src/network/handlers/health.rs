//! Probe endpoints for orchestrators and operators.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use super::AppState;
use crate::network::HealthState;

/// Body of `GET /health`.
#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub state: &'static str,
    pub in_flight: u64,
    pub publisher_running: bool,
    pub publish_queue_depth: usize,
    pub uptime_secs: u64,
}

/// Always 200; `state` tells "up but draining" apart from "ready".
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthReport> {
    Json(HealthReport {
        state: state.shutdown.health_state().as_str(),
        in_flight: state.shutdown.in_flight_count(),
        publisher_running: state.publisher.is_running(),
        publish_queue_depth: state.publisher.queue_depth(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

pub async fn liveness_handler() -> StatusCode {
    StatusCode::OK
}

/// 200 only while the listener is `Ready` and submissions can still be
/// queued for the broker.
pub async fn readiness_handler(State(state): State<AppState>) -> StatusCode {
    if state.shutdown.health_state() == HealthState::Ready && state.publisher.is_running() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}
