//! Metrics middleware for gateway flows.
//!
//! Wraps each flow in a tracing span carrying the call kind, terminal state,
//! status, and duration. Counts flows per terminal state and records their
//! latency per call kind.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;

use tower::{Layer, Service};
use tracing::{info_span, Instrument};

use crate::service::operation::{GatewayError, GatewayRequest, SuccessEnvelope};

// ---------------------------------------------------------------------------
// MetricsLayer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct MetricsLayer;

impl<S> Layer<S> for MetricsLayer {
    type Service = MetricsService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MetricsService { inner }
    }
}

// ---------------------------------------------------------------------------
// MetricsService
// ---------------------------------------------------------------------------

/// Service wrapper that records flow duration and outcome.
#[derive(Debug, Clone)]
pub struct MetricsService<S> {
    inner: S,
}

impl<S> Service<GatewayRequest> for MetricsService<S>
where
    S: Service<GatewayRequest, Response = SuccessEnvelope, Error = GatewayError> + Send,
    S::Future: Send + 'static,
{
    type Response = SuccessEnvelope;
    type Error = GatewayError;
    type Future = Pin<Box<dyn Future<Output = Result<SuccessEnvelope, GatewayError>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: GatewayRequest) -> Self::Future {
        let call = request.call.kind();

        let span = info_span!(
            "flow",
            call = call,
            terminal = tracing::field::Empty,
            status = tracing::field::Empty,
            duration_ms = tracing::field::Empty,
        );

        let fut = self.inner.call(request);

        Box::pin(
            async move {
                let start = Instant::now();
                let result = fut.await;
                let elapsed = start.elapsed();

                let (terminal, status) = match &result {
                    Ok(success) => (success.terminal_state(), None),
                    Err(err) => (err.terminal_state(), Some(err.status_code())),
                };
                let terminal = terminal.as_str();

                #[allow(clippy::cast_possible_truncation)]
                let duration_ms = elapsed.as_millis() as u64;
                let span = tracing::Span::current();
                span.record("terminal", terminal);
                span.record("duration_ms", duration_ms);
                if let Some(status) = status {
                    span.record("status", status.as_u16());
                }

                ::metrics::counter!("jobgate_requests_total", "call" => call, "terminal" => terminal)
                    .increment(1);
                ::metrics::histogram!("jobgate_request_duration_seconds", "call" => call)
                    .record(elapsed.as_secs_f64());

                match (&result, status) {
                    (Err(err), Some(status)) if status.is_server_error() => {
                        tracing::error!(call, terminal, error = %err, duration_ms, "flow failed");
                    }
                    (Err(err), _) => {
                        tracing::warn!(call, terminal, error = %err, duration_ms, "flow rejected");
                    }
                    (Ok(_), _) => {
                        tracing::info!(call, terminal, duration_ms, "flow complete");
                    }
                }

                result
            }
            .instrument(span),
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
