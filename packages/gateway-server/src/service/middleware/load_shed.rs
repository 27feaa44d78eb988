//! Admission control: a fixed number of flows may run at once and anything
//! beyond that is answered with `GatewayError::Overloaded` immediately.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tower::{Layer, Service};

use crate::service::operation::{GatewayError, GatewayRequest, SuccessEnvelope};

/// Permit pool shared by every clone of the shedding service.
#[derive(Debug)]
struct Admission {
    permits: Arc<Semaphore>,
    limit: usize,
}

impl Admission {
    fn new(limit: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(limit)),
            limit,
        }
    }

    fn try_admit(admission: &Arc<Self>) -> Option<Admitted> {
        let permit = Arc::clone(&admission.permits).try_acquire_owned().ok()?;
        admission.report();
        Some(Admitted {
            permit: Some(permit),
            admission: Arc::clone(admission),
        })
    }

    fn in_flight(&self) -> usize {
        self.limit - self.permits.available_permits()
    }

    fn report(&self) {
        #[allow(clippy::cast_precision_loss)]
        ::metrics::gauge!("jobgate_requests_in_flight").set(self.in_flight() as f64);
    }
}

/// A held permit. Dropping it, on completion or cancellation, frees the slot
/// and updates the in-flight gauge.
struct Admitted {
    permit: Option<OwnedSemaphorePermit>,
    admission: Arc<Admission>,
}

impl Drop for Admitted {
    fn drop(&mut self) {
        drop(self.permit.take());
        self.admission.report();
    }
}

#[derive(Debug, Clone)]
pub struct LoadShedLayer {
    admission: Arc<Admission>,
}

impl LoadShedLayer {
    /// A limit of zero sheds every request.
    #[must_use]
    pub fn new(max_concurrent: u32) -> Self {
        Self {
            admission: Arc::new(Admission::new(max_concurrent as usize)),
        }
    }

    /// Flows currently holding a permit.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.admission.in_flight()
    }
}

impl<S> Layer<S> for LoadShedLayer {
    type Service = LoadShedService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        LoadShedService {
            inner,
            admission: Arc::clone(&self.admission),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoadShedService<S> {
    inner: S,
    admission: Arc<Admission>,
}

impl<S> Service<GatewayRequest> for LoadShedService<S>
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
        let Some(admitted) = Admission::try_admit(&self.admission) else {
            tracing::warn!(
                call = request.call.kind(),
                limit = self.admission.limit,
                "gateway saturated, request shed"
            );
            ::metrics::counter!("jobgate_requests_shed_total").increment(1);
            return Box::pin(async { Err(GatewayError::Overloaded) });
        };

        let flow = self.inner.call(request);
        Box::pin(async move {
            let outcome = flow.await;
            drop(admitted);
            outcome
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::Duration;

    use ::metrics::{
        Counter, Gauge, GaugeFn, Histogram, Key, KeyName, Metadata, Recorder, SharedString, Unit,
    };
    use bytes::Bytes;
    use jobgate_core::JobAccepted;
    use tower::ServiceExt;

    use super::*;
    use crate::service::operation::InboundCall;

    /// Service that holds for a configurable duration.
    struct SlowService {
        delay_ms: u64,
    }

    impl Service<GatewayRequest> for SlowService {
        type Response = SuccessEnvelope;
        type Error = GatewayError;
        type Future =
            Pin<Box<dyn Future<Output = Result<SuccessEnvelope, GatewayError>> + Send>>;

        fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }

        fn call(&mut self, _request: GatewayRequest) -> Self::Future {
            let delay = self.delay_ms;
            Box::pin(async move {
                tokio::time::sleep(Duration::from_millis(delay)).await;
                Ok(SuccessEnvelope::Accepted(JobAccepted::new("j-1")))
            })
        }
    }

    /// Recorder that keeps the last value set on any gauge.
    #[derive(Default)]
    struct LastGauge(Arc<AtomicU64>);

    impl LastGauge {
        fn value(&self) -> f64 {
            f64::from_bits(self.0.load(Ordering::SeqCst))
        }

        fn assert_at(&self, expected: f64) {
            let value = self.value();
            assert!((value - expected).abs() < f64::EPSILON, "gauge at {value}");
        }
    }

    struct LastGaugeHandle(Arc<AtomicU64>);

    impl LastGaugeHandle {
        fn shift(&self, delta: f64) {
            let current = f64::from_bits(self.0.load(Ordering::SeqCst));
            self.0.store((current + delta).to_bits(), Ordering::SeqCst);
        }
    }

    impl GaugeFn for LastGaugeHandle {
        fn increment(&self, value: f64) {
            self.shift(value);
        }

        fn decrement(&self, value: f64) {
            self.shift(-value);
        }

        fn set(&self, value: f64) {
            self.0.store(value.to_bits(), Ordering::SeqCst);
        }
    }

    impl Recorder for LastGauge {
        fn describe_counter(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}
        fn describe_gauge(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}
        fn describe_histogram(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}

        fn register_counter(&self, _: &Key, _: &Metadata<'_>) -> Counter {
            Counter::noop()
        }

        fn register_gauge(&self, _: &Key, _: &Metadata<'_>) -> Gauge {
            Gauge::from_arc(Arc::new(LastGaugeHandle(Arc::clone(&self.0))))
        }

        fn register_histogram(&self, _: &Key, _: &Metadata<'_>) -> Histogram {
            Histogram::noop()
        }
    }

    fn make_request() -> GatewayRequest {
        GatewayRequest::new(
            Some("key".to_string()),
            InboundCall::IngestData(Bytes::from_static(b"{}")),
        )
    }

    #[tokio::test]
    async fn allows_requests_under_limit() {
        let layer = LoadShedLayer::new(10);
        let svc = layer.layer(SlowService { delay_ms: 1 });
        let resp = svc.oneshot(make_request()).await.unwrap();
        assert!(matches!(resp, SuccessEnvelope::Accepted(_)));
    }

    #[tokio::test]
    async fn rejects_when_overloaded() {
        let layer = LoadShedLayer::new(1);
        let mut svc = layer.layer(SlowService { delay_ms: 500 });

        // First request takes the single permit.
        let _ = ServiceExt::ready(&mut svc).await.unwrap();
        let _in_flight = tokio::spawn({
            let fut = svc.call(make_request());
            async move { fut.await }
        });

        tokio::time::sleep(Duration::from_millis(10)).await;

        let err = svc.call(make_request()).await.unwrap_err();
        assert!(matches!(err, GatewayError::Overloaded));
    }

    #[tokio::test]
    async fn permit_is_released_after_flow() {
        let layer = LoadShedLayer::new(1);
        let mut svc = layer.layer(SlowService { delay_ms: 1 });
        assert_eq!(layer.in_flight(), 0);

        for _ in 0..3 {
            let resp = ServiceExt::ready(&mut svc)
                .await
                .unwrap()
                .call(make_request())
                .await;
            assert!(resp.is_ok());
        }
        assert_eq!(layer.in_flight(), 0);
    }

    #[tokio::test]
    async fn zero_limit_sheds_everything() {
        let svc = LoadShedLayer::new(0).layer(SlowService { delay_ms: 1 });
        let err = svc.oneshot(make_request()).await.unwrap_err();
        assert!(matches!(err, GatewayError::Overloaded));
    }

    #[test]
    fn in_flight_gauge_falls_when_permits_are_released() {
        let recorder = LastGauge::default();
        let admission = Arc::new(Admission::new(2));

        ::metrics::with_local_recorder(&recorder, || {
            let first = Admission::try_admit(&admission).unwrap();
            let second = Admission::try_admit(&admission).unwrap();
            recorder.assert_at(2.0);
            assert!(Admission::try_admit(&admission).is_none());

            drop(first);
            recorder.assert_at(1.0);
            drop(second);
            recorder.assert_at(0.0);
        });
        assert_eq!(admission.in_flight(), 0);
    }

    #[tokio::test]
    async fn cancelled_flow_releases_its_permit() {
        let layer = LoadShedLayer::new(1);
        let mut svc = layer.layer(SlowService { delay_ms: 10_000 });

        let flow = ServiceExt::ready(&mut svc).await.unwrap().call(make_request());
        assert_eq!(layer.in_flight(), 1);
        drop(flow);
        assert_eq!(layer.in_flight(), 0);
    }
}
