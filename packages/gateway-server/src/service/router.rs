//! Per-request dispatch: `AuthGate` -> `RequestClassifier` -> transport.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tower::Service;
use tracing::debug;

use super::classify::RequestClassifier;
use super::domain::{AsyncSubmitter, AuthGate, SyncProxy};
use super::flow::{Flow, FlowState};
use super::operation::{GatewayError, GatewayRequest, Route, SuccessEnvelope};

type BoxedFuture = Pin<Box<dyn Future<Output = Result<SuccessEnvelope, GatewayError>> + Send>>;

// ---------------------------------------------------------------------------
// GatewayRouter
// ---------------------------------------------------------------------------

/// Runs one request flow per call.
///
/// Cheap to clone; every clone shares the same components. Flows share no
/// per-request state.
#[derive(Clone)]
pub struct GatewayRouter {
    inner: Arc<Dispatch>,
}

struct Dispatch {
    auth: AuthGate,
    classifier: RequestClassifier,
    proxy: SyncProxy,
    submitter: AsyncSubmitter,
}

impl GatewayRouter {
    #[must_use]
    pub fn new(auth: AuthGate, proxy: SyncProxy, submitter: AsyncSubmitter) -> Self {
        Self {
            inner: Arc::new(Dispatch {
                auth,
                classifier: RequestClassifier::new(),
                proxy,
                submitter,
            }),
        }
    }
}

impl Dispatch {
    async fn run(&self, request: GatewayRequest) -> Result<SuccessEnvelope, GatewayError> {
        let mut flow = Flow::new();
        let result = self.run_flow(&mut flow, request).await;

        let terminal = match &result {
            Ok(success) => success.terminal_state(),
            Err(err) => err.terminal_state(),
        };
        flow.advance(terminal);
        debug!(state = flow.state().as_str(), "flow finished");
        result
    }

    /// Drives `flow` up to `Routed` and returns the transport's outcome. The
    /// caller records the terminal state.
    async fn run_flow(
        &self,
        flow: &mut Flow,
        request: GatewayRequest,
    ) -> Result<SuccessEnvelope, GatewayError> {
        flow.advance(FlowState::Authorizing);
        self.auth.check(request.credential.as_deref()).await?;
        flow.advance(FlowState::Authorized);

        flow.advance(FlowState::Classifying);
        let route = self.classifier.classify(request.call)?;
        flow.advance(FlowState::Routed);

        match route {
            Route::Sync(proxy_request) => self.proxy.forward(proxy_request).await,
            Route::Async(job) => self.submitter.submit(job),
        }
    }
}

impl Service<GatewayRequest> for GatewayRouter {
    type Response = SuccessEnvelope;
    type Error = GatewayError;
    type Future = BoxedFuture;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: GatewayRequest) -> Self::Future {
        let inner = Arc::clone(&self.inner);
        Box::pin(async move { inner.run(request).await })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
