//! Request dispatch framework.
//!
//! Every inbound call runs one flow through this pipeline:
//!
//! 1. **Middleware** (`middleware`): Tower layers (load-shedding, metrics)
//! 2. **Routing** (`router`): `AuthGate`, then classification, then transport
//! 3. **Classification** (`classify`): untyped call -> `Route`
//! 4. **Domain components** (`domain`): auth gate, sync proxy, async submitter
//! 5. **Normalization** (`normalize`): outcome -> status + envelope
//! 6. **Background workers** (`worker`): bounded-queue task runner

pub mod classify;
pub mod config;
pub mod domain;
pub mod flow;
pub mod middleware;
pub mod normalize;
pub mod operation;
pub mod router;
pub mod worker;

pub use classify::RequestClassifier;
pub use config::{
    AuthorityConfig, BackendConfig, BrokerConfig, DispatchConfig, GatewayConfig,
};
pub use flow::{Flow, FlowState};
pub use middleware::{build_gateway_pipeline, GatewayPipeline};
pub use normalize::normalize;
pub use operation::{
    Component, GatewayError, GatewayRequest, InboundCall, ProxyRequest, Resource, Route,
    SuccessEnvelope,
};
pub use router::GatewayRouter;
pub use worker::{BackgroundRunnable, BackgroundWorker};
