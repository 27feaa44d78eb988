//! `jobgate` server: HTTP gateway in front of job backends and a message
//! broker.
//!
//! A request passes the auth gate, is classified, and is then either proxied
//! to a backend (queries) or published to the broker (everything else). All
//! outcomes are rendered by the response normalizer.

pub mod app;
pub mod broker;
pub mod network;
pub mod service;
pub mod telemetry;
pub mod traits;

#[cfg(test)]
pub(crate) mod test_support;

pub use app::Gateway;
pub use traits::{AuditSink, BrokerClient, CredentialAuthority};
