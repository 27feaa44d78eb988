//! Domain components a routed request is handed to.
//!
//! - [`auth`]: `AuthGate` and the HTTP security authority
//! - [`proxy`]: `SyncProxy`, one backend round-trip per request
//! - [`submit`]: `AsyncSubmitter`, broker submission with a minted job id

pub mod auth;
pub mod proxy;
pub mod submit;

pub use auth::{credential_from_headers, AuthGate, HttpAuthority, TracingAuditSink};
pub use proxy::SyncProxy;
pub use submit::AsyncSubmitter;
