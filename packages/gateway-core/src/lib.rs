//! `jobgate` core: job request types, response envelopes, authority wire
//! types, and broker messages.

pub mod auth;
pub mod broker;
pub mod envelope;
pub mod job;

pub use auth::{AuditAction, AuditRecord, AuthDecision, VerificationRequest, VerificationResponse};
pub use broker::{request_topic, BrokerMessage, DEFAULT_REQUEST_TOPIC};
pub use envelope::{EnvelopeKind, ErrorEnvelope, JobAccepted};
pub use job::{
    AbortJob, ExecuteServiceData, ExecuteServiceJob, GetJob, IngestJob, JobType,
    RegisterServiceJob, RepeatJob,
};

#[cfg(test)]
mod tests {
    #[test]
    fn crate_loads() {
        // Empty body: if this test runs, the crate compiles and loads.
    }
}
