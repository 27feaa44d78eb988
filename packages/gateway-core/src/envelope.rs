//! Uniform response envelopes.
//!
//! Every response the gateway produces is either a success envelope or an
//! [`ErrorEnvelope`]. Backend services speak the same error shape, which is
//! how structured backend failures are recognised and relayed.

use serde::{Deserialize, Serialize};

/// Discriminator carried in the `type` field of every envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvelopeKind {
    Job,
    Error,
}

/// Success envelope for an asynchronously accepted job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobAccepted {
    #[serde(rename = "type")]
    pub kind: EnvelopeKind,
    /// Correlation id minted by the gateway for this submission.
    pub job_id: String,
}

impl JobAccepted {
    #[must_use]
    pub fn new(job_id: impl Into<String>) -> Self {
        Self {
            kind: EnvelopeKind::Job,
            job_id: job_id.into(),
        }
    }
}

/// Error envelope: message, originating component, and the affected job id
/// when one is known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEnvelope {
    #[serde(rename = "type")]
    pub kind: EnvelopeKind,
    pub message: String,
    #[serde(default)]
    pub origin: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
}

impl ErrorEnvelope {
    #[must_use]
    pub fn new(message: impl Into<String>, origin: impl Into<String>, job_id: Option<String>) -> Self {
        Self {
            kind: EnvelopeKind::Error,
            message: message.into(),
            origin: origin.into(),
            job_id,
        }
    }

    /// Parses `body` as an error envelope.
    ///
    /// Returns `None` unless the body is JSON with `"type": "error"` and a
    /// message; success envelopes and arbitrary JSON are not errors.
    #[must_use]
    pub fn parse(body: &[u8]) -> Option<Self> {
        serde_json::from_slice::<Self>(body)
            .ok()
            .filter(|envelope| envelope.kind == EnvelopeKind::Error)
    }
}
