//! Wire types for the external security authority, plus audit records.

use serde::{Deserialize, Serialize};

/// Body of `POST /v2/verification` sent to the security authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationRequest {
    pub uuid: String,
}

/// Authority reply to a verification request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationResponse {
    pub authenticated: bool,
}

/// Outcome of one credential check. Created per request, never cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthDecision {
    /// The credential the authority evaluated.
    pub credential: String,
    pub verified: bool,
}

/// Audit action recorded for each credential check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AuditAction {
    CredentialVerified,
    CredentialDeclined,
}

impl AuditAction {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CredentialVerified => "credentialVerified",
            Self::CredentialDeclined => "credentialDeclined",
        }
    }
}

/// One audit entry: who was checked, and what the authority said.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub actor: String,
    pub action: AuditAction,
    pub detail: String,
}

impl AuditRecord {
    #[must_use]
    pub fn for_decision(decision: &AuthDecision) -> Self {
        let action = if decision.verified {
            AuditAction::CredentialVerified
        } else {
            AuditAction::CredentialDeclined
        };
        Self {
            actor: decision.credential.clone(),
            action,
            detail: format!(
                "checked verification for credential {} with verified = {}",
                decision.credential, decision.verified
            ),
        }
    }
}
