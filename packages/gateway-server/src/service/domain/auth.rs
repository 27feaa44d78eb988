//! Credential checks against the external security authority.

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use base64::Engine;
use http::{header, HeaderMap};
use jobgate_core::{AuditRecord, AuthDecision, VerificationRequest, VerificationResponse};
use tracing::{debug, info, warn};

use crate::service::config::AuthorityConfig;
use crate::service::operation::GatewayError;
use crate::traits::{AuditSink, CredentialAuthority};

/// Decides whether a request may proceed. Every check asks the authority
/// afresh; decisions are never cached.
pub struct AuthGate {
    authority: Arc<dyn CredentialAuthority>,
    audit: Arc<dyn AuditSink>,
}

impl AuthGate {
    #[must_use]
    pub fn new(authority: Arc<dyn CredentialAuthority>, audit: Arc<dyn AuditSink>) -> Self {
        Self { authority, audit }
    }

    /// Verify `credential`.
    ///
    /// A missing or blank credential is denied without contacting the
    /// authority. Every decision the authority makes is audited before it is
    /// acted on.
    ///
    /// # Errors
    ///
    /// [`GatewayError::Denied`] when the credential is absent or declined,
    /// [`GatewayError::AuthorityUnreachable`] when no decision was obtained.
    pub async fn check(&self, credential: Option<&str>) -> Result<AuthDecision, GatewayError> {
        let Some(credential) = credential.map(str::trim).filter(|c| !c.is_empty()) else {
            debug!("request carries no credential");
            return Err(GatewayError::Denied {
                reason: "no credential supplied".to_string(),
            });
        };

        let verified = self.authority.verify(credential).await.map_err(|e| {
            warn!(error = %e, "security authority unreachable");
            GatewayError::AuthorityUnreachable(e.to_string())
        })?;

        let decision = AuthDecision {
            credential: credential.to_string(),
            verified,
        };
        self.audit.record(AuditRecord::for_decision(&decision));

        if decision.verified {
            Ok(decision)
        } else {
            Err(GatewayError::Denied {
                reason: "credential declined".to_string(),
            })
        }
    }
}

/// Extracts the caller's credential from the request headers.
///
/// Accepts `Authorization: Bearer <key>` and `Authorization: Basic
/// base64(<key>:<ignored>)`, where the key is the user part.
#[must_use]
pub fn credential_from_headers(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?.trim();
    let (scheme, rest) = value.split_once(' ')?;
    let rest = rest.trim();

    let credential = if scheme.eq_ignore_ascii_case("bearer") {
        rest.to_string()
    } else if scheme.eq_ignore_ascii_case("basic") {
        let decoded = base64::engine::general_purpose::STANDARD.decode(rest).ok()?;
        let decoded = String::from_utf8(decoded).ok()?;
        match decoded.split_once(':') {
            Some((user, _)) => user.to_string(),
            None => decoded,
        }
    } else {
        return None;
    };

    (!credential.trim().is_empty()).then_some(credential)
}

// ---------------------------------------------------------------------------
// HTTP authority
// ---------------------------------------------------------------------------

/// Security authority reached over HTTP: `POST {url}/v2/verification`.
pub struct HttpAuthority {
    client: reqwest::Client,
    endpoint: reqwest::Url,
}

impl HttpAuthority {
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the HTTP client cannot be
    /// built.
    pub fn new(config: &AuthorityConfig) -> anyhow::Result<Self> {
        let base = reqwest::Url::parse(&config.url)
            .with_context(|| format!("invalid authority url '{}'", config.url))?;
        let endpoint = join_path(&base, &["v2", "verification"])?;

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .context("failed to build authority HTTP client")?;

        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl CredentialAuthority for HttpAuthority {
    async fn verify(&self, credential: &str) -> anyhow::Result<bool> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&VerificationRequest {
                uuid: credential.to_string(),
            })
            .send()
            .await
            .context("verification request failed")?
            .error_for_status()
            .context("authority returned an error status")?;

        let reply: VerificationResponse = response
            .json()
            .await
            .context("authority reply is not a verification response")?;
        Ok(reply.authenticated)
    }
}

/// Appends `segments` to `base`, keeping any path `base` already has.
pub(crate) fn join_path(base: &reqwest::Url, segments: &[&str]) -> anyhow::Result<reqwest::Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| anyhow::anyhow!("url '{base}' cannot be a base"))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

// ---------------------------------------------------------------------------
// Audit
// ---------------------------------------------------------------------------

/// Writes audit records to the `jobgate::audit` tracing target.
#[derive(Debug, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, record: AuditRecord) {
        info!(
            target: "jobgate::audit",
            actor = %record.actor,
            action = record.action.as_str(),
            "{}",
            record.detail
        );
    }
}
