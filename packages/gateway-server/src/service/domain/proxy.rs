//! Synchronous pass-through to backend services.

use anyhow::Context;
use http::header;
use jobgate_core::ErrorEnvelope;
use reqwest::{Method, Url};
use tracing::{debug, warn};

use super::auth::join_path;
use crate::service::config::BackendConfig;
use crate::service::operation::{GatewayError, ProxyRequest, Resource, SuccessEnvelope};

/// Forwards one [`ProxyRequest`] to the backend that owns its resource.
///
/// Exactly one outbound call per request: no retries, bounded by the
/// configured timeout.
pub struct SyncProxy {
    client: reqwest::Client,
    jobs: Url,
    data: Url,
    services: Url,
}

impl SyncProxy {
    /// # Errors
    ///
    /// Returns an error if a backend URL is invalid or the HTTP client cannot
    /// be built.
    pub fn new(config: &BackendConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .context("failed to build backend HTTP client")?;

        Ok(Self {
            client,
            jobs: parse_base(&config.jobs_url)?,
            data: parse_base(&config.data_url)?,
            services: parse_base(&config.services_url)?,
        })
    }

    /// Performs the backend call and relays its outcome.
    ///
    /// # Errors
    ///
    /// [`GatewayError::BackendReported`] when the backend answers with an
    /// error envelope, [`GatewayError::BackendUnreachable`] when it cannot be
    /// reached or fails without one.
    pub async fn forward(&self, request: ProxyRequest) -> Result<SuccessEnvelope, GatewayError> {
        let job_id = request.job_id().map(str::to_string);
        let backend_down = |reason: String| GatewayError::BackendUnreachable {
            reason,
            job_id: job_id.clone(),
        };

        let mut url = self.url_for(&request).map_err(|e| backend_down(e.to_string()))?;
        let (method, body, query) = match request {
            ProxyRequest::Fetch { .. } => (Method::GET, None, None),
            ProxyRequest::List { query, .. } => (Method::GET, None, query),
            ProxyRequest::Update { body, .. } => (Method::PUT, Some(body), None),
            ProxyRequest::Delete { query, .. } => (Method::DELETE, None, query),
            ProxyRequest::Search { body, .. } => (Method::POST, Some(body), None),
            ProxyRequest::Download { query, .. } => (Method::GET, None, query),
        };
        url.set_query(query.as_deref().filter(|q| !q.is_empty()));

        debug!(%method, %url, "forwarding to backend");
        let mut builder = self.client.request(method, url);
        if let Some(body) = body.filter(|b| !b.is_empty()) {
            builder = builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(body);
        }

        let response = builder.send().await.map_err(|e| {
            warn!(error = %e, timeout = e.is_timeout(), "backend call failed");
            backend_down(e.to_string())
        })?;

        let status = response.status();
        let content_type = response.headers().get(header::CONTENT_TYPE).cloned();
        let body = response
            .bytes()
            .await
            .map_err(|e| backend_down(format!("failed to read backend response: {e}")))?;

        if let Some(mut envelope) = ErrorEnvelope::parse(&body) {
            debug!(origin = %envelope.origin, %status, "backend reported an error");
            if envelope.job_id.is_none() {
                envelope.job_id = job_id.clone();
            }
            return Err(GatewayError::BackendReported(envelope));
        }

        if !status.is_success() {
            warn!(%status, "backend failed without an error envelope");
            return Err(backend_down(format!("backend responded with status {status}")));
        }

        Ok(SuccessEnvelope::Proxied {
            status,
            content_type,
            body,
        })
    }

    fn url_for(&self, request: &ProxyRequest) -> anyhow::Result<Url> {
        let resource = request.resource();
        let base = match resource {
            Resource::Job => &self.jobs,
            Resource::Data => &self.data,
            Resource::Service => &self.services,
        };
        match request {
            ProxyRequest::Search { .. } => join_path(base, &[resource.path(), "query"]),
            ProxyRequest::Download { id, .. } => join_path(base, &["file", id]),
            _ => match request.id() {
                Some(id) => join_path(base, &[resource.path(), id]),
                None => join_path(base, &[resource.path()]),
            },
        }
    }
}

fn parse_base(raw: &str) -> anyhow::Result<Url> {
    let url = Url::parse(raw).with_context(|| format!("invalid backend url '{raw}'"))?;
    anyhow::ensure!(!url.cannot_be_a_base(), "backend url '{raw}' cannot be a base");
    Ok(url)
}
