//! Request, route, response, and error types flowing through the dispatch
//! pipeline.

use bytes::Bytes;
use http::{HeaderValue, StatusCode};
use jobgate_core::{ErrorEnvelope, JobAccepted, JobType};

use super::flow::FlowState;

// ---------------------------------------------------------------------------
// Inbound
// ---------------------------------------------------------------------------

/// One inbound gateway call: the caller's credential plus what was asked.
#[derive(Debug, Clone)]
pub struct GatewayRequest {
    /// Opaque credential extracted from the HTTP request, if any.
    pub credential: Option<String>,
    pub call: InboundCall,
}

impl GatewayRequest {
    #[must_use]
    pub fn new(credential: Option<String>, call: InboundCall) -> Self {
        Self { credential, call }
    }
}

/// Untyped inbound call, one per HTTP route family.
#[derive(Debug, Clone)]
pub enum InboundCall {
    /// `POST /job`: body selects the job kind through its `jobType` tag.
    SubmitJob(Bytes),
    /// `POST /data`: ingest payload without tag.
    IngestData(Bytes),
    /// `POST /service`: service registration payload without tag.
    RegisterService(Bytes),
    /// `POST /v2/job`: service execution payload without tag.
    ExecuteService(Bytes),
    /// Pass-through lookups and mutations against the backend.
    Proxy(ProxyRequest),
}

impl InboundCall {
    /// Short label used in spans and metrics.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SubmitJob(_) => "submit-job",
            Self::IngestData(_) => "ingest-data",
            Self::RegisterService(_) => "register-service",
            Self::ExecuteService(_) => "execute-service",
            Self::Proxy(ProxyRequest::Fetch { .. }) => "proxy-fetch",
            Self::Proxy(ProxyRequest::List { .. }) => "proxy-list",
            Self::Proxy(ProxyRequest::Update { .. }) => "proxy-update",
            Self::Proxy(ProxyRequest::Delete { .. }) => "proxy-delete",
            Self::Proxy(ProxyRequest::Search { .. }) => "proxy-search",
            Self::Proxy(ProxyRequest::Download { .. }) => "proxy-download",
        }
    }
}

/// Backend resource families reachable through the sync proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Job,
    Data,
    Service,
}

impl Resource {
    /// Path segment on the backend (`/job`, `/data`, `/service`).
    #[must_use]
    pub fn path(self) -> &'static str {
        match self {
            Self::Job => "job",
            Self::Data => "data",
            Self::Service => "service",
        }
    }

    /// Name of the identifying field, reported when an id is missing.
    #[must_use]
    pub fn id_field(self) -> &'static str {
        match self {
            Self::Job => "jobId",
            Self::Data => "dataId",
            Self::Service => "serviceId",
        }
    }
}

/// A synchronous backend call. Exactly one outbound request per value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProxyRequest {
    /// `GET /{resource}/{id}`: job status or metadata fetch.
    Fetch { resource: Resource, id: String },
    /// `GET /{resource}?query`: listing and keyword search.
    List {
        resource: Resource,
        query: Option<String>,
    },
    /// `PUT /{resource}/{id}`: metadata update, or job repeat.
    Update {
        resource: Resource,
        id: String,
        body: Bytes,
    },
    /// `DELETE /{resource}/{id}?query`: delete, or job abort.
    Delete {
        resource: Resource,
        id: String,
        query: Option<String>,
    },
    /// `POST /{resource}/query`: structured search with a JSON criteria body.
    Search { resource: Resource, body: Bytes },
    /// `GET /file/{id}?query`: raw bytes of an ingested data item.
    Download { id: String, query: Option<String> },
}

impl ProxyRequest {
    #[must_use]
    pub fn resource(&self) -> Resource {
        match self {
            Self::Fetch { resource, .. }
            | Self::List { resource, .. }
            | Self::Update { resource, .. }
            | Self::Delete { resource, .. }
            | Self::Search { resource, .. } => *resource,
            Self::Download { .. } => Resource::Data,
        }
    }

    /// Identifier of the addressed item; `None` for listings and searches.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        match self {
            Self::Fetch { id, .. }
            | Self::Update { id, .. }
            | Self::Delete { id, .. }
            | Self::Download { id, .. } => Some(id.as_str()),
            Self::List { .. } | Self::Search { .. } => None,
        }
    }

    /// The job this request concerns, reported in error envelopes.
    #[must_use]
    pub fn job_id(&self) -> Option<&str> {
        match self.resource() {
            Resource::Job => self.id(),
            Resource::Data | Resource::Service => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Routing decision
// ---------------------------------------------------------------------------

/// Transport chosen by the classifier.
#[derive(Debug, Clone, PartialEq)]
pub enum Route {
    /// Answered now by a backend round-trip.
    Sync(ProxyRequest),
    /// Submitted to the broker; answered with a correlation id.
    Async(JobType),
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Success half of the response envelope.
#[derive(Debug, Clone)]
pub enum SuccessEnvelope {
    /// Job accepted for asynchronous processing.
    Accepted(JobAccepted),
    /// Backend body relayed verbatim.
    Proxied {
        status: StatusCode,
        content_type: Option<HeaderValue>,
        body: Bytes,
    },
}

impl SuccessEnvelope {
    #[must_use]
    pub fn terminal_state(&self) -> FlowState {
        match self {
            Self::Accepted(_) => FlowState::AsyncPending,
            Self::Proxied { .. } => FlowState::SyncCompleted,
        }
    }
}

/// Logical component names carried in error envelopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Component {
    AuthGate,
    RequestClassifier,
    AsyncSubmitter,
    SyncProxy,
    Gateway,
}

impl Component {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AuthGate => "AuthGate",
            Self::RequestClassifier => "RequestClassifier",
            Self::AsyncSubmitter => "AsyncSubmitter",
            Self::SyncProxy => "SyncProxy",
            Self::Gateway => "Gateway",
        }
    }
}

/// Every failure a gateway flow can end in.
///
/// Status codes, origins, and envelopes are assigned in
/// [`crate::service::normalize`].
#[derive(Debug, Clone, thiserror::Error)]
pub enum GatewayError {
    #[error("authentication failed: {reason}")]
    Denied { reason: String },
    #[error("security authority unreachable: {0}")]
    AuthorityUnreachable(String),
    #[error("error parsing request: {0}")]
    MalformedRequest(String),
    #[error("missing required field: {field}")]
    MissingRequiredField { field: &'static str },
    #[error("error creating message for job: {reason}")]
    MessageBuildFailure { job_id: String, reason: String },
    #[error("job publisher is not accepting messages")]
    PublisherUnavailable { job_id: String },
    #[error("error connecting to backend service: {reason}")]
    BackendUnreachable {
        reason: String,
        job_id: Option<String>,
    },
    #[error("{}", .0.message)]
    BackendReported(ErrorEnvelope),
    #[error("gateway overloaded, try again later")]
    Overloaded,
    #[error("request body exceeds the configured limit")]
    PayloadTooLarge,
}

impl GatewayError {
    /// Terminal flow state this failure resolves to.
    #[must_use]
    pub fn terminal_state(&self) -> FlowState {
        match self {
            Self::Denied { .. } | Self::AuthorityUnreachable(_) => FlowState::Denied,
            Self::MalformedRequest(_)
            | Self::MissingRequiredField { .. }
            | Self::Overloaded
            | Self::PayloadTooLarge => FlowState::Rejected,
            Self::MessageBuildFailure { .. } | Self::PublisherUnavailable { .. } => {
                FlowState::SubmitFailed
            }
            Self::BackendUnreachable { .. } | Self::BackendReported(_) => FlowState::SyncFailed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn proxy_job_id_only_for_jobs() {
        let job = ProxyRequest::Fetch {
            resource: Resource::Job,
            id: "j1".to_string(),
        };
        let data = ProxyRequest::Delete {
            resource: Resource::Data,
            id: "d1".to_string(),
            query: None,
        };
        let list = ProxyRequest::List {
            resource: Resource::Service,
            query: Some("page=1".to_string()),
        };

        assert_eq!(job.job_id(), Some("j1"));
        assert_eq!(data.id(), Some("d1"));
        assert_eq!(data.job_id(), None);
        assert_eq!(list.id(), None);
        assert_eq!(list.resource(), Resource::Service);

        let download = ProxyRequest::Download {
            id: "d2".to_string(),
            query: None,
        };
        let search = ProxyRequest::Search {
            resource: Resource::Service,
            body: Bytes::from_static(b"{}"),
        };
        assert_eq!(download.resource(), Resource::Data);
        assert_eq!(download.id(), Some("d2"));
        assert_eq!(search.id(), None);
    }

    #[test]
    fn call_kinds_are_distinct() {
        let calls = [
            InboundCall::SubmitJob(Bytes::new()),
            InboundCall::IngestData(Bytes::new()),
            InboundCall::RegisterService(Bytes::new()),
            InboundCall::ExecuteService(Bytes::new()),
            InboundCall::Proxy(ProxyRequest::List {
                resource: Resource::Data,
                query: None,
            }),
        ];
        let kinds: std::collections::HashSet<_> = calls.iter().map(InboundCall::kind).collect();
        assert_eq!(kinds.len(), calls.len());
    }

    #[test]
    fn every_error_has_a_terminal_state() {
        let errors = [
            GatewayError::Denied {
                reason: "x".to_string(),
            },
            GatewayError::AuthorityUnreachable("x".to_string()),
            GatewayError::MalformedRequest("x".to_string()),
            GatewayError::MissingRequiredField { field: "jobId" },
            GatewayError::MessageBuildFailure {
                job_id: "j".to_string(),
                reason: "x".to_string(),
            },
            GatewayError::PublisherUnavailable {
                job_id: "j".to_string(),
            },
            GatewayError::BackendUnreachable {
                reason: "x".to_string(),
                job_id: None,
            },
            GatewayError::BackendReported(ErrorEnvelope::new("x", "Job Manager", None)),
            GatewayError::Overloaded,
            GatewayError::PayloadTooLarge,
        ];
        for err in &errors {
            assert!(err.terminal_state().is_terminal(), "{err}");
        }
    }
}
