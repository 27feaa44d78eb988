//! Maps every flow outcome to exactly one HTTP status and envelope.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use jobgate_core::ErrorEnvelope;

use super::operation::{Component, GatewayError, SuccessEnvelope};

impl GatewayError {
    /// HTTP status for this failure kind.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Denied { .. } => StatusCode::UNAUTHORIZED,
            Self::MalformedRequest(_) | Self::MissingRequiredField { .. } => {
                StatusCode::BAD_REQUEST
            }
            Self::PublisherUnavailable { .. } | Self::Overloaded => StatusCode::SERVICE_UNAVAILABLE,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::AuthorityUnreachable(_)
            | Self::MessageBuildFailure { .. }
            | Self::BackendUnreachable { .. }
            | Self::BackendReported(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Gateway component the failure surfaced in. Backend-reported failures
    /// surface in the proxy.
    #[must_use]
    pub fn component(&self) -> Component {
        match self {
            Self::Denied { .. } | Self::AuthorityUnreachable(_) => Component::AuthGate,
            Self::MalformedRequest(_) | Self::MissingRequiredField { .. } => {
                Component::RequestClassifier
            }
            Self::MessageBuildFailure { .. } | Self::PublisherUnavailable { .. } => {
                Component::AsyncSubmitter
            }
            Self::BackendUnreachable { .. } | Self::BackendReported(_) => Component::SyncProxy,
            Self::Overloaded | Self::PayloadTooLarge => Component::Gateway,
        }
    }

    /// Origin tag written to the envelope: the backend's own tag when it
    /// supplied one, otherwise the component name.
    #[must_use]
    pub fn origin(&self) -> &str {
        match self {
            Self::BackendReported(envelope) if !envelope.origin.trim().is_empty() => {
                &envelope.origin
            }
            _ => self.component().as_str(),
        }
    }

    /// The job this failure concerns, when known.
    #[must_use]
    pub fn job_id(&self) -> Option<&str> {
        match self {
            Self::MessageBuildFailure { job_id, .. } | Self::PublisherUnavailable { job_id } => {
                Some(job_id)
            }
            Self::BackendUnreachable { job_id, .. } => job_id.as_deref(),
            Self::BackendReported(envelope) => envelope.job_id.as_deref(),
            Self::Denied { .. }
            | Self::AuthorityUnreachable(_)
            | Self::MalformedRequest(_)
            | Self::MissingRequiredField { .. }
            | Self::Overloaded
            | Self::PayloadTooLarge => None,
        }
    }

    #[must_use]
    pub fn to_envelope(&self) -> ErrorEnvelope {
        let message = match self {
            Self::BackendReported(envelope) => envelope.message.clone(),
            other => other.to_string(),
        };
        ErrorEnvelope::new(message, self.origin(), self.job_id().map(str::to_string))
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self.to_envelope())).into_response()
    }
}

impl IntoResponse for SuccessEnvelope {
    fn into_response(self) -> Response {
        match self {
            Self::Accepted(accepted) => (StatusCode::CREATED, Json(accepted)).into_response(),
            Self::Proxied {
                status,
                content_type,
                body,
            } => {
                let content_type = content_type
                    .unwrap_or_else(|| HeaderValue::from_static("application/json"));
                (status, [(header::CONTENT_TYPE, content_type)], body).into_response()
            }
        }
    }
}

/// Converts a flow result into the HTTP response sent to the caller.
#[must_use]
pub fn normalize(result: Result<SuccessEnvelope, GatewayError>) -> Response {
    match result {
        Ok(success) => success.into_response(),
        Err(err) => err.into_response(),
    }
}
