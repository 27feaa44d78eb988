//! Job request types accepted by the gateway.
//!
//! A request body names exactly one job kind through its `jobType` tag.
//! Variant payloads deserialize their mandatory fields leniently (absent is
//! treated as empty) so callers can distinguish "unparseable" from
//! "parseable but incomplete" with [`JobType::missing_field`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ---------------------------------------------------------------------------
// JobType
// ---------------------------------------------------------------------------

/// Closed set of job kinds the gateway understands.
///
/// Serialized internally tagged: `{"jobType": "get", "jobId": "..."}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "jobType", rename_all = "kebab-case")]
pub enum JobType {
    /// Status lookup for an existing job. The only synchronous kind.
    Get(GetJob),
    /// Load new data into the platform.
    Ingest(IngestJob),
    /// Register an external service.
    RegisterService(RegisterServiceJob),
    /// Execute a registered service.
    ExecuteService(ExecuteServiceJob),
    /// Re-run a previously submitted job.
    Repeat(RepeatJob),
    /// Cancel a running job.
    Abort(AbortJob),
}

impl JobType {
    /// Wire tag of this variant. Also used as the broker message key.
    #[must_use]
    pub fn category(&self) -> &'static str {
        match self {
            Self::Get(_) => "get",
            Self::Ingest(_) => "ingest",
            Self::RegisterService(_) => "register-service",
            Self::ExecuteService(_) => "execute-service",
            Self::Repeat(_) => "repeat",
            Self::Abort(_) => "abort",
        }
    }

    /// Returns `true` for kinds answered immediately from a live backend.
    #[must_use]
    pub fn is_query(&self) -> bool {
        matches!(self, Self::Get(_))
    }

    /// Name of the first mandatory field that is absent or blank, if any.
    #[must_use]
    pub fn missing_field(&self) -> Option<&'static str> {
        match self {
            Self::Get(GetJob { job_id })
            | Self::Repeat(RepeatJob { job_id })
            | Self::Abort(AbortJob { job_id, .. }) => is_blank(job_id).then_some("jobId"),
            Self::Ingest(job) => match &job.data {
                None | Some(Value::Null) => Some("data"),
                Some(_) => None,
            },
            Self::RegisterService(job) => is_blank(&job.url).then_some("url"),
            Self::ExecuteService(job) => is_blank(&job.data.service_id).then_some("serviceId"),
        }
    }

    /// The existing job this request refers to, for kinds that reference one.
    #[must_use]
    pub fn referenced_job_id(&self) -> Option<&str> {
        match self {
            Self::Get(GetJob { job_id })
            | Self::Repeat(RepeatJob { job_id })
            | Self::Abort(AbortJob { job_id, .. })
                if !is_blank(job_id) =>
            {
                Some(job_id.as_str())
            }
            _ => None,
        }
    }
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

// ---------------------------------------------------------------------------
// Variant payloads
// ---------------------------------------------------------------------------

/// Status lookup for a job by id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetJob {
    #[serde(default)]
    pub job_id: String,
}

/// Data ingestion request. `data` is an opaque resource description.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestJob {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Whether the platform should host the ingested file itself.
    #[serde(default)]
    pub host: bool,
}

/// Service registration request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterServiceJob {
    #[serde(default)]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_metadata: Option<Value>,
}

/// Service execution request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteServiceJob {
    #[serde(default)]
    pub data: ExecuteServiceData,
}

/// Inputs for a service execution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteServiceData {
    #[serde(default)]
    pub service_id: String,
    #[serde(default)]
    pub data_inputs: Map<String, Value>,
    #[serde(default)]
    pub data_output: Vec<Value>,
}

/// Re-run of an existing job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepeatJob {
    #[serde(default)]
    pub job_id: String,
}

/// Cancellation of an existing job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbortJob {
    #[serde(default)]
    pub job_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
