//! Broker messages produced for asynchronously submitted jobs.

use serde::Serialize;

use crate::job::JobType;

/// Base topic for job requests when none is configured.
pub const DEFAULT_REQUEST_TOPIC: &str = "Request-Job";

/// Builds the request topic name, suffixed with the deployment space if any.
#[must_use]
pub fn request_topic(base: &str, space: Option<&str>) -> String {
    match space.map(str::trim) {
        Some(space) if !space.is_empty() => format!("{base}-{space}"),
        _ => base.to_string(),
    }
}

/// Payload written to the broker: the correlation id plus the job itself.
///
/// The job stays nested because `repeat` and `abort` carry their own
/// `jobId` naming the job they act on.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct JobPayload<'a> {
    job_id: &'a str,
    job: &'a JobType,
}

/// A broker-ready message. Ownership moves to the broker client on publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerMessage {
    pub topic: String,
    /// Routing key: the job category (`ingest`, `abort`, ...).
    pub key: String,
    pub payload: Vec<u8>,
}

impl BrokerMessage {
    /// Serializes `job` and its correlation id into a message for `topic`.
    ///
    /// # Errors
    ///
    /// Returns the serializer error if the job cannot be encoded as JSON.
    pub fn for_job(topic: &str, job_id: &str, job: &JobType) -> Result<Self, serde_json::Error> {
        let payload = serde_json::to_vec(&JobPayload { job_id, job })?;
        Ok(Self {
            topic: topic.to_string(),
            key: job.category().to_string(),
            payload,
        })
    }
}
