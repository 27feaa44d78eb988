//! Asynchronous job submission: correlation id, broker message, publish
//! queue.

use std::sync::Arc;

use jobgate_core::{BrokerMessage, JobAccepted, JobType};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::broker::Publisher;
use crate::service::operation::{GatewayError, SuccessEnvelope};

/// Turns an asynchronous job into a broker message and hands it to the
/// [`Publisher`]. Returns as soon as the message is queued.
pub struct AsyncSubmitter {
    publisher: Arc<Publisher>,
    topic: String,
}

impl AsyncSubmitter {
    #[must_use]
    pub fn new(publisher: Arc<Publisher>, topic: impl Into<String>) -> Self {
        Self {
            publisher,
            topic: topic.into(),
        }
    }

    /// Mints a correlation id for `job` and queues it for publishing.
    ///
    /// # Errors
    ///
    /// [`GatewayError::MessageBuildFailure`] if the message cannot be
    /// serialized, [`GatewayError::PublisherUnavailable`] if the publish
    /// queue is full or the publisher is shutting down.
    pub fn submit(&self, job: JobType) -> Result<SuccessEnvelope, GatewayError> {
        let job_id = Uuid::new_v4().to_string();

        let message = BrokerMessage::for_job(&self.topic, &job_id, &job).map_err(|e| {
            error!(%job_id, error = %e, "failed to build broker message");
            GatewayError::MessageBuildFailure {
                job_id: job_id.clone(),
                reason: e.to_string(),
            }
        })?;

        info!(
            %job_id,
            category = job.category(),
            target_job = job.referenced_job_id(),
            topic = %self.topic,
            "requesting job"
        );

        self.publisher.enqueue(message).map_err(|e| {
            warn!(%job_id, error = %e, "job not queued");
            GatewayError::PublisherUnavailable {
                job_id: job_id.clone(),
            }
        })?;

        Ok(SuccessEnvelope::Accepted(JobAccepted::new(job_id)))
    }
}
