//! Broker lifecycle owner.
//!
//! One `Publisher` exists per process. It holds the single broker client,
//! accepts messages from request flows through a bounded queue, and hands
//! them to the client on a publishing task that keeps up to
//! `max_in_flight` deliveries running at once. Request flows never wait: a
//! full queue is an immediate error. On shutdown the queue is drained within
//! `drain_timeout` and the client closed exactly once.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use jobgate_core::BrokerMessage;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use super::BrokerError;
use crate::service::config::BrokerConfig;
use crate::service::worker::{BackgroundRunnable, BackgroundWorker, WorkerError};
use crate::traits::BrokerClient;

/// Shared handle to the publishing task.
pub struct Publisher {
    worker: BackgroundWorker<PublishRunnable>,
    broker: Arc<dyn BrokerClient>,
    drain_timeout: Duration,
    /// Set once the broker client has been closed.
    closed: Mutex<bool>,
}

impl Publisher {
    /// Spawn the publishing task around `broker`. Must be called from within
    /// a tokio runtime.
    #[must_use]
    pub fn start(broker: Arc<dyn BrokerClient>, config: &BrokerConfig) -> Self {
        let capacity = config.queue_capacity.max(1);
        let max_in_flight = config.max_in_flight.max(1);
        let runnable = PublishRunnable {
            broker: Arc::clone(&broker),
            slots: Arc::new(Semaphore::new(max_in_flight)),
            deliveries: JoinSet::new(),
            stats: Arc::new(DeliveryStats::default()),
        };
        info!(capacity, max_in_flight, "publisher started");
        Self {
            worker: BackgroundWorker::start(runnable, capacity, config.report_interval),
            broker,
            drain_timeout: config.drain_timeout,
            closed: Mutex::new(false),
        }
    }

    /// Hand `message` to the publishing task without waiting.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::QueueFull`] when the queue has no free slot and
    /// [`BrokerError::PublisherClosed`] after [`shutdown`](Self::shutdown).
    pub fn enqueue(&self, message: BrokerMessage) -> Result<(), BrokerError> {
        self.worker.try_submit(message).map_err(|e| match e {
            WorkerError::Full => {
                metrics::counter!("jobgate_publish_rejected_total").increment(1);
                BrokerError::QueueFull
            }
            WorkerError::Closed => BrokerError::PublisherClosed,
        })?;

        #[allow(clippy::cast_precision_loss)]
        metrics::gauge!("jobgate_publish_queue_depth").set(self.queue_depth() as f64);
        Ok(())
    }

    /// Messages waiting to be published.
    #[must_use]
    pub fn queue_depth(&self) -> usize {
        self.worker.queue_depth()
    }

    /// `false` once shutdown has begun.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.worker.is_running()
    }

    /// Stop accepting messages, publish what is queued, and close the broker
    /// client. Deliveries still pending after `drain_timeout` are dropped.
    /// Safe to call more than once; the client is closed on the first call.
    pub async fn shutdown(&self) {
        let mut closed = self.closed.lock().await;
        if *closed {
            return;
        }

        info!(pending = self.queue_depth(), "publisher draining");
        if !self.worker.stop_within(self.drain_timeout).await {
            warn!(
                timeout_ms = self.drain_timeout.as_millis(),
                "publisher drain timed out, undelivered messages dropped"
            );
        }

        match self.broker.close().await {
            Ok(()) => info!("broker client closed"),
            Err(e) => warn!(error = %e, "broker client did not close cleanly"),
        }
        *closed = true;
    }
}

#[derive(Default)]
struct DeliveryStats {
    published: AtomicU64,
    failed: AtomicU64,
}

/// Runs on the publishing task and spawns one delivery per message.
struct PublishRunnable {
    broker: Arc<dyn BrokerClient>,
    slots: Arc<Semaphore>,
    deliveries: JoinSet<()>,
    stats: Arc<DeliveryStats>,
}

impl PublishRunnable {
    fn reap_finished(&mut self) {
        while let Some(joined) = self.deliveries.try_join_next() {
            if let Err(e) = joined {
                error!(error = %e, "delivery task failed");
            }
        }
    }
}

#[async_trait]
impl BackgroundRunnable for PublishRunnable {
    type Task = BrokerMessage;

    async fn run(&mut self, message: BrokerMessage) {
        // Holding the queue while all slots are busy is what makes enqueue
        // report QueueFull under a slow broker.
        let Ok(permit) = Arc::clone(&self.slots).acquire_owned().await else {
            error!("delivery slots closed, message dropped");
            return;
        };
        self.reap_finished();

        let broker = Arc::clone(&self.broker);
        let stats = Arc::clone(&self.stats);
        self.deliveries.spawn(async move {
            let topic = message.topic.clone();
            let key = message.key.clone();
            match broker.publish(message).await {
                Ok(()) => {
                    stats.published.fetch_add(1, Ordering::Relaxed);
                    metrics::counter!("jobgate_publish_total").increment(1);
                }
                Err(e) => {
                    stats.failed.fetch_add(1, Ordering::Relaxed);
                    metrics::counter!("jobgate_publish_failures_total").increment(1);
                    error!(%topic, %key, error = %e, "failed to publish job request");
                }
            }
            drop(permit);
        });
    }

    async fn on_tick(&mut self) {
        self.reap_finished();
        debug!(
            published = self.stats.published.swap(0, Ordering::Relaxed),
            failed = self.stats.failed.swap(0, Ordering::Relaxed),
            in_flight = self.deliveries.len(),
            "publisher status"
        );
    }

    async fn shutdown(&mut self) {
        while let Some(joined) = self.deliveries.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "delivery task failed");
            }
        }
        debug!("publisher drained");
    }
}
